use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tracing::info;

/// Route with its account and post ids replaced by `:id`, so failures for
/// every page land in one bucket.
pub fn route_family(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.chars().any(|c| c.is_ascii_digit()) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Proxy traffic seen by the client: cache lookups, requests sent and
/// failures per route.
#[derive(Debug, Default)]
pub struct ApiMetrics {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    failures: Mutex<BTreeMap<String, u64>>,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, path: &str) {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        *failures.entry(route_family(path)).or_default() += 1;
    }

    pub fn get_stats(&self) -> ApiStats {
        ApiStats {
            requests: self.requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            failures: self
                .failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            requests = stats.requests,
            failures = stats.total_failures(),
            cache_hit_rate = stats.cache_hit_rate(),
            "Graph API metrics"
        );
        for (route, count) in &stats.failures {
            info!(route = %route, failures = count, "Graph API route failures");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiStats {
    pub requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Route family → failed requests
    pub failures: BTreeMap<String, u64>,
}

impl ApiStats {
    /// Share of lookups answered from the cache, 0.0 before any lookup.
    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }

    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }
}

/// Chart snapshots taken for reports in this process.
#[derive(Debug, Default)]
pub struct ReportMetrics {
    captured: AtomicU64,
    capture_failures: AtomicU64,
}

impl ReportMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_captures(&self, count: u64) {
        self.captured.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_capture_failure(&self) {
        self.capture_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn captured(&self) -> u64 {
        self.captured.load(Ordering::Relaxed)
    }

    pub fn capture_failures(&self) -> u64 {
        self.capture_failures.load(Ordering::Relaxed)
    }

    pub fn log_stats(&self) {
        let (captured, failed) = (self.captured(), self.capture_failures());
        if captured + failed > 0 {
            info!(captured, failed, "Report snapshot metrics");
        }
    }
}

static API_METRICS: std::sync::LazyLock<ApiMetrics> = std::sync::LazyLock::new(ApiMetrics::new);
static REPORT_METRICS: std::sync::LazyLock<ReportMetrics> = std::sync::LazyLock::new(ReportMetrics::new);

pub fn api_metrics() -> &'static ApiMetrics {
    &API_METRICS
}

pub fn report_metrics() -> &'static ReportMetrics {
    &REPORT_METRICS
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}
