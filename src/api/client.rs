use super::errors::{ApiError, ApiResult};
use super::fetcher::{filter_to_range, BreakdownDimension, MetricsFetcher, FACEBOOK_POST_METRICS};
use super::types::{
    Account, BreakdownResult, Comment, DoublyNested, Envelope, FeedItem, InstagramProfile,
    MetricRecord, Nested, PageInfo, TotalValueMetric,
};
use crate::config::ApiConfig;
use crate::observability::api_metrics;
use crate::selection::{DateRange, Platform};
use async_trait::async_trait;
use chrono::Utc;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use moka::future::Cache;
use moka::Expiry;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Rate-limited, caching client for the Graph API proxy
#[derive(Debug)]
pub struct GraphApiClient {
    http: reqwest::Client,
    base_url: Url,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    cache: Cache<String, CachedResponse>,
    settings: ApiConfig,
}

#[derive(Debug, Clone)]
struct CachedResponse {
    body: Arc<Value>,
    ttl: Duration,
}

/// Each entry lives for the freshness window it was stored with.
struct FreshnessWindow;

impl Expiry<String, CachedResponse> for FreshnessWindow {
    fn expire_after_create(&self, _key: &String, value: &CachedResponse, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }
}

impl GraphApiClient {
    pub fn new(settings: &ApiConfig) -> ApiResult<Self> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| ApiError::InvalidBaseUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;

        let per_second = NonZeroU32::new(settings.rate_limit.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(settings.rate_limit.burst_capacity).unwrap_or(per_second);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst)));

        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|source| ApiError::Transport {
                endpoint: settings.base_url.clone(),
                source,
            })?;

        let cache = Cache::builder()
            .max_capacity(settings.cache.max_capacity)
            .expire_after(FreshnessWindow)
            .build();

        Ok(Self {
            http,
            base_url,
            rate_limiter,
            cache,
            settings: settings.clone(),
        })
    }

    pub fn settings(&self) -> &ApiConfig {
        &self.settings
    }

    /// Freshness window for a response tied to `range`: short while the
    /// range is still accumulating data, long once it lies in the past.
    fn freshness(&self, range: Option<&DateRange>) -> Duration {
        let today = Utc::now().date_naive();
        match range {
            Some(range) if !range.ends_in_month_of(today) && range.until() < today => {
                self.settings.cache.past_month_ttl()
            }
            _ => self.settings.cache.current_month_ttl(),
        }
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        let raw = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| ApiError::InvalidBaseUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })
    }

    /// Execute one request through the cache and the rate limiter and return
    /// the decoded JSON body.
    async fn send(&self, method: Method, path: &str, body: Option<Value>, ttl: Duration) -> ApiResult<Arc<Value>> {
        let cache_key = match &body {
            Some(body) => format!("{method} {path} {body}"),
            None => format!("{method} {path}"),
        };

        if let Some(cached) = self.cache.get(&cache_key).await {
            api_metrics().record_cache_hit();
            debug!(endpoint = path, "Cache hit");
            return Ok(cached.body);
        }
        api_metrics().record_cache_miss();

        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        let url = self.url(path)?;
        let mut request = self.http.request(method, url);
        if let Some(body) = &body {
            request = request.json(body);
        }

        api_metrics().record_request();
        debug!(endpoint = path, "Issuing Graph API request");

        let response = request.send().await.map_err(|source| {
            api_metrics().record_failure(path);
            warn!(endpoint = path, error = %source, "Graph API request failed");
            ApiError::Transport {
                endpoint: path.to_string(),
                source,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            api_metrics().record_failure(path);
            warn!(endpoint = path, status = status.as_u16(), "Graph API returned an error status");
            return Err(ApiError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|source| ApiError::Transport {
            endpoint: path.to_string(),
            source,
        })?;
        if text.trim().is_empty() {
            return Err(ApiError::no_data(path));
        }
        let value: Value = serde_json::from_str(&text).map_err(|e| ApiError::parse(path, e))?;
        if value.is_null() {
            return Err(ApiError::no_data(path));
        }

        let body = Arc::new(value);
        self.cache
            .insert(
                cache_key,
                CachedResponse {
                    body: Arc::clone(&body),
                    ttl,
                },
            )
            .await;

        Ok(body)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value, ttl: Duration) -> ApiResult<T> {
        let value = self.send(Method::POST, path, Some(body), ttl).await?;
        decode(path, &value)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, ttl: Duration) -> ApiResult<T> {
        let value = self.send(Method::GET, path, None, ttl).await?;
        decode(path, &value)
    }

    /// Drop every cached response
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
        debug!("Graph API cache cleared");
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: &Value) -> ApiResult<T> {
    T::deserialize(value).map_err(|e| ApiError::parse(path, e))
}

fn non_empty<T>(path: &str, items: Vec<T>) -> ApiResult<Vec<T>> {
    if items.is_empty() {
        Err(ApiError::no_data(path))
    } else {
        Ok(items)
    }
}

#[async_trait]
impl MetricsFetcher for GraphApiClient {
    async fn list_accounts(&self) -> ApiResult<Vec<Account>> {
        let path = "/api/v1/accounts";
        let body = json!({
            "limit": self.settings.accounts_limit.to_string(),
            "after": "",
            "before": "",
        });
        let envelope: Nested<Vec<Account>> = self.post(path, body, self.freshness(None)).await?;
        non_empty(path, envelope.data.data)
    }

    async fn page_info(&self, page_id: &str) -> ApiResult<PageInfo> {
        let path = format!("/api/v1/page/{page_id}");
        let envelope: Envelope<PageInfo> = self.get(&path, self.freshness(None)).await?;
        Ok(envelope.data)
    }

    async fn instagram_profile(&self, page_id: &str) -> ApiResult<InstagramProfile> {
        let path = format!("/api/v1/page/{page_id}/ig_data");
        let envelope: Envelope<InstagramProfile> = self.post(&path, json!({}), self.freshness(None)).await?;
        Ok(envelope.data)
    }

    async fn fetch_page_summary(
        &self,
        page_id: &str,
        metrics: &[String],
        range: &DateRange,
    ) -> ApiResult<Vec<MetricRecord>> {
        let path = format!("/api/v1/page/summary/{page_id}");
        let body = json!({
            "metric": metrics.join(","),
            "period": "day",
            "since": range.since_param(),
            "until": range.until_param(),
        });
        let envelope: Nested<Vec<MetricRecord>> = self.post(&path, body, self.freshness(Some(range))).await?;
        non_empty(&path, envelope.data.data)
    }

    async fn fetch_instagram_insights(&self, page_id: &str, range: &DateRange) -> ApiResult<Vec<MetricRecord>> {
        let path = format!("/api/v1/page/{page_id}/insight");
        let body = json!({
            "since": range.since_param(),
            "until": range.until_param(),
        });
        let envelope: DoublyNested<Vec<MetricRecord>> =
            self.post(&path, body, self.freshness(Some(range))).await?;
        non_empty(&path, envelope.data.data.data)
    }

    async fn fetch_feed(&self, account_id: &str, range: &DateRange, platform: Platform) -> ApiResult<Vec<FeedItem>> {
        let ttl = self.freshness(Some(range));
        match platform {
            Platform::Facebook => {
                let path = format!("/api/v1/page/{account_id}/feeds");
                let body = json!({
                    "limit": self.settings.feed_limit.to_string(),
                    "offset": "0",
                    "since": range.since_param(),
                    "until": range.until_param(),
                });
                let envelope: DoublyNested<Vec<FeedItem>> = self.post(&path, body, ttl).await?;
                Ok(envelope.data.data.data)
            }
            Platform::Instagram => {
                let path = format!("/api/v1/page/{account_id}/ig_media");
                let envelope: DoublyNested<Vec<FeedItem>> = self.post(&path, json!({}), ttl).await?;
                let all = envelope.data.data.data;
                let total = all.len();
                let kept = filter_to_range(all, range);
                debug!(total, kept = kept.len(), "Filtered Instagram media by date range");
                Ok(kept)
            }
        }
    }

    async fn fetch_post_insights(
        &self,
        post_id: &str,
        platform: Platform,
        page_id: &str,
        range: &DateRange,
    ) -> ApiResult<Vec<MetricRecord>> {
        let ttl = self.freshness(Some(range));
        let (path, body) = match platform {
            Platform::Facebook => (
                format!("/api/v1/feed/summary/{post_id}"),
                json!({
                    "metric": FACEBOOK_POST_METRICS.join(","),
                    "period": "lifetime",
                }),
            ),
            Platform::Instagram => (format!("/api/v1/post_ig/{page_id}/{post_id}/insights"), json!({})),
        };
        let envelope: Nested<Vec<MetricRecord>> = self.post(&path, body, ttl).await?;
        non_empty(&path, envelope.data.data)
    }

    async fn fetch_comments(&self, post_id: &str) -> ApiResult<Vec<Comment>> {
        let path = format!("/api/v1/post/{post_id}/comments");
        let envelope: DoublyNested<Vec<Comment>> = self.post(&path, json!({}), self.freshness(None)).await?;
        Ok(envelope.data.data.data)
    }

    async fn fetch_page_demographics(&self, page_id: &str, range: &DateRange) -> ApiResult<Vec<MetricRecord>> {
        let path = format!("/api/v1/page/{page_id}/insightsByAgeGender");
        let body = json!({
            "since": range.since_param(),
            "until": range.until_param(),
        });
        let envelope: Nested<Vec<MetricRecord>> = self.post(&path, body, self.freshness(Some(range))).await?;
        non_empty(&path, envelope.data.data)
    }

    async fn fetch_instagram_breakdown(
        &self,
        page_id: &str,
        dimension: BreakdownDimension,
    ) -> ApiResult<Vec<BreakdownResult>> {
        let path = format!("/api/v1/page/{page_id}/IginsightsByAgeGender");
        let body = json!({ "breakdown": dimension.as_str() });
        let envelope: Nested<Vec<TotalValueMetric>> = self.post(&path, body, self.freshness(None)).await?;

        let results = envelope
            .data
            .data
            .into_iter()
            .next()
            .and_then(|metric| metric.total_value.breakdowns.into_iter().next())
            .map(|group| group.results)
            .ok_or_else(|| ApiError::no_data(&path))?;
        non_empty(&path, results)
    }

    async fn fetch_media(&self, url: &str) -> ApiResult<Vec<u8>> {
        let response = self.http.get(url).send().await.map_err(|source| ApiError::Transport {
            endpoint: url.to_string(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(|source| ApiError::Transport {
            endpoint: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}
