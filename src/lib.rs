// PagePulse Library - Facebook and Instagram page analytics
// This exposes the core components for the CLI, testing and integration

pub mod analytics;
pub mod api;
pub mod charts;
pub mod config;
pub mod dashboard;
pub mod observability;
pub mod report;
pub mod selection;
pub mod telemetry;

// Re-export key types for easy access
pub use api::{ApiError, ApiResult, GraphApiClient, MetricsFetcher};
pub use config::PagePulseConfig;
pub use dashboard::{Dashboard, ReportSession, ViewState};
pub use observability::{api_metrics, report_metrics, OperationTimer};
pub use selection::{DateRange, Platform, Selection, SelectionTracker};
pub use telemetry::{generate_correlation_id, init_telemetry};
