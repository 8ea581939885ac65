pub mod client;
pub mod errors;
pub mod fetcher;
pub mod types;

pub use client::GraphApiClient;
pub use errors::{ApiError, ApiResult, FailureKind};
pub use fetcher::{BreakdownDimension, MetricsFetcher};
