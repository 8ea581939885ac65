//! Pure transforms from raw insight payloads to display-ready structures.

pub mod aggregator;
pub mod cities;
pub mod demographics;
pub mod families;
pub mod labels;
pub mod series;

pub use aggregator::{aggregate, AggregatedInsights, MetricFamily};
pub use cities::{CityDistribution, CityNormalizer};
pub use demographics::{decompose, AgeDistribution, GenderDistribution};
pub use series::PageGrowth;
