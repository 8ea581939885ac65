use super::svg::bar_chart;
use super::{region_id, ChartRegion};
use crate::analytics::aggregator::{AggregatedInsights, MetricFamily};
use crate::analytics::labels::{self, Unit};
use crate::api::types::MetricValue;
use tracing::debug;

pub const POST_CHART_WIDTH: u32 = 560;
pub const POST_CHART_HEIGHT: u32 = 280;

/// Headline number of a family: its root metric, else its first metric.
/// Durations and breakdowns have no headline.
pub fn family_headline(family: &MetricFamily) -> Option<f64> {
    let record = family
        .records
        .iter()
        .find(|record| record.name == family.key)
        .or_else(|| family.records.first())?;
    if labels::unit_of(&record.name) != Unit::Count {
        return None;
    }
    record.first_value().and_then(MetricValue::as_scalar)
}

/// Bar chart of a post's insight families plus its non-zero reactions.
/// `None` when there is nothing to draw.
pub fn post_chart(item_id: &str, insights: &AggregatedInsights) -> Option<ChartRegion> {
    let mut bars: Vec<(String, f64)> = insights
        .visible_families()
        .filter_map(|family| family_headline(family).map(|value| (family.title.clone(), value)))
        .collect();

    if let Some(reactions) = &insights.reactions {
        bars.extend(
            labels::reaction_counts(reactions)
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(kind, count)| (labels::prettify(kind), count as f64)),
        );
    }

    match bar_chart("Post Insights", &bars, POST_CHART_WIDTH, POST_CHART_HEIGHT) {
        Ok(svg) => Some(ChartRegion {
            id: region_id(item_id),
            title: "Post Insights".to_string(),
            svg,
            width: POST_CHART_WIDTH,
            height: POST_CHART_HEIGHT,
        }),
        Err(e) => {
            debug!(item_id, error = %e, "No insight chart for post");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::aggregator::aggregate;
    use crate::api::types::MetricRecord;
    use crate::selection::Platform;

    #[test]
    fn chart_covers_families_and_reactions() {
        let insights = aggregate(
            &[
                MetricRecord::scalar("post_impressions", 1500.0),
                MetricRecord::scalar("post_impressions_unique", 900.0),
                MetricRecord::scalar("post_clicks", 42.0),
                MetricRecord::breakdown(
                    "post_reactions_by_type_total",
                    vec![("like".into(), 12.0), ("haha".into(), 0.0)],
                ),
            ],
            Platform::Facebook,
            false,
        );

        let region = post_chart("1_2", &insights).unwrap();
        assert_eq!(region.id, "chart-1_2");
        assert!(region.svg.contains("Impressions"));
        assert!(region.svg.contains("Clicks"));
        assert!(region.svg.contains("Like"));
        assert!(!region.svg.contains("Haha"));
    }

    #[test]
    fn no_chart_without_numbers() {
        assert!(post_chart("1_2", &AggregatedInsights::default()).is_none());

        let durations_only = aggregate(
            &[MetricRecord::scalar("post_video_avg_time_watched", 3000.0)],
            Platform::Facebook,
            true,
        );
        assert!(post_chart("1_2", &durations_only).is_none());
    }
}
