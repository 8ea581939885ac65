use super::families::{families_for, resolve, FamilySpec, REACTIONS_RECORD};
use super::labels;
use crate::api::types::MetricRecord;
use crate::selection::Platform;
use serde::Serialize;
use tracing::trace;

/// A group of related metrics shown together as one card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricFamily {
    pub key: String,
    pub title: String,
    pub records: Vec<MetricRecord>,
    /// Not declared in the family table
    pub singleton: bool,
    /// Kept for completeness but not shown for this kind of post
    pub hidden: bool,
}

impl MetricFamily {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedInsights {
    /// Declared families in priority order, then singletons in discovery order.
    pub families: Vec<MetricFamily>,
    /// The per-type reaction breakdown, rendered by its own widget.
    pub reactions: Option<MetricRecord>,
}

impl AggregatedInsights {
    pub fn family(&self, key: &str) -> Option<&MetricFamily> {
        self.families.iter().find(|family| family.key == key)
    }

    pub fn visible_families(&self) -> impl Iterator<Item = &MetricFamily> {
        self.families.iter().filter(|family| !family.hidden)
    }

    /// Records in families plus the reactions record.
    pub fn record_count(&self) -> usize {
        self.families.iter().map(|f| f.records.len()).sum::<usize>() + usize::from(self.reactions.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

/// Group a flat insight list into display families.
///
/// Non-video posts lose every record whose name mentions video and every
/// member of a video-only family. Everything else lands in exactly one
/// family, except the reaction breakdown which is set aside.
pub fn aggregate(records: &[MetricRecord], platform: Platform, is_video: bool) -> AggregatedInsights {
    let table = families_for(platform);
    let mut declared: Vec<(&'static FamilySpec, Vec<MetricRecord>)> = Vec::new();
    let mut singletons: Vec<MetricFamily> = Vec::new();
    let mut reactions = None;

    for record in records {
        if !is_video && record.name.contains("video") {
            trace!(metric = %record.name, "Dropping video metric for non-video post");
            continue;
        }

        if let Some(spec) = resolve(table, &record.name) {
            if !is_video && spec.video_only {
                continue;
            }
            match declared.iter_mut().find(|(s, _)| s.key == spec.key) {
                Some((_, members)) => members.push(record.clone()),
                None => declared.push((spec, vec![record.clone()])),
            }
            continue;
        }

        if record.name == REACTIONS_RECORD {
            reactions = Some(record.clone());
            continue;
        }

        match singletons.iter_mut().find(|family| family.key == record.name) {
            Some(family) => family.records.push(record.clone()),
            None => singletons.push(MetricFamily {
                key: record.name.clone(),
                title: labels::singleton_title(record),
                records: vec![record.clone()],
                singleton: true,
                hidden: false,
            }),
        }
    }

    let mut families: Vec<MetricFamily> = table
        .iter()
        .filter_map(|spec| {
            let (_, members) = declared.iter_mut().find(|(s, _)| s.key == spec.key)?;
            Some(MetricFamily {
                key: spec.key.to_string(),
                title: spec.title.to_string(),
                records: std::mem::take(members),
                singleton: false,
                hidden: !spec.applies_to(is_video),
            })
        })
        .collect();
    families.extend(singletons);

    AggregatedInsights { families, reactions }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(insights: &AggregatedInsights) -> Vec<&str> {
        insights.families.iter().map(|f| f.key.as_str()).collect()
    }

    #[test]
    fn impressions_and_clicks_example() {
        let records = vec![
            MetricRecord::scalar("post_impressions", 100.0),
            MetricRecord::scalar("post_impressions_paid", 60.0),
            MetricRecord::scalar("post_clicks", 5.0),
        ];

        let insights = aggregate(&records, Platform::Facebook, false);

        assert_eq!(keys(&insights), vec!["post_impressions", "post_clicks"]);
        let impressions = insights.family("post_impressions").unwrap();
        assert_eq!(
            impressions.names().collect::<Vec<_>>(),
            vec!["post_impressions", "post_impressions_paid"]
        );
        assert_eq!(insights.family("post_clicks").unwrap().records.len(), 1);
    }

    #[test]
    fn priority_order_then_singletons_in_discovery_order() {
        let records = vec![
            MetricRecord::scalar("post_reactions_love_total", 2.0),
            MetricRecord::scalar("post_negative_feedback", 1.0),
            MetricRecord::scalar("post_reactions_like_total", 9.0),
            MetricRecord::scalar("post_clicks_unique", 3.0),
            MetricRecord::scalar("post_impressions_unique", 80.0),
            MetricRecord::scalar("post_video_views", 40.0),
        ];

        let insights = aggregate(&records, Platform::Facebook, true);

        assert_eq!(
            keys(&insights),
            vec![
                "post_impressions",
                "post_clicks",
                "post_negative_feedback",
                "post_video",
                "post_reactions_love_total",
                "post_reactions_like_total",
            ]
        );
        assert!(insights.family("post_reactions_like_total").unwrap().singleton);
    }

    #[test]
    fn video_metrics_dropped_for_non_video_posts() {
        let records = vec![
            MetricRecord::scalar("post_video_views", 40.0),
            MetricRecord::scalar("post_video_avg_time_watched", 5300.0),
            MetricRecord::scalar("post_custom_video_metric", 1.0),
            MetricRecord::scalar("post_clicks", 5.0),
        ];

        let insights = aggregate(&records, Platform::Facebook, false);

        assert_eq!(keys(&insights), vec!["post_clicks"]);
        assert_eq!(insights.record_count(), 1);
    }

    #[test]
    fn reactions_breakdown_is_isolated() {
        let records = vec![
            MetricRecord::breakdown(
                REACTIONS_RECORD,
                vec![("like".into(), 10.0), ("love".into(), 2.0)],
            ),
            MetricRecord::scalar("post_clicks", 5.0),
        ];

        let insights = aggregate(&records, Platform::Facebook, false);

        assert!(insights.family(REACTIONS_RECORD).is_none());
        assert_eq!(insights.reactions.as_ref().map(|r| r.name.as_str()), Some(REACTIONS_RECORD));
        assert_eq!(insights.record_count(), 2);
    }

    #[test]
    fn instagram_families_follow_media_type() {
        let records = vec![
            MetricRecord::scalar("reach", 900.0),
            MetricRecord::scalar("impressions", 1200.0),
            MetricRecord::scalar("follows", 4.0),
            MetricRecord::scalar("profile_visits", 12.0),
            MetricRecord::scalar("clips_replays_count", 30.0),
            MetricRecord::scalar("saved", 3.0),
        ];

        let image = aggregate(&records, Platform::Instagram, false);
        assert_eq!(keys(&image), vec!["impressions", "follows", "saved"]);
        assert!(image.visible_families().all(|f| f.key != "video_views"));

        let reel = aggregate(&records, Platform::Instagram, true);
        assert_eq!(keys(&reel), vec!["impressions", "follows", "video_views", "saved"]);
        assert!(reel.family("follows").unwrap().hidden);
        assert_eq!(reel.record_count(), records.len());
        assert_eq!(
            reel.visible_families().map(|f| f.key.as_str()).collect::<Vec<_>>(),
            vec!["impressions", "video_views", "saved"]
        );
    }
}
