//! Canonical metric family tables.
//!
//! One table per platform, consumed by both the aggregator and the renderers.
//! Table order is the display priority order.

use crate::selection::Platform;

/// Record carrying the per-type reaction breakdown. Never grouped.
pub const REACTIONS_RECORD: &str = "post_reactions_by_type_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilySpec {
    /// Family root key
    pub key: &'static str,
    pub title: &'static str,
    /// Metric names absorbed by this family
    pub members: &'static [&'static str],
    /// Every member is dropped for non-video posts
    pub video_only: bool,
    /// Family is not shown for video posts
    pub hidden_for_video: bool,
}

impl FamilySpec {
    pub fn absorbs(&self, metric: &str) -> bool {
        self.key == metric || self.members.contains(&metric)
    }

    pub fn applies_to(&self, is_video: bool) -> bool {
        if is_video {
            !self.hidden_for_video
        } else {
            !self.video_only
        }
    }
}

const FACEBOOK_FAMILIES: &[FamilySpec] = &[
    FamilySpec {
        key: "post_impressions",
        title: "Impressions",
        members: &[
            "post_impressions",
            "post_impressions_paid",
            "post_impressions_organic",
            "post_impressions_unique",
            "post_impressions_paid_unique",
            "post_impressions_organic_unique",
        ],
        video_only: false,
        hidden_for_video: false,
    },
    FamilySpec {
        key: "post_clicks",
        title: "Clicks",
        members: &["post_clicks", "post_clicks_unique"],
        video_only: false,
        hidden_for_video: false,
    },
    FamilySpec {
        key: "post_engaged_users",
        title: "Engaged Users",
        members: &["post_engaged_users", "post_engaged_users_unique"],
        video_only: false,
        hidden_for_video: false,
    },
    FamilySpec {
        key: "post_negative_feedback",
        title: "Negative Feedback",
        members: &["post_negative_feedback", "post_negative_feedback_unique"],
        video_only: false,
        hidden_for_video: false,
    },
    FamilySpec {
        key: "post_video",
        title: "Video",
        members: &[
            "post_video_views",
            "post_video_views_organic",
            "post_video_views_paid",
            "post_video_avg_time_watched",
        ],
        video_only: true,
        hidden_for_video: false,
    },
];

const INSTAGRAM_FAMILIES: &[FamilySpec] = &[
    FamilySpec {
        key: "impressions",
        title: "Impressions & Reach",
        members: &["impressions", "reach"],
        video_only: false,
        hidden_for_video: false,
    },
    FamilySpec {
        key: "follows",
        title: "Follows & Profile Visits",
        members: &["follows", "profile_visits"],
        video_only: false,
        hidden_for_video: true,
    },
    FamilySpec {
        key: "video_views",
        title: "Video Views",
        members: &[
            "video_views",
            "ig_reels_video_view_total_time",
            "ig_reels_video_view_avg_time",
            "ig_reels_aggregated_all_plays_count",
            "clips_replays_count",
        ],
        video_only: true,
        hidden_for_video: false,
    },
];

pub fn families_for(platform: Platform) -> &'static [FamilySpec] {
    match platform {
        Platform::Facebook => FACEBOOK_FAMILIES,
        Platform::Instagram => INSTAGRAM_FAMILIES,
    }
}

/// First family in `table` that absorbs `metric`.
pub fn resolve(table: &'static [FamilySpec], metric: &str) -> Option<&'static FamilySpec> {
    table.iter().find(|family| family.absorbs(metric))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_metric_belongs_to_at_most_one_family() {
        for platform in [Platform::Facebook, Platform::Instagram] {
            let table = families_for(platform);
            for family in table {
                for member in family.members {
                    let owners = table.iter().filter(|f| f.absorbs(member)).count();
                    assert_eq!(owners, 1, "{member} is claimed by {owners} families");
                }
            }
        }
    }

    #[test]
    fn root_key_resolves_to_its_family() {
        let table = families_for(Platform::Facebook);
        assert_eq!(resolve(table, "post_video").map(|f| f.key), Some("post_video"));
        assert_eq!(
            resolve(table, "post_impressions_paid_unique").map(|f| f.key),
            Some("post_impressions")
        );
        assert!(resolve(table, "post_reactions_like_total").is_none());
    }

    #[test]
    fn instagram_follows_are_hidden_for_video() {
        let follows = resolve(families_for(Platform::Instagram), "profile_visits").unwrap();
        assert!(!follows.applies_to(true));
        assert!(follows.applies_to(false));
    }
}
