//! The data-access seam between views and the Graph API proxy.

use super::errors::ApiResult;
use super::types::{
    Account, BreakdownResult, Comment, FeedItem, InstagramProfile, MetricRecord, PageInfo,
};
use crate::selection::{DateRange, Platform};
use async_trait::async_trait;
use std::fmt;

#[cfg(test)]
use mockall::automock;

/// Lifetime metrics requested for every Facebook post.
pub const FACEBOOK_POST_METRICS: &[&str] = &[
    "post_engaged_users",
    "post_video_views",
    "post_video_views_organic",
    "post_video_views_paid",
    "post_negative_feedback",
    "post_negative_feedback_unique",
    "post_impressions",
    "post_impressions_unique",
    "post_impressions_paid",
    "post_impressions_paid_unique",
    "post_impressions_organic",
    "post_impressions_organic_unique",
    "post_reactions_like_total",
    "post_reactions_love_total",
    "post_reactions_wow_total",
    "post_reactions_haha_total",
    "post_reactions_sorry_total",
    "post_reactions_anger_total",
    "post_clicks",
    "post_clicks_unique",
    "post_reactions_by_type_total",
];

/// Daily page metrics behind the growth chart.
pub const PAGE_SUMMARY_METRICS: &[&str] = &["page_impressions", "page_fans"];

/// Dimension of an Instagram audience breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakdownDimension {
    Age,
    Gender,
    City,
}

impl BreakdownDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakdownDimension::Age => "age",
            BreakdownDimension::Gender => "gender",
            BreakdownDimension::City => "city",
        }
    }
}

impl fmt::Display for BreakdownDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the dashboard and report pipeline read from the proxy.
///
/// Implementations must not panic on odd payloads: transport and status
/// problems become `FailureKind::NetworkFailure`, empty or malformed bodies
/// become `FailureKind::NoData`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetricsFetcher: Send + Sync {
    async fn list_accounts(&self) -> ApiResult<Vec<Account>>;

    async fn page_info(&self, page_id: &str) -> ApiResult<PageInfo>;

    async fn instagram_profile(&self, page_id: &str) -> ApiResult<InstagramProfile>;

    async fn fetch_page_summary(
        &self,
        page_id: &str,
        metrics: &[String],
        range: &DateRange,
    ) -> ApiResult<Vec<MetricRecord>>;

    async fn fetch_instagram_insights(&self, page_id: &str, range: &DateRange) -> ApiResult<Vec<MetricRecord>>;

    /// Posts of `account_id` inside `range`. Instagram media are filtered
    /// locally because the proxy ignores the range for them.
    async fn fetch_feed(&self, account_id: &str, range: &DateRange, platform: Platform) -> ApiResult<Vec<FeedItem>>;

    /// Lifetime insights of one post. `page_id` is only used for Instagram.
    async fn fetch_post_insights(
        &self,
        post_id: &str,
        platform: Platform,
        page_id: &str,
        range: &DateRange,
    ) -> ApiResult<Vec<MetricRecord>>;

    async fn fetch_comments(&self, post_id: &str) -> ApiResult<Vec<Comment>>;

    /// Facebook audience records (`page_impressions_by_age_gender_unique`, `page_fans_city`).
    async fn fetch_page_demographics(&self, page_id: &str, range: &DateRange) -> ApiResult<Vec<MetricRecord>>;

    async fn fetch_instagram_breakdown(
        &self,
        page_id: &str,
        dimension: BreakdownDimension,
    ) -> ApiResult<Vec<BreakdownResult>>;

    /// Raw bytes behind a media url, for embedding in the report.
    async fn fetch_media(&self, url: &str) -> ApiResult<Vec<u8>>;
}

/// Keep the items whose capture time lies inside `range`, both ends inclusive.
/// Items without a parseable timestamp are dropped.
pub fn filter_to_range(items: Vec<FeedItem>, range: &DateRange) -> Vec<FeedItem> {
    items
        .into_iter()
        .filter(|item| item.created_at().is_some_and(|at| range.contains(at)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(id: &str, timestamp: &str) -> FeedItem {
        let mut item = FeedItem::new(id);
        item.timestamp = Some(timestamp.to_string());
        item
    }

    #[test]
    fn instagram_filter_is_inclusive_on_both_ends() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();

        let kept = filter_to_range(
            vec![
                item("mid", "2024-01-15T10:00:00Z"),
                item("after", "2024-02-01T00:00:00Z"),
                item("last-second", "2024-01-31T23:59:59Z"),
                item("facebook-style", "2024-01-01T00:00:00+0000"),
                item("garbage", "not a date"),
            ],
            &range,
        );

        let ids: Vec<_> = kept.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["mid", "last-second", "facebook-style"]);
    }

    #[test]
    fn facebook_metric_list_requests_reaction_breakdown() {
        assert!(FACEBOOK_POST_METRICS.contains(&"post_reactions_by_type_total"));
        assert_eq!(FACEBOOK_POST_METRICS.len(), 21);
    }
}
