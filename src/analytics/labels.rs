//! Display labels and value formatting for insight metrics.

use super::aggregator::MetricFamily;
use crate::api::types::{MetricRecord, MetricValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Count,
    /// Stored in milliseconds, shown in seconds
    Milliseconds,
}

struct Label {
    metric: &'static str,
    text: &'static str,
    unit: Unit,
}

const fn count(metric: &'static str, text: &'static str) -> Label {
    Label {
        metric,
        text,
        unit: Unit::Count,
    }
}

const fn millis(metric: &'static str, text: &'static str) -> Label {
    Label {
        metric,
        text,
        unit: Unit::Milliseconds,
    }
}

const LABELS: &[Label] = &[
    count("post_impressions", "Total"),
    count("post_impressions_unique", "Total (Unique)"),
    count("post_impressions_paid", "Paid"),
    count("post_impressions_paid_unique", "Paid (Unique)"),
    count("post_impressions_organic", "Organic"),
    count("post_impressions_organic_unique", "Organic (Unique)"),
    count("post_clicks", "Clicks"),
    count("post_clicks_unique", "Clicks (Unique)"),
    count("post_engaged_users", "Engaged Users"),
    count("post_engaged_users_unique", "Engaged Users (Unique)"),
    count("post_negative_feedback", "Negative Feedback"),
    count("post_negative_feedback_unique", "Negative Feedback (Unique)"),
    count("post_video_views", "Total"),
    count("post_video_views_organic", "Organic"),
    count("post_video_views_paid", "Paid"),
    millis("post_video_avg_time_watched", "Avg Time Watched"),
    count("post_reactions_like_total", "Like Reactions"),
    count("post_reactions_love_total", "Love Reactions"),
    count("post_reactions_wow_total", "Wow Reactions"),
    count("post_reactions_haha_total", "Haha Reactions"),
    count("post_reactions_sorry_total", "Sorry Reactions"),
    count("post_reactions_anger_total", "Anger Reactions"),
    count("post_reactions_by_type_total", "Reactions"),
    count("impressions", "Impressions"),
    count("reach", "Reach"),
    count("follows", "Follows"),
    count("profile_visits", "Profile Visits"),
    count("video_views", "Video Views"),
    millis("ig_reels_video_view_total_time", "Total Watch Time"),
    millis("ig_reels_video_view_avg_time", "Avg Watch Time"),
    count("ig_reels_aggregated_all_plays_count", "Plays"),
    count("clips_replays_count", "Replays"),
    count("shares", "Shares"),
    count("saved", "Saved"),
    count("page_impressions", "Impressions"),
    count("page_fans", "Fans"),
    count("follower_count", "Followers"),
];

/// Reaction types in the order the reactions widget shows them.
pub const REACTION_TYPES: &[&str] = &["like", "love", "haha", "wow", "sorry", "anger", "care"];

fn lookup(metric: &str) -> Option<&'static Label> {
    LABELS.iter().find(|label| label.metric == metric)
}

pub fn unit_of(metric: &str) -> Unit {
    lookup(metric).map(|label| label.unit).unwrap_or(Unit::Count)
}

/// Display label of a metric: the table entry, or a cleaned-up form of
/// `fallback` (usually the API-provided title) when the metric is unknown.
pub fn label_for(metric: &str, fallback: &str) -> String {
    match lookup(metric) {
        Some(label) => label.text.to_string(),
        None if !fallback.trim().is_empty() => prettify(fallback),
        None => prettify(metric),
    }
}

pub(crate) fn singleton_title(record: &MetricRecord) -> String {
    label_for(&record.name, &record.title)
}

/// Turn an API title or raw key into a short heading:
/// `"Lifetime Post Total Reactions by type total"` → `"Total Reactions"`.
pub fn prettify(raw: &str) -> String {
    let mut text = raw.trim().trim_end_matches('.').to_string();
    for prefix in ["Lifetime ", "Post ", "post_", "_ "] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.to_string();
        }
    }
    for suffix in [" by type total", "_by_type_total"] {
        if let Some(rest) = text.strip_suffix(suffix) {
            text = rest.to_string();
        }
    }

    text.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `1234567` → `"1,234,567"`; fractions keep two decimals.
pub fn format_count(value: f64) -> String {
    let negative = value < 0.0;
    let abs = value.abs();
    let (whole, fraction) = if abs.fract() == 0.0 {
        (format!("{abs:.0}"), None)
    } else {
        let fixed = format!("{abs:.2}");
        match fixed.split_once('.') {
            Some((whole, fraction)) => (whole.to_string(), Some(fraction.to_string())),
            None => (fixed, None),
        }
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(&fraction);
    }
    out
}

/// Milliseconds shown as seconds with two decimals.
pub fn format_duration_ms(millis: f64) -> String {
    format!("{:.2} sec", millis / 1000.0)
}

/// Render one metric value. Breakdowns are never summed; they are shown as
/// their JSON form.
pub fn format_value(value: Option<&MetricValue>, unit: Unit) -> String {
    match (value, unit) {
        (Some(MetricValue::Scalar(v)), Unit::Milliseconds) => format_duration_ms(*v),
        (Some(MetricValue::Scalar(v)), Unit::Count) => format_count(*v),
        (Some(MetricValue::Breakdown(breakdown)), _) => {
            serde_json::to_string(breakdown).unwrap_or_else(|_| "N/A".to_string())
        }
        (None, _) => "N/A".to_string(),
    }
}

/// Lifetime value of a record, formatted for display.
pub fn display_value(record: &MetricRecord) -> String {
    format_value(record.first_value(), unit_of(&record.name))
}

/// One line of a family card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyRow {
    pub label: String,
    pub total: String,
    /// Value of the matching `_unique` metric, when the family has one
    pub unique: Option<String>,
}

/// Card rows for a family. A metric and its `_unique` twin share a row.
pub fn family_rows(family: &MetricFamily) -> Vec<FamilyRow> {
    family
        .records
        .iter()
        .filter(|record| {
            !(record.name.ends_with("_unique")
                && family
                    .records
                    .iter()
                    .any(|other| Some(other.name.as_str()) == record.name.strip_suffix("_unique")))
        })
        .map(|record| {
            let unique_name = format!("{}_unique", record.name);
            let unique = family
                .records
                .iter()
                .find(|other| other.name == unique_name)
                .map(display_value);
            FamilyRow {
                label: label_for(&record.name, &record.title),
                total: display_value(record),
                unique,
            }
        })
        .collect()
}

/// Reaction counts in widget order, zero when a type is missing.
pub fn reaction_counts(record: &MetricRecord) -> Vec<(&'static str, u64)> {
    let breakdown = record.first_value().and_then(MetricValue::as_breakdown);
    REACTION_TYPES
        .iter()
        .map(|kind| {
            let count = breakdown.and_then(|b| b.get(kind)).unwrap_or(0.0);
            (*kind, count.max(0.0) as u64)
        })
        .collect()
}
