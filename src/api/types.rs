//! Typed response schemas for the Graph API proxy.
//!
//! Every endpoint wraps its payload in one or more `data` envelopes. The
//! envelope types below spell out each nesting level so a shape change
//! surfaces as a parse error instead of a silent `None` deep in a view.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One `{"data": ...}` wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// `data.data` payloads.
pub type Nested<T> = Envelope<Envelope<T>>;

/// `data.data.data` payloads.
pub type DoublyNested<T> = Envelope<Envelope<Envelope<T>>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cover {
    pub source: Option<String>,
}

/// Facebook page profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageInfo {
    pub name: String,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub cover: Option<Cover>,
    #[serde(default)]
    pub fan_count: Option<u64>,
    #[serde(default)]
    pub followers_count: Option<u64>,
}

/// Instagram business profile linked to a page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstagramProfile {
    pub username: String,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    #[serde(default)]
    pub followers_count: Option<u64>,
    #[serde(default)]
    pub media_count: Option<u64>,
}

/// A metric value is either a plain number or a breakdown over some dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Scalar(f64),
    Breakdown(Breakdown),
}

impl MetricValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            MetricValue::Scalar(value) => Some(*value),
            MetricValue::Breakdown(_) => None,
        }
    }

    pub fn as_breakdown(&self) -> Option<&Breakdown> {
        match self {
            MetricValue::Breakdown(breakdown) => Some(breakdown),
            MetricValue::Scalar(_) => None,
        }
    }
}

/// Dimension key → count, in the order the proxy sent them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Breakdown(Vec<(String, f64)>);

impl Breakdown {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, f64)> {
        self.0
    }
}

impl FromIterator<(String, f64)> for Breakdown {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Breakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, &Number(*value))?;
        }
        map.end()
    }
}

/// Whole numbers go out as integers, the way the proxy sends them.
struct Number(f64);

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0.abs() < i64::MAX as f64 {
            serializer.serialize_i64(self.0 as i64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Scalar(value) => Number(*value).serialize(serializer),
            MetricValue::Breakdown(breakdown) => breakdown.serialize(serializer),
        }
    }
}

struct MetricValueVisitor;

impl<'de> Visitor<'de> for MetricValueVisitor {
    type Value = MetricValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or an object of numbers")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(MetricValue::Scalar(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(MetricValue::Scalar(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(MetricValue::Scalar(v as f64))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, f64>()? {
            entries.push((key, value));
        }
        Ok(MetricValue::Breakdown(Breakdown(entries)))
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MetricValueVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    #[serde(default)]
    pub value: Option<MetricValue>,
    #[serde(default)]
    pub end_time: Option<String>,
}

impl MetricPoint {
    pub fn scalar(value: f64) -> Self {
        Self {
            value: Some(MetricValue::Scalar(value)),
            end_time: None,
        }
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time.as_deref().and_then(parse_graph_timestamp)
    }
}

/// One named metric with its per-period values. Lifetime metrics carry a
/// single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub values: Vec<MetricPoint>,
}

impl MetricRecord {
    pub fn scalar(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            title: String::new(),
            description: String::new(),
            period: Some("lifetime".to_string()),
            values: vec![MetricPoint::scalar(value)],
        }
    }

    pub fn breakdown(name: &str, entries: Vec<(String, f64)>) -> Self {
        Self {
            name: name.to_string(),
            title: String::new(),
            description: String::new(),
            period: Some("lifetime".to_string()),
            values: vec![MetricPoint {
                value: Some(MetricValue::Breakdown(Breakdown::new(entries))),
                end_time: None,
            }],
        }
    }

    pub fn first_value(&self) -> Option<&MetricValue> {
        self.values.first().and_then(|point| point.value.as_ref())
    }

    pub fn last_value(&self) -> Option<&MetricValue> {
        self.values.last().and_then(|point| point.value.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Count {
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summarized {
    #[serde(default)]
    pub summary: Option<Summary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default, alias = "message")]
    pub text: String,
    #[serde(default, alias = "created_time")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentsEdge {
    #[serde(default)]
    pub data: Vec<Comment>,
    #[serde(default)]
    pub summary: Option<Summary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// A Facebook post or an Instagram media object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub full_picture: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub shares: Option<Count>,
    #[serde(default)]
    pub reactions: Option<Summarized>,
    #[serde(default)]
    pub comments: Option<CommentsEdge>,
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub comments_count: Option<u64>,
    #[serde(default)]
    pub attachments: Option<Edge<Attachment>>,
    #[serde(default)]
    pub insights: Option<Edge<MetricRecord>>,
}

impl FeedItem {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            message: None,
            caption: None,
            created_time: None,
            timestamp: None,
            full_picture: None,
            media_url: None,
            thumbnail_url: None,
            permalink: None,
            media_type: None,
            shares: None,
            reactions: None,
            comments: None,
            like_count: None,
            comments_count: None,
            attachments: None,
            insights: None,
        }
    }

    /// Message, then caption, then `fallback`.
    pub fn text_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        fn present(text: &Option<String>) -> Option<&str> {
            text.as_deref().filter(|t| !t.trim().is_empty())
        }
        present(&self.message)
            .or_else(|| present(&self.caption))
            .unwrap_or(fallback)
    }

    /// Capture time: Facebook `created_time`, Instagram `timestamp`.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_time
            .as_deref()
            .or(self.timestamp.as_deref())
            .and_then(parse_graph_timestamp)
    }

    pub fn created_on(&self) -> Option<NaiveDate> {
        self.created_at().map(|at| at.date_naive())
    }

    /// Preferred image: thumbnail, then media url, then full picture.
    pub fn media_ref(&self) -> Option<&str> {
        self.thumbnail_url
            .as_deref()
            .or(self.media_url.as_deref())
            .or(self.full_picture.as_deref())
    }

    /// Type of the first attachment (Facebook).
    pub fn attachment_type(&self) -> Option<&str> {
        self.attachments
            .as_ref()
            .and_then(|edge| edge.data.first())
            .map(|attachment| attachment.kind.as_str())
    }

    pub fn is_video(&self) -> bool {
        let attachment_video = self
            .attachment_type()
            .map(|kind| kind.to_lowercase().contains("video"))
            .unwrap_or(false);
        let media_video = self
            .media_type
            .as_deref()
            .map(|kind| kind.eq_ignore_ascii_case("VIDEO"))
            .unwrap_or(false);
        attachment_video || media_video
    }

    pub fn reaction_count(&self) -> u64 {
        self.reactions
            .as_ref()
            .and_then(|r| r.summary.as_ref())
            .map(|s| s.total_count)
            .unwrap_or(0)
    }

    /// Comment total from the summary (Facebook) or `comments_count` (Instagram).
    pub fn comment_count(&self) -> u64 {
        self.comments
            .as_ref()
            .and_then(|c| c.summary.as_ref())
            .map(|s| s.total_count)
            .or(self.comments_count)
            .unwrap_or(0)
    }

    pub fn share_count(&self) -> u64 {
        self.shares
            .as_ref()
            .map(|s| s.count)
            .or_else(|| self.embedded_insight("shares"))
            .unwrap_or(0)
    }

    pub fn like_count(&self) -> u64 {
        self.like_count.unwrap_or(0)
    }

    pub fn saved_count(&self) -> u64 {
        self.embedded_insight("saved").unwrap_or(0)
    }

    fn embedded_insight(&self, name: &str) -> Option<u64> {
        self.insights
            .as_ref()?
            .data
            .iter()
            .find(|record| record.name == name)?
            .first_value()?
            .as_scalar()
            .map(|value| value.max(0.0) as u64)
    }
}

/// Instagram demographic breakdown payload:
/// `data.data[0].total_value.breakdowns[0].results[]`.
#[derive(Debug, Clone, Deserialize)]
pub struct TotalValueMetric {
    #[serde(default)]
    pub name: String,
    pub total_value: TotalValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TotalValue {
    #[serde(default)]
    pub breakdowns: Vec<BreakdownGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BreakdownGroup {
    #[serde(default)]
    pub dimension_keys: Vec<String>,
    #[serde(default)]
    pub results: Vec<BreakdownResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownResult {
    pub dimension_values: Vec<String>,
    pub value: f64,
}

impl BreakdownResult {
    pub fn dimension(&self) -> Option<&str> {
        self.dimension_values.first().map(String::as_str)
    }
}

/// Parse the timestamp formats the Graph API emits.
///
/// Facebook writes offsets without a colon (`2024-01-15T10:00:00+0000`);
/// RFC 3339 and bare dates are accepted as well.
pub fn parse_graph_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metric_value_accepts_numbers_and_maps() {
        let record: MetricRecord = serde_json::from_value(json!({
            "name": "post_reactions_by_type_total",
            "title": "Lifetime Total post Reactions by Type.",
            "values": [{"value": {"like": 12, "love": 3}}]
        }))
        .unwrap();

        let breakdown = record.first_value().and_then(MetricValue::as_breakdown).unwrap();
        assert_eq!(breakdown.get("like"), Some(12.0));
        assert_eq!(breakdown.entries()[1].0, "love");

        let scalar: MetricRecord =
            serde_json::from_value(json!({"name": "post_clicks", "values": [{"value": 5}]})).unwrap();
        assert_eq!(scalar.first_value().and_then(MetricValue::as_scalar), Some(5.0));
    }

    #[test]
    fn breakdown_keeps_wire_order() {
        let value: MetricValue =
            serde_json::from_str(r#"{"Rabat, Morocco": 4, "Agadir, Morocco": 9, "Fes, Morocco": 1}"#).unwrap();
        let keys: Vec<_> = value
            .as_breakdown()
            .unwrap()
            .entries()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, vec!["Rabat, Morocco", "Agadir, Morocco", "Fes, Morocco"]);
    }

    #[test]
    fn null_value_is_tolerated() {
        let point: MetricPoint = serde_json::from_value(json!({"value": null})).unwrap();
        assert!(point.value.is_none());
    }

    #[test]
    fn graph_timestamps_parse() {
        let fb = parse_graph_timestamp("2024-01-15T10:00:00+0000").unwrap();
        let ig = parse_graph_timestamp("2024-01-15T10:00:00Z").unwrap();
        assert_eq!(fb, ig);
        assert!(parse_graph_timestamp("2024-01-15").is_some());
        assert!(parse_graph_timestamp("yesterday").is_none());
    }

    #[test]
    fn feed_item_counters() {
        let item: FeedItem = serde_json::from_value(json!({
            "id": "1_2",
            "message": "Hello #world",
            "created_time": "2024-01-15T10:00:00+0000",
            "reactions": {"summary": {"total_count": 7}},
            "comments": {"data": [], "summary": {"total_count": 2}},
            "shares": {"count": 3},
            "attachments": {"data": [{"type": "video_inline"}]}
        }))
        .unwrap();

        assert_eq!(item.reaction_count(), 7);
        assert_eq!(item.comment_count(), 2);
        assert_eq!(item.share_count(), 3);
        assert!(item.is_video());
        assert_eq!(item.text_or("No caption available"), "Hello #world");
    }

    #[test]
    fn instagram_item_reads_embedded_insights() {
        let item: FeedItem = serde_json::from_value(json!({
            "id": "1789",
            "caption": "Reel",
            "timestamp": "2024-01-31T23:59:59+0000",
            "media_type": "VIDEO",
            "like_count": 40,
            "comments_count": 4,
            "insights": {"data": [
                {"name": "shares", "values": [{"value": 6}]},
                {"name": "saved", "values": [{"value": 2}]}
            ]}
        }))
        .unwrap();

        assert!(item.is_video());
        assert_eq!(item.like_count(), 40);
        assert_eq!(item.comment_count(), 4);
        assert_eq!(item.share_count(), 6);
        assert_eq!(item.saved_count(), 2);
        assert_eq!(item.text_or("No caption available"), "Reel");
    }

    #[test]
    fn blank_message_falls_through_to_caption() {
        let mut item = FeedItem::new("1");
        item.message = Some(String::new());
        item.caption = Some("Behind the counter".into());
        assert_eq!(item.text_or("No caption available"), "Behind the counter");

        item.caption = Some("  ".into());
        assert_eq!(item.text_or("No caption available"), "No caption available");
    }
}
