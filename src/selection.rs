//! Operator selection: which account, which platform, which date range.
//!
//! A `Selection` is the key every fetch is issued under. Views compare the key
//! a response was requested with against the current one and drop anything
//! that no longer matches.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Prompt shown instead of an error when the selection is incomplete.
pub const SELECTION_PROMPT: &str = "Please select an account and date range to view the feed.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no account selected")]
    MissingAccount,
    #[error("no date range selected")]
    MissingDateRange,
    #[error("invalid date range: {since} is after {until}")]
    InvertedRange { since: NaiveDate, until: NaiveDate },
}

impl SelectionError {
    /// Whether the operator simply has not finished choosing yet.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, SelectionError::MissingAccount | SelectionError::MissingDateRange)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Facebook,
    Instagram,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Facebook => write!(f, "facebook"),
            Platform::Instagram => write!(f, "instagram"),
        }
    }
}

/// Inclusive calendar range. Both bounds are whole days in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    since: NaiveDate,
    until: NaiveDate,
}

impl DateRange {
    pub fn new(since: NaiveDate, until: NaiveDate) -> Result<Self, SelectionError> {
        if since > until {
            return Err(SelectionError::InvertedRange { since, until });
        }
        Ok(Self { since, until })
    }

    pub fn since(&self) -> NaiveDate {
        self.since
    }

    pub fn until(&self) -> NaiveDate {
        self.until
    }

    /// `since` as the `YYYY-MM-DD` string the proxy expects.
    pub fn since_param(&self) -> String {
        self.since.format("%Y-%m-%d").to_string()
    }

    pub fn until_param(&self) -> String {
        self.until.format("%Y-%m-%d").to_string()
    }

    /// True when `timestamp` falls anywhere inside the range, both ends inclusive.
    ///
    /// The upper bound covers the whole `until` day, so `2024-01-31T23:59:59Z`
    /// is inside a range ending on `2024-01-31`.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let start = self.since.and_time(NaiveTime::MIN).and_utc();
        let end_exclusive = self
            .until
            .checked_add_days(Days::new(1))
            .map(|day| day.and_time(NaiveTime::MIN).and_utc());

        match end_exclusive {
            Some(end) => timestamp >= start && timestamp < end,
            None => timestamp >= start,
        }
    }

    /// Whether the range ends in the same calendar month as `today`.
    pub fn ends_in_month_of(&self, today: NaiveDate) -> bool {
        self.until.year() == today.year() && self.until.month() == today.month()
    }

    /// Ranges ending in the current month are cut off at today; the proxy has
    /// nothing to report for days that have not happened yet.
    pub fn clamped_to(self, today: NaiveDate) -> Self {
        if self.ends_in_month_of(today) && today >= self.since {
            Self {
                since: self.since,
                until: today,
            }
        } else {
            self
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.since_param(), self.until_param())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub account_id: String,
    pub range: DateRange,
    pub platform: Platform,
}

impl Selection {
    /// Build a selection from possibly-missing operator input.
    pub fn new(
        account_id: Option<String>,
        range: Option<DateRange>,
        platform: Platform,
    ) -> Result<Self, SelectionError> {
        let account_id = account_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(SelectionError::MissingAccount)?;
        let range = range.ok_or(SelectionError::MissingDateRange)?;

        Ok(Self {
            account_id,
            range,
            platform,
        })
    }

    pub fn key(&self) -> QueryKey {
        QueryKey(format!(
            "{}:{}:{}:{}",
            self.platform,
            self.account_id,
            self.range.since_param(),
            self.range.until_param()
        ))
    }
}

/// Identity of a (account, date range, platform) query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issued when a view starts loading; compare it against the tracker when
/// the response lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    key: QueryKey,
}

impl Ticket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

/// Tracks the current selection so late responses for an old one can be dropped.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    next_generation: AtomicU64,
    current: Mutex<Option<Ticket>>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&self) -> MutexGuard<'_, Option<Ticket>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `selection` as current and hand back a ticket for its fetches.
    /// Selecting the same query again reuses the live ticket, so parallel
    /// views for one selection do not invalidate each other.
    pub fn select(&self, selection: &Selection) -> Ticket {
        let key = selection.key();
        let mut current = self.current();
        if let Some(ticket) = current.as_ref().filter(|ticket| ticket.key == key) {
            return ticket.clone();
        }

        let ticket = Ticket {
            generation: self.next_generation.fetch_add(1, Ordering::SeqCst) + 1,
            key,
        };
        *current = Some(ticket.clone());
        ticket
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.current().as_ref() == Some(ticket)
    }

    pub fn current_key(&self) -> Option<QueryKey> {
        self.current().as_ref().map(|ticket| ticket.key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn january_range_bounds_are_inclusive() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();

        assert!(range.contains(ts("2024-01-15T10:00:00Z")));
        assert!(range.contains(ts("2024-01-31T23:59:59Z")));
        assert!(range.contains(ts("2024-01-01T00:00:00Z")));
        assert!(!range.contains(ts("2024-02-01T00:00:00Z")));
        assert!(!range.contains(ts("2023-12-31T23:59:59Z")));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = DateRange::new(date(2024, 2, 1), date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, SelectionError::InvertedRange { .. }));
        assert!(!err.is_incomplete());
    }

    #[test]
    fn current_month_range_is_clamped_to_today() {
        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 31)).unwrap();
        let clamped = range.clamped_to(date(2024, 3, 12));
        assert_eq!(clamped.until(), date(2024, 3, 12));

        let past = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(past.clamped_to(date(2024, 3, 12)), past);
    }

    #[test]
    fn selection_requires_account_and_range() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();

        assert_eq!(
            Selection::new(None, Some(range), Platform::Facebook).unwrap_err(),
            SelectionError::MissingAccount
        );
        assert_eq!(
            Selection::new(Some("  ".into()), Some(range), Platform::Facebook).unwrap_err(),
            SelectionError::MissingAccount
        );
        assert_eq!(
            Selection::new(Some("123".into()), None, Platform::Facebook).unwrap_err(),
            SelectionError::MissingDateRange
        );

        let selection = Selection::new(Some("123".into()), Some(range), Platform::Instagram).unwrap();
        assert_eq!(selection.key().as_str(), "instagram:123:2024-01-01:2024-01-31");
    }

    #[test]
    fn tracker_invalidates_older_tickets() {
        let tracker = SelectionTracker::new();
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let first = Selection::new(Some("1".into()), Some(range), Platform::Facebook).unwrap();
        let second = Selection::new(Some("2".into()), Some(range), Platform::Facebook).unwrap();

        let old = tracker.select(&first);
        assert!(tracker.is_current(&old));

        assert_eq!(tracker.select(&first), old);

        let new = tracker.select(&second);
        assert!(!tracker.is_current(&old));
        assert!(tracker.is_current(&new));
        assert_eq!(new.key(), &second.key());

        let back = tracker.select(&first);
        assert_ne!(back, old);
        assert!(!tracker.is_current(&old));
        assert_eq!(tracker.current_key(), Some(first.key()));
    }
}
