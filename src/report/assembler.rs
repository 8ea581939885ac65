//! Report preparation: capture one snapshot per feed item, then hand the
//! complete map to the document builder.
//!
//! ```text
//! Idle --Prepare--> Preparing --Finish--> Ready
//!  ^                   |                    |
//!  +--SelectionChanged-+--------------------+
//! ```

use super::document::{DocumentBuilder, DocumentError, ReportDocument, ReportInput};
use super::snapshot::{Snapshot, SnapshotCapturer};
use crate::api::types::FeedItem;
use crate::charts::ChartBoard;
use crate::observability::report_metrics;
use crate::selection::QueryKey;
use statig::prelude::*;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Feed item id → chart snapshot.
pub type SnapshotMap = HashMap<String, Snapshot>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no feed items loaded")]
    NothingToPrepare,
    #[error("report is not ready; prepare it first")]
    NotReady,
    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyEvent {
    Prepare { key: QueryKey, item_count: usize },
    Captured { item_id: String, snapshot: Snapshot },
    Skipped { item_id: String, reason: String },
    Finish,
    SelectionChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyPhase {
    Idle,
    Preparing,
    Ready,
}

/// Data owned by the preparation state machine.
#[derive(Debug, Default)]
pub struct Assembly {
    key: Option<QueryKey>,
    expected: usize,
    snapshots: SnapshotMap,
    skipped: Vec<String>,
}

impl Assembly {
    fn begin(&mut self, key: &QueryKey, item_count: usize) {
        self.key = Some(key.clone());
        self.expected = item_count;
        self.snapshots.clear();
        self.skipped.clear();
    }

    fn reset(&mut self) {
        self.key = None;
        self.expected = 0;
        self.snapshots.clear();
        self.skipped.clear();
    }

    pub fn snapshots(&self) -> &SnapshotMap {
        &self.snapshots
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn key(&self) -> Option<&QueryKey> {
        self.key.as_ref()
    }
}

#[state_machine(initial = "State::idle()", state(derive(Debug, Clone, PartialEq, Eq)))]
impl Assembly {
    #[state]
    fn idle(&mut self, event: &AssemblyEvent) -> Outcome<State> {
        match event {
            AssemblyEvent::Prepare { key, item_count } if *item_count > 0 => {
                self.begin(key, *item_count);
                Transition(State::preparing())
            }
            _ => Handled,
        }
    }

    #[state]
    fn preparing(&mut self, event: &AssemblyEvent) -> Outcome<State> {
        match event {
            AssemblyEvent::Captured { item_id, snapshot } => {
                self.snapshots.insert(item_id.clone(), snapshot.clone());
                Handled
            }
            AssemblyEvent::Skipped { item_id, .. } => {
                self.skipped.push(item_id.clone());
                Handled
            }
            AssemblyEvent::Finish => Transition(State::ready()),
            AssemblyEvent::SelectionChanged => {
                self.reset();
                Transition(State::idle())
            }
            AssemblyEvent::Prepare { .. } => Handled,
        }
    }

    #[state]
    fn ready(&mut self, event: &AssemblyEvent) -> Outcome<State> {
        match event {
            AssemblyEvent::SelectionChanged => {
                self.reset();
                Transition(State::idle())
            }
            AssemblyEvent::Prepare { key, item_count } if *item_count > 0 => {
                self.begin(key, *item_count);
                Transition(State::preparing())
            }
            _ => Handled,
        }
    }
}

/// Drives snapshot capture for the visible feed and gates document creation.
pub struct ReportAssembler {
    machine: StateMachine<Assembly>,
}

impl Default for ReportAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportAssembler {
    pub fn new() -> Self {
        Self {
            machine: Assembly::default().state_machine(),
        }
    }

    pub fn phase(&self) -> AssemblyPhase {
        match self.machine.state() {
            State::Idle {} => AssemblyPhase::Idle,
            State::Preparing {} => AssemblyPhase::Preparing,
            State::Ready {} => AssemblyPhase::Ready,
        }
    }

    pub fn snapshots(&self) -> &SnapshotMap {
        self.machine.inner().snapshots()
    }

    /// Items that ended up without a snapshot in the last run.
    pub fn skipped(&self) -> &[String] {
        self.machine.inner().skipped()
    }

    pub fn handle(&mut self, event: &AssemblyEvent) {
        self.machine.handle(event);
    }

    /// Capture every item's chart in display order, one at a time.
    ///
    /// Items without a rendered chart and items whose capture fails are
    /// skipped; the run still completes and the assembler ends up `Ready`.
    pub async fn prepare(
        &mut self,
        key: QueryKey,
        items: &[FeedItem],
        board: &ChartBoard,
        capturer: &dyn SnapshotCapturer,
    ) -> Result<&SnapshotMap, ReportError> {
        // `&mut self` rules out a concurrent run, so a run still marked as
        // preparing was dropped before it finished.
        if self.phase() == AssemblyPhase::Preparing {
            warn!("Previous report preparation was abandoned, starting over");
            self.handle(&AssemblyEvent::SelectionChanged);
        }
        if items.is_empty() {
            return Err(ReportError::NothingToPrepare);
        }

        self.handle(&AssemblyEvent::Prepare {
            key,
            item_count: items.len(),
        });

        for item in items {
            let Some(region) = board.region_for_item(&item.id) else {
                debug!(item_id = %item.id, "No chart region rendered, skipping");
                self.handle(&AssemblyEvent::Skipped {
                    item_id: item.id.clone(),
                    reason: "no chart region".to_string(),
                });
                continue;
            };

            match capturer.capture(region).await {
                Ok(snapshot) => self.handle(&AssemblyEvent::Captured {
                    item_id: item.id.clone(),
                    snapshot,
                }),
                Err(e) => {
                    report_metrics().record_capture_failure();
                    warn!(item_id = %item.id, error = %e, "Snapshot capture failed, leaving item out");
                    self.handle(&AssemblyEvent::Skipped {
                        item_id: item.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.handle(&AssemblyEvent::Finish);
        report_metrics().record_captures(self.snapshots().len() as u64);
        info!(
            captured = self.snapshots().len(),
            skipped = self.skipped().len(),
            "Report snapshots prepared"
        );
        Ok(self.snapshots())
    }

    /// Account or date range changed: the captured charts are stale.
    pub fn selection_changed(&mut self) {
        self.handle(&AssemblyEvent::SelectionChanged);
    }

    /// Build the document from the prepared snapshots.
    pub fn build_document(
        &self,
        input: &ReportInput<'_>,
        builder: &dyn DocumentBuilder,
    ) -> Result<ReportDocument, ReportError> {
        if self.phase() != AssemblyPhase::Ready {
            return Err(ReportError::NotReady);
        }
        Ok(builder.build(input, self.snapshots())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::snapshot::{MockSnapshotCapturer, SnapshotError};
    use crate::selection::{DateRange, Platform, Selection};
    use chrono::NaiveDate;

    fn key() -> QueryKey {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();
        Selection::new(Some("42".into()), Some(range), Platform::Facebook)
            .unwrap()
            .key()
    }

    fn snapshot() -> Snapshot {
        Snapshot::from_png(b"png", 1, 1)
    }

    #[test]
    fn transitions_follow_the_lifecycle() {
        let mut assembler = ReportAssembler::new();
        assert_eq!(assembler.phase(), AssemblyPhase::Idle);

        assembler.handle(&AssemblyEvent::Prepare {
            key: key(),
            item_count: 0,
        });
        assert_eq!(assembler.phase(), AssemblyPhase::Idle);

        assembler.handle(&AssemblyEvent::Prepare {
            key: key(),
            item_count: 2,
        });
        assert_eq!(assembler.phase(), AssemblyPhase::Preparing);

        assembler.handle(&AssemblyEvent::Captured {
            item_id: "a".into(),
            snapshot: snapshot(),
        });
        assembler.handle(&AssemblyEvent::Finish);
        assert_eq!(assembler.phase(), AssemblyPhase::Ready);
        assert_eq!(assembler.snapshots().len(), 1);

        assembler.selection_changed();
        assert_eq!(assembler.phase(), AssemblyPhase::Idle);
        assert!(assembler.snapshots().is_empty());
    }

    #[test]
    fn prepare_is_ignored_while_preparing() {
        let mut assembler = ReportAssembler::new();
        assembler.handle(&AssemblyEvent::Prepare {
            key: key(),
            item_count: 1,
        });
        assembler.handle(&AssemblyEvent::Captured {
            item_id: "a".into(),
            snapshot: snapshot(),
        });
        assembler.handle(&AssemblyEvent::Prepare {
            key: key(),
            item_count: 5,
        });

        assert_eq!(assembler.phase(), AssemblyPhase::Preparing);
        assert_eq!(assembler.snapshots().len(), 1);
    }

    #[tokio::test]
    async fn empty_feed_cannot_be_prepared() {
        let mut assembler = ReportAssembler::new();
        let capturer = MockSnapshotCapturer::new();
        let err = assembler
            .prepare(key(), &[], &ChartBoard::new(), &capturer)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::NothingToPrepare));
        assert_eq!(assembler.phase(), AssemblyPhase::Idle);
    }

    /// Never finishes a capture.
    struct StalledCapturer;

    #[async_trait::async_trait]
    impl SnapshotCapturer for StalledCapturer {
        async fn capture(&self, _region: &crate::charts::ChartRegion) -> Result<Snapshot, SnapshotError> {
            futures::future::pending().await
        }
    }

    fn board_for(items: &[FeedItem]) -> ChartBoard {
        use crate::charts::{region_id, ChartRegion};

        let mut board = ChartBoard::new();
        for item in items {
            board.insert(ChartRegion {
                id: region_id(&item.id),
                title: String::new(),
                svg: String::new(),
                width: 1,
                height: 1,
            });
        }
        board
    }

    #[tokio::test]
    async fn abandoned_run_does_not_block_the_next_one() {
        let items = vec![FeedItem::new("a"), FeedItem::new("b")];
        let board = board_for(&items);
        let mut assembler = ReportAssembler::new();

        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            assembler.prepare(key(), &items, &board, &StalledCapturer),
        )
        .await;
        assert!(cancelled.is_err());
        assert_eq!(assembler.phase(), AssemblyPhase::Preparing);

        let mut capturer = MockSnapshotCapturer::new();
        capturer
            .expect_capture()
            .times(2)
            .returning(|_| Ok(Snapshot::from_png(b"png", 1, 1)));
        let map = assembler.prepare(key(), &items, &board, &capturer).await.unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(assembler.phase(), AssemblyPhase::Ready);
    }

    #[tokio::test]
    async fn failed_capture_is_left_out() {
        let items: Vec<FeedItem> = ["a", "b", "c"].iter().map(|id| FeedItem::new(id)).collect();
        let board = board_for(&items);

        let mut capturer = MockSnapshotCapturer::new();
        capturer.expect_capture().times(3).returning(|region| {
            if region.id == "chart-b" {
                Err(SnapshotError::Parse("broken".into()))
            } else {
                Ok(Snapshot::from_png(b"png", 1, 1))
            }
        });

        let mut assembler = ReportAssembler::new();
        let map = assembler.prepare(key(), &items, &board, &capturer).await.unwrap();
        assert_eq!(map.len(), 2);
        assert!(!map.contains_key("b"));
        assert_eq!(assembler.phase(), AssemblyPhase::Ready);
        assert_eq!(assembler.skipped().to_vec(), vec!["b".to_string()]);
    }
}
