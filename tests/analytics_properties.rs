//! Property-based tests for the insight transforms and report preparation
//!
//! Uses proptest to generate random metric lists, demographic breakdowns and
//! city labels and checks the invariants the views rely on.

use async_trait::async_trait;
use pagepulse::analytics::cities::CityNormalizer;
use pagepulse::analytics::demographics::{decompose, AGE_BUCKETS, GENDER_CODES};
use pagepulse::analytics::series::percentage_change;
use pagepulse::analytics::aggregate;
use pagepulse::api::fetcher::FACEBOOK_POST_METRICS;
use pagepulse::api::types::{Breakdown, FeedItem, MetricRecord};
use pagepulse::charts::{region_id, ChartBoard, ChartRegion};
use pagepulse::report::{AssemblyPhase, ReportAssembler, Snapshot, SnapshotCapturer, SnapshotError};
use pagepulse::selection::{DateRange, Platform, Selection};
use proptest::prelude::*;
use std::collections::HashSet;

fn metric_name() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => proptest::sample::select(FACEBOOK_POST_METRICS).prop_map(str::to_string),
        1 => "[a-z_]{3,20}",
    ]
}

fn records() -> impl Strategy<Value = Vec<MetricRecord>> {
    proptest::collection::vec((metric_name(), 0u32..100_000), 0..30).prop_map(|pairs| {
        // The API returns each metric at most once per post.
        let mut seen = HashSet::new();
        pairs
            .into_iter()
            .filter(|(name, _)| seen.insert(name.clone()))
            .map(|(name, value)| MetricRecord::scalar(&name, f64::from(value)))
            .collect()
    })
}

fn segment_key() -> impl Strategy<Value = String> {
    let gender = prop_oneof![proptest::sample::select(GENDER_CODES.to_vec()).prop_map(str::to_string), "[A-Z]"];
    let age = prop_oneof![proptest::sample::select(AGE_BUCKETS.to_vec()).prop_map(str::to_string), "[0-9]{2}-[0-9]{2}"];
    prop_oneof![
        4 => (gender, age).prop_map(|(g, a)| format!("{g}.{a}")),
        1 => "[A-Za-z.]{0,8}",
    ]
}

fn suffixes() -> CityNormalizer {
    CityNormalizer::new(["Morocco", "Maroc", "المغرب"])
}

proptest! {
    #[test]
    fn video_posts_keep_every_record(records in records()) {
        let grouped = aggregate(&records, Platform::Facebook, true);
        prop_assert_eq!(grouped.record_count(), records.len());
    }

    #[test]
    fn non_video_posts_lose_exactly_the_video_records(records in records()) {
        let grouped = aggregate(&records, Platform::Facebook, false);
        let video = records.iter().filter(|r| r.name.contains("video")).count();
        prop_assert_eq!(grouped.record_count(), records.len() - video);
        for family in &grouped.families {
            prop_assert!(family.names().all(|name| !name.contains("video")));
        }
    }

    #[test]
    fn instagram_video_posts_keep_every_record(records in records()) {
        let grouped = aggregate(&records, Platform::Instagram, true);
        prop_assert_eq!(grouped.record_count(), records.len());
    }

    #[test]
    fn decomposition_totals_match(entries in proptest::collection::vec((segment_key(), 0u32..10_000), 0..40)) {
        let breakdown = Breakdown::new(
            entries.iter().map(|(key, value)| (key.clone(), f64::from(*value))).collect(),
        );
        let (ages, genders) = decompose(&breakdown);

        prop_assert_eq!(ages.buckets().len(), AGE_BUCKETS.len());
        prop_assert_eq!(genders.codes().len(), GENDER_CODES.len());
        prop_assert_eq!(ages.total(), genders.total());

        let valid: f64 = entries
            .iter()
            .filter(|(key, _)| {
                key.split_once('.').is_some_and(|(gender, age)| {
                    GENDER_CODES.contains(&gender) && AGE_BUCKETS.contains(&age)
                })
            })
            .map(|(_, value)| f64::from(*value))
            .sum();
        prop_assert_eq!(ages.total(), valid);
    }

    #[test]
    fn city_normalization_is_idempotent(label in "[A-Za-z ]{0,12}(, )?(Morocco|Maroc|المغرب)?[ ,]{0,3}") {
        let normalizer = suffixes();
        let once = normalizer.normalize(&label);
        prop_assert_eq!(normalizer.normalize(&once), once);
    }

    #[test]
    fn city_distribution_is_sorted_descending(
        pairs in proptest::collection::vec(("[A-Z][a-z]{2,8}(, Morocco)?", 0u32..5_000), 0..25)
    ) {
        let distribution = suffixes().distribution(
            pairs.into_iter().map(|(label, value)| (label, f64::from(value))),
        );
        for window in distribution.entries().windows(2) {
            prop_assert!(window[0].value >= window[1].value);
        }
    }

    #[test]
    fn change_from_zero_is_zero(last in 0.0f64..1e9) {
        prop_assert_eq!(percentage_change(0.0, last), 0.0);
    }
}

/// Capturer that fails for one item id.
struct FlakyCapturer {
    failing: String,
}

#[async_trait]
impl SnapshotCapturer for FlakyCapturer {
    async fn capture(&self, region: &ChartRegion) -> Result<Snapshot, SnapshotError> {
        if region.id == self.failing {
            Err(SnapshotError::Parse("unrenderable".into()))
        } else {
            Ok(Snapshot::from_png(b"png", region.width, region.height))
        }
    }
}

fn key() -> pagepulse::selection::QueryKey {
    let range = DateRange::new(
        chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        chrono::NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
    )
    .unwrap();
    Selection::new(Some("101".into()), Some(range), Platform::Instagram)
        .unwrap()
        .key()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn one_failed_capture_leaves_n_minus_one_snapshots(n in 1usize..12, failing in 0usize..12) {
        let failing = failing % n;
        let items: Vec<FeedItem> = (0..n).map(|i| FeedItem::new(&format!("post_{i}"))).collect();
        let mut board = ChartBoard::new();
        for item in &items {
            board.insert(ChartRegion {
                id: region_id(&item.id),
                title: item.id.clone(),
                svg: String::new(),
                width: 10,
                height: 10,
            });
        }
        let capturer = FlakyCapturer { failing: region_id(&items[failing].id) };

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let mut assembler = ReportAssembler::new();
        let captured = runtime
            .block_on(assembler.prepare(key(), &items, &board, &capturer))
            .unwrap()
            .len();

        prop_assert_eq!(captured, n - 1);
        prop_assert_eq!(assembler.phase(), AssemblyPhase::Ready);
        prop_assert!(!assembler.snapshots().contains_key(&items[failing].id));
    }
}
