//! Age and gender distributions from composite `"<gender>.<age>"` breakdowns.

use crate::api::types::{Breakdown, BreakdownResult};
use serde::Serialize;
use tracing::debug;

pub const AGE_BUCKETS: [&str; 7] = ["13-17", "18-24", "25-34", "35-44", "45-54", "55-64", "65+"];
pub const GENDER_CODES: [&str; 3] = ["M", "F", "U"];

/// Counts per age bucket, always holding all seven buckets in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeDistribution {
    buckets: Vec<(&'static str, f64)>,
}

impl Default for AgeDistribution {
    fn default() -> Self {
        Self {
            buckets: AGE_BUCKETS.iter().map(|bucket| (*bucket, 0.0)).collect(),
        }
    }
}

impl AgeDistribution {
    /// Adds to `bucket`; returns false for labels outside the fixed set.
    pub fn add(&mut self, bucket: &str, count: f64) -> bool {
        match self.buckets.iter_mut().find(|(label, _)| *label == bucket) {
            Some((_, total)) => {
                *total += count;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, bucket: &str) -> Option<f64> {
        self.buckets.iter().find(|(label, _)| *label == bucket).map(|(_, v)| *v)
    }

    pub fn buckets(&self) -> &[(&'static str, f64)] {
        &self.buckets
    }

    pub fn total(&self) -> f64 {
        self.buckets.iter().map(|(_, v)| v).sum()
    }

    pub fn has_data(&self) -> bool {
        self.buckets.iter().any(|(_, v)| *v != 0.0)
    }
}

/// Counts per raw gender code (`M`, `F`, `U`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderDistribution {
    codes: Vec<(&'static str, f64)>,
}

impl Default for GenderDistribution {
    fn default() -> Self {
        Self {
            codes: GENDER_CODES.iter().map(|code| (*code, 0.0)).collect(),
        }
    }
}

impl GenderDistribution {
    pub fn add(&mut self, code: &str, count: f64) -> bool {
        match self.codes.iter_mut().find(|(c, _)| c.eq_ignore_ascii_case(code)) {
            Some((_, total)) => {
                *total += count;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.codes.iter().find(|(c, _)| *c == code).map(|(_, v)| *v)
    }

    pub fn codes(&self) -> &[(&'static str, f64)] {
        &self.codes
    }

    pub fn total(&self) -> f64 {
        self.codes.iter().map(|(_, v)| v).sum()
    }

    pub fn has_data(&self) -> bool {
        self.codes.iter().any(|(_, v)| *v != 0.0)
    }

    /// `(display label, count)` pairs for charts.
    pub fn labelled(&self) -> Vec<(&'static str, f64)> {
        self.codes.iter().map(|(code, v)| (gender_label(code), *v)).collect()
    }
}

pub fn gender_label(code: &str) -> &'static str {
    match code {
        "M" | "male" => "Male",
        "F" | "female" => "Female",
        _ => "Unknown",
    }
}

fn is_gender(code: &str) -> bool {
    GENDER_CODES.iter().any(|known| known.eq_ignore_ascii_case(code))
}

fn is_age_bucket(bucket: &str) -> bool {
    AGE_BUCKETS.contains(&bucket)
}

/// Split a composite gender.age breakdown into two distributions.
///
/// Entries whose gender or age segment is not recognised are skipped for
/// both outputs, so the two totals always agree.
pub fn decompose(breakdown: &Breakdown) -> (AgeDistribution, GenderDistribution) {
    let mut ages = AgeDistribution::default();
    let mut genders = GenderDistribution::default();

    for (key, count) in breakdown.entries() {
        let Some((gender, age)) = key.split_once('.') else {
            debug!(key = %key, "Skipping demographic key without a gender.age shape");
            continue;
        };
        if !is_gender(gender) || !is_age_bucket(age) {
            debug!(key = %key, "Skipping demographic key with an unknown segment");
            continue;
        }
        ages.add(age, *count);
        genders.add(gender, *count);
    }

    (ages, genders)
}

/// Age distribution from an Instagram `age` breakdown.
pub fn ages_from_results(results: &[BreakdownResult]) -> AgeDistribution {
    let mut ages = AgeDistribution::default();
    for result in results {
        if let Some(bucket) = result.dimension() {
            ages.add(bucket, result.value);
        }
    }
    ages
}

/// Gender distribution from an Instagram `gender` breakdown.
pub fn genders_from_results(results: &[BreakdownResult]) -> GenderDistribution {
    let mut genders = GenderDistribution::default();
    for result in results {
        if let Some(code) = result.dimension() {
            genders.add(code, result.value);
        }
    }
    genders
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breakdown(entries: &[(&str, f64)]) -> Breakdown {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn composite_keys_are_summed_both_ways() {
        let (ages, genders) = decompose(&breakdown(&[
            ("M.25-34", 10.0),
            ("F.25-34", 15.0),
            ("F.18-24", 5.0),
            ("U.65+", 1.0),
        ]));

        assert_eq!(ages.get("25-34"), Some(25.0));
        assert_eq!(ages.get("18-24"), Some(5.0));
        assert_eq!(ages.get("65+"), Some(1.0));
        assert_eq!(ages.get("13-17"), Some(0.0));
        assert_eq!(genders.get("F"), Some(20.0));
        assert_eq!(genders.get("M"), Some(10.0));
        assert_eq!(ages.total(), genders.total());
    }

    #[test]
    fn all_seven_buckets_present_for_empty_input() {
        let (ages, genders) = decompose(&Breakdown::default());
        assert_eq!(ages.buckets().len(), 7);
        assert!(!ages.has_data());
        assert!(!genders.has_data());
    }

    #[test]
    fn invalid_segments_skip_the_whole_entry() {
        let (ages, genders) = decompose(&breakdown(&[
            ("M.12-13", 7.0),
            ("X.25-34", 3.0),
            ("nodot", 2.0),
            ("F.35-44", 4.0),
        ]));

        assert_eq!(ages.total(), 4.0);
        assert_eq!(genders.total(), 4.0);
        assert_eq!(genders.get("M"), Some(0.0));
    }

    #[test]
    fn gender_labels_applied_only_for_display() {
        let (_, genders) = decompose(&breakdown(&[("M.18-24", 2.0), ("U.18-24", 1.0)]));
        assert_eq!(genders.codes()[0].0, "M");
        assert_eq!(genders.labelled(), vec![("Male", 2.0), ("Female", 0.0), ("Unknown", 1.0)]);
    }

    #[test]
    fn instagram_results_fill_distributions() {
        let results = vec![
            BreakdownResult {
                dimension_values: vec!["25-34".into()],
                value: 40.0,
            },
            BreakdownResult {
                dimension_values: vec!["18-24".into()],
                value: 12.0,
            },
        ];
        let ages = ages_from_results(&results);
        assert_eq!(ages.get("25-34"), Some(40.0));
        assert_eq!(ages.buckets().len(), 7);

        let genders = genders_from_results(&[BreakdownResult {
            dimension_values: vec!["F".into()],
            value: 9.0,
        }]);
        assert_eq!(genders.get("F"), Some(9.0));
    }
}
