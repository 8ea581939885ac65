//! Page growth series built from daily page metrics.

use super::labels::label_for;
use crate::api::types::{MetricRecord, MetricValue};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthPoint {
    /// `MMM d` label of the period end
    pub label: String,
    pub impressions: f64,
    pub fans: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageGrowth {
    pub points: Vec<GrowthPoint>,
    /// Display name of the second series (`Fans`, `Followers`, `Reach`)
    pub audience_label: String,
}

fn scalar_at(record: Option<&MetricRecord>, index: usize) -> f64 {
    record
        .and_then(|r| r.values.get(index))
        .and_then(|point| point.value.as_ref())
        .and_then(MetricValue::as_scalar)
        .unwrap_or(0.0)
}

impl PageGrowth {
    /// Zip the daily impression and fan series by position.
    ///
    /// Records are looked up by name (`page_impressions`, `page_fans` for
    /// Facebook, `impressions` with `follower_count` or `reach` for
    /// Instagram). Without a named match the first record is impressions and
    /// the next different one is the second series. Missing values count as
    /// zero.
    pub fn from_records(records: &[MetricRecord]) -> Self {
        let by_name = |names: &[&str]| records.iter().find(|r| names.contains(&r.name.as_str()));
        let Some(impressions) = by_name(&["page_impressions", "impressions"]).or_else(|| records.first()) else {
            return Self::default();
        };
        let fans = by_name(&["page_fans", "follower_count", "reach"])
            .or_else(|| records.iter().find(|r| !std::ptr::eq(*r, impressions)));
        let audience_label = fans
            .map(|r| label_for(&r.name, &r.title))
            .unwrap_or_else(|| "Fans".to_string());

        let points = impressions
            .values
            .iter()
            .enumerate()
            .map(|(index, point)| GrowthPoint {
                label: point
                    .end_time()
                    .map(|at| at.format("%b %-d").to_string())
                    .unwrap_or_else(|| format!("#{}", index + 1)),
                impressions: scalar_at(Some(impressions), index),
                fans: scalar_at(fans, index),
            })
            .collect();

        Self { points, audience_label }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Y axis bounds for the fans line, padded slightly around the data.
    pub fn fans_domain(&self) -> Option<(f64, f64)> {
        let min = self.points.iter().map(|p| p.fans).reduce(f64::min)?;
        let max = self.points.iter().map(|p| p.fans).reduce(f64::max)?;
        Some(((min * 0.9999).floor(), (max * 1.0001).ceil()))
    }

    pub fn impressions_change(&self) -> f64 {
        self.change_of(|p| p.impressions)
    }

    pub fn fans_change(&self) -> f64 {
        self.change_of(|p| p.fans)
    }

    fn change_of(&self, value: impl Fn(&GrowthPoint) -> f64) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => percentage_change(value(first), value(last)),
            _ => 0.0,
        }
    }
}

/// Relative change from `initial` to `last` in percent; zero when `initial` is zero.
pub fn percentage_change(initial: f64, last: f64) -> f64 {
    if initial == 0.0 {
        0.0
    } else {
        (last - initial) / initial * 100.0
    }
}
