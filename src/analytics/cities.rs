//! City audience normalization.

use crate::api::types::BreakdownResult;
use serde::Serialize;

/// One row of the top-cities chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityCount {
    pub city: String,
    pub value: f64,
}

/// Cities sorted by count, highest first. Equal counts keep input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CityDistribution {
    entries: Vec<CityCount>,
}

impl CityDistribution {
    pub fn entries(&self) -> &[CityCount] {
        &self.entries
    }

    pub fn top(&self, n: usize) -> &[CityCount] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_separator(c: char) -> bool {
    c == ',' || c == '،' || c.is_whitespace()
}

/// Strips trailing country names (in any configured spelling or script) and
/// list punctuation from city labels.
#[derive(Debug, Clone)]
pub struct CityNormalizer {
    suffixes: Vec<String>,
}

impl CityNormalizer {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.trim().is_empty())
                .collect(),
        }
    }

    /// `"Casablanca, Morocco"` → `"Casablanca"`. Applying it twice changes
    /// nothing, and a label is never reduced to nothing.
    pub fn normalize(&self, label: &str) -> String {
        let mut current = label.trim();
        while let Some(shorter) = self.strip_once(current) {
            current = shorter;
        }
        current.to_string()
    }

    fn strip_once<'a>(&self, label: &'a str) -> Option<&'a str> {
        let trimmed = label.trim_end_matches(is_separator);
        if trimmed.len() < label.len() {
            return (!trimmed.is_empty()).then_some(trimmed);
        }

        self.suffixes.iter().find_map(|suffix| {
            let start = label.len().checked_sub(suffix.len())?;
            let tail = label.get(start..)?;
            if !tail.eq_ignore_ascii_case(suffix) {
                return None;
            }
            let rest = label[..start].trim_end_matches(is_separator);
            (!rest.is_empty()).then_some(rest)
        })
    }

    /// Normalize and rank raw `(label, count)` pairs.
    pub fn distribution<I>(&self, raw: I) -> CityDistribution
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut entries: Vec<CityCount> = raw
            .into_iter()
            .map(|(label, value)| CityCount {
                city: self.normalize(&label),
                value,
            })
            .collect();
        // sort_by is stable
        entries.sort_by(|a, b| b.value.total_cmp(&a.value));
        CityDistribution { entries }
    }

    /// Instagram labels carry a region after the first `", "`; only the city
    /// part is kept.
    pub fn distribution_from_results(&self, results: &[BreakdownResult]) -> CityDistribution {
        self.distribution(results.iter().filter_map(|result| {
            let label = result.dimension()?;
            let city = label.split(", ").next().unwrap_or(label);
            Some((city.to_string(), result.value))
        }))
    }
}
