//! Page-level charts: growth over the selected range and audience breakdowns.

use super::svg::{horizontal_bar_chart, line_chart, pie_chart, LineSeries, PALETTE};
use super::{ChartError, ChartRegion};
use crate::analytics::cities::CityDistribution;
use crate::analytics::demographics::{AgeDistribution, GenderDistribution};
use crate::analytics::series::PageGrowth;

pub const GROWTH_REGION: &str = "page-growth";
pub const AGE_REGION: &str = "page-age";
pub const GENDER_REGION: &str = "page-gender";
pub const CITIES_REGION: &str = "page-cities";

fn region(id: &str, title: &str, width: u32, height: u32, svg: Result<String, ChartError>) -> Option<ChartRegion> {
    let svg = svg.ok()?;
    Some(ChartRegion {
        id: id.to_string(),
        title: title.to_string(),
        svg,
        width,
        height,
    })
}

/// Impressions on the left axis, the audience series on a padded right axis.
pub fn growth_chart(growth: &PageGrowth, title: &str) -> Option<ChartRegion> {
    let labels: Vec<String> = growth.points.iter().map(|p| p.label.clone()).collect();
    let impressions: Vec<f64> = growth.points.iter().map(|p| p.impressions).collect();
    let fans: Vec<f64> = growth.points.iter().map(|p| p.fans).collect();

    let series = [
        LineSeries {
            name: "Impressions",
            values: &impressions,
            color: PALETTE[0],
            domain: None,
        },
        LineSeries {
            name: &growth.audience_label,
            values: &fans,
            color: PALETTE[1],
            domain: growth.fans_domain(),
        },
    ];
    region(
        GROWTH_REGION,
        title,
        720,
        320,
        line_chart(title, &labels, &series, 720, 320),
    )
}

/// Age pie, only when some bucket is non-zero.
pub fn age_chart(ages: &AgeDistribution) -> Option<ChartRegion> {
    if !ages.has_data() {
        return None;
    }
    let slices: Vec<(String, f64)> = ages.buckets().iter().map(|(b, v)| (b.to_string(), *v)).collect();
    region(AGE_REGION, "Age", 420, 260, pie_chart("Age", &slices, 420, 260))
}

/// Gender pie with display labels, only when some code is non-zero.
pub fn gender_chart(genders: &GenderDistribution) -> Option<ChartRegion> {
    if !genders.has_data() {
        return None;
    }
    let slices: Vec<(String, f64)> = genders.labelled().into_iter().map(|(l, v)| (l.to_string(), v)).collect();
    region(GENDER_REGION, "Gender", 420, 260, pie_chart("Gender", &slices, 420, 260))
}

/// The `top` largest cities.
pub fn cities_chart(cities: &CityDistribution, top: usize) -> Option<ChartRegion> {
    let bars: Vec<(String, f64)> = cities.top(top).iter().map(|c| (c.city.clone(), c.value)).collect();
    let height = 80 + 28 * bars.len() as u32;
    region(
        CITIES_REGION,
        "Top Cities",
        560,
        height,
        horizontal_bar_chart("Top Cities", &bars, 560, height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::cities::CityNormalizer;
    use crate::analytics::demographics::decompose;
    use crate::api::types::Breakdown;

    #[test]
    fn demographic_pies_only_with_data() {
        let (ages, genders) = decompose(&Breakdown::default());
        assert!(age_chart(&ages).is_none());
        assert!(gender_chart(&genders).is_none());

        let (ages, genders) = decompose(&Breakdown::new(vec![("F.25-34".into(), 5.0)]));
        assert_eq!(age_chart(&ages).map(|r| r.id), Some(AGE_REGION.to_string()));
        assert!(gender_chart(&genders).unwrap().svg.contains("Female"));
    }

    #[test]
    fn cities_chart_is_capped() {
        let raw: Vec<(String, f64)> = (0..15).map(|i| (format!("City {i}, Morocco"), i as f64)).collect();
        let cities = CityNormalizer::new(["Morocco"]).distribution(raw);

        let chart = cities_chart(&cities, 10).unwrap();
        assert!(chart.svg.contains("City 14"));
        assert!(!chart.svg.contains("City 4<"));
        assert!(cities_chart(&CityDistribution::default(), 10).is_none());
    }

    #[test]
    fn growth_chart_needs_points() {
        assert!(growth_chart(&PageGrowth::default(), "Facebook Insights").is_none());
    }
}
