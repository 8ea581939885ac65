use super::{unwrap_view, write_charts, SelectionArgs};
use anyhow::Result;
use pagepulse::analytics::labels::format_count;
use pagepulse::dashboard::{Dashboard, PageOverview, Profile};
use std::path::PathBuf;

/// Profile, growth and audience overview of one account.
pub struct PageCommand {
    pub selection: SelectionArgs,
    pub charts_dir: Option<PathBuf>,
    pub top_cities: usize,
}

impl PageCommand {
    pub fn new(selection: SelectionArgs, charts_dir: Option<PathBuf>, top_cities: usize) -> Self {
        Self {
            selection,
            charts_dir,
            top_cities,
        }
    }

    pub async fn execute(&self, dashboard: &Dashboard) -> Result<()> {
        let selection = self.selection.resolve_today()?;
        let Some(state) = dashboard.load_page(selection.as_ref()).await else {
            return Ok(());
        };
        let Some(overview) = unwrap_view(state) else {
            return Ok(());
        };

        print_profile(&overview);
        print_growth(&overview);
        self.print_audience(&overview);

        if let Some(dir) = &self.charts_dir {
            let written = write_charts(dir, overview.charts.regions())?;
            println!("🖼️  Wrote {written} charts to {}", dir.display());
        }
        Ok(())
    }

    fn print_audience(&self, overview: &PageOverview) {
        println!("👥 Audience");
        let Some(audience) = unwrap_view(overview.audience.clone()) else {
            println!();
            return;
        };

        if audience.ages.has_data() {
            for (bucket, count) in audience.ages.buckets() {
                println!("   {bucket:<8} {:>10}", format_count(*count));
            }
        }
        if audience.genders.has_data() {
            for (label, count) in audience.genders.labelled() {
                println!("   {label:<8} {:>10}", format_count(count));
            }
        }
        for city in audience.cities.top(self.top_cities) {
            println!("   {:<24} {:>10}", city.city, format_count(city.value));
        }
        println!();
    }
}

fn print_profile(overview: &PageOverview) {
    match &overview.profile {
        Profile::Facebook(info) => {
            println!("📘 {}", info.name);
            if let Some(about) = &info.about {
                println!("   {about}");
            }
            if let Some(fans) = info.fan_count {
                println!("   Fans: {}", format_count(fans as f64));
            }
            if let Some(followers) = info.followers_count {
                println!("   Followers: {}", format_count(followers as f64));
            }
        }
        Profile::Instagram(profile) => {
            println!("📸 @{}", profile.username);
            if let Some(bio) = &profile.biography {
                println!("   {bio}");
            }
            if let Some(followers) = profile.followers_count {
                println!("   Followers: {}", format_count(followers as f64));
            }
        }
    }
    println!();
}

fn print_growth(overview: &PageOverview) {
    println!("📈 Growth");
    if let Some(growth) = unwrap_view(overview.growth.clone()) {
        for point in &growth.points {
            println!(
                "   {:<8} impressions {:>10}  {} {:>10}",
                point.label,
                format_count(point.impressions),
                growth.audience_label.to_lowercase(),
                format_count(point.fans)
            );
        }
        println!(
            "   Impressions {:+.2}%  {} {:+.2}%",
            growth.impressions_change(),
            growth.audience_label,
            growth.fans_change()
        );
    }
    println!();
}
