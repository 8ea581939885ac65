use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Args;
use pagepulse::api::GraphApiClient;
use pagepulse::charts::ChartRegion;
use pagepulse::config::PagePulseConfig;
use pagepulse::dashboard::{Dashboard, ViewState};
use pagepulse::selection::{DateRange, Platform, Selection, SELECTION_PROMPT};
use std::path::Path;
use std::sync::Arc;

pub mod accounts;
pub mod comments;
pub mod feed;
pub mod init;
pub mod page;
pub mod report;

/// Account, platform and date range shared by the view commands.
#[derive(Debug, Clone, Args)]
pub struct SelectionArgs {
    /// Page id (see 'pagepulse accounts')
    #[arg(long)]
    pub account: Option<String>,
    #[arg(long, value_enum, default_value_t = Platform::Facebook)]
    pub platform: Platform,
    /// First day of the range, YYYY-MM-DD
    #[arg(long)]
    pub since: Option<NaiveDate>,
    /// Last day of the range, YYYY-MM-DD
    #[arg(long)]
    pub until: Option<NaiveDate>,
}

impl SelectionArgs {
    /// `Ok(None)` when the operator left the account or range out.
    pub fn resolve(&self, today: NaiveDate) -> Result<Option<Selection>> {
        let range = match (self.since, self.until) {
            (Some(since), Some(until)) => Some(DateRange::new(since, until)?.clamped_to(today)),
            _ => None,
        };
        match Selection::new(self.account.clone(), range, self.platform) {
            Ok(selection) => Ok(Some(selection)),
            Err(e) if e.is_incomplete() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn resolve_today(&self) -> Result<Option<Selection>> {
        self.resolve(Utc::now().date_naive())
    }
}

pub fn connect(config: &PagePulseConfig) -> Result<Dashboard> {
    let client = GraphApiClient::new(&config.api)
        .with_context(|| format!("Failed to set up the API client for {}", config.api.base_url))?;
    Ok(Dashboard::new(Arc::new(client), &config.demographics))
}

/// Prints the placeholder text for a state without content. Returns the
/// content when there is some.
pub fn unwrap_view<T>(state: ViewState<T>) -> Option<T> {
    match state {
        ViewState::Loaded(value) => Some(value),
        ViewState::Prompt => {
            println!("👉 {SELECTION_PROMPT}");
            None
        }
        ViewState::Empty(message) => {
            println!("📭 {message}");
            None
        }
        ViewState::Failed(message) => {
            println!("❌ {message}");
            None
        }
    }
}

pub fn write_charts<'a>(dir: &Path, regions: impl IntoIterator<Item = &'a ChartRegion>) -> Result<usize> {
    std::fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
    let mut written = 0;
    for region in regions {
        let path = dir.join(format!("{}.svg", region.id));
        std::fs::write(&path, &region.svg).with_context(|| format!("Cannot write {}", path.display()))?;
        written += 1;
    }
    Ok(written)
}
