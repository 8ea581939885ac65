use super::{unwrap_view, SelectionArgs};
use anyhow::{Context, Result};
use pagepulse::config::ReportConfig;
use pagepulse::dashboard::{Dashboard, ViewState};
use pagepulse::report::{PdfReportBuilder, ReportInput, ResvgCapturer};
use pagepulse::telemetry::{create_report_span, generate_correlation_id};
use std::path::PathBuf;
use tracing::Instrument;

/// Captures every post chart and writes the feed report as a PDF.
pub struct ReportCommand {
    pub selection: SelectionArgs,
    pub output: Option<PathBuf>,
    pub settings: ReportConfig,
}

impl ReportCommand {
    pub fn new(selection: SelectionArgs, output: Option<PathBuf>, settings: ReportConfig) -> Self {
        Self {
            selection,
            output,
            settings,
        }
    }

    pub async fn execute(&self, dashboard: &Dashboard) -> Result<()> {
        let selection = self.selection.resolve_today()?;
        let Some(state) = dashboard.load_feed(selection.as_ref()).await else {
            return Ok(());
        };
        let (Some(selection), Some(feed)) = (selection, unwrap_view(state)) else {
            return Ok(());
        };

        let span = create_report_span(feed.posts.len(), &generate_correlation_id());
        async {
            print!("📸 Capturing {} post charts... ", feed.posts.len());
            std::io::Write::flush(&mut std::io::stdout())?;

            let capturer = ResvgCapturer::new(self.settings.snapshot_scale);
            let mut session = dashboard.report_session();
            let captured = session.prepare(&selection, &feed, &capturer).await?.len();
            println!("✅ {captured}/{}", feed.posts.len());

            let account_name = match dashboard.load_accounts().await {
                ViewState::Loaded(accounts) => accounts
                    .into_iter()
                    .find(|account| account.id == selection.account_id)
                    .map(|account| account.name),
                _ => None,
            }
            .unwrap_or_else(|| selection.account_id.clone());

            let cards = dashboard.report_cards(&feed, selection.platform).await;
            let output = self
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(&self.settings.output_path));
            let file_name = output
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.settings.output_path.clone());

            let input = ReportInput {
                title: &self.settings.title,
                account_name: &account_name,
                platform: selection.platform,
                range: selection.range,
                cards: &cards,
            };
            let document = session.build_document(&input, &PdfReportBuilder::new(&file_name))?;

            std::fs::write(&output, &document.bytes)
                .with_context(|| format!("Cannot write {}", output.display()))?;
            println!("📄 Wrote {} ({} bytes)", output.display(), document.bytes.len());
            Ok::<_, anyhow::Error>(())
        }
        .instrument(span)
        .await
    }
}
