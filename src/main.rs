use anyhow::Result;
use clap::Parser;
use pagepulse::config::PagePulseConfig;
use pagepulse::observability::{api_metrics, report_metrics};
use pagepulse::telemetry::init_telemetry;

mod cli;

use cli::commands::accounts::AccountsCommand;
use cli::commands::comments::CommentsCommand;
use cli::commands::feed::{FeedCommand, InsightsCommand};
use cli::commands::init::InitCommand;
use cli::commands::page::PageCommand;
use cli::commands::report::ReportCommand;
use cli::commands::connect;
use cli::{Cli, Commands};

fn show_how_to_start() {
    println!("📊 PagePulse - Facebook and Instagram analytics");
    println!();
    println!("To get started:");
    println!("  ⚙️  pagepulse init                         # Write pagepulse.toml");
    println!("  📋 pagepulse accounts                     # List pages");
    println!("  📘 pagepulse page --account <id> --since <date> --until <date>");
    println!("  📰 pagepulse feed --account <id> --since <date> --until <date>");
    println!("  📄 pagepulse report --account <id> --since <date> --until <date>");
    println!();
    println!("💡 Add --platform instagram for the linked Instagram account.");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        show_how_to_start();
        return Ok(());
    };

    if let Commands::Init { force, dry_run } = command {
        let init = InitCommand::new(force, dry_run);
        let init = match cli.config {
            Some(path) => init.with_path(path),
            None => init,
        };
        return init.execute();
    }

    PagePulseConfig::load_env_file()?;
    let config = match &cli.config {
        Some(path) => PagePulseConfig::load_from(path)?,
        None => PagePulseConfig::load()?,
    };
    init_telemetry(&config.observability)?;

    let dashboard = connect(&config)?;
    let result = match command {
        Commands::Init { .. } => Ok(()),
        Commands::Accounts => AccountsCommand.execute(&dashboard).await,
        Commands::Page {
            selection,
            charts_dir,
        } => {
            PageCommand::new(selection, charts_dir, config.demographics.top_cities)
                .execute(&dashboard)
                .await
        }
        Commands::Feed { selection } => FeedCommand::new(selection).execute(&dashboard).await,
        Commands::Insights {
            selection,
            charts_dir,
        } => InsightsCommand::new(selection, charts_dir).execute(&dashboard).await,
        Commands::Comments { post_id } => CommentsCommand::new(post_id).execute(&dashboard).await,
        Commands::Report { selection, output } => {
            ReportCommand::new(selection, output, config.report.clone())
                .execute(&dashboard)
                .await
        }
    };

    api_metrics().log_stats();
    report_metrics().log_stats();
    result
}
