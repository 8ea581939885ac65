use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

use commands::SelectionArgs;

#[derive(Parser)]
#[command(name = "pagepulse")]
#[command(version)]
#[command(about = "Social media analytics for Facebook pages and Instagram business accounts")]
#[command(long_about = "PagePulse reads page, feed and audience metrics through the metrics proxy, \
                       groups them for display, renders charts and exports a PDF report of the feed. \
                       Get started with 'pagepulse init' and 'pagepulse accounts'.")]
pub struct Cli {
    /// Configuration file to read instead of ./pagepulse.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default pagepulse.toml to the working directory
    Init {
        /// Overwrite an existing configuration file
        #[arg(long, help = "Overwrite an existing pagepulse.toml")]
        force: bool,
        /// Show what would be written without writing it
        #[arg(long, help = "Print the configuration instead of writing it")]
        dry_run: bool,
    },
    /// List the pages the proxy can read
    Accounts,
    /// Profile, growth and audience of the selected account
    Page {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Directory to write the rendered charts to as SVG files
        #[arg(long, help = "Write page charts as SVG files into this directory")]
        charts_dir: Option<PathBuf>,
    },
    /// Posts in the selected range with their headline counts
    Feed {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Grouped insights for every post in the selected range
    Insights {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Directory to write the per-post charts to as SVG files
        #[arg(long, help = "Write post charts as SVG files into this directory")]
        charts_dir: Option<PathBuf>,
    },
    /// Comments on one post
    Comments {
        /// Post id as shown by 'pagepulse feed'
        post_id: String,
    },
    /// Export the feed with per-post charts as a PDF
    Report {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Output file (defaults to report.output_path from the configuration)
        #[arg(long, short = 'o', help = "Where to write the PDF")]
        output: Option<PathBuf>,
    },
}
