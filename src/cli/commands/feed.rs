use super::{unwrap_view, write_charts, SelectionArgs};
use anyhow::Result;
use pagepulse::analytics::labels::{family_rows, reaction_counts};
use pagepulse::dashboard::{display_date, Dashboard, FeedView, NO_CAPTION};
use pagepulse::selection::{Platform, Selection};
use std::path::PathBuf;

const CAPTION_PREVIEW: usize = 120;

fn preview(text: &str) -> String {
    if text.chars().count() > CAPTION_PREVIEW {
        let cut: String = text.chars().take(CAPTION_PREVIEW).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

async fn load(dashboard: &Dashboard, selection: Option<&Selection>) -> Option<FeedView> {
    match dashboard.load_feed(selection).await {
        Some(state) => unwrap_view(state),
        // A newer selection took over; nothing to show for this one.
        None => None,
    }
}

/// Lists the posts of the selected range with their headline counts.
pub struct FeedCommand {
    pub selection: SelectionArgs,
}

impl FeedCommand {
    pub fn new(selection: SelectionArgs) -> Self {
        Self { selection }
    }

    pub async fn execute(&self, dashboard: &Dashboard) -> Result<()> {
        let selection = self.selection.resolve_today()?;
        if let Some(selection) = &selection {
            println!("📰 {} feed for {} ({})", selection.platform, selection.account_id, selection.range);
            println!();
        }

        let Some(feed) = load(dashboard, selection.as_ref()).await else {
            return Ok(());
        };
        let platform = self.selection.platform;
        for post in &feed.posts {
            let item = &post.item;
            println!("🗓️  {}", display_date(item, platform).unwrap_or_default());
            println!("   {}", preview(item.text_or(NO_CAPTION)));
            match platform {
                Platform::Facebook => println!(
                    "   👍 {}  💬 {}  🔁 {}",
                    item.reaction_count(),
                    item.comment_count(),
                    item.share_count()
                ),
                Platform::Instagram => println!(
                    "   ❤️ {}  💬 {}  🔖 {}",
                    item.like_count(),
                    item.comment_count(),
                    item.saved_count()
                ),
            }
            if let Some(link) = &item.permalink {
                println!("   🔗 {link}");
            }
            println!("   id: {}", item.id);
            println!();
        }
        println!("{} posts", feed.posts.len());
        Ok(())
    }
}

/// Grouped insight families for every post in the range.
pub struct InsightsCommand {
    pub selection: SelectionArgs,
    pub charts_dir: Option<PathBuf>,
}

impl InsightsCommand {
    pub fn new(selection: SelectionArgs, charts_dir: Option<PathBuf>) -> Self {
        Self { selection, charts_dir }
    }

    pub async fn execute(&self, dashboard: &Dashboard) -> Result<()> {
        let selection = self.selection.resolve_today()?;
        let Some(feed) = load(dashboard, selection.as_ref()).await else {
            return Ok(());
        };

        for post in &feed.posts {
            println!("📊 {}  {}", post.item.id, preview(post.item.text_or(NO_CAPTION)));
            let Some(insights) = unwrap_view(post.insights.clone()) else {
                println!();
                continue;
            };

            for family in insights.visible_families() {
                println!("   {}", family.title);
                for row in family_rows(family) {
                    match row.unique {
                        Some(unique) => println!("     {:<32} {:>12}  unique {:>10}", row.label, row.total, unique),
                        None => println!("     {:<32} {:>12}", row.label, row.total),
                    }
                }
            }
            if let Some(reactions) = &insights.reactions {
                let counts: Vec<String> = reaction_counts(reactions)
                    .into_iter()
                    .map(|(kind, count)| format!("{kind} {count}"))
                    .collect();
                println!("   Reactions: {}", counts.join(", "));
            }
            println!();
        }

        if let Some(dir) = &self.charts_dir {
            let written = write_charts(dir, feed.charts.regions())?;
            println!("🖼️  Wrote {written} charts to {}", dir.display());
        }
        Ok(())
    }
}
