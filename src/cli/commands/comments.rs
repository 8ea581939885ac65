use super::unwrap_view;
use anyhow::Result;
use pagepulse::dashboard::Dashboard;

pub struct CommentsCommand {
    pub post_id: String,
}

impl CommentsCommand {
    pub fn new(post_id: String) -> Self {
        Self { post_id }
    }

    pub async fn execute(&self, dashboard: &Dashboard) -> Result<()> {
        println!("💬 Comments on {}", self.post_id);
        println!();
        if let Some(comments) = unwrap_view(dashboard.load_comments(&self.post_id).await) {
            for comment in comments {
                let when = comment.timestamp.as_deref().unwrap_or("");
                println!("  [{when}] {}", comment.text);
            }
        }
        Ok(())
    }
}
