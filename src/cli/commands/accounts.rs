use super::unwrap_view;
use anyhow::Result;
use pagepulse::dashboard::Dashboard;

pub struct AccountsCommand;

impl AccountsCommand {
    pub async fn execute(&self, dashboard: &Dashboard) -> Result<()> {
        println!("📋 Pages available through the proxy:");
        println!();
        if let Some(accounts) = unwrap_view(dashboard.load_accounts().await) {
            for account in accounts {
                println!("  {:<24} {}", account.id, account.name);
            }
        }
        Ok(())
    }
}
