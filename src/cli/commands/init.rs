use anyhow::{bail, Result};
use pagepulse::config::{PagePulseConfig, CONFIG_FILE};
use std::path::PathBuf;

/// Writes the default configuration so it can be edited in place.
pub struct InitCommand {
    pub path: PathBuf,
    pub force: bool,
    pub dry_run: bool,
}

impl InitCommand {
    pub fn new(force: bool, dry_run: bool) -> Self {
        Self {
            path: PathBuf::from(CONFIG_FILE),
            force,
            dry_run,
        }
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    pub fn execute(&self) -> Result<()> {
        let defaults = PagePulseConfig::default();

        if self.dry_run {
            println!("🔍 Would write {}:", self.path.display());
            println!();
            print!("{}", toml::to_string_pretty(&defaults)?);
            return Ok(());
        }

        if self.path.exists() && !self.force {
            bail!(
                "{} already exists. Use --force to overwrite it.",
                self.path.display()
            );
        }

        defaults.save_to_file(&self.path)?;
        println!("✅ Wrote {}", self.path.display());
        println!();
        println!("Next steps:");
        println!("  1. Point api.base_url at your metrics proxy");
        println!("  2. Run 'pagepulse accounts' to find a page id");
        Ok(())
    }
}
