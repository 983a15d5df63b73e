use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

use super::{assets::AssetsCommand, page::PageCommand};
use crate::config::Config;
use crate::tui;

/// Salona - browse a paginated product catalog from your terminal
#[derive(Parser)]
#[command(
    name = "salona",
    version,
    about = "Browse a paginated product catalog from your terminal",
    long_about = r#"Salona fetches product listings page by page from a REST catalog, caches
them, prefetches the next page and renders them as a grid of cards.

Examples:
  salona                          # Start the interactive browser
  salona --page 3 --limit 20      # Open the browser on page 3, 20 per page
  salona page 2 --json            # Print one page as JSON
  salona assets install           # Pre-cache the static assets"#
)]
pub struct Cli {
    /// Current working directory
    #[arg(short = 'c', long = "cwd", global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    /// Catalog endpoint, overrides the configuration
    #[arg(short = 'b', long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Page to open in the interactive browser
    #[arg(short = 'p', long = "page", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Page size for the interactive browser
    #[arg(short = 'l', long = "limit")]
    pub limit: Option<u32>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print one page of the catalog
    Page(PageCommand),

    /// Manage the offline asset cache
    Assets(AssetsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        // Change working directory if specified
        if let Some(cwd) = &self.cwd {
            std::env::set_current_dir(cwd)
                .map_err(|e| anyhow::anyhow!("Failed to change directory to {}: {}", cwd.display(), e))?;
        }

        let config = self.load_config().await?;

        // The interactive browser owns the terminal, so it logs to a file
        let log_file = self.command.is_none().then(|| config.log_file());
        crate::init_logging(self.debug, log_file.as_deref())?;
        debug!("Configuration initialized: {:?}", config);

        match &self.command {
            Some(Commands::Page(page_cmd)) => page_cmd.execute(&config).await,
            Some(Commands::Assets(assets_cmd)) => assets_cmd.execute(&config).await,
            None => self.start_interactive_mode(&config).await,
        }
    }

    async fn load_config(&self) -> Result<Config> {
        let mut config = Config::init().await?;
        if let Some(base_url) = &self.base_url {
            config.api_base = base_url.clone();
        }
        config.validate()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    async fn start_interactive_mode(&self, config: &Config) -> Result<()> {
        info!("Starting interactive mode");

        let mut pagination = config.pagination()?;
        if let Some(limit) = self.limit {
            pagination.set_limit(limit)?;
        }
        pagination.start_at(self.page);

        tui::run(config, pagination).await?;

        info!("Application finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_page_command() {
        let cli = Cli::try_parse_from(["salona", "--debug", "page", "3", "--limit", "20", "--json"]).unwrap();
        assert!(cli.debug);
        match cli.command {
            Some(Commands::Page(page)) => {
                assert_eq!(page.page, 3);
                assert_eq!(page.limit, Some(20));
                assert!(page.json);
            }
            _ => panic!("expected page command"),
        }
    }

    #[test]
    fn test_page_zero_is_rejected() {
        assert!(Cli::try_parse_from(["salona", "page", "0"]).is_err());
        assert!(Cli::try_parse_from(["salona", "--page", "0"]).is_err());
    }

    #[test]
    fn test_interactive_defaults() {
        let cli = Cli::try_parse_from(["salona"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.page, 1);
        assert_eq!(cli.limit, None);
    }
}
