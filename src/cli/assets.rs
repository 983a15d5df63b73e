use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::assets::{AssetCache, AssetSource, DEFAULT_ASSETS};
use crate::config::Config;

/// Manage the offline asset cache
#[derive(Args)]
pub struct AssetsCommand {
    #[command(subcommand)]
    pub action: AssetsAction,
}

#[derive(Subcommand)]
pub enum AssetsAction {
    /// Download assets into the current cache version (all or nothing)
    Install {
        /// Asset paths such as /index.html; defaults to the built-in list
        paths: Vec<String>,
    },

    /// Delete every cache version except the current one
    Activate,

    /// Print an asset, served from the cache when present
    Get {
        path: String,

        /// Write the asset to a file instead of stdout
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}

impl AssetsCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let cache = AssetCache::new(config.asset_options())?;
        debug!("Using asset cache {} in {}", cache.name(), cache.dir().display());

        match &self.action {
            AssetsAction::Install { paths } => {
                let paths: Vec<String> = if paths.is_empty() {
                    DEFAULT_ASSETS.iter().map(|path| path.to_string()).collect()
                } else {
                    paths.clone()
                };
                let installed = cache
                    .install(&paths)
                    .await
                    .with_context(|| format!("Failed to install assets into {}", cache.name()))?;
                for entry in &installed {
                    println!("{}\t{} bytes", entry.path, entry.size);
                }
                info!("Installed {} asset(s) into {}", installed.len(), cache.name());
            }
            AssetsAction::Activate => {
                let removed = cache.activate().await?;
                if removed.is_empty() {
                    println!("{} is the only cache version", cache.name());
                } else {
                    for name in &removed {
                        println!("removed {}", name);
                    }
                }
            }
            AssetsAction::Get { path, output } => {
                let asset = cache.fetch(path).await?;
                let source = match asset.source {
                    AssetSource::Cache => "cache",
                    AssetSource::Network => "network",
                };
                info!("Served {} from {} ({} bytes)", asset.path, source, asset.body.len());

                match output {
                    Some(file) => tokio::fs::write(file, &asset.body)
                        .await
                        .with_context(|| format!("Failed to write {}", file.display()))?,
                    None => {
                        let mut stdout = std::io::stdout().lock();
                        stdout.write_all(&asset.body)?;
                        stdout.flush()?;
                    }
                }
            }
        }

        Ok(())
    }
}
