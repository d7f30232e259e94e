//! sitekit: content services for a small business website
//!
//! Serves a markdown-backed blog as JSON, RSS and sitemap documents,
//! digital business cards with vCard downloads, and schema.org
//! structured data, all from static configuration and files on disk.

pub mod cards;
pub mod commands;
pub mod config;
pub mod content;
pub mod feed;
pub mod seo;
pub mod server;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the site configuration file in the base directory
pub const CONFIG_FILE: &str = "site.yml";

/// The site: configuration plus the directories it resolves to
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Blog markdown directory
    pub content_dir: PathBuf,
    /// Business card directory
    pub cards_dir: PathBuf,
    /// Static files served as-is
    pub public_dir: PathBuf,
}

impl Site {
    /// Create a site from a directory, reading `site.yml` when present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let config_path = base_dir.join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No {} in {:?}, using defaults", CONFIG_FILE, base_dir);
            config::SiteConfig::default()
        };
        config.apply_env();

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a site from an already loaded configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let content_dir = base_dir.join(&config.content_dir);
        let cards_dir = base_dir.join(&config.cards_dir);
        let public_dir = base_dir.join(&config.public_dir);

        Self {
            config,
            base_dir,
            content_dir,
            cards_dir,
            public_dir,
        }
    }

    /// Blog content store sharing `renderer`
    pub fn content_store(
        &self,
        renderer: Arc<content::MarkdownRenderer>,
    ) -> content::ContentStore {
        content::ContentStore::from_config(&self.base_dir, &self.config, renderer)
    }

    /// Business card store
    pub fn card_store(&self) -> cards::CardStore {
        cards::CardStore::from_config(&self.base_dir, &self.config)
    }
}
