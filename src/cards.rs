//! Digital business cards stored as JSON files

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SiteConfig;

/// Errors raised while loading cards
#[derive(Debug, Error)]
pub enum CardError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid card {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One way of reaching the card holder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// A business card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Card {
    pub slug: String,
    pub name: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub image: String,
    pub active: bool,
    /// Keyed by kind (`email`, `mobile`, `office`, `website`, ...), in file order
    pub contacts: IndexMap<String, Contact>,
}

impl Card {
    /// vCard 3.0 text for the card
    pub fn vcard(&self) -> String {
        let family_first: Vec<String> = self
            .name
            .split_whitespace()
            .rev()
            .map(escape_vcard)
            .collect();

        let mut lines = vec![
            "BEGIN:VCARD".to_string(),
            "VERSION:3.0".to_string(),
            format!("FN:{}", escape_vcard(&self.name)),
            format!("N:{}", family_first.join(";")),
            format!("ORG:{}", escape_vcard(&self.company)),
            format!("TITLE:{}", escape_vcard(&self.title)),
            format!("ADR:;;{}", escape_vcard(&self.location)),
        ];

        if let Some(email) = self.contacts.get("email") {
            lines.push(format!("EMAIL:{}", escape_vcard(&email.value)));
        }
        if let Some(mobile) = self.contacts.get("mobile") {
            lines.push(format!("TEL;TYPE=CELL:{}", escape_vcard(&mobile.value)));
        }
        if let Some(office) = self.contacts.get("office") {
            lines.push(format!("TEL;TYPE=WORK:{}", escape_vcard(&office.value)));
        }
        if let Some(website) = self.contacts.get("website") {
            let url = website.href.as_deref().unwrap_or(&website.value);
            lines.push(format!("URL:{}", escape_vcard(url)));
        }

        lines.push(format!("NOTE:{}", escape_vcard(&self.description)));
        lines.push("END:VCARD".to_string());

        lines.join("\n")
    }

    /// Public URL of the card page
    pub fn share_url(&self, config: &SiteConfig) -> String {
        format!("{}/cards/{}", config.base_url(), self.slug)
    }

    /// Image path anchored at the site root
    pub fn image_path(&self) -> String {
        resolve_image_path(&self.image)
    }

    /// The card as served to clients
    pub fn shared(mut self, config: &SiteConfig) -> SharedCard {
        let share_url = self.share_url(config);
        self.image = self.image_path();
        SharedCard {
            card: self,
            share_url,
        }
    }
}

/// Card response: the image anchored at the site root, plus the card's public URL
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedCard {
    #[serde(flatten)]
    pub card: Card,
    pub share_url: String,
}

/// Make an image path absolute from the site root
pub fn resolve_image_path(path: &str) -> String {
    if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Escape vCard text values
fn escape_vcard(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// Cards read from a directory of `<slug>.json` files
#[derive(Debug, Clone)]
pub struct CardStore {
    dir: PathBuf,
}

impl CardStore {
    /// Create a store over `dir`
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Create the store described by the site configuration
    pub fn from_config(base_dir: &Path, config: &SiteConfig) -> Self {
        Self::new(base_dir.join(&config.cards_dir))
    }

    /// Active cards sorted by name
    pub async fn list_cards(&self) -> Result<Vec<Card>, CardError> {
        let mut cards = Vec::new();
        for path in self.card_files().await? {
            match load_card(&path).await {
                Ok(card) if card.active => cards.push(card),
                Ok(card) => tracing::debug!("Skipping inactive card {}", card.slug),
                Err(e) => tracing::warn!("Skipping card: {}", e),
            }
        }

        cards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cards)
    }

    /// The active card with `slug`
    pub async fn get_card(&self, slug: &str) -> Result<Option<Card>, CardError> {
        let cards = self.list_cards().await?;
        Ok(cards.into_iter().find(|card| card.slug == slug))
    }

    async fn card_files(&self) -> Result<Vec<PathBuf>, CardError> {
        let io_err = |source| CardError::Io {
            path: self.dir.clone(),
            source,
        };

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Cards directory {:?} not found", self.dir);
                return Ok(Vec::new());
            }
            Err(e) => return Err(io_err(e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

async fn load_card(path: &Path) -> Result<Card, CardError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CardError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let mut card: Card = serde_json::from_str(&text).map_err(|source| CardError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if card.slug.is_empty() {
        card.slug = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
    }

    Ok(card)
}
