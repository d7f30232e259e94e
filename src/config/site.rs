//! Site configuration (site.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding the public site URL
pub const SITE_URL_ENV: &str = "SITE_URL";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub name: String,
    pub url: String,
    pub description: String,
    pub language: String,

    // Blog
    pub blog_title: String,
    pub blog_description: String,
    pub default_author: String,
    pub feed_author: String,
    pub webmaster: String,
    pub generator: String,
    pub copyright_holder: String,
    pub categories: Vec<String>,
    pub logo: String,

    // Directory
    pub content_dir: String,
    pub cards_dir: String,
    pub public_dir: String,

    // Sitemap
    pub sitemap: Vec<SitemapRoute>,

    // Structured data
    #[serde(default)]
    pub organization: OrganizationConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "816tech".to_string(),
            url: "https://816tech.com".to_string(),
            description: "Enterprise technology integration using open-source solutions"
                .to_string(),
            language: "en-us".to_string(),

            blog_title: "816tech Blog".to_string(),
            blog_description: "Enterprise technology insights, system integration best practices, and open-source solutions".to_string(),
            default_author: "816tech".to_string(),
            feed_author: "816tech Team".to_string(),
            webmaster: "info@816tech.com (816tech Team)".to_string(),
            generator: "sitekit".to_string(),
            copyright_holder: "816tech".to_string(),
            categories: vec![
                "Technology".to_string(),
                "Enterprise Software".to_string(),
                "System Integration".to_string(),
            ],
            logo: "/images/816tech-logo.png".to_string(),

            content_dir: "content/blog".to_string(),
            cards_dir: "data/cards".to_string(),
            public_dir: "public".to_string(),

            sitemap: SitemapRoute::defaults(),

            organization: OrganizationConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment overrides on top of the file values
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(SITE_URL_ENV) {
            if !url.trim().is_empty() {
                tracing::debug!("Site URL overridden from {}: {}", SITE_URL_ENV, url);
                self.url = url;
            }
        }
    }

    /// Site URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Absolute URL for a site path
    pub fn full_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path.trim_start_matches('/'))
    }

    /// Public URL of a blog post
    pub fn post_url(&self, slug: &str) -> String {
        format!("{}/blog/{}", self.base_url(), slug)
    }
}

/// A hand-declared sitemap entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapRoute {
    pub path: String,
    pub changefreq: String,
    pub priority: f64,
}

impl SitemapRoute {
    fn new(path: &str, changefreq: &str, priority: f64) -> Self {
        Self {
            path: path.to_string(),
            changefreq: changefreq.to_string(),
            priority,
        }
    }

    /// Home page plus the landing page sections
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("/", "weekly", 1.0),
            Self::new("/#solutions", "monthly", 0.9),
            Self::new("/#approach", "monthly", 0.8),
            Self::new("/#about", "monthly", 0.7),
            Self::new("/#contact", "monthly", 0.9),
        ]
    }
}

/// Organisation details used for structured data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationConfig {
    pub telephone: String,
    pub email: String,
    pub founding_date: String,
    pub locality: String,
    pub region: String,
    pub country: String,
    pub area_served: Vec<String>,
    pub services: Vec<String>,
    pub same_as: Vec<String>,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            telephone: "+1-816-800-3299".to_string(),
            email: "info@816tech.com".to_string(),
            founding_date: "2020".to_string(),
            locality: "Kansas City".to_string(),
            region: "MO".to_string(),
            country: "US".to_string(),
            area_served: vec![
                "Kansas City".to_string(),
                "Missouri".to_string(),
                "Kansas".to_string(),
            ],
            services: vec![
                "System Integration".to_string(),
                "Custom Software Development".to_string(),
                "Enterprise Technology Consulting".to_string(),
                "Infrastructure Design".to_string(),
            ],
            same_as: vec![
                "https://www.linkedin.com/company/816tech".to_string(),
                "https://twitter.com/816tech".to_string(),
            ],
        }
    }
}
