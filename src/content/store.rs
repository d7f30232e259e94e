//! Content store - answers post queries from a directory of markdown files

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;

use super::frontmatter::FrontMatterError;
use super::{FrontMatter, MarkdownRenderer, Post, PostListing};
use crate::config::SiteConfig;

/// Errors raised by content store queries
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid front-matter in {}: {source}", .path.display())]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },

    #[error(
        "duplicate slug \"{slug}\" in {} (already declared by {})",
        .path.display(),
        .first.display()
    )]
    DuplicateSlug {
        slug: String,
        path: PathBuf,
        first: PathBuf,
    },

    #[error("content task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A markdown file split into front-matter and body
struct SourceFile {
    path: PathBuf,
    front_matter: FrontMatter,
    body: String,
}

/// Read-only view over the blog content directory.
///
/// Nothing is cached: every query reads the directory again.
#[derive(Clone)]
pub struct ContentStore {
    dir: PathBuf,
    renderer: Arc<MarkdownRenderer>,
    default_author: String,
}

impl ContentStore {
    /// Create a store over `dir`
    pub fn new<P: AsRef<Path>>(
        dir: P,
        renderer: Arc<MarkdownRenderer>,
        default_author: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            renderer,
            default_author: default_author.into(),
        }
    }

    /// Create the store described by the site configuration
    pub fn from_config(
        base_dir: &Path,
        config: &SiteConfig,
        renderer: Arc<MarkdownRenderer>,
    ) -> Self {
        Self::new(
            base_dir.join(&config.content_dir),
            renderer,
            config.default_author.clone(),
        )
    }

    /// Content directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All posts as listing records, newest first
    pub async fn list_posts(&self) -> Result<Vec<PostListing>, ContentError> {
        let files = self.load_all().await?;
        ensure_unique_slugs(&files)?;

        let mut posts: Vec<PostListing> = files
            .into_iter()
            .filter_map(|file| {
                PostListing::from_front_matter(file.front_matter, &file.body, &self.default_author)
            })
            .collect();

        // Sort by date descending (newest first)
        posts.sort_by(|a, b| b.date.cmp(&a.date));

        Ok(posts)
    }

    /// Find the post declaring `slug` and render its body.
    ///
    /// Files are visited in name order and the first match wins.
    pub async fn get_post(&self, slug: &str) -> Result<Option<Post>, ContentError> {
        for path in self.markdown_files().await? {
            let text = match read_file(&path).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Skipping content file: {}", e);
                    continue;
                }
            };
            let (front_matter, body) = match FrontMatter::parse(&text) {
                Ok(parsed) => parsed,
                Err(source) => {
                    tracing::warn!("Skipping {:?}: {}", path, source);
                    continue;
                }
            };

            if front_matter.slug() != Some(slug) {
                continue;
            }

            let body = body.to_string();
            let meta = PostListing::from_front_matter(front_matter, &body, &self.default_author);
            let Some(meta) = meta else {
                continue;
            };

            let renderer = Arc::clone(&self.renderer);
            let content = tokio::task::spawn_blocking(move || renderer.render(&body)).await?;

            return Ok(Some(Post { meta, content }));
        }

        tracing::debug!("No post declares slug {:?}", slug);
        Ok(None)
    }

    /// Every declared slug, in file name order.
    ///
    /// Fails when two files declare the same slug.
    pub async fn all_slugs(&self) -> Result<Vec<String>, ContentError> {
        let files = self.load_all().await?;
        ensure_unique_slugs(&files)?;

        Ok(files
            .iter()
            .filter_map(|file| file.front_matter.slug().map(str::to_string))
            .collect())
    }

    /// Markdown files in the content directory, sorted by name
    async fn markdown_files(&self) -> Result<Vec<PathBuf>, ContentError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Content directory {:?} not found", self.dir);
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(ContentError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut files = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|source| ContentError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let Some(entry) = entry else {
                break;
            };

            let path = entry.path();
            let is_file = tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if is_file && is_markdown_file(&path) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    /// Read and split every markdown file concurrently, skipping unreadable ones
    async fn load_all(&self) -> Result<Vec<SourceFile>, ContentError> {
        let mut tasks = JoinSet::new();
        for path in self.markdown_files().await? {
            tasks.spawn(load_source(path));
        }

        let mut files = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined? {
                Ok(file) => files.push(file),
                Err(e) => tracing::warn!("Skipping content file: {}", e),
            }
        }

        // Completion order is arbitrary
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

async fn read_file(path: &Path) -> Result<String, ContentError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })
}

async fn load_source(path: PathBuf) -> Result<SourceFile, ContentError> {
    let text = read_file(&path).await?;
    match FrontMatter::parse(&text) {
        Ok((front_matter, body)) => {
            let body = body.to_string();
            Ok(SourceFile {
                path,
                front_matter,
                body,
            })
        }
        Err(source) => Err(ContentError::FrontMatter { path, source }),
    }
}

/// Reject the set when two files declare the same slug
fn ensure_unique_slugs(files: &[SourceFile]) -> Result<(), ContentError> {
    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for file in files {
        let Some(slug) = file.front_matter.slug() else {
            continue;
        };
        if let Some(first) = seen.insert(slug, &file.path) {
            return Err(ContentError::DuplicateSlug {
                slug: slug.to_string(),
                path: file.path.clone(),
                first: first.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}
