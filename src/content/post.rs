//! Post models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FrontMatter;

/// Reading speed used for the reading time estimate
pub const WORDS_PER_MINUTE: usize = 200;

/// Title used when the front-matter has none
pub const UNTITLED: &str = "Untitled";

/// Listing record: post metadata without the rendered body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListing {
    /// Post title
    pub title: String,

    /// Publication date
    pub date: DateTime<Utc>,

    /// Display name of the author
    pub author: String,

    /// URL identifier declared in the front-matter
    pub slug: String,

    /// Short summary
    pub excerpt: String,

    /// Post tags
    pub tags: Vec<String>,

    /// Estimated minutes to read the body
    pub reading_time: usize,
}

impl PostListing {
    /// Build a listing record from parsed front-matter and the markdown body.
    ///
    /// Returns `None` when the front-matter declares no slug.
    pub fn from_front_matter(
        fm: FrontMatter,
        body: &str,
        default_author: &str,
    ) -> Option<Self> {
        let slug = fm.slug()?.to_string();
        let date = fm.parse_date().unwrap_or_else(Utc::now);

        Some(Self {
            title: fm.title.unwrap_or_else(|| UNTITLED.to_string()),
            date,
            author: fm.author.unwrap_or_else(|| default_author.to_string()),
            slug,
            excerpt: fm.excerpt.unwrap_or_default(),
            tags: fm.tags,
            reading_time: reading_time(body),
        })
    }

    /// Whether the post is dated at or before `now`
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.date <= now
    }
}

/// Full record: listing metadata plus the rendered HTML body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(flatten)]
    pub meta: PostListing,

    /// Rendered HTML content
    pub content: String,
}

/// Minutes needed to read `body`, rounded up; an empty body reads in 0 minutes
pub fn reading_time(body: &str) -> usize {
    body.split_whitespace().count().div_ceil(WORDS_PER_MINUTE)
}
