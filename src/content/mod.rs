//! Content module - blog posts parsed from markdown files

mod frontmatter;
mod markdown;
mod post;
mod store;

pub use frontmatter::{parse_date_string, FrontMatter, FrontMatterError};
pub use markdown::{heading_id, html_escape, MarkdownRenderer};
pub use post::{reading_time, Post, PostListing, UNTITLED, WORDS_PER_MINUTE};
pub use store::{ContentError, ContentStore};
