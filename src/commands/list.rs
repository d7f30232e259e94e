//! List blog posts

use anyhow::Result;
use std::sync::Arc;

use crate::Site;

/// Print every post, newest first
pub async fn run(site: &Site) -> Result<()> {
    let store = site.content_store(Arc::default());
    let posts = store.list_posts().await?;

    println!("Posts ({}):", posts.len());
    for post in posts {
        println!(
            "  {} - {} [{}] ({} min)",
            post.date.format("%Y-%m-%d"),
            post.title,
            post.slug,
            post.reading_time
        );
    }

    Ok(())
}
