//! Build-time route discovery
//!
//! Lists the pages a static build should prerender: the home page, the
//! blog index and one page per post. Only the CLI calls this; no request
//! handler reaches it.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::Site;

/// Routes to prerender, failing when two posts declare the same slug
pub async fn prerender_routes(site: &Site) -> Result<Vec<String>> {
    let store = site.content_store(Arc::default());
    let slugs = store
        .all_slugs()
        .await
        .with_context(|| format!("route discovery failed in {:?}", store.dir()))?;

    tracing::info!("Found {} blog posts for prerendering", slugs.len());

    let mut routes = vec!["/".to_string(), "/blog".to_string()];
    routes.extend(slugs.into_iter().map(|slug| format!("/blog/{}", slug)));
    Ok(routes)
}

/// Print the prerender routes, one per line
pub async fn run(site: &Site) -> Result<()> {
    for route in prerender_routes(site).await? {
        println!("{}", route);
    }
    Ok(())
}
