//! HTTP server exposing the blog, feeds, cards and structured data

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cards::{Card, CardStore, SharedCard};
use crate::config::SiteConfig;
use crate::content::{ContentStore, MarkdownRenderer, Post, PostListing};
use crate::{feed, seo, Site};

/// Cache hint for generated XML documents
const XML_CACHE_CONTROL: &str = "public, max-age=3600, s-maxage=3600";

/// Shared, read-only state handed to every handler
pub struct AppState {
    pub config: SiteConfig,
    pub posts: ContentStore,
    pub cards: CardStore,
    pub renderer: Arc<MarkdownRenderer>,
}

impl AppState {
    /// Build the handler state for a site
    pub fn new(site: &Site, renderer: Arc<MarkdownRenderer>) -> Self {
        Self {
            config: site.config.clone(),
            posts: site.content_store(Arc::clone(&renderer)),
            cards: site.card_store(),
            renderer,
        }
    }
}

/// Failure modes surfaced to API clients
#[derive(Debug)]
pub enum ApiError {
    /// The requested resource does not exist
    NotFound(&'static str),
    /// Anything else; details are logged, never returned
    Internal(anyhow::Error),
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        ApiError::Internal(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(err) => {
                tracing::error!("Request failed: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "statusCode": status.as_u16(),
            "message": message,
        }));
        (status, body).into_response()
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/blog", get(list_posts))
        .route("/api/blog/posts", get(list_posts))
        .route("/api/blog/:slug", get(get_post))
        .route("/api/blog/posts/:slug", get(get_post))
        .route("/api/feed.xml", get(rss_feed))
        .route("/api/sitemap.xml", get(sitemap))
        .route("/api/highlight.css", get(highlight_css))
        .route("/api/cards", get(list_cards))
        .route("/api/cards/:slug", get(get_card))
        .route("/api/cards/:slug/vcard", get(card_vcard))
        .route("/api/structured-data", get(site_structured_data))
        .route("/api/structured-data/blog/:slug", get(post_structured_data))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start(site: &Site, ip: &str, port: u16) -> Result<()> {
    let renderer = Arc::new(MarkdownRenderer::new());
    let state = Arc::new(AppState::new(site, renderer));

    let app = router(state)
        .fallback_service(ServeDir::new(&site.public_dir).append_index_html_on_directories(true))
        .layer(TraceLayer::new_for_http());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    tracing::info!("Serving content from {:?}", site.content_dir);
    tracing::info!("Server running at http://{}:{}", ip, port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn list_posts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PostListing>>, ApiError> {
    let posts = state.posts.list_posts().await?;
    Ok(Json(posts))
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Post>, ApiError> {
    match state.posts.get_post(&slug).await? {
        Some(post) => Ok(Json(post)),
        None => Err(ApiError::NotFound("Blog post not found")),
    }
}

/// XML body with the content type and cache hint feeds are served with
fn xml_response(body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/xml; charset=utf-8"),
            (header::CACHE_CONTROL, XML_CACHE_CONTROL),
        ],
        body,
    )
        .into_response()
}

async fn rss_feed(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let posts = state.posts.list_posts().await?;
    let rss = feed::render_rss(&state.config, &posts, Utc::now());
    Ok(xml_response(rss))
}

async fn sitemap(State(state): State<Arc<AppState>>) -> Response {
    xml_response(feed::render_sitemap(&state.config, Utc::now()))
}

async fn highlight_css(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let css = state.renderer.stylesheet()?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/css; charset=utf-8"),
            (header::CACHE_CONTROL, XML_CACHE_CONTROL),
        ],
        css,
    )
        .into_response())
}

async fn list_cards(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SharedCard>>, ApiError> {
    let cards = state.cards.list_cards().await?;
    Ok(Json(
        cards
            .into_iter()
            .map(|card| card.shared(&state.config))
            .collect(),
    ))
}

async fn find_card(state: &AppState, slug: &str) -> Result<Card, ApiError> {
    state
        .cards
        .get_card(slug)
        .await?
        .ok_or(ApiError::NotFound("Card not found"))
}

async fn get_card(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<SharedCard>, ApiError> {
    let card = find_card(&state, &slug).await?;
    Ok(Json(card.shared(&state.config)))
}

async fn card_vcard(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let card = find_card(&state, &slug).await?;
    let disposition = format!("attachment; filename=\"{}.vcf\"", card.slug);
    Ok((
        [
            (header::CONTENT_TYPE, "text/vcard; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        card.vcard(),
    )
        .into_response())
}

async fn site_structured_data(State(state): State<Arc<AppState>>) -> Json<Vec<Value>> {
    let config = &state.config;
    Json(vec![
        seo::organization(config),
        seo::website(config),
        seo::local_business(config),
    ])
}

async fn post_structured_data(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let post = state
        .posts
        .get_post(&slug)
        .await?
        .ok_or(ApiError::NotFound("Blog post not found"))?;

    let config = &state.config;
    Ok(Json(vec![
        seo::blog_posting(config, &post),
        seo::breadcrumbs(&seo::post_trail(config, &post)),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::fs;
    use tempfile::TempDir;

    fn write_post(dir: &std::path::Path, file: &str, slug: &str, date: &str) {
        fs::create_dir_all(dir).unwrap();
        let text = format!(
            "---\ntitle: Post {slug}\ndate: {date}\nslug: {slug}\nexcerpt: Fish & chips\n---\n\n# Heading\n\nBody text.\n"
        );
        fs::write(dir.join(file), text).unwrap();
    }

    fn state(base: &std::path::Path) -> Arc<AppState> {
        let site = Site::with_config(base, SiteConfig::default());
        Arc::new(AppState::new(&site, Arc::new(MarkdownRenderer::new())))
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_list_posts_handler() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("content/blog");
        write_post(&dir, "a.md", "first", "2024-01-01");
        write_post(&dir, "b.md", "second", "2024-02-01");

        let response = list_posts(State(state(tmp.path()))).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        let posts = body.as_array().unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0]["slug"], "second");
        assert!(posts[0].get("content").is_none());
    }

    #[tokio::test]
    async fn test_get_post_handler() {
        let tmp = TempDir::new().unwrap();
        write_post(&tmp.path().join("content/blog"), "a.md", "first", "2024-01-01");
        let state = state(tmp.path());

        let response = get_post(State(state.clone()), Path("first".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert!(body["content"].as_str().unwrap().contains("<h1 id=\"heading\">"));

        let response = get_post(State(state), Path("does-not-exist".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["statusCode"], 404);
    }

    #[tokio::test]
    async fn test_internal_error_is_generic() {
        let tmp = TempDir::new().unwrap();
        // A file where the content directory should be
        fs::create_dir_all(tmp.path().join("content")).unwrap();
        fs::write(tmp.path().join("content/blog"), "not a directory").unwrap();

        let response = list_posts(State(state(tmp.path()))).await.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(response).await;
        assert!(body.contains("Internal server error"));
        assert!(!body.contains("content/blog"));
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_server_error() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("content/blog");
        write_post(&dir, "a.md", "same", "2024-01-01");
        write_post(&dir, "b.md", "same", "2024-02-01");

        let response = rss_feed(State(state(tmp.path()))).await.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_feed_handlers() {
        let tmp = TempDir::new().unwrap();
        write_post(&tmp.path().join("content/blog"), "a.md", "first", "2024-01-01");
        let state = state(tmp.path());

        let response = rss_feed(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/xml; charset=utf-8"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], XML_CACHE_CONTROL);
        let body = body_string(response).await;
        assert_eq!(body.matches("<item>").count(), 1);
        assert!(body.contains("<description>Fish &amp; chips</description>"));

        let response = sitemap(State(state)).await;
        assert_eq!(response.headers()[header::CACHE_CONTROL], XML_CACHE_CONTROL);
        assert!(body_string(response).await.contains("<urlset"));
    }

    #[tokio::test]
    async fn test_empty_feed() {
        let tmp = TempDir::new().unwrap();
        let response = rss_feed(State(state(tmp.path()))).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("<channel>"));
        assert!(!body.contains("<item>"));
    }

    #[tokio::test]
    async fn test_card_handlers() {
        let tmp = TempDir::new().unwrap();
        let cards = tmp.path().join("data/cards");
        fs::create_dir_all(&cards).unwrap();
        fs::write(
            cards.join("jane.json"),
            r#"{"name": "Jane Roe", "company": "Acme", "image": "img/jane.png", "active": true}"#,
        )
        .unwrap();
        let state = state(tmp.path());
        let share_url = format!("{}/cards/jane", state.config.base_url());

        let response = list_cards(State(state.clone())).await.into_response();
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body[0]["slug"], "jane");
        assert_eq!(body[0]["image"], "/img/jane.png");
        assert_eq!(body[0]["shareUrl"], share_url.as_str());

        let response = get_card(State(state.clone()), Path("jane".to_string()))
            .await
            .into_response();
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["shareUrl"], share_url.as_str());

        let response = card_vcard(State(state.clone()), Path("jane".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"jane.vcf\""
        );
        assert!(body_string(response).await.contains("FN:Jane Roe"));

        let response = get_card(State(state), Path("nobody".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_structured_data_handlers() {
        let tmp = TempDir::new().unwrap();
        write_post(&tmp.path().join("content/blog"), "a.md", "first", "2024-01-01");
        let state = state(tmp.path());

        let Json(site) = site_structured_data(State(state.clone())).await;
        assert_eq!(site.len(), 3);

        let response = post_structured_data(State(state.clone()), Path("first".to_string()))
            .await
            .into_response();
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body[0]["@type"], "BlogPosting");
        assert_eq!(body[1]["@type"], "BreadcrumbList");

        let response = post_structured_data(State(state), Path("missing".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
