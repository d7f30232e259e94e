//! schema.org structured data (JSON-LD)

use serde_json::{json, Value};

use crate::config::SiteConfig;
use crate::content::Post;

const SCHEMA_CONTEXT: &str = "https://schema.org";

/// One entry of a breadcrumb trail
#[derive(Debug, Clone, PartialEq)]
pub struct Breadcrumb {
    pub name: String,
    pub url: String,
}

impl Breadcrumb {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

fn postal_address(config: &SiteConfig) -> Value {
    let org = &config.organization;
    json!({
        "@type": "PostalAddress",
        "addressLocality": org.locality,
        "addressRegion": org.region,
        "addressCountry": org.country,
    })
}

fn organization_id(config: &SiteConfig) -> String {
    format!("{}/#organization", config.base_url())
}

/// Organization node describing the company
pub fn organization(config: &SiteConfig) -> Value {
    let org = &config.organization;
    json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "Organization",
        "@id": organization_id(config),
        "name": config.name,
        "url": config.base_url(),
        "logo": {
            "@type": "ImageObject",
            "url": config.full_url(&config.logo),
        },
        "description": config.description,
        "foundingDate": org.founding_date,
        "address": postal_address(config),
        "contactPoint": {
            "@type": "ContactPoint",
            "telephone": org.telephone,
            "contactType": "customer service",
            "availableLanguage": "English",
        },
        "sameAs": org.same_as,
    })
}

/// WebSite node with a site search action
pub fn website(config: &SiteConfig) -> Value {
    json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "WebSite",
        "@id": format!("{}/#website", config.base_url()),
        "url": config.base_url(),
        "name": config.name,
        "description": config.description,
        "publisher": { "@id": organization_id(config) },
        "potentialAction": {
            "@type": "SearchAction",
            "target": {
                "@type": "EntryPoint",
                "urlTemplate": format!("{}/search?q={{search_term_string}}", config.base_url()),
            },
            "query-input": "required name=search_term_string",
        },
    })
}

/// LocalBusiness node for local search results
pub fn local_business(config: &SiteConfig) -> Value {
    let org = &config.organization;
    let area_served: Vec<Value> = org
        .area_served
        .iter()
        .map(|name| json!({ "@type": "Place", "name": name }))
        .collect();

    json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "LocalBusiness",
        "@id": config.base_url(),
        "name": config.name,
        "description": config.description,
        "url": config.base_url(),
        "telephone": org.telephone,
        "email": org.email,
        "foundingDate": org.founding_date,
        "address": postal_address(config),
        "areaServed": area_served,
        "serviceType": org.services,
        "sameAs": org.same_as,
    })
}

/// BreadcrumbList with 1-based positions
pub fn breadcrumbs(trail: &[Breadcrumb]) -> Value {
    let items: Vec<Value> = trail
        .iter()
        .enumerate()
        .map(|(index, crumb)| {
            json!({
                "@type": "ListItem",
                "position": index + 1,
                "name": crumb.name,
                "item": crumb.url,
            })
        })
        .collect();

    json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "BreadcrumbList",
        "itemListElement": items,
    })
}

/// Home, blog index, then the post itself
pub fn post_trail(config: &SiteConfig, post: &Post) -> Vec<Breadcrumb> {
    vec![
        Breadcrumb::new("Home", config.full_url("/")),
        Breadcrumb::new("Blog", config.full_url("/blog")),
        Breadcrumb::new(post.meta.title.clone(), config.post_url(&post.meta.slug)),
    ]
}

/// BlogPosting node for a full post record
pub fn blog_posting(config: &SiteConfig, post: &Post) -> Value {
    let url = config.post_url(&post.meta.slug);
    json!({
        "@context": SCHEMA_CONTEXT,
        "@type": "BlogPosting",
        "@id": url,
        "mainEntityOfPage": url,
        "headline": post.meta.title,
        "description": post.meta.excerpt,
        "datePublished": post.meta.date.to_rfc3339(),
        "author": { "@type": "Person", "name": post.meta.author },
        "publisher": { "@id": organization_id(config) },
        "keywords": post.meta.tags.join(", "),
        "timeRequired": format!("PT{}M", post.meta.reading_time),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PostListing;
    use chrono::{TimeZone, Utc};

    fn post() -> Post {
        Post {
            meta: PostListing {
                title: "Hello".to_string(),
                date: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
                author: "Jane".to_string(),
                slug: "hello".to_string(),
                excerpt: "Intro".to_string(),
                tags: vec!["rust".to_string(), "web".to_string()],
                reading_time: 3,
            },
            content: "<p>Hi</p>".to_string(),
        }
    }

    #[test]
    fn test_organization() {
        let config = SiteConfig::default();
        let org = organization(&config);
        assert_eq!(org["@type"], "Organization");
        assert_eq!(org["@id"], "https://816tech.com/#organization");
        assert_eq!(org["address"]["addressLocality"], "Kansas City");
    }

    #[test]
    fn test_website_links_publisher() {
        let config = SiteConfig::default();
        let site = website(&config);
        assert_eq!(site["publisher"]["@id"], organization(&config)["@id"]);
        assert_eq!(
            site["potentialAction"]["target"]["urlTemplate"],
            "https://816tech.com/search?q={search_term_string}"
        );
    }

    #[test]
    fn test_local_business() {
        let business = local_business(&SiteConfig::default());
        assert_eq!(business["areaServed"][0]["name"], "Kansas City");
        assert!(business["serviceType"].as_array().unwrap().len() > 1);
    }

    #[test]
    fn test_breadcrumb_positions() {
        let config = SiteConfig::default();
        let list = breadcrumbs(&post_trail(&config, &post()));
        let items = list["itemListElement"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["position"], 1);
        assert_eq!(items[2]["position"], 3);
        assert_eq!(items[2]["item"], "https://816tech.com/blog/hello");
    }

    #[test]
    fn test_blog_posting() {
        let posting = blog_posting(&SiteConfig::default(), &post());
        assert_eq!(posting["headline"], "Hello");
        assert_eq!(posting["datePublished"], "2024-01-15T00:00:00+00:00");
        assert_eq!(posting["keywords"], "rust, web");
        assert_eq!(posting["timeRequired"], "PT3M");
    }
}
