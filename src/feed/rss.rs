//! RSS 2.0 channel for the blog

use chrono::{DateTime, Datelike, Utc};

use super::escape_xml;
use crate::config::SiteConfig;
use crate::content::PostListing;

/// RFC 2822 date in the `GMT` form feed readers expect
fn rfc2822(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Render the RSS document for `posts`.
///
/// Posts dated after `now` are left out; the rest are ordered newest first.
pub fn render_rss(config: &SiteConfig, posts: &[PostListing], now: DateTime<Utc>) -> String {
    let mut published: Vec<&PostListing> = posts.iter().filter(|p| p.is_published(now)).collect();
    published.sort_by(|a, b| b.date.cmp(&a.date));

    let blog_url = config.full_url("/blog");
    let blog_title = escape_xml(&config.blog_title);

    let mut feed = String::new();
    feed.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    feed.push('\n');
    feed.push_str(concat!(
        r#"<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom""#,
        r#" xmlns:content="http://purl.org/rss/1.0/modules/content/""#,
        r#" xmlns:dc="http://purl.org/dc/elements/1.1/">"#
    ));
    feed.push('\n');
    feed.push_str("  <channel>\n");
    feed.push_str(&format!("    <title>{}</title>\n", blog_title));
    feed.push_str(&format!("    <link>{}</link>\n", escape_xml(&blog_url)));
    feed.push_str(&format!(
        "    <description>{}</description>\n",
        escape_xml(&config.blog_description)
    ));
    feed.push_str(&format!(
        "    <language>{}</language>\n",
        escape_xml(&config.language)
    ));
    feed.push_str(&format!(
        "    <lastBuildDate>{}</lastBuildDate>\n",
        rfc2822(&now)
    ));
    feed.push_str(&format!(
        "    <atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\" />\n",
        escape_xml(&config.full_url("/api/feed.xml"))
    ));
    feed.push_str(&format!(
        "    <generator>{}</generator>\n",
        escape_xml(&config.generator)
    ));
    feed.push_str(&format!(
        "    <webMaster>{}</webMaster>\n",
        escape_xml(&config.webmaster)
    ));
    feed.push_str(&format!(
        "    <copyright>Copyright {} {}. All rights reserved.</copyright>\n",
        now.year(),
        escape_xml(&config.copyright_holder)
    ));
    for category in &config.categories {
        feed.push_str(&format!(
            "    <category>{}</category>\n",
            escape_xml(category)
        ));
    }
    feed.push_str("    <image>\n");
    feed.push_str(&format!(
        "      <url>{}</url>\n",
        escape_xml(&config.full_url(&config.logo))
    ));
    feed.push_str(&format!("      <title>{}</title>\n", blog_title));
    feed.push_str(&format!("      <link>{}</link>\n", escape_xml(&blog_url)));
    feed.push_str("    </image>\n");

    for post in published {
        let post_url = escape_xml(&config.post_url(&post.slug));
        let author = if post.author.is_empty() {
            &config.feed_author
        } else {
            &post.author
        };

        feed.push_str("    <item>\n");
        feed.push_str(&format!("      <title>{}</title>\n", escape_xml(&post.title)));
        feed.push_str(&format!("      <link>{}</link>\n", post_url));
        feed.push_str(&format!(
            "      <guid isPermaLink=\"true\">{}</guid>\n",
            post_url
        ));
        feed.push_str(&format!(
            "      <description>{}</description>\n",
            escape_xml(&post.excerpt)
        ));
        feed.push_str(&format!(
            "      <dc:creator>{}</dc:creator>\n",
            escape_xml(author)
        ));
        feed.push_str(&format!("      <pubDate>{}</pubDate>\n", rfc2822(&post.date)));
        for tag in &post.tags {
            feed.push_str(&format!("      <category>{}</category>\n", escape_xml(tag)));
        }
        feed.push_str("    </item>\n");
    }

    feed.push_str("  </channel>\n");
    feed.push_str("</rss>\n");

    feed
}
