//! Sitemap for the hand-declared site sections

use chrono::{DateTime, SecondsFormat, Utc};

use super::escape_xml;
use crate::config::SiteConfig;

/// Render the sitemap `urlset`, stamping every entry with `now`
pub fn render_sitemap(config: &SiteConfig, now: DateTime<Utc>) -> String {
    let lastmod = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    xml.push('\n');

    for route in &config.sitemap {
        xml.push_str("  <url>\n");
        xml.push_str(&format!(
            "    <loc>{}{}</loc>\n",
            escape_xml(config.base_url()),
            escape_xml(&route.path)
        ));
        xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod));
        xml.push_str(&format!(
            "    <changefreq>{}</changefreq>\n",
            escape_xml(&route.changefreq)
        ));
        xml.push_str(&format!("    <priority>{}</priority>\n", route.priority));
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}
