//! XML sitemap

use crate::config::SiteConfig;
use crate::content::Post;
use crate::helpers::{date_xml, escape_xml, full_url_for};

/// Render a sitemap listing the home page and every post in `posts`
pub fn render_sitemap(config: &SiteConfig, posts: &[&Post]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    xml.push('\n');

    xml.push_str("  <url>\n");
    xml.push_str(&format!(
        "    <loc>{}</loc>\n",
        escape_xml(&full_url_for(config, ""))
    ));
    if let Some(newest) = posts.iter().map(|p| p.metadata.date).max() {
        xml.push_str(&format!("    <lastmod>{}</lastmod>\n", date_xml(&newest)));
    }
    xml.push_str("  </url>\n");

    for post in posts {
        xml.push_str("  <url>\n");
        xml.push_str(&format!(
            "    <loc>{}</loc>\n",
            escape_xml(&full_url_for(config, &post.path()))
        ));
        xml.push_str(&format!(
            "    <lastmod>{}</lastmod>\n",
            date_xml(&post.metadata.date)
        ));
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}
