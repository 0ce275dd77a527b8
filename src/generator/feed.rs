//! RSS 2.0 feed

use crate::config::SiteConfig;
use crate::content::Post;
use crate::helpers::{absolutize_urls, date_rfc2822, escape_xml, full_url_for, strip_invalid_xml_chars};

/// Characters of body text used for items without a description
const SUMMARY_LENGTH: usize = 280;

/// Render the feed for `posts`, which must already be published and sorted newest first
pub fn render_rss(config: &SiteConfig, posts: &[&Post]) -> String {
    let home = full_url_for(config, "");
    let base_url = config.url.trim_end_matches('/');

    let mut feed = String::new();
    feed.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    feed.push('\n');
    feed.push_str(r#"<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom" xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:dc="http://purl.org/dc/elements/1.1/">"#);
    feed.push('\n');
    feed.push_str("<channel>\n");
    feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
    feed.push_str(&format!("  <link>{}</link>\n", escape_xml(&home)));
    feed.push_str(&format!(
        "  <atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>\n",
        escape_xml(&full_url_for(config, &config.feed.path))
    ));
    feed.push_str(&format!(
        "  <description>{}</description>\n",
        escape_xml(&config.description)
    ));
    feed.push_str(&format!("  <language>{}</language>\n", escape_xml(&config.language)));
    if let Some(newest) = posts.first() {
        feed.push_str(&format!(
            "  <lastBuildDate>{}</lastBuildDate>\n",
            date_rfc2822(&newest.metadata.date)
        ));
    }
    feed.push_str("  <generator>postforge</generator>\n");

    for post in posts.iter().take(config.feed.limit) {
        let meta = &post.metadata;
        let link = full_url_for(config, &post.path());

        feed.push_str("  <item>\n");
        feed.push_str(&format!("    <title>{}</title>\n", escape_xml(&meta.title)));
        feed.push_str(&format!("    <link>{}</link>\n", escape_xml(&link)));
        feed.push_str(&format!(
            "    <guid isPermaLink=\"true\">{}</guid>\n",
            escape_xml(&link)
        ));
        feed.push_str(&format!(
            "    <pubDate>{}</pubDate>\n",
            date_rfc2822(&meta.date)
        ));
        if !meta.author.is_empty() {
            feed.push_str(&format!(
                "    <dc:creator>{}</dc:creator>\n",
                escape_xml(&meta.author)
            ));
        }
        for tag in &meta.tags {
            feed.push_str(&format!("    <category>{}</category>\n", escape_xml(tag)));
        }
        feed.push_str(&format!(
            "    <description>{}</description>\n",
            escape_xml(&post.summary(SUMMARY_LENGTH))
        ));
        let content = strip_invalid_xml_chars(&absolutize_urls(&post.html, base_url));
        feed.push_str(&format!(
            "    <content:encoded><![CDATA[{}]]></content:encoded>\n",
            cdata(&content)
        ));
        feed.push_str("  </item>\n");
    }

    feed.push_str("</channel>\n");
    feed.push_str("</rss>\n");
    feed
}

/// Split any `]]>` so the text cannot close its CDATA section early
fn cdata(s: &str) -> String {
    s.replace("]]>", "]]]]><![CDATA[>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{FrontMatter, PostMetadata};
    use std::path::PathBuf;

    fn config() -> SiteConfig {
        SiteConfig {
            title: "Notes & Sketches".to_string(),
            url: "https://example.com".to_string(),
            ..SiteConfig::default()
        }
    }

    fn post(slug: &str, date: &str, html: &str) -> Post {
        let block = format!("---\ntitle: {slug}\nslug: {slug}\ndate: {date}\ntags: rust\n---\n");
        let (fm, _) = FrontMatter::parse(&block).unwrap();
        Post {
            html: html.to_string(),
            metadata: PostMetadata::from_front_matter(&fm, &config(), "posts", slug).unwrap(),
            source: PathBuf::from(format!("posts/{slug}.md")),
            asset_dir: "posts".to_string(),
        }
    }

    #[test]
    fn test_feed_items_and_absolute_urls() {
        let a = post("a", "2024-02-01", r#"<img src="/posts/a/x.png" />"#);
        let b = post("b", "2024-01-01", "<p>b</p>");
        let rss = render_rss(&config(), &[&a, &b]);

        assert!(rss.contains("<title>Notes &amp; Sketches</title>"));
        assert!(rss.contains("<link>https://example.com/posts/a/</link>"));
        assert!(rss.contains(r#"src="https://example.com/posts/a/x.png""#));
        assert!(rss.contains("<category>rust</category>"));
        assert!(rss.contains("<description>b</description>"));
        assert!(rss.contains("<lastBuildDate>Thu, "));
        assert!(rss.contains("Feb 2024 00:00:00 +0000</lastBuildDate>"));
        assert!(rss.find("posts/a/").unwrap() < rss.find("posts/b/").unwrap());
    }

    #[test]
    fn test_feed_limit() {
        let config = SiteConfig {
            feed: crate::config::FeedConfig {
                limit: 1,
                ..Default::default()
            },
            ..config()
        };
        let a = post("a", "2024-02-01", "");
        let b = post("b", "2024-01-01", "");
        let rss = render_rss(&config, &[&a, &b]);
        assert_eq!(rss.matches("<item>").count(), 1);
    }

    #[test]
    fn test_cdata_is_split() {
        assert_eq!(cdata("a]]>b"), "a]]]]><![CDATA[>b");
    }
}
