//! Post model and front-matter normalization

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{slugify, FrontMatter};
use crate::config::SiteConfig;
use crate::error::{ContentError, Result};
use crate::helpers::{
    format_date, full_url_for, html_unescape, is_external_url, parse_date, resolve_path, strip_html,
    truncate,
};

/// Keys lifted into typed fields; everything else lands in `extra`
const KNOWN_KEYS: &[&str] = &[
    "title",
    "slug",
    "description",
    "author",
    "date",
    "tags",
    "banner",
    "published",
];

/// Normalized post metadata
#[derive(Debug, Clone, Serialize)]
pub struct PostMetadata {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub author: String,
    pub date: DateTime<FixedOffset>,
    /// `date` formatted with the site's `date_format`
    #[serde(rename = "dateFormat")]
    pub date_format: String,
    pub published: bool,
    pub tags: Vec<String>,
    /// Absolute banner URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    /// Front-matter keys without a typed field, in source order
    #[serde(flatten)]
    pub extra: IndexMap<String, String>,
}

impl PostMetadata {
    /// Type the raw front-matter of the post living in `asset_dir`.
    ///
    /// `fallback_slug` is used when the front-matter has no `slug`.
    pub fn from_front_matter(
        fm: &FrontMatter,
        config: &SiteConfig,
        asset_dir: &str,
        fallback_slug: &str,
    ) -> Result<Self> {
        let tz = config.tz()?;

        let title = fm.require("title")?.to_string();
        let raw_date = fm.require("date")?;
        let date =
            parse_date(raw_date, tz).ok_or_else(|| ContentError::InvalidDate(raw_date.to_string()))?;

        let slug = fm
            .non_empty("slug")
            .unwrap_or(fallback_slug)
            .to_string();
        if slug.is_empty() {
            return Err(ContentError::MissingField("slug"));
        }
        // The slug names the output directory
        if slugify(&slug) != slug {
            return Err(ContentError::InvalidSlug(slug));
        }

        let extra = fm
            .iter()
            .filter(|(key, _)| !KNOWN_KEYS.contains(key))
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Ok(Self {
            title,
            slug,
            description: fm.get("description").unwrap_or_default().to_string(),
            author: fm
                .non_empty("author")
                .unwrap_or(&config.author)
                .to_string(),
            date_format: format_date(&date, &config.date_format),
            date,
            published: parse_published(fm.get("published")),
            tags: parse_tags(fm.get("tags").unwrap_or_default()),
            banner: fm
                .non_empty("banner")
                .map(|banner| banner_url(config, asset_dir, banner)),
            extra,
        })
    }
}

/// A rendered post. Built once per build and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub html: String,
    pub metadata: PostMetadata,
    /// Source file
    #[serde(skip)]
    pub source: PathBuf,
    /// Source directory relative to the site base, `/`-separated
    #[serde(skip)]
    pub asset_dir: String,
}

impl Post {
    /// Site-relative route of the post page
    pub fn path(&self) -> String {
        format!("posts/{}/", self.metadata.slug)
    }

    /// The description, or the opening of the rendered text when there is none
    pub fn summary(&self, length: usize) -> String {
        if !self.metadata.description.is_empty() {
            return self.metadata.description.clone();
        }
        let text = html_unescape(&strip_html(&self.html));
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        truncate(&text, length, None)
    }

    /// Source path for messages, relative when possible
    pub fn source_display(&self, base: &Path) -> String {
        self.source
            .strip_prefix(base)
            .unwrap_or(&self.source)
            .display()
            .to_string()
    }
}

/// Only an explicit `true` publishes a post
pub fn parse_published(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Split a comma-separated tag list, dropping empty entries
pub fn parse_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Make a banner reference absolute. Relative paths live next to the post.
pub fn banner_url(config: &SiteConfig, asset_dir: &str, banner: &str) -> String {
    if is_external_url(banner) {
        banner.to_string()
    } else if banner.starts_with('/') {
        full_url_for(config, banner)
    } else {
        full_url_for(config, &resolve_path(asset_dir, banner))
    }
}

/// Posts that belong in public listings. The loader itself never filters.
pub fn published(posts: &[Post]) -> impl Iterator<Item = &Post> {
    posts.iter().filter(|p| p.metadata.published)
}

/// Order posts newest first. Stable, so equal dates keep their input order.
pub fn sort_by_date(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.metadata.date.cmp(&a.metadata.date));
}
