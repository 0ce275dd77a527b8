//! Site configuration (_config.yml)

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};

use crate::error::ContentError;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    /// IANA name; post dates without an offset are read in this zone
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub posts_dir: String,
    pub public_dir: String,
    pub static_dir: String,

    // Writing
    /// Moment-style pattern for `Post::metadata.date_format`
    pub date_format: String,
    /// Spaces substituted for each leading tab before rendering
    pub tab_width: usize,
    /// Also write pages for unpublished posts
    pub drafts: bool,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Listing
    pub per_page: usize,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub sitemap: SitemapConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            description: String::new(),
            author: String::new(),
            language: "en".to_string(),
            timezone: "UTC".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            posts_dir: "posts".to_string(),
            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            date_format: "MMMM D, YYYY".to_string(),
            tab_width: 4,
            drafts: false,
            highlight: HighlightConfig::default(),

            per_page: 10,
            feed: FeedConfig::default(),
            sitemap: SitemapConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        config.tz()?;
        config.check_posts_dir()?;
        Ok(config)
    }

    /// Post assets are published under their path relative to the site base,
    /// so `posts_dir` has to stay inside it
    fn check_posts_dir(&self) -> Result<()> {
        let inside = Path::new(&self.posts_dir)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !inside {
            bail!(
                "posts_dir `{}` must be a relative path inside the site directory",
                self.posts_dir
            );
        }
        Ok(())
    }

    /// The configured timezone
    pub fn tz(&self) -> Result<Tz, ContentError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ContentError::InvalidTimezone(self.timezone.clone()))
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Name of a bundled syntect theme
    pub theme: String,
    /// Write `css/syntax.css` for the theme
    pub stylesheet: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            stylesheet: true,
        }
    }
}

/// RSS feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub enable: bool,
    pub path: String,
    pub limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enable: true,
            path: "rss.xml".to_string(),
            limit: 20,
        }
    }
}

/// Sitemap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    pub enable: bool,
    pub path: String,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            enable: true,
            path: "sitemap.xml".to_string(),
        }
    }
}
