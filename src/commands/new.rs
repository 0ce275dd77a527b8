//! Create a new post

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::content::{slugify, FrontMatter};
use crate::Blog;

/// Create `posts/<slug>/index.md` with an unpublished front-matter scaffold.
///
/// The slug comes from `slug` when given, otherwise from the title.
/// Returns the path of the new file.
pub fn create_post(blog: &Blog, title: &str, slug: Option<&str>) -> Result<PathBuf> {
    let slug = slugify(slug.unwrap_or(title));
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a slug from {:?}; pass --slug", title);
    }

    let post_dir = blog.posts_dir.join(&slug);
    let file_path = post_dir.join("index.md");
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let now = chrono::Utc::now().with_timezone(&blog.config.tz()?);

    let mut fm = FrontMatter::default();
    fm.insert("title", title.trim());
    fm.insert("slug", slug.as_str());
    fm.insert("description", "");
    fm.insert("date", now.format("%Y-%m-%d %H:%M:%S").to_string());
    fm.insert("tags", "");
    fm.insert("banner", "");
    fm.insert("published", "false");

    fs::create_dir_all(&post_dir).with_context(|| format!("Failed to create {:?}", post_dir))?;
    fs::write(&file_path, fm.to_block())
        .with_context(|| format!("Failed to write {:?}", file_path))?;

    Ok(file_path)
}
