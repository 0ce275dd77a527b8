//! Content loader - loads posts from the posts directory

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::markdown::RenderContext;
use super::post::sort_by_date;
use super::{slugify, FrontMatter, Highlighter, MarkdownRenderer, Post, PostMetadata};
use crate::error::ContentError;
use crate::Blog;

/// Loads content from the posts directory
pub struct ContentLoader<'a> {
    blog: &'a Blog,
    renderer: MarkdownRenderer,
    highlighter: Highlighter,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(blog: &'a Blog) -> Self {
        Self {
            blog,
            renderer: MarkdownRenderer::new(blog.config.tab_width),
            highlighter: Highlighter::new(&blog.config.highlight.theme),
        }
    }

    /// Load all posts, newest first. Any broken post fails the whole load.
    pub fn load_posts(&self) -> Result<Vec<Post>> {
        let posts_dir = &self.blog.posts_dir;
        if !posts_dir.exists() {
            tracing::warn!("Posts directory {:?} does not exist", posts_dir);
            return Ok(Vec::new());
        }

        let mut posts = Vec::new();
        let mut slugs: HashMap<String, PathBuf> = HashMap::new();

        for entry in WalkDir::new(posts_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = entry.with_context(|| format!("Failed to walk {:?}", posts_dir))?;
            let path = entry.path();
            if !path.is_file() || !is_markdown_file(path) {
                continue;
            }

            let post = self
                .load_post(path)
                .with_context(|| format!("Failed to load post {:?}", path))?;

            if let Some(first) = slugs.get(&post.metadata.slug) {
                return Err(ContentError::DuplicateSlug {
                    slug: post.metadata.slug.clone(),
                    first: first.clone(),
                    second: path.to_path_buf(),
                }
                .into());
            }
            slugs.insert(post.metadata.slug.clone(), path.to_path_buf());

            tracing::debug!("Loaded {} from {:?}", post.metadata.slug, path);
            posts.push(post);
        }

        sort_by_date(&mut posts);

        Ok(posts)
    }

    /// Load a single post from a file
    pub fn load_post(&self, path: &Path) -> Result<Post> {
        let content = fs::read_to_string(path)?;
        self.load_post_from_str(path, &content)
    }

    /// Build a post from already-read source text
    pub fn load_post_from_str(&self, path: &Path, content: &str) -> Result<Post> {
        let (fm, body) = FrontMatter::parse(content)?;

        let asset_dir = asset_dir(&self.blog.base_dir, path);
        let metadata = PostMetadata::from_front_matter(
            &fm,
            &self.blog.config,
            &asset_dir,
            &fallback_slug(path),
        )?;

        let ctx = RenderContext {
            slug: &metadata.slug,
            asset_dir: &asset_dir,
            root: &self.blog.config.root,
            highlighter: &self.highlighter,
        };
        let html = self.renderer.render(body, &ctx);

        Ok(Post {
            html,
            metadata,
            source: path.to_path_buf(),
            asset_dir,
        })
    }
}

/// Directory of `path` relative to `base`, joined with `/`
fn asset_dir(base: &Path, path: &Path) -> String {
    let dir = path.parent().unwrap_or(Path::new(""));
    let relative = dir.strip_prefix(base).unwrap_or(dir);
    relative
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Slug for posts without one: the folder name for `<dir>/index.md`, else the file stem
fn fallback_slug(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let name = if stem == "index" {
        path.parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .unwrap_or(stem)
    } else {
        stem
    };
    slugify(name)
}

/// Check if a file is a markdown file
pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn blog(dir: &TempDir) -> Blog {
        let config = SiteConfig {
            url: "https://example.com".to_string(),
            ..SiteConfig::default()
        };
        Blog::with_config(dir.path(), config)
    }

    #[test]
    fn test_load_posts_sorted_newest_first() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "posts/older/index.md",
            "---\ntitle: Older\nslug: older\ndate: 2023-01-01\npublished: true\n---\nOld.\n",
        );
        write(
            dir.path(),
            "posts/newer/index.md",
            "---\ntitle: Newer\nslug: newer\ndate: 2024-01-01\npublished: true\n---\nNew.\n",
        );
        write(dir.path(), "posts/newer/images/a.png", "not markdown");

        let posts = blog(&dir).load_posts().unwrap();
        let slugs: Vec<_> = posts.iter().map(|p| p.metadata.slug.as_str()).collect();
        assert_eq!(slugs, vec!["newer", "older"]);
        assert_eq!(posts[0].asset_dir, "posts/newer");
        assert!(posts[0].html.contains("<p>New.</p>"));
    }

    #[test]
    fn test_unpublished_posts_are_kept() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "posts/draft.md",
            "---\ntitle: Draft\ndate: 2024-01-01\npublished: \"false\"\n---\nWIP\n",
        );
        let posts = blog(&dir).load_posts().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].metadata.slug, "draft");
        assert!(!posts[0].metadata.published);
    }

    #[test]
    fn test_image_resolves_against_post_directory() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "posts/my-post/index.md",
            "---\ntitle: Mine\nslug: mine\ndate: 2024-01-01\n---\n![b](./images/banner.jpg)\n",
        );
        let posts = blog(&dir).load_posts().unwrap();
        assert!(posts[0]
            .html
            .contains(r#"src="/posts/my-post/images/banner.jpg""#));
    }

    #[test]
    fn test_fallback_slug() {
        assert_eq!(
            fallback_slug(Path::new("/site/posts/Mon Été/index.md")),
            "mon-ete"
        );
        assert_eq!(fallback_slug(Path::new("/site/posts/hello_world.md")), "hello-world");
    }

    #[test]
    fn test_duplicate_slug_fails() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "posts/a.md",
            "---\ntitle: A\nslug: same\ndate: 2024-01-01\n---\n",
        );
        write(
            dir.path(),
            "posts/b.md",
            "---\ntitle: B\nslug: same\ndate: 2024-01-02\n---\n",
        );
        let err = blog(&dir).load_posts().unwrap_err();
        assert!(err.to_string().contains("duplicate slug `same`"));
    }

    #[test]
    fn test_malformed_front_matter_aborts_with_path() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "posts/ok.md", "---\ntitle: A\ndate: 2024-01-01\n---\n");
        write(dir.path(), "posts/broken.md", "# no front matter\n");
        let err = blog(&dir).load_posts().unwrap_err();
        assert!(format!("{:#}", err).contains("broken.md"));
        assert!(err
            .chain()
            .any(|e| matches!(e.downcast_ref::<ContentError>(), Some(ContentError::MissingFrontMatter))));
    }

    #[test]
    fn test_slug_outside_posts_dir_fails() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "posts/a/index.md",
            "---\ntitle: A\ndate: 2024-01-01\nslug: ../../../outside\n---\n",
        );
        let err = blog(&dir).load_posts().unwrap_err();
        assert!(format!("{:#}", err).contains("index.md"));
        assert!(err.chain().any(|e| matches!(
            e.downcast_ref::<ContentError>(),
            Some(ContentError::InvalidSlug(slug)) if slug == "../../../outside"
        )));
    }

    #[test]
    fn test_slug_with_spaces_fails() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "posts/b.md",
            "---\ntitle: B\ndate: 2024-01-01\nslug: My Post\n---\n",
        );
        assert!(blog(&dir).load_posts().is_err());
        assert!(!dir.path().join("public").exists());
    }

    #[test]
    fn test_missing_posts_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(blog(&dir).load_posts().unwrap().is_empty());
    }
}
