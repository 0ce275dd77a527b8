//! Generator module - writes the static site from rendered posts

mod feed;
mod sitemap;

pub use feed::render_rss;
pub use sitemap::render_sitemap;

use anyhow::{Context as _, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::content::loader::is_markdown_file;
use crate::content::{published, slugify, Highlighter, Post};
use crate::helpers::url_for;
use crate::templates::{tag_path, PaginationData, PostData, TemplateRenderer};
use crate::Blog;

/// Static site generator using the built-in Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            renderer: TemplateRenderer::new()?,
        })
    }

    /// Generate the entire site. `posts` must be sorted newest first.
    pub fn generate(&self, posts: &[Post]) -> Result<()> {
        let config = &self.blog.config;
        fs::create_dir_all(&self.blog.public_dir)
            .with_context(|| format!("Failed to create {:?}", self.blog.public_dir))?;

        self.copy_post_assets()?;
        self.copy_static_files()?;

        if config.highlight.stylesheet {
            self.write_stylesheet()?;
        }

        let listed: Vec<&Post> = published(posts).collect();
        let pages: Vec<&Post> = if config.drafts {
            posts.iter().collect()
        } else {
            listed.clone()
        };

        self.generate_post_pages(&pages)?;
        self.generate_index_pages(&listed)?;
        self.generate_tag_pages(&listed)?;

        if config.feed.enable {
            self.write(&config.feed.path, render_rss(config, &listed))?;
            tracing::info!("Generated {}", config.feed.path);
        }
        if config.sitemap.enable {
            self.write(&config.sitemap.path, render_sitemap(config, &listed))?;
            tracing::info!("Generated {}", config.sitemap.path);
        }

        self.write("posts.json", serde_json::to_string_pretty(&listed)?)?;
        tracing::info!("Generated posts.json");

        Ok(())
    }

    /// Generate one page per post
    fn generate_post_pages(&self, posts: &[&Post]) -> Result<()> {
        let config = &self.blog.config;

        for post in posts {
            let mut context = self.renderer.base_context(config);
            context.insert("post", &PostData::new(config, post));

            let html = self
                .renderer
                .render("post.html", &context)
                .with_context(|| format!("Failed to render post {}", post.metadata.slug))?;
            self.write(&format!("{}index.html", post.path()), html)?;
            tracing::debug!("Generated post: {}", post.metadata.slug);
        }

        tracing::info!("Generated {} post pages", posts.len());
        Ok(())
    }

    /// Generate index pages with pagination
    fn generate_index_pages(&self, posts: &[&Post]) -> Result<()> {
        let config = &self.blog.config;
        let per_page = config.per_page.max(1);
        let total_pages = posts.len().div_ceil(per_page).max(1);

        for page_num in 1..=total_pages {
            let start = (page_num - 1) * per_page;
            let end = (start + per_page).min(posts.len());
            let page_posts: Vec<PostData> = posts[start..end]
                .iter()
                .map(|p| PostData::summary(config, p))
                .collect();

            let pagination = PaginationData {
                current: page_num,
                total: total_pages,
                prev: (page_num > 1).then(|| url_for(config, &page_path(page_num - 1))),
                next: (page_num < total_pages).then(|| url_for(config, &page_path(page_num + 1))),
            };

            let mut context = self.renderer.base_context(config);
            context.insert("posts", &page_posts);
            context.insert("pagination", &pagination);

            let html = self.renderer.render("index.html", &context)?;
            self.write(&format!("{}index.html", page_path(page_num)), html)?;
        }

        tracing::info!("Generated {} index pages", total_pages);
        Ok(())
    }

    /// Generate tag pages
    fn generate_tag_pages(&self, posts: &[&Post]) -> Result<()> {
        let config = &self.blog.config;

        // Keyed by slug so tags differing only in case share a page
        let mut tags: BTreeMap<String, (String, Vec<PostData>)> = BTreeMap::new();
        for post in posts {
            for tag in &post.metadata.tags {
                let slug = slugify(tag);
                if slug.is_empty() {
                    continue;
                }
                tags.entry(slug)
                    .or_insert_with(|| (tag.clone(), Vec::new()))
                    .1
                    .push(PostData::summary(config, post));
            }
        }

        for (name, tag_posts) in tags.values() {
            let mut context = self.renderer.base_context(config);
            context.insert("tag", name);
            context.insert("posts", tag_posts);

            let html = self.renderer.render("tag.html", &context)?;
            self.write(&format!("{}index.html", tag_path(name)), html)?;
        }

        tracing::info!("Generated {} tag pages", tags.len());
        Ok(())
    }

    /// Write the highlighter stylesheet
    fn write_stylesheet(&self) -> Result<()> {
        let highlighter = Highlighter::new(&self.blog.config.highlight.theme);
        self.write("css/syntax.css", highlighter.stylesheet()?)
    }

    /// Copy non-markdown files under the posts directory, keeping their
    /// path relative to the site base
    fn copy_post_assets(&self) -> Result<()> {
        let copied = copy_tree(
            &self.blog.posts_dir,
            &self.blog.base_dir,
            &self.blog.public_dir,
            true,
        )?;
        tracing::debug!("Copied {} post assets", copied);
        Ok(())
    }

    /// Copy files under the static directory to the output root
    fn copy_static_files(&self) -> Result<()> {
        let copied = copy_tree(
            &self.blog.static_dir,
            &self.blog.static_dir,
            &self.blog.public_dir,
            false,
        )?;
        tracing::debug!("Copied {} static files", copied);
        Ok(())
    }

    /// Write a file under the public directory
    fn write(&self, relative: &str, contents: String) -> Result<()> {
        let output_path = self.blog.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {:?}", parent))?;
        }
        fs::write(&output_path, contents)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }
}

/// Site-relative directory of index page `n`, the first page being the root
fn page_path(n: usize) -> String {
    if n <= 1 {
        String::new()
    } else {
        format!("page/{}/", n)
    }
}

/// Copy every file under `source` to `dest`, keeping its path relative to `base`
fn copy_tree(source: &Path, base: &Path, dest: &Path, skip_markdown: bool) -> Result<usize> {
    if !source.exists() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", source))?;
        let path = entry.path();
        if !path.is_file() || (skip_markdown && is_markdown_file(path)) {
            continue;
        }

        let relative = path
            .strip_prefix(base)
            .with_context(|| format!("{:?} is outside {:?}", path, base))?;
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &target)
            .with_context(|| format!("Failed to copy {:?} to {:?}", path, target))?;
        copied += 1;
    }

    Ok(copied)
}
