//! List site content

use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::content::{published, Post};
use crate::Blog;

/// Print one collection of the site
pub fn run(blog: &Blog, content_type: &str) -> Result<()> {
    let posts = blog.load_posts()?;
    print!("{}", render(blog, &posts, content_type)?);
    Ok(())
}

/// Text listing of `posts` for `content_type`
pub fn render(blog: &Blog, posts: &[Post], content_type: &str) -> Result<String> {
    let mut out = String::new();

    match content_type {
        "post" | "posts" => {
            let listed: Vec<_> = published(posts).collect();
            writeln!(out, "Posts ({}):", listed.len())?;
            for post in listed {
                write_post(&mut out, blog, post)?;
            }
        }
        "draft" | "drafts" => {
            let drafts: Vec<_> = posts.iter().filter(|p| !p.metadata.published).collect();
            writeln!(out, "Drafts ({}):", drafts.len())?;
            for post in drafts {
                write_post(&mut out, blog, post)?;
            }
        }
        "tag" | "tags" => {
            let mut tags: BTreeMap<&str, usize> = BTreeMap::new();
            for post in published(posts) {
                for tag in &post.metadata.tags {
                    *tags.entry(tag.as_str()).or_insert(0) += 1;
                }
            }
            writeln!(out, "Tags ({}):", tags.len())?;
            let mut tags: Vec<_> = tags.into_iter().collect();
            tags.sort_by(|a, b| b.1.cmp(&a.1));
            for (tag, count) in tags {
                writeln!(out, "  {} ({})", tag, count)?;
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post, draft, tag", content_type);
        }
    }

    Ok(out)
}

fn write_post(out: &mut String, blog: &Blog, post: &Post) -> std::fmt::Result {
    writeln!(
        out,
        "  {} - {} [{}]",
        post.metadata.date.format("%Y-%m-%d"),
        post.metadata.title,
        post.source_display(&blog.base_dir)
    )
}
