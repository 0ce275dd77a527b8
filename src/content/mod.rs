//! Content module - turns markdown post sources into rendered posts

mod frontmatter;
pub mod highlight;
pub mod loader;
pub mod markdown;
mod post;
mod slug;

pub use frontmatter::FrontMatter;
pub use highlight::Highlighter;
pub use markdown::{MarkdownRenderer, RenderContext, RenderHooks};
pub use post::{
    banner_url, parse_published, parse_tags, published, sort_by_date, Post, PostMetadata,
};
pub use slug::slugify;
