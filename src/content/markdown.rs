//! Markdown rendering with per-element hooks
//!
//! The parser's event stream is walked once. Code blocks, inline code,
//! images, links and headings are buffered until their end tag and handed to
//! the matching function in [`RenderHooks`]; everything else goes straight to
//! pulldown-cmark's HTML writer.

use lazy_static::lazy_static;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::{Captures, Regex};

use super::highlight::{resolve_language, Highlighter, Language, PLAIN_TEXT};
use super::slug::slugify;
use crate::helpers::{encode_path, html_escape, is_external_url, resolve_path};

lazy_static! {
    static ref LEADING_TABS: Regex = Regex::new(r"(?m)^\t+").unwrap();
}

/// Per-post inputs the hooks need
pub struct RenderContext<'a> {
    /// Slug of the post being rendered, used for heading deep links
    pub slug: &'a str,
    /// Directory holding the post source, relative to the site base (`posts/my-post`)
    pub asset_dir: &'a str,
    /// Site root path (`/` or `/blog/`)
    pub root: &'a str,
    pub highlighter: &'a Highlighter,
}

/// A fenced or indented code block
pub struct CodeBlock<'a> {
    /// First word of the fence info string, if any
    pub lang: Option<&'a str>,
    pub code: &'a str,
}

pub struct Image<'a> {
    pub src: &'a str,
    /// Plain text of the alt content
    pub alt: &'a str,
    pub title: &'a str,
}

pub struct Link<'a> {
    pub href: &'a str,
    pub title: &'a str,
    /// Rendered HTML of the link content
    pub content: &'a str,
}

pub struct Heading<'a> {
    pub level: usize,
    /// Plain text, used for the anchor fragment
    pub text: &'a str,
    /// Rendered HTML of the heading content
    pub content: &'a str,
}

/// One function per overridable element. Each returns the complete HTML for it.
#[derive(Clone, Copy)]
pub struct RenderHooks {
    pub code: fn(&RenderContext, &CodeBlock) -> String,
    pub codespan: fn(&RenderContext, &str) -> String,
    pub image: fn(&RenderContext, &Image) -> String,
    pub link: fn(&RenderContext, &Link) -> String,
    pub heading: fn(&RenderContext, &Heading) -> String,
}

impl Default for RenderHooks {
    fn default() -> Self {
        Self {
            code: render_code,
            codespan: render_codespan,
            image: render_image,
            link: render_link,
            heading: render_heading,
        }
    }
}

/// Language of a code block. An unknown label comes back as the error.
pub fn block_language(lang: Option<&str>) -> Result<Language, &str> {
    match lang {
        None => Ok(PLAIN_TEXT),
        Some(label) => resolve_language(label).ok_or(label),
    }
}

/// Highlighted code, falling back to plain text for unknown languages
pub fn render_code(ctx: &RenderContext, block: &CodeBlock) -> String {
    let language = block_language(block.lang).unwrap_or_else(|label| {
        tracing::warn!(
            "Unknown code block language `{}` in post `{}`, rendering as plain text",
            label,
            ctx.slug
        );
        PLAIN_TEXT
    });

    format!(
        "<pre class=\"language-{}\"><code>{}</code></pre>\n",
        language.class,
        ctx.highlighter.highlight(block.code, language)
    )
}

/// Inline code is never highlighted
pub fn render_codespan(_ctx: &RenderContext, code: &str) -> String {
    format!(r#"<code class="language-text">{}</code>"#, html_escape(code))
}

/// Images resolve against the post's own directory and load lazily
pub fn render_image(ctx: &RenderContext, image: &Image) -> String {
    let src = if is_external_url(image.src) || image.src.starts_with('/') {
        image.src.to_string()
    } else {
        format!(
            "{}/{}",
            ctx.root.trim_end_matches('/'),
            encode_path(&resolve_path(ctx.asset_dir, image.src))
        )
    };

    format!(
        r#"<img src="{}" alt="{}"{} loading="lazy" />"#,
        html_escape(&src),
        html_escape(image.alt),
        title_attr(image.title)
    )
}

/// Links pass through untouched apart from escaping
pub fn render_link(_ctx: &RenderContext, link: &Link) -> String {
    format!(
        r#"<a href="{}"{}>{}</a>"#,
        html_escape(link.href),
        title_attr(link.title),
        link.content
    )
}

/// Headings carry an anchor target and a deep link to themselves
pub fn render_heading(ctx: &RenderContext, heading: &Heading) -> String {
    let fragment = slugify(heading.text);
    format!(
        "<h{level}><span id=\"{fragment}\"></span><a href=\"{root}/posts/{slug}#{fragment}\" aria-hidden=\"true\"></a>{content}</h{level}>\n",
        level = heading.level,
        fragment = fragment,
        root = ctx.root.trim_end_matches('/'),
        slug = ctx.slug,
        content = heading.content,
    )
}

fn title_attr(title: &str) -> String {
    if title.is_empty() {
        String::new()
    } else {
        format!(r#" title="{}""#, html_escape(title))
    }
}

/// Replace every tab in a line's leading run of tabs with `width` spaces
pub fn expand_leading_tabs(markdown: &str, width: usize) -> String {
    LEADING_TABS
        .replace_all(markdown, |caps: &Captures| " ".repeat(caps[0].len() * width))
        .into_owned()
}

/// Number of a footnote label, assigned in order of first appearance
fn footnote_number(footnotes: &mut Vec<String>, label: &str) -> usize {
    match footnotes.iter().position(|l| l == label) {
        Some(i) => i + 1,
        None => {
            footnotes.push(label.to_string());
            footnotes.len()
        }
    }
}

/// Element whose content is being collected until its end tag
enum Frame<'a> {
    Code { lang: Option<String>, code: String },
    Image { src: CowStr<'a>, title: CowStr<'a>, alt: String },
    Link { href: CowStr<'a>, title: CowStr<'a>, events: Vec<Event<'a>> },
    Heading { level: usize, text: String, events: Vec<Event<'a>> },
}

/// Markdown renderer driven by a set of hooks
pub struct MarkdownRenderer {
    hooks: RenderHooks,
    tab_width: usize,
}

impl MarkdownRenderer {
    /// Create a renderer with the default post hooks
    pub fn new(tab_width: usize) -> Self {
        Self::with_hooks(RenderHooks::default(), tab_width)
    }

    /// Create a renderer with custom hooks
    pub fn with_hooks(hooks: RenderHooks, tab_width: usize) -> Self {
        Self { hooks, tab_width }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str, ctx: &RenderContext) -> String {
        let markdown = expand_leading_tabs(markdown, self.tab_width);
        // Front-matter is split off before we get here, so no metadata blocks
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_GFM;
        let parser = Parser::new_ext(&markdown, options);

        let mut output: Vec<Event> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        // Buffered headings and links go through their own HTML writer, so
        // footnotes are numbered here rather than by pulldown-cmark
        let mut footnotes: Vec<String> = Vec::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(|s| s.to_string()),
                        CodeBlockKind::Indented => None,
                    };
                    stack.push(Frame::Code {
                        lang,
                        code: String::new(),
                    });
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(Frame::Code { lang, code }) = stack.pop() {
                        let block = CodeBlock {
                            lang: lang.as_deref(),
                            code: &code,
                        };
                        let html = (self.hooks.code)(ctx, &block);
                        emit(&mut output, &mut stack, Event::Html(html.into()));
                    }
                }
                Event::Start(Tag::Image {
                    dest_url, title, ..
                }) => stack.push(Frame::Image {
                    src: dest_url,
                    title,
                    alt: String::new(),
                }),
                Event::End(TagEnd::Image) => {
                    if let Some(Frame::Image { src, title, alt }) = stack.pop() {
                        let image = Image {
                            src: &src,
                            alt: &alt,
                            title: &title,
                        };
                        let html = (self.hooks.image)(ctx, &image);
                        emit(&mut output, &mut stack, Event::InlineHtml(html.into()));
                    }
                }
                Event::Start(Tag::Link {
                    dest_url, title, ..
                }) => stack.push(Frame::Link {
                    href: dest_url,
                    title,
                    events: Vec::new(),
                }),
                Event::End(TagEnd::Link) => {
                    if let Some(Frame::Link {
                        href,
                        title,
                        events,
                    }) = stack.pop()
                    {
                        let mut content = String::new();
                        html::push_html(&mut content, events.into_iter());
                        let link = Link {
                            href: &href,
                            title: &title,
                            content: &content,
                        };
                        let html = (self.hooks.link)(ctx, &link);
                        emit(&mut output, &mut stack, Event::InlineHtml(html.into()));
                    }
                }
                Event::Start(Tag::Heading { level, .. }) => stack.push(Frame::Heading {
                    level: level as usize,
                    text: String::new(),
                    events: Vec::new(),
                }),
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(Frame::Heading {
                        level,
                        text,
                        events,
                    }) = stack.pop()
                    {
                        let mut content = String::new();
                        html::push_html(&mut content, events.into_iter());
                        let heading = Heading {
                            level,
                            text: &text,
                            content: &content,
                        };
                        let html = (self.hooks.heading)(ctx, &heading);
                        emit(&mut output, &mut stack, Event::Html(html.into()));
                    }
                }
                Event::Code(code) => {
                    collect_text(&mut stack, &code);
                    if !matches!(stack.last(), Some(Frame::Image { .. })) {
                        let html = (self.hooks.codespan)(ctx, &code);
                        emit(&mut output, &mut stack, Event::InlineHtml(html.into()));
                    }
                }
                Event::Text(text) => {
                    collect_text(&mut stack, &text);
                    if !matches!(
                        stack.last(),
                        Some(Frame::Code { .. } | Frame::Image { .. })
                    ) {
                        emit(&mut output, &mut stack, Event::Text(text));
                    }
                }
                Event::FootnoteReference(label)
                    if !matches!(stack.last(), Some(Frame::Image { .. })) =>
                {
                    let html = format!(
                        "<sup class=\"footnote-reference\"><a href=\"#{}\">{}</a></sup>",
                        html_escape(&label),
                        footnote_number(&mut footnotes, &label)
                    );
                    emit(&mut output, &mut stack, Event::InlineHtml(html.into()));
                }
                Event::Start(Tag::FootnoteDefinition(label)) => {
                    let html = format!(
                        "<div class=\"footnote-definition\" id=\"{}\"><sup class=\"footnote-definition-label\">{}</sup>\n",
                        html_escape(&label),
                        footnote_number(&mut footnotes, &label)
                    );
                    emit(&mut output, &mut stack, Event::Html(html.into()));
                }
                Event::End(TagEnd::FootnoteDefinition) => {
                    emit(&mut output, &mut stack, Event::Html("</div>\n".into()));
                }
                Event::SoftBreak | Event::HardBreak
                    if matches!(stack.last(), Some(Frame::Image { .. })) =>
                {
                    collect_text(&mut stack, " ");
                }
                other => {
                    // Markup nested in alt text has no HTML form
                    if !matches!(
                        stack.last(),
                        Some(Frame::Code { .. } | Frame::Image { .. })
                    ) {
                        emit(&mut output, &mut stack, other);
                    }
                }
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, output.into_iter());
        html_output
    }
}

/// Send an event to the innermost element collecting events, or to the output
fn emit<'a>(output: &mut Vec<Event<'a>>, stack: &mut [Frame<'a>], event: Event<'a>) {
    for frame in stack.iter_mut().rev() {
        match frame {
            Frame::Link { events, .. } | Frame::Heading { events, .. } => {
                events.push(event);
                return;
            }
            _ => {}
        }
    }
    output.push(event);
}

/// Feed plain text to the code, alt-text and heading-text buffers that want it
fn collect_text(stack: &mut [Frame], text: &str) {
    if let Some(Frame::Code { code, .. }) = stack.last_mut() {
        code.push_str(text);
        return;
    }
    for frame in stack.iter_mut() {
        match frame {
            Frame::Image { alt, .. } => alt.push_str(text),
            Frame::Heading { text: buf, .. } => buf.push_str(text),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        let highlighter = Highlighter::default();
        let ctx = RenderContext {
            slug: "my-post",
            asset_dir: "posts/my-post",
            root: "/",
            highlighter: &highlighter,
        };
        MarkdownRenderer::new(4).render(markdown, &ctx)
    }

    #[test]
    fn test_render_basic_markdown() {
        let html = render("Some *emphasis* and a list:\n\n- one\n- two\n");
        assert!(html.contains("<em>emphasis</em>"));
        assert!(html.contains("<li>one</li>"));
    }

    #[test]
    fn test_heading_anchor() {
        let html = render("## Hello, World!\n");
        assert_eq!(
            html.trim(),
            r#"<h2><span id="hello-world"></span><a href="/posts/my-post#hello-world" aria-hidden="true"></a>Hello, World!</h2>"#
        );
    }

    #[test]
    fn test_heading_text_includes_inline_markup() {
        let html = render("# Using `cargo` & [friends](https://x.dev)\n");
        assert!(html.contains(r#"<span id="using-cargo-and-friends"></span>"#));
        assert!(html.contains(r#"<code class="language-text">cargo</code>"#));
        assert!(html.contains(r#"<a href="https://x.dev">friends</a>"#));
        assert!(html.starts_with("<h1>"));
    }

    #[test]
    fn test_code_block_known_alias() {
        let html = render("```ts\nconst x: number = 1;\n```\n");
        assert!(html.contains(r#"<pre class="language-typescript"><code>"#));
        assert!(html.contains("</code></pre>"));
    }

    #[test]
    fn test_code_block_unknown_language() {
        let html = render("```brainfuck\n+[-]<>\n```\n");
        assert!(html.contains(r#"<pre class="language-text"><code>+[-]&lt;&gt;"#));
    }

    #[test]
    fn test_unknown_language_is_reported() {
        assert_eq!(block_language(Some("brainfuck")), Err("brainfuck"));
        assert_eq!(block_language(Some("TS")), Ok(resolve_language("ts").unwrap()));
        assert_eq!(block_language(None), Ok(PLAIN_TEXT));
    }

    #[test]
    fn test_code_block_without_language() {
        let html = render("```\nplain <text>\n```\n\n    indented\n");
        assert_eq!(html.matches(r#"<pre class="language-text">"#).count(), 2);
        assert!(html.contains("plain &lt;text&gt;"));
    }

    #[test]
    fn test_code_block_info_string_extras() {
        let html = render("```rust title=\"main.rs\"\nfn main() {}\n```\n");
        assert!(html.contains(r#"<pre class="language-rust">"#));
    }

    #[test]
    fn test_code_block_keeps_markdown_literal() {
        let html = render("```md\n# not a heading\n```\n");
        assert!(!html.contains("<h1>"));
        assert!(html.contains("not a heading"));
    }

    #[test]
    fn test_codespan() {
        let html = render("Run `ls -la <dir>` now.");
        assert!(html.contains(r#"<code class="language-text">ls -la &lt;dir&gt;</code>"#));
    }

    #[test]
    fn test_image_relative_to_post() {
        let html = render("![A banner](./images/banner.jpg \"Banner\")");
        assert!(html.contains(r#"src="/posts/my-post/images/banner.jpg""#));
        assert!(html.contains(r#"alt="A banner""#));
        assert!(html.contains(r#"title="Banner""#));
        assert!(html.contains(r#"loading="lazy""#));
        assert!(!html.contains(r#"src="/images"#));
    }

    #[test]
    fn test_image_absolute_sources_untouched() {
        let html = render("![a](https://cdn.example.com/a.png) ![b](/static/b.png)");
        assert!(html.contains(r#"src="https://cdn.example.com/a.png""#));
        assert!(html.contains(r#"src="/static/b.png""#));
    }

    #[test]
    fn test_image_alt_is_plain_text() {
        let html = render("![the *best* `pic`](pic.png)");
        assert!(html.contains(r#"alt="the best pic""#));
        assert!(!html.contains("<em>"));
    }

    #[test]
    fn test_image_inside_link() {
        let html = render("[![logo](logo.png)](https://example.com)");
        assert!(html.contains(
            r#"<a href="https://example.com"><img src="/posts/my-post/logo.png" alt="logo" loading="lazy" /></a>"#
        ));
    }

    #[test]
    fn test_link_title_preserved() {
        let html = render("[docs](https://docs.rs \"Docs\")");
        assert!(html.contains(r#"<a href="https://docs.rs" title="Docs">docs</a>"#));
        assert!(!html.contains("target="));
    }

    #[test]
    fn test_footnotes_numbered_across_headings_and_body() {
        let html = render("# Title[^a]\n\nBody[^b].\n\n## More[^c]\n\n[^a]: first\n[^b]: second\n[^c]: third\n");
        assert!(html.contains(r##"Title<sup class="footnote-reference"><a href="#a">1</a></sup></h1>"##));
        assert!(html.contains(r##"Body<sup class="footnote-reference"><a href="#b">2</a></sup>"##));
        assert!(html.contains(r##"More<sup class="footnote-reference"><a href="#c">3</a></sup></h2>"##));
        assert!(html.contains(r#"id="a"><sup class="footnote-definition-label">1</sup>"#));
        assert!(html.contains(r#"id="b"><sup class="footnote-definition-label">2</sup>"#));
        assert!(html.contains(r#"id="c"><sup class="footnote-definition-label">3</sup>"#));
        assert!(html.contains(r#"<span id="title"></span>"#));
    }

    #[test]
    fn test_repeated_footnote_keeps_its_number() {
        let html = render("One[^n] two[^n].\n\n[^n]: note\n");
        assert_eq!(html.matches(r##"<a href="#n">1</a>"##).count(), 2);
        assert!(!html.contains(">2</"));
    }

    #[test]
    fn test_expand_leading_tabs() {
        assert_eq!(expand_leading_tabs("\t\titem\n\tx\ty", 2), "    item\n  x\ty");
        assert_eq!(expand_leading_tabs("no tabs", 4), "no tabs");
    }

    #[test]
    fn test_tab_indented_nested_list() {
        let html = render("- outer\n\t- inner\n");
        assert_eq!(html.matches("<ul>").count(), 2);
    }

    #[test]
    fn test_custom_hooks() {
        fn shout(_ctx: &RenderContext, heading: &Heading) -> String {
            format!("<p>{}!</p>", heading.text.to_uppercase())
        }
        let hooks = RenderHooks {
            heading: shout,
            ..RenderHooks::default()
        };
        let highlighter = Highlighter::default();
        let ctx = RenderContext {
            slug: "s",
            asset_dir: "posts/s",
            root: "/",
            highlighter: &highlighter,
        };
        let html = MarkdownRenderer::with_hooks(hooks, 4).render("# quiet", &ctx);
        assert_eq!(html, "<p>QUIET!</p>");
    }

    #[test]
    fn test_root_prefix() {
        let highlighter = Highlighter::default();
        let ctx = RenderContext {
            slug: "p",
            asset_dir: "posts/p",
            root: "/blog/",
            highlighter: &highlighter,
        };
        let html = MarkdownRenderer::new(4).render("# T\n\n![x](x.png)", &ctx);
        assert!(html.contains(r#"href="/blog/posts/p#t""#));
        assert!(html.contains(r#"src="/blog/posts/p/x.png""#));
    }
}
