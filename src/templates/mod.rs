//! Built-in page templates using the Tera template engine
//!
//! The theme is deliberately bare: styling is left to `static/` files.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{slugify, Post};
use crate::helpers::{date_xml, url_for};

const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="{{ site.language }}">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{% block title %}{{ site.title }}{% endblock title %}</title>
  <meta name="description" content="{% block description %}{{ site.description }}{% endblock description %}">
  <meta name="generator" content="postforge {{ version }}">
  {% if site.stylesheet %}<link rel="stylesheet" href="{{ site.stylesheet | safe }}">{% endif %}
  {% if site.feed %}<link rel="alternate" type="application/rss+xml" title="{{ site.title }}" href="{{ site.feed | safe }}">{% endif %}
  {% block head %}{% endblock head %}
</head>
<body>
  <header><a href="{{ site.home | safe }}">{{ site.title }}</a></header>
  <main>
  {% block content %}{% endblock content %}
  </main>
  <footer>{% if site.author %}&copy; {{ site.author }}{% endif %}</footer>
</body>
</html>
"#;

const POST_LIST: &str = r#"<ul class="post-list">
{% for post in posts %}
  <li>
    <a href="{{ post.url | safe }}">{{ post.title }}</a>
    <time datetime="{{ post.date }}">{{ post.date_format }}</time>
    {% if post.description %}<p>{{ post.description }}</p>{% endif %}
    {% for tag in post.tags %}<a class="tag" href="{{ tag.url | safe }}">#{{ tag.name }}</a> {% endfor %}
  </li>
{% endfor %}
</ul>
"#;

const INDEX: &str = r#"{% extends "layout.html" %}
{% block content %}
{% include "partials/post_list.html" %}
{% if pagination.total > 1 %}
<nav class="pager">
  {% if pagination.prev %}<a href="{{ pagination.prev | safe }}">Newer</a>{% endif %}
  <span>{{ pagination.current }} / {{ pagination.total }}</span>
  {% if pagination.next %}<a href="{{ pagination.next | safe }}">Older</a>{% endif %}
</nav>
{% endif %}
{% endblock content %}
"#;

const POST: &str = r#"{% extends "layout.html" %}
{% block title %}{{ post.title }} | {{ site.title }}{% endblock title %}
{% block description %}{{ post.description }}{% endblock description %}
{% block head %}{% if post.banner %}<meta property="og:image" content="{{ post.banner }}">{% endif %}{% endblock head %}
{% block content %}
<article>
  <h1>{{ post.title }}</h1>
  <p class="meta">
    <time datetime="{{ post.date }}">{{ post.date_format }}</time>
    {% if post.author %}&middot; {{ post.author }}{% endif %}
    {% if not post.published %}&middot; <strong>draft</strong>{% endif %}
  </p>
  {% if post.banner %}<img class="banner" src="{{ post.banner }}" alt="">{% endif %}
  {{ post.html | safe }}
  <p class="tags">{% for tag in post.tags %}<a class="tag" href="{{ tag.url | safe }}">#{{ tag.name }}</a> {% endfor %}</p>
</article>
{% endblock content %}
"#;

const TAG: &str = r#"{% extends "layout.html" %}
{% block title %}#{{ tag }} | {{ site.title }}{% endblock title %}
{% block content %}
<h1>#{{ tag }}</h1>
{% include "partials/post_list.html" %}
{% endblock content %}
"#;

/// Characters of body text shown for posts without a description
const SUMMARY_LENGTH: usize = 160;

/// Site-wide values available to every template as `site`
#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub home: String,
    pub stylesheet: Option<String>,
    pub feed: Option<String>,
}

impl SiteData {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            home: url_for(config, ""),
            stylesheet: config
                .highlight
                .stylesheet
                .then(|| url_for(config, "css/syntax.css")),
            feed: config.feed.enable.then(|| url_for(config, &config.feed.path)),
        }
    }
}

/// A tag with the URL of its listing page
#[derive(Debug, Clone, Serialize)]
pub struct TagLink {
    pub name: String,
    pub url: String,
}

impl TagLink {
    pub fn new(config: &SiteConfig, name: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url_for(config, &tag_path(name)),
        }
    }
}

/// Site-relative directory of a tag listing
pub fn tag_path(name: &str) -> String {
    format!("tags/{}/", slugify(name))
}

/// Post fields as the templates see them
#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    pub url: String,
    pub date: String,
    pub date_format: String,
    pub description: String,
    pub author: String,
    pub banner: Option<String>,
    pub published: bool,
    pub tags: Vec<TagLink>,
    pub html: String,
}

impl PostData {
    pub fn new(config: &SiteConfig, post: &Post) -> Self {
        let meta = &post.metadata;
        Self {
            title: meta.title.clone(),
            url: url_for(config, &post.path()),
            date: date_xml(&meta.date),
            date_format: meta.date_format.clone(),
            description: post.summary(SUMMARY_LENGTH),
            author: meta.author.clone(),
            banner: meta.banner.clone(),
            published: meta.published,
            tags: meta.tags.iter().map(|t| TagLink::new(config, t)).collect(),
            html: post.html.clone(),
        }
    }

    /// Listing entry: same fields without the body
    pub fn summary(config: &SiteConfig, post: &Post) -> Self {
        Self {
            html: String::new(),
            ..Self::new(config, post)
        }
    }
}

/// Pager state for paginated listings
#[derive(Debug, Clone, Serialize)]
pub struct PaginationData {
    pub current: usize,
    pub total: usize,
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// Template renderer with the built-in theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("layout.html", LAYOUT),
            ("partials/post_list.html", POST_LIST),
            ("index.html", INDEX),
            ("post.html", POST),
            ("tag.html", TAG),
        ])?;
        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Context pre-filled with `site` and `version`
    pub fn base_context(&self, config: &SiteConfig) -> Context {
        let mut context = Context::new();
        context.insert("site", &SiteData::new(config));
        context.insert("version", env!("CARGO_PKG_VERSION"));
        context
    }
}
