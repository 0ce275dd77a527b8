//! Initialize a new blog

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::CONFIG_FILE;

const CONFIG_TEMPLATE: &str = r#"# Site
title: My Blog
description: ''
author: ''
language: en
timezone: UTC

# URL
url: http://localhost:4000
root: /

# Directories
posts_dir: posts
public_dir: public
static_dir: static

# Writing
date_format: MMMM D, YYYY
tab_width: 4
drafts: false

# Listing
per_page: 10

highlight:
  theme: base16-ocean.dark
  stylesheet: true

feed:
  enable: true
  path: rss.xml
  limit: 20

sitemap:
  enable: true
  path: sitemap.xml
"#;

const SAMPLE_POST: &str = r#"Welcome! This post lives in `posts/hello-world/index.md`. Images and other
files next to it are published with the post, so `./images/cover.png` just works.

## Quick Start

### Create a new post

```bash
$ postforge new "My New Post"
```

New posts start unpublished. Set `published: true` when they are ready.

### Run server

```bash
$ postforge serve
```

### Build static files

```bash
$ postforge build
```
"#;

/// Scaffold a blog in `target_dir`. Refuses to touch an existing site.
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("{:?} already contains a blog", target_dir);
    }

    fs::create_dir_all(target_dir.join("posts/hello-world"))
        .with_context(|| format!("Failed to create {:?}", target_dir))?;
    fs::create_dir_all(target_dir.join("static"))?;

    fs::write(&config_path, CONFIG_TEMPLATE)?;

    let date = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
    let sample_post = format!(
        "---\ntitle: Hello World\nslug: hello-world\ndescription: Your first post\ndate: {}\ntags: welcome\npublished: true\n---\n\n{}",
        date, SAMPLE_POST
    );
    fs::write(target_dir.join("posts/hello-world/index.md"), sample_post)?;

    tracing::debug!("Scaffolded {:?}", target_dir);
    Ok(())
}
