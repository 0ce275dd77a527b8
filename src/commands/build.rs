//! Build the static site, once or on every change

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use crate::generator::Generator;
use crate::{Blog, CONFIG_FILE};

/// Quiet period before a burst of file events triggers a rebuild
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Load every post and write the site
pub fn run(blog: &Blog) -> Result<()> {
    let start = Instant::now();

    let posts = blog.load_posts()?;
    tracing::info!("Loaded {} posts", posts.len());

    Generator::new(blog)?.generate(&posts)?;

    tracing::info!("Generated in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

/// Paths a rebuild depends on
pub fn watch_targets(blog: &Blog) -> Vec<(PathBuf, RecursiveMode)> {
    let mut targets = vec![
        (blog.posts_dir.clone(), RecursiveMode::Recursive),
        (blog.static_dir.clone(), RecursiveMode::Recursive),
        (blog.base_dir.join(CONFIG_FILE), RecursiveMode::NonRecursive),
    ];
    targets.retain(|(path, _)| path.exists());
    targets
}

/// Editor droppings and VCS files never trigger a rebuild
pub fn is_relevant(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    !path_str.contains(".git")
        && name != ".DS_Store"
        && !name.ends_with('~')
        && !name.ends_with(".swp")
        && !name.starts_with(".#")
}

/// Watch the site sources and rebuild on change until the watcher stops.
///
/// The configuration is re-read before every rebuild. A failed rebuild is
/// logged and the previous output stays in place. `on_rebuild` runs after
/// each successful rebuild.
pub fn watch<F>(blog: &Blog, mut on_rebuild: F) -> Result<()>
where
    F: FnMut(&Blog),
{
    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(DEBOUNCE, tx)?;

    for (path, mode) in watch_targets(blog) {
        debouncer.watcher().watch(&path, mode)?;
        tracing::debug!("Watching: {:?}", path);
    }

    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    let mut blog = blog.clone();
    for result in rx {
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Watch error: {:?}", e);
                continue;
            }
        };

        let changed: Vec<_> = events.iter().filter(|e| is_relevant(&e.path)).collect();
        if changed.is_empty() {
            continue;
        }
        for event in &changed {
            tracing::info!("File changed: {}", event.path.display());
        }

        match rebuild(&blog) {
            Ok(fresh) => {
                blog = fresh;
                on_rebuild(&blog);
            }
            Err(e) => tracing::error!("Build failed: {:#}", e),
        }
    }

    Ok(())
}

/// Reload the configuration and build again
fn rebuild(blog: &Blog) -> Result<Blog> {
    let fresh = Blog::new(&blog.base_dir)?;
    run(&fresh)?;
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_relevant() {
        assert!(is_relevant(Path::new("/site/posts/a/index.md")));
        assert!(is_relevant(Path::new("/site/static/logo.png")));
        assert!(!is_relevant(Path::new("/site/.git/index")));
        assert!(!is_relevant(Path::new("/site/posts/.DS_Store")));
        assert!(!is_relevant(Path::new("/site/posts/a/index.md~")));
        assert!(!is_relevant(Path::new("/site/posts/a/.index.md.swp")));
    }

    #[test]
    fn test_watch_targets_skip_missing_paths() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("posts")).unwrap();
        let blog = Blog::new(dir.path()).unwrap();

        let targets: Vec<_> = watch_targets(&blog).into_iter().map(|(p, _)| p).collect();
        assert_eq!(targets, vec![dir.path().join("posts")]);
    }

    #[test]
    fn test_run_builds_site() {
        let dir = TempDir::new().unwrap();
        let post = dir.path().join("posts/hello/index.md");
        fs::create_dir_all(post.parent().unwrap()).unwrap();
        fs::write(
            &post,
            "---\ntitle: Hello\ndate: 2024-01-01\npublished: true\n---\nHi\n",
        )
        .unwrap();

        let blog = Blog::new(dir.path()).unwrap();
        run(&blog).unwrap();
        assert!(blog.public_dir.join("posts/hello/index.html").exists());
        assert!(blog.public_dir.join("index.html").exists());
    }

    #[test]
    fn test_rebuild_rereads_config() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "public_dir: out\n").unwrap();

        let fresh = rebuild(&blog).unwrap();
        assert_eq!(fresh.public_dir, dir.path().join("out"));
        assert!(fresh.public_dir.join("index.html").exists());
    }

    #[test]
    fn test_failed_rebuild_is_an_error() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "timezone: Mars/Olympus\n").unwrap();
        assert!(rebuild(&blog).is_err());
    }
}
