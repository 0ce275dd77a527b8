//! Clean the public directory

use anyhow::{Context, Result};
use std::fs;

use crate::Blog;

/// Delete the generated site
pub fn run(blog: &Blog) -> Result<()> {
    if blog.public_dir.exists() {
        fs::remove_dir_all(&blog.public_dir)
            .with_context(|| format!("Failed to delete {:?}", blog.public_dir))?;
        tracing::info!("Deleted: {:?}", blog.public_dir);
    } else {
        tracing::debug!("Nothing to clean at {:?}", blog.public_dir);
    }

    Ok(())
}
