//! CLI entry point for postforge

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postforge::commands;
use postforge::server::{self, ServerOptions};
use postforge::Blog;

#[derive(Parser)]
#[command(name = "postforge")]
#[command(version)]
#[command(about = "Build a static blog from a folder of markdown posts", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new blog
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Create a new unpublished post
    New {
        /// Title of the new post
        title: String,

        /// Slug for the post folder (defaults to the slugified title)
        #[arg(short, long)]
        slug: Option<String>,
    },

    /// Build the static site
    #[command(alias = "g")]
    Build {
        /// Rebuild whenever sources change
        #[arg(short, long)]
        watch: bool,
    },

    /// Build, then serve the site locally
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Serve files only: no watching, no live reload
        #[arg(long)]
        r#static: bool,
    },

    /// Delete the public folder
    Clean,

    /// List site information
    List {
        /// Type of content to list (post, draft, tag)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "postforge=debug,info"
    } else {
        "postforge=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing blog in {:?}", target_dir);
            commands::init::init_site(&target_dir)?;
            println!("Initialized blog in {:?}", target_dir);
        }

        Commands::New { title, slug } => {
            let blog = Blog::new(&base_dir)?;
            let path = commands::new::create_post(&blog, &title, slug.as_deref())?;
            println!("Created: {:?}", path);
        }

        Commands::Build { watch } => {
            let blog = Blog::new(&base_dir)?;
            tracing::info!("Building site...");
            blog.build()?;
            println!("Built successfully!");

            if watch {
                tokio::task::spawn_blocking(move || commands::build::watch(&blog, |_| {}))
                    .await??;
            }
        }

        Commands::Serve {
            port,
            ip,
            open,
            r#static,
        } => {
            let blog = Blog::new(&base_dir)?;
            tracing::info!("Building site...");
            blog.build()?;

            let options = ServerOptions {
                ip,
                port,
                live_reload: !r#static,
                open,
            };
            server::start(&blog, &options).await?;
        }

        Commands::Clean => {
            let blog = Blog::new(&base_dir)?;
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type } => {
            let blog = Blog::new(&base_dir)?;
            commands::list::run(&blog, &r#type)?;
        }

        Commands::Version => {
            println!("postforge version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
