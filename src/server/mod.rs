//! Development server with live reload

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

use crate::commands::build;
use crate::Blog;

const LIVE_RELOAD_PATH: &str = "/__livereload";

/// Injected before `</body>` of every served page when live reload is on
const LIVE_RELOAD_SCRIPT: &str = r#"<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') location.reload();
    };
    ws.onclose = function() {
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
"#;

/// How the server binds and behaves
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub ip: String,
    pub port: u16,
    /// Watch sources, rebuild and reload connected pages
    pub live_reload: bool,
    /// Open the site in a browser once listening
    pub open: bool,
}

struct ServerState {
    public_dir: PathBuf,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

/// Serve the public directory until interrupted. The site must already be built.
pub async fn start(blog: &Blog, options: &ServerOptions) -> Result<()> {
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = Arc::new(ServerState {
        public_dir: blog.public_dir.clone(),
        reload_tx: reload_tx.clone(),
        live_reload: options.live_reload,
    });

    let app = Router::new()
        .route(LIVE_RELOAD_PATH, get(livereload_handler))
        .fallback(fallback_handler)
        .with_state(state);

    let bind_ip = if options.ip == "localhost" {
        "127.0.0.1"
    } else {
        options.ip.as_str()
    };
    let addr: SocketAddr = format!("{}:{}", bind_ip, options.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let url = format!("http://{}:{}{}", options.ip, options.port, blog.config.root);
    tracing::info!("Server running at {}", url);

    if options.live_reload {
        let blog = blog.clone();
        tokio::task::spawn_blocking(move || {
            let notify = |_: &Blog| {
                let _ = reload_tx.send(());
            };
            if let Err(e) = build::watch(&blog, notify) {
                tracing::error!("File watcher error: {:#}", e);
            }
        });
        tracing::info!("Live reload enabled");
    }

    if options.open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    axum::serve(listener, app).await?;
    Ok(())
}

async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(()) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Serve pages with the reload script injected; everything else goes to `ServeDir`
async fn fallback_handler(State(state): State<Arc<ServerState>>, request: Request<Body>) -> Response {
    if state.live_reload {
        if let Some(page) = resolve_page(&state.public_dir, request.uri().path()) {
            return match tokio::fs::read_to_string(&page).await {
                Ok(content) => Html(inject_live_reload(&content)).into_response(),
                Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
            };
        }
    }

    let mut service = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

/// The HTML file a request path maps to, if it is a page inside `public_dir`
fn resolve_page(public_dir: &Path, uri_path: &str) -> Option<PathBuf> {
    let decoded = percent_encoding::percent_decode_str(uri_path).decode_utf8().ok()?;
    let relative = Path::new(decoded.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let candidate = public_dir.join(relative);
    let page = if candidate.is_dir() {
        candidate.join("index.html")
    } else {
        candidate
    };

    let is_html = page
        .extension()
        .is_some_and(|ext| ext == "html" || ext == "htm");
    (is_html && page.is_file()).then_some(page)
}

fn inject_live_reload(html: &str) -> String {
    match html.rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], LIVE_RELOAD_SCRIPT, &html[pos..]),
        None => format!("{}{}", html, LIVE_RELOAD_SCRIPT),
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_inject_live_reload() {
        let html = inject_live_reload("<html><body><p>x</p></body></html>");
        assert!(html.contains("/__livereload"));
        assert!(html.ends_with("</script>\n</body></html>"));

        let bare = inject_live_reload("<p>x</p>");
        assert!(bare.starts_with("<p>x</p><script>"));
    }

    #[test]
    fn test_resolve_page() {
        let dir = TempDir::new().unwrap();
        let public = dir.path();
        fs::create_dir_all(public.join("posts/hello")).unwrap();
        fs::write(public.join("index.html"), "home").unwrap();
        fs::write(public.join("posts/hello/index.html"), "post").unwrap();
        fs::write(public.join("rss.xml"), "feed").unwrap();

        assert_eq!(resolve_page(public, "/"), Some(public.join("index.html")));
        assert_eq!(
            resolve_page(public, "/posts/hello/"),
            Some(public.join("posts/hello/index.html"))
        );
        assert_eq!(resolve_page(public, "/rss.xml"), None);
        assert_eq!(resolve_page(public, "/missing/"), None);
        assert_eq!(resolve_page(public, "/../etc/passwd"), None);
        assert_eq!(resolve_page(public, "/%2e%2e/index.html"), None);
    }
}
