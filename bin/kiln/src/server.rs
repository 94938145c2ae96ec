//! Embedded development server with live reload support

use std::{convert::Infallible, path::Path, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tower_http::services::ServeDir;

/// Path of the server-sent events endpoint.
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Server state containing the reload broadcaster.
#[derive(Clone)]
pub struct ServerState {
    /// Broadcast channel for reload events.
    pub reload_tx: broadcast::Sender<()>,
}

impl ServerState {
    /// Create a new server state.
    pub fn new() -> Self {
        let (reload_tx, _) = broadcast::channel(16);
        Self { reload_tx }
    }

    /// Tell every connected browser to reload. Returns the number of receivers.
    pub fn notify_reload(&self) -> usize {
        self.reload_tx.send(()).unwrap_or(0)
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the development server router.
pub fn create_router(root: &Path, state: Arc<ServerState>) -> Router {
    Router::new()
        .route(LIVERELOAD_PATH, get(livereload_handler))
        .fallback_service(ServeDir::new(root))
        .with_state(state)
}

/// Server-Sent Events handler for live reload.
async fn livereload_handler(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.reload_tx.subscribe();
    // Lagged receivers skip missed events; one reload covers them all.
    let stream = BroadcastStream::new(rx)
        .filter_map(|msg| msg.ok().map(|()| Ok::<_, Infallible>(Event::default().data("reload"))));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

/// Client snippet injected before `</body>` of served pages.
pub const LIVERELOAD_SCRIPT: &str = r#"<script>
(function() {
    var source = new EventSource('/__livereload');
    source.onmessage = function(event) {
        if (event.data === 'reload') {
            window.location.reload();
        }
    };
    source.onerror = function() {
        console.log('[kiln] live reload connection lost, retrying...');
    };
})();
</script>
"#;

/// Insert the live reload snippet into an HTML document.
///
/// Returns `None` when the document already has it or has no `</body>`.
#[must_use]
pub fn inject_livereload(html: &str) -> Option<String> {
    if html.contains(LIVERELOAD_PATH) {
        return None;
    }
    let at = html.rfind("</body>")?;

    let mut out = String::with_capacity(html.len() + LIVERELOAD_SCRIPT.len());
    out.push_str(&html[..at]);
    out.push_str(LIVERELOAD_SCRIPT);
    out.push_str(&html[at..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_before_body_end() {
        let html = "<html><body><p>hi</p></body></html>";
        let out = inject_livereload(html).unwrap();

        assert!(out.starts_with("<html><body><p>hi</p><script>"));
        assert!(out.ends_with("</script>\n</body></html>"));
    }

    #[test]
    fn test_inject_is_idempotent() {
        let once = inject_livereload("<body></body>").unwrap();
        assert!(inject_livereload(&once).is_none());
    }

    #[test]
    fn test_inject_skips_fragments() {
        assert!(inject_livereload("<nav></nav>").is_none());
    }

    #[test]
    fn test_notify_without_clients() {
        let state = ServerState::new();
        assert_eq!(state.notify_reload(), 0);

        let mut rx = state.reload_tx.subscribe();
        assert_eq!(state.notify_reload(), 1);
        assert!(rx.try_recv().is_ok());
    }
}
