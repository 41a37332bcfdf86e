// File: scorebot-core/src/auth/callback_server.rs

use std::{net::SocketAddr, sync::Arc};
use tokio::sync::{oneshot, Mutex};
use axum::{
    Router,
    routing::get,
    extract::{Query, State},
    response::Html,
    http::StatusCode,
};
use axum_server::{Server, Handle};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use serde::Deserialize;
use tracing::{info, error, warn};

use crate::Error;

/// What the identity provider handed back on the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackResult {
    pub code: String,
    pub state: Option<String>,
}

/// `?code=xxx&state=...` or `?error=...&error_description=...`
#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Clone)]
struct CallbackServerState {
    done_tx: Arc<Mutex<Option<oneshot::Sender<CallbackResult>>>>,
    expected_state: Option<String>,
}

/// Starts a local `GET /callback` listener on 127.0.0.1:`port`.
///
/// Returns the receiver that yields the first accepted code, the shutdown
/// sender, and the bound address. When `expected_state` is set, redirects
/// carrying any other state are answered with an error page and ignored.
pub async fn start_callback_server(
    port: u16,
    expected_state: Option<String>,
) -> Result<(oneshot::Receiver<CallbackResult>, oneshot::Sender<()>, SocketAddr), Error> {
    let (done_tx, done_rx) = oneshot::channel::<CallbackResult>();
    let state = CallbackServerState {
        done_tx: Arc::new(Mutex::new(Some(done_tx))),
        expected_state,
    };

    let app = Router::new()
        .route("/callback", get(handle_callback))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    // Bind up front so a busy port is reported to the caller.
    let listener = std::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port)))
        .map_err(|e| Error::Auth(format!("Port {} not available: {}", port, e)))?;
    listener.set_nonblocking(true)?;
    let addr = listener.local_addr()?;
    info!("[Auth] OAuth callback server listening on http://{}", addr);

    let (shutdown_send, shutdown_recv) = oneshot::channel::<()>();
    let handle = Handle::new();
    let handle_clone = handle.clone();

    tokio::spawn(async move {
        let _ = shutdown_recv.await;
        handle_clone.graceful_shutdown(None);
    });

    let server = Server::from_tcp(listener)
        .handle(handle)
        .serve(app.into_make_service());

    tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("[Auth] callback server error: {}", e);
        }
        info!("[Auth] callback server shut down.");
    });

    Ok((done_rx, shutdown_send, addr))
}

async fn handle_callback(
    State(state): State<CallbackServerState>,
    Query(query): Query<AuthQuery>,
) -> (StatusCode, Html<String>) {
    if let Some(err) = query.error.as_ref() {
        let desc = query.error_description.as_deref().unwrap_or_default();
        warn!("[Auth] authorization denied: {} {}", err, desc);
        let msg = format!(
            "<h2>OAuth Error</h2><p>Authorization failed ({}). Check the logs and try again.</p>",
            error_code_label(err)
        );
        return (StatusCode::OK, Html(msg));
    }

    if let Some(expected) = state.expected_state.as_deref() {
        if query.state.as_deref() != Some(expected) {
            warn!("[Auth] callback state mismatch, ignoring redirect");
            let msg = "<h2>State mismatch</h2><p>Start the authorization again.</p>";
            return (StatusCode::BAD_REQUEST, Html(msg.to_string()));
        }
    }

    if let Some(code) = query.code.clone() {
        if let Some(tx) = state.done_tx.lock().await.take() {
            let _ = tx.send(CallbackResult {
                code,
                state: query.state.clone(),
            });
        }

        let success = r#"
<h2>Authentication Successful</h2>
<p>The bot token has been stored. You can close this window now.</p>
<script>
  window.onload = function() {
      window.open('about:blank', '_self');
      window.close();
  };
</script>
"#;
        return (StatusCode::OK, Html(success.to_string()));
    }

    let msg = "<h2>Missing 'code' query param</h2><p>Check logs or try again.</p>";
    (StatusCode::OK, Html(msg.to_string()))
}

// Only plain OAuth error codes (`access_denied`, ...) are echoed back.
fn error_code_label(err: &str) -> &str {
    let plain = !err.is_empty() && err.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain { err } else { "unrecognized error" }
}
