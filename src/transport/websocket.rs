//! WebSocket transport
//!
//! Accepts TCP connections and upgrades them on a single route. The upgrade
//! is where a connection gets its identity:
//! - the path must match the configured route (404 otherwise)
//! - the bearer token must verify (401)
//! - the optional `resource` query parameter names the device; a random one
//!   is assigned when it is absent (400 if the result is malformed)
//!
//! A successful upgrade registers a `Connection` with the hub and hands the
//! stream to the pump.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async_with_config;
use tracing::{debug, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::protocol::WebSocketConfig;

use crate::client::{CompleteIdentity, Connection, random_resource};
use crate::config::Settings;
use crate::hub::Hub;
use crate::transport::auth::{AuthError, Authenticator};
use crate::transport::pump;

pub const RESOURCE_QUERY_KEY: &str = "resource";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no route for {0}")]
    NotFound(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("malformed identity {user:?}@{resource:?}")]
    MalformedIdentity { user: String, resource: String },
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),
}

impl TransportError {
    /// HTTP status used when the error rejects an upgrade request.
    pub fn status(&self) -> StatusCode {
        match self {
            TransportError::NotFound(_) => StatusCode::NOT_FOUND,
            TransportError::Auth(e) => e.status(),
            TransportError::MalformedIdentity { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_response(self) -> ErrorResponse {
        let mut response = ErrorResponse::new(Some(self.to_string()));
        *response.status_mut() = self.status();
        response
    }
}

pub async fn start_websocket_server(
    addr: &str,
    hub: Arc<Hub>,
    settings: Settings,
    authenticator: Arc<dyn Authenticator>,
) -> Result<(), TransportError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    info!(
        "WebSocket server listening on ws://{addr}{}",
        settings.server.ws_path
    );
    serve(listener, hub, settings, authenticator).await;
    Ok(())
}

/// Accepts connections from an already bound listener until the task is
/// dropped.
pub async fn serve(
    listener: TcpListener,
    hub: Arc<Hub>,
    settings: Settings,
    authenticator: Arc<dyn Authenticator>,
) {
    let settings = Arc::new(settings);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("failed to accept connection: {e}");
                continue;
            }
        };

        tokio::spawn(handle_connection(
            stream,
            peer,
            hub.clone(),
            settings.clone(),
            authenticator.clone(),
        ));
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<Hub>,
    settings: Arc<Settings>,
    authenticator: Arc<dyn Authenticator>,
) {
    let mut identity = None;
    let callback = |request: &Request, response: Response| {
        match authorize(request, &settings.server.ws_path, authenticator.as_ref()) {
            Ok(authorized) => {
                identity = Some(authorized);
                Ok(response)
            }
            Err(e) => {
                info!(%peer, path = request.uri().path(), "upgrade rejected: {e}");
                Err(e.into_response())
            }
        }
    };

    let config = WebSocketConfig::default()
        .max_message_size(Some(settings.hub.max_frame_bytes))
        .max_frame_size(Some(settings.hub.max_frame_bytes));

    let ws_stream = match accept_hdr_async_with_config(stream, callback, Some(config)).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!(%peer, "WebSocket handshake error: {e}");
            return;
        }
    };
    let Some(identity) = identity else {
        return;
    };

    let (connection, queue) = Connection::channel(identity, settings.hub.outbound_capacity);
    debug!(%peer, identity = %connection.identity(), "upgrade accepted");
    hub.register(connection.clone());

    pump::run(ws_stream, connection, queue, hub, settings.hub.clone()).await;
}

/// Checks the route and credentials of an upgrade request and builds the
/// identity of the connection it will become.
pub fn authorize(
    request: &Request,
    ws_path: &str,
    authenticator: &dyn Authenticator,
) -> Result<CompleteIdentity, TransportError> {
    let path = request.uri().path();
    if path != ws_path {
        return Err(TransportError::NotFound(path.to_string()));
    }

    let user = authenticator.authenticate(request)?;
    let resource = requested_resource(request).unwrap_or_else(random_resource);

    CompleteIdentity::new(user.as_str(), resource.as_str())
        .ok_or(TransportError::MalformedIdentity { user, resource })
}

fn requested_resource(request: &Request) -> Option<String> {
    let query = request.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == RESOURCE_QUERY_KEY)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
