//! Per-connection pump
//!
//! Two loops share one connection. The read loop feeds inbound frames to the
//! dispatcher and watches the liveness deadline; the write loop drains the
//! outbound queue and sends heartbeats. Whichever exits first tears the
//! connection down, and the shutdown signal stops the other one.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::Receiver;
use tokio::time::{Instant, interval_at, sleep, timeout};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};
use tungstenite::error::ProtocolError;
use tungstenite::protocol::Message as WsMessage;

use crate::client::Connection;
use crate::config::HubSettings;
use crate::hub::Hub;
use crate::payload::dispatch;
use crate::transport::websocket::TransportError;

type WsSink<S> = SplitSink<WebSocketStream<S>, WsMessage>;
type WsSource<S> = SplitStream<WebSocketStream<S>>;

/// Runs both loops until the connection ends. The connection must already be
/// registered with `hub`.
pub async fn run<S>(
    stream: WebSocketStream<S>,
    connection: Arc<Connection>,
    queue: Receiver<WsMessage>,
    hub: Arc<Hub>,
    settings: HubSettings,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sink, source) = stream.split();

    let writer = tokio::spawn(write_loop(
        sink,
        queue,
        connection.clone(),
        hub.clone(),
        settings.clone(),
    ));

    read_loop(source, &connection, &hub, &settings).await;
    hub.teardown(&connection);

    if let Err(e) = writer.await {
        warn!(identity = %connection.identity(), "write loop failed: {e}");
    }
}

async fn read_loop<S>(
    mut source: WsSource<S>,
    connection: &Arc<Connection>,
    hub: &Hub,
    settings: &HubSettings,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut shutdown = connection.shutdown_signal();
    if *shutdown.borrow_and_update() {
        return;
    }

    let deadline = sleep(settings.pong_wait());
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            () = &mut deadline => {
                info!(identity = %connection.identity(), "read deadline exceeded");
                break;
            }
            frame = source.next() => {
                match frame {
                    Some(Ok(WsMessage::Pong(_))) => {
                        deadline.as_mut().reset(Instant::now() + settings.pong_wait());
                    }
                    Some(Ok(frame @ (WsMessage::Text(_) | WsMessage::Binary(_)))) => {
                        match dispatch(hub, connection, &frame) {
                            Ok(kind) => debug!(identity = %connection.identity(), %kind, "dispatched"),
                            Err(e) => warn!(identity = %connection.identity(), "dropped frame: {e}"),
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    // pings are answered by the websocket layer
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        if !is_expected_close(&e) {
                            warn!(identity = %connection.identity(), "read error: {e}");
                        }
                        break;
                    }
                }
            }
        }
    }
}

async fn write_loop<S>(
    mut sink: WsSink<S>,
    mut queue: Receiver<WsMessage>,
    connection: Arc<Connection>,
    hub: Arc<Hub>,
    settings: HubSettings,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut shutdown = connection.shutdown_signal();
    let write_wait = settings.write_wait();
    let ping_interval = settings.ping_interval();
    let mut heartbeat = interval_at(Instant::now() + ping_interval, ping_interval);

    loop {
        if *shutdown.borrow_and_update() {
            close(&mut sink, write_wait).await;
            break;
        }

        tokio::select! {
            _ = shutdown.changed() => {
                close(&mut sink, write_wait).await;
                break;
            }
            frame = queue.recv() => {
                let Some(frame) = frame else {
                    close(&mut sink, write_wait).await;
                    break;
                };
                if let Err(e) = send(&mut sink, frame, write_wait).await {
                    debug!(identity = %connection.identity(), "write failed: {e}");
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if let Err(e) = send(&mut sink, WsMessage::Ping(Default::default()), write_wait).await {
                    debug!(identity = %connection.identity(), "ping failed: {e}");
                    break;
                }
            }
        }
    }

    hub.teardown(&connection);
    debug!(identity = %connection.identity(), "write loop closed");
}

async fn send<S>(sink: &mut WsSink<S>, frame: WsMessage, wait: Duration) -> Result<(), TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match timeout(wait, sink.send(frame)).await {
        Ok(result) => result.map_err(TransportError::from),
        Err(_) => Err(TransportError::WriteTimeout(wait)),
    }
}

async fn close<S>(sink: &mut WsSink<S>, wait: Duration)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Err(e) = send(sink, WsMessage::Close(None), wait).await {
        debug!("close frame not sent: {e}");
    }
    let _ = timeout(wait, sink.close()).await;
}

/// Going-away style endings that are not worth a warning.
pub fn is_expected_close(error: &tungstenite::Error) -> bool {
    matches!(
        error,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}
