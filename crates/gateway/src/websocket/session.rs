//! One socket: a reader loop feeding the hub and a writer task draining the
//! connection's outbound queue.
//!
//! The writer pings on `heartbeat_interval`; the reader closes the socket
//! once nothing at all has arrived for `idle_timeout`. Sockets opened
//! without a token get `join_timeout` to authenticate.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use storefront_chats::{ChatError, ChatHub, ClientEvent, Connection, ConnectionId, ServerEvent};
use tokio::sync::mpsc;
use tokio::time::{self, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::state::GatewayState;

type SocketSink = SplitSink<WebSocket, Message>;
type SocketStream = SplitStream<WebSocket>;

/// A connection registered with the hub plus the receiving end of its queue.
pub(crate) struct Authenticated {
    pub connection: Arc<Connection>,
    pub outbound: mpsc::Receiver<ServerEvent>,
}

pub(crate) async fn serve(
    socket: WebSocket,
    state: Arc<GatewayState>,
    authenticated: Option<Authenticated>,
) {
    let hub = state.hub().clone();
    let config = hub.config().clone();
    let send_timeout = config.send_timeout();
    let (mut sink, mut stream) = socket.split();

    let authenticated = match authenticated {
        Some(authenticated) => authenticated,
        None => {
            let joined = timeout(
                config.join_timeout(),
                await_join(&hub, &mut sink, &mut stream, send_timeout),
            )
            .await;
            match joined {
                Ok(Some(authenticated)) => authenticated,
                Ok(None) => {
                    let _ = timeout(send_timeout, sink.close()).await;
                    return;
                }
                Err(_) => {
                    info!(
                        timeout_ms = config.join_timeout_ms,
                        "socket sent no join in time"
                    );
                    let error = ChatError::authentication("join timed out");
                    send_event(&mut sink, &ServerEvent::error(&error), send_timeout).await;
                    let _ = timeout(send_timeout, sink.close()).await;
                    return;
                }
            }
        }
    };

    let Authenticated {
        connection,
        outbound,
    } = authenticated;
    let connection_id = connection.id();
    let idle_timeout = config.idle_timeout();

    let mut writer = tokio::spawn(write_events(
        sink,
        outbound,
        send_timeout,
        config.heartbeat_interval(),
        connection_id,
    ));
    let mut writer_finished = false;
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            _ = &mut writer => {
                writer_finished = true;
                break;
            }
            _ = connection.closed() => {
                info!(connection_id = %connection_id, "connection evicted, closing socket");
                break;
            }
            _ = time::sleep_until(last_seen + idle_timeout) => {
                info!(
                    connection_id = %connection_id,
                    idle_ms = idle_timeout.as_millis() as u64,
                    "closing idle socket"
                );
                break;
            }
            frame = stream.next() => {
                last_seen = Instant::now();
                match frame {
                    Some(Ok(Message::Text(text))) => match ClientEvent::parse(&text) {
                        Ok(event) => hub.handle_event(&connection, event).await,
                        Err(error) => reject(&connection, &error),
                    },
                    Some(Ok(Message::Binary(_))) => reject(
                        &connection,
                        &ChatError::validation("binary frames are not supported"),
                    ),
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(error)) => {
                        debug!(connection_id = %connection_id, %error, "socket read failed");
                        break;
                    }
                }
            }
        }
    }

    hub.disconnect(connection_id).await;

    // The writer ends once the last sender is gone and the queue is drained.
    drop(connection);
    if !writer_finished && timeout(send_timeout, &mut writer).await.is_err() {
        writer.abort();
    }
}

/// Wait for `join {token}` on a socket opened without a query token.
/// Anything else is answered with an error and the socket stays in the
/// connecting state. A rejected join ends the socket.
async fn await_join(
    hub: &ChatHub,
    sink: &mut SocketSink,
    stream: &mut SocketStream,
    send_timeout: Duration,
) -> Option<Authenticated> {
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => return None,
            Ok(Message::Binary(_)) => {
                let error = ChatError::validation("binary frames are not supported");
                if !send_event(sink, &ServerEvent::error(&error), send_timeout).await {
                    return None;
                }
                continue;
            }
            Ok(_) => continue,
            Err(error) => {
                debug!(%error, "socket closed before join");
                return None;
            }
        };

        let token = match ClientEvent::parse(&text) {
            Ok(ClientEvent::Join { token }) => token,
            Ok(other) => {
                let error =
                    ChatError::authentication(format!("send join before {}", other.kind()));
                if !send_event(sink, &ServerEvent::error(&error), send_timeout).await {
                    return None;
                }
                continue;
            }
            Err(error) => {
                if !send_event(sink, &ServerEvent::error(&error), send_timeout).await {
                    return None;
                }
                continue;
            }
        };

        let (outbound_tx, outbound) = hub.outbound_channel();
        return match hub.connect(&token, outbound_tx).await {
            Ok(connection) => Some(Authenticated {
                connection,
                outbound,
            }),
            Err(error) => {
                info!(%error, "join rejected");
                send_event(sink, &ServerEvent::error(&error), send_timeout).await;
                None
            }
        };
    }

    None
}

async fn write_events(
    mut sink: SocketSink,
    mut outbound: mpsc::Receiver<ServerEvent>,
    send_timeout: Duration,
    heartbeat_interval: Duration,
    connection_id: ConnectionId,
) {
    let mut heartbeat = time::interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let delivered = tokio::select! {
            event = outbound.recv() => match event {
                Some(event) => send_event(&mut sink, &event, send_timeout).await,
                None => break,
            },
            _ = heartbeat.tick() => send_frame(&mut sink, Message::Ping(Vec::new()), send_timeout).await,
        };
        if !delivered {
            debug!(connection_id = %connection_id, "writer stopped");
            return;
        }
    }

    let _ = timeout(send_timeout, sink.close()).await;
}

/// Write one event within `send_timeout`. `false` means the socket is no
/// longer usable.
async fn send_event(sink: &mut SocketSink, event: &ServerEvent, send_timeout: Duration) -> bool {
    let text = match event.to_json() {
        Ok(text) => text,
        Err(error) => {
            error!(event = event.kind(), %error, "failed to encode event");
            return true;
        }
    };
    send_frame(sink, Message::Text(text), send_timeout).await
}

async fn send_frame(sink: &mut SocketSink, frame: Message, send_timeout: Duration) -> bool {
    match timeout(send_timeout, sink.send(frame)).await {
        Ok(Ok(())) => true,
        Ok(Err(error)) => {
            debug!(%error, "socket write failed");
            false
        }
        Err(_) => {
            warn!(
                timeout_ms = send_timeout.as_millis() as u64,
                "socket write timed out"
            );
            false
        }
    }
}

fn reject(connection: &Connection, error: &ChatError) {
    if let Err(delivery) = connection.try_deliver(ServerEvent::error(error)) {
        warn!(connection_id = %connection.id(), error = %delivery, "could not queue error event");
    }
}
