//! Duplex command channel to the course service.
//!
//! Outbound commands and inbound pushes are JSON objects discriminated by
//! a `cmd` field. The websocket client splits into a writer task (commands
//! out, send failures logged and dropped), a reader task (pushes in,
//! malformed frames logged and skipped) and a 30-second ping task.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::Course;

/// Interval between keep-alive pings.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Outbound command messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Command {
    Join {
        #[serde(rename = "sessionID")]
        session_id: String,
        #[serde(rename = "courseID")]
        course_id: String,
    },
    Leave {
        #[serde(rename = "sessionID")]
        session_id: String,
        #[serde(rename = "courseID")]
        course_id: String,
    },
    Position {
        #[serde(rename = "sessionID")]
        session_id: String,
        name: String,
        velocity: f64,
        heading: f64,
        latitude: f64,
        longitude: f64,
    },
    Ping {
        #[serde(rename = "sessionID")]
        session_id: String,
    },
}

/// Inbound push messages. Unknown commands decode to [`PushMessage::Unknown`]
/// and are ignored without error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum PushMessage {
    Position {
        #[serde(rename = "positionID")]
        position_id: String,
        name: String,
        velocity: f64,
        heading: f64,
        latitude: f64,
        longitude: f64,
    },
    Course {
        course: Course,
    },
    #[serde(other)]
    Unknown,
}

/// Errors establishing the duplex channel.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Sends outbound commands, fire-and-forget.
///
/// Implementations log and drop on failure; background sends are never
/// retried.
pub trait CommandSender: Send + Sync + 'static {
    fn send(&self, command: Command);
}

impl<T: CommandSender> CommandSender for Arc<T> {
    fn send(&self, command: Command) {
        (**self).send(command);
    }
}

/// Handle to a connected websocket. Commands are queued to the writer
/// task; dropping the handle closes the channel and winds down the tasks.
pub struct SocketClient {
    tx: mpsc::UnboundedSender<Command>,
}

impl CommandSender for SocketClient {
    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            warn!("dropping command, socket writer has shut down");
        }
    }
}

/// Connects to the course service websocket and spawns the reader, writer
/// and ping tasks. Inbound pushes arrive on the returned receiver.
pub async fn connect(
    url: &str,
    session_id: &str,
    shutdown: CancellationToken,
) -> Result<(SocketClient, mpsc::UnboundedReceiver<PushMessage>), SocketError> {
    let (stream, _) = tokio_tungstenite::connect_async(url).await?;
    let (mut write, mut read) = stream.split();

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (push_tx, push_rx) = mpsc::unbounded_channel::<PushMessage>();

    // Writer: serialize and send queued commands.
    let writer_shutdown = shutdown.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = writer_shutdown.cancelled() => break,

                command = cmd_rx.recv() => {
                    let Some(command) = command else { break };
                    let json = match serde_json::to_string(&command) {
                        Ok(json) => json,
                        Err(error) => {
                            warn!(%error, "failed to encode command");
                            continue;
                        }
                    };
                    if let Err(error) = write.send(Message::Text(json)).await {
                        warn!(%error, "failed to send command");
                    }
                }
            }
        }
        info!("socket writer stopped");
    });

    // Reader: decode pushes and forward to the consumer.
    let reader_shutdown = shutdown.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = reader_shutdown.cancelled() => break,

                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<PushMessage>(&text) {
                                Ok(push) => {
                                    if push_tx.send(push).is_err() {
                                        break;
                                    }
                                }
                                Err(error) => {
                                    debug!(%error, "skipping malformed push frame");
                                }
                            }
                        }
                        Some(Ok(_)) => {} // non-text frames ignored
                        Some(Err(error)) => {
                            warn!(%error, "socket read failed");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
        info!("socket reader stopped");
    });

    // Keep-alive ping.
    let ping_tx = cmd_tx.clone();
    let ping_session = session_id.to_string();
    let ping_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PING_INTERVAL);
        interval.tick().await; // skip the immediate first tick
        loop {
            tokio::select! {
                biased;

                _ = ping_shutdown.cancelled() => break,

                _ = interval.tick() => {
                    let ping = Command::Ping { session_id: ping_session.clone() };
                    if ping_tx.send(ping).is_err() {
                        break;
                    }
                }
            }
        }
    });

    Ok((SocketClient { tx: cmd_tx }, push_rx))
}
