// src/channel.rs - Websocket event channel to the game server
use chrono::{DateTime, Local};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::app::AppEvent;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::shoot::ShootEvent;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("event channel is closed")]
    Closed,
}

/// Connection lifecycle, reported for diagnostics only.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelStatus {
    Connecting,
    Connected { at: DateTime<Local> },
    Disconnected { reason: String },
    Failed { message: String },
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelStatus::Connecting => write!(f, "Connecting..."),
            ChannelStatus::Connected { at } => write!(f, "Connected since {}", at.format("%H:%M:%S")),
            ChannelStatus::Disconnected { reason } => write!(f, "Disconnected ({reason})"),
            ChannelStatus::Failed { message } => write!(f, "Connection error: {message}"),
        }
    }
}

/// Where fired shots go. Fire-and-forget: failures are reported, never retried.
pub trait ShootSink {
    fn emit(&mut self, event: ShootEvent) -> Result<(), ChannelError>;
}

impl ShootSink for Vec<ShootEvent> {
    fn emit(&mut self, event: ShootEvent) -> Result<(), ChannelError> {
        self.push(event);
        Ok(())
    }
}

/// Sending half kept by the application loop.
#[derive(Debug, Clone)]
pub struct EventChannelHandle {
    outbound: UnboundedSender<ClientMessage>,
}

impl ShootSink for EventChannelHandle {
    fn emit(&mut self, event: ShootEvent) -> Result<(), ChannelError> {
        self.outbound
            .send(ClientMessage::Shoot(event))
            .map_err(|_| ChannelError::Closed)
    }
}

/// Spawns the connection task on `runtime`.
pub fn spawn(
    runtime: &Handle,
    url: String,
    events: UnboundedSender<AppEvent>,
) -> EventChannelHandle {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let span = info_span!("event_channel", %url);
    runtime.spawn(run_channel(url, outbound_rx, events).instrument(span));
    EventChannelHandle {
        outbound: outbound_tx,
    }
}

async fn run_channel(
    url: String,
    mut outbound: UnboundedReceiver<ClientMessage>,
    events: UnboundedSender<AppEvent>,
) {
    let _ = events.send(AppEvent::Channel(ChannelStatus::Connecting));

    let socket = match connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(e) => {
            error!(error = %e, "failed to connect to game server");
            let _ = events.send(AppEvent::Channel(ChannelStatus::Failed {
                message: e.to_string(),
            }));
            return;
        }
    };
    info!("connected to game server");
    let _ = events.send(AppEvent::Channel(ChannelStatus::Connected { at: Local::now() }));

    let (mut sink, mut stream) = socket.split();
    let reason = loop {
        tokio::select! {
            msg = outbound.recv() => {
                let Some(msg) = msg else {
                    break "client shut down".to_string();
                };
                let text = match msg.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "failed to encode outbound message");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::text(text)).await {
                    warn!(error = %e, "failed to send shoot event");
                    break e.to_string();
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => forward_server_message(text.as_str(), &events),
                Some(Ok(Message::Close(frame))) => {
                    break frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "closed by server".to_string());
                }
                Some(Ok(other)) => debug!(kind = ?other, "ignoring non-text frame"),
                Some(Err(e)) => {
                    warn!(error = %e, "event channel read failed");
                    let _ = events.send(AppEvent::Channel(ChannelStatus::Failed {
                        message: e.to_string(),
                    }));
                    break e.to_string();
                }
                None => break "stream ended".to_string(),
            }
        }
    };

    info!(%reason, "disconnected from game server");
    let _ = events.send(AppEvent::Channel(ChannelStatus::Disconnected { reason }));
}

fn forward_server_message(text: &str, events: &UnboundedSender<AppEvent>) {
    match ServerMessage::decode(text) {
        Ok(ServerMessage::GameUpdate(state)) => {
            debug!(ducks = state.ducks.len(), score = state.score, "game update");
            let _ = events.send(AppEvent::StateUpdate(state));
        }
        Ok(ServerMessage::TestEvent(greeting)) => {
            info!(greeting = %greeting.data, "server greeting");
        }
        Err(e) => warn!(error = %e, "dropping server message"),
    }
}
