//! Live event stream over WebSocket
//!
//! Every event a wallet emits through the API is fanned out to connected
//! clients. Clients may narrow the stream to one wallet with
//! `GET /ws?wallet=0x...`.

use crate::api::handlers::ApiState;
use crate::multisig::MultisigEvent;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};

/// Events buffered per subscriber before it starts lagging
const STREAM_BUFFER: usize = 256;

/// Messages pushed to stream clients
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WsEvent {
    /// A new wallet was deployed
    WalletDeployed {
        address: String,
        owners: Vec<String>,
        quorum: usize,
    },
    /// A wallet emitted an event
    Multisig {
        wallet: String,
        event: MultisigEvent,
    },
    /// Sent once when the socket opens
    Connected { wallet: Option<String> },
    /// The client fell behind and `skipped` events were dropped
    Lagged { skipped: u64 },
}

impl WsEvent {
    /// Wallet the message concerns, if any
    pub fn wallet(&self) -> Option<&str> {
        match self {
            WsEvent::WalletDeployed { address, .. } => Some(address),
            WsEvent::Multisig { wallet, .. } => Some(wallet),
            WsEvent::Connected { .. } | WsEvent::Lagged { .. } => None,
        }
    }
}

/// Fan-out channel shared by all API handlers
#[derive(Debug)]
pub struct WsBroadcaster {
    sender: broadcast::Sender<WsEvent>,
}

impl WsBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(STREAM_BUFFER);
        Self { sender }
    }

    /// Publish to every subscriber. Publishing with nobody listening is fine.
    pub fn broadcast(&self, event: WsEvent) {
        if let Ok(receivers) = self.sender.send(event) {
            log::debug!("Event delivered to {} stream clients", receivers);
        }
    }

    /// Publish an event emitted by `wallet`
    pub fn broadcast_multisig(&self, wallet: &str, event: MultisigEvent) {
        self.broadcast(WsEvent::Multisig {
            wallet: wallet.to_string(),
            event,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WsEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Query parameters accepted by `/ws`
#[derive(Debug, Default, Deserialize)]
pub struct StreamFilter {
    pub wallet: Option<String>,
}

impl StreamFilter {
    /// Whether a client with this filter should see `event`
    pub fn matches(&self, event: &WsEvent) -> bool {
        match (&self.wallet, event.wallet()) {
            (Some(wanted), Some(wallet)) => wanted.eq_ignore_ascii_case(wallet),
            _ => true,
        }
    }
}

/// `GET /ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(filter): Query<StreamFilter>,
    State(state): State<ApiState>,
) -> impl IntoResponse {
    let events = state.ws_broadcaster.subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, events, filter))
}

async fn send_event(
    sink: &mut SplitSink<WebSocket, Message>,
    event: &WsEvent,
) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            log::warn!("Dropping unserializable stream event: {}", e);
            Ok(())
        }
    }
}

async fn stream_events(
    socket: WebSocket,
    mut events: broadcast::Receiver<WsEvent>,
    filter: StreamFilter,
) {
    let (mut sink, mut incoming) = socket.split();
    log::info!("Stream client connected (wallet filter: {:?})", filter.wallet);

    let hello = WsEvent::Connected {
        wallet: filter.wallet.clone(),
    };
    if send_event(&mut sink, &hello).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            message = incoming.next() => match message {
                None | Some(Ok(Message::Close(_))) => break,
                Some(Ok(Message::Text(text))) => {
                    log::debug!("Ignoring client message: {}", text.as_str());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log::warn!("Stream client error: {}", e);
                    break;
                }
            },
            received = events.recv() => {
                let event = match received {
                    Ok(event) if filter.matches(&event) => event,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Stream client lagged, {} events dropped", skipped);
                        WsEvent::Lagged { skipped }
                    }
                    Err(RecvError::Closed) => break,
                };
                if send_event(&mut sink, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    log::info!("Stream client disconnected");
}
