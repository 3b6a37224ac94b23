//! Server network layer handling WebSocket connections and game loop coordination

use crate::client_manager::{
    ConnectionId, Outbound, RegistryError, SessionRegistry, OUTBOUND_CAPACITY,
};
use crate::game::MatchState;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{ClientMessage, ServerMessage, TICK_RATE};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

/// Errors that stop the server from starting or running
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum NetworkEvent {
    Connected {
        id: ConnectionId,
        addr: SocketAddr,
        outbound: Outbound,
    },
    Input {
        id: ConnectionId,
        direction: f64,
    },
    Disconnected {
        id: ConnectionId,
    },
}

/// Main server coordinating networking and game simulation.
///
/// The server loop is the only owner of the match state and the registry;
/// connection tasks talk to it exclusively through [`NetworkEvent`]s.
pub struct Server {
    listener: TcpListener,
    registry: SessionRegistry,
    state: MatchState,
    rng: StdRng,
    tick_duration: Duration,
    next_connection_id: ConnectionId,

    event_tx: mpsc::UnboundedSender<NetworkEvent>,
    event_rx: mpsc::UnboundedReceiver<NetworkEvent>,
}

impl Server {
    pub async fn bind(addr: &str) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!("Server listening on {}", listener.local_addr()?);

        let mut rng = StdRng::from_entropy();
        let state = MatchState::new(&mut rng);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            registry: SessionRegistry::new(),
            state,
            rng,
            tick_duration: Duration::from_secs(1) / TICK_RATE,
            next_connection_id: 1,
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    fn handle_accept(&mut self, stream: TcpStream, addr: SocketAddr) {
        let id = self.next_connection_id;
        self.next_connection_id += 1;
        debug!("Accepted TCP connection {} from {}", id, addr);

        let events = self.event_tx.clone();
        tokio::spawn(async move {
            match accept_async(stream).await {
                Ok(ws) => handle_connection(ws, id, addr, events).await,
                Err(e) => warn!("WebSocket handshake failed for {}: {}", addr, e),
            }
        });
    }

    fn handle_event(&mut self, event: NetworkEvent) {
        let now = Instant::now();
        match event {
            NetworkEvent::Connected { id, addr, outbound } => {
                match self.registry.assign(id, addr, outbound, &mut self.state, now) {
                    Ok(slot) => debug!("Connection {} playing slot {}", id, slot.index()),
                    Err(RegistryError::Full) => debug!("Connection {} turned away", id),
                }
            }
            NetworkEvent::Input { id, direction } => {
                if !self.registry.set_direction(id, direction, &mut self.state) {
                    debug!("Dropping input from unassigned connection {}", id);
                }
            }
            NetworkEvent::Disconnected { id } => {
                self.registry
                    .release(id, &mut self.state, now, &mut self.rng);
            }
        }
    }

    fn tick(&mut self) {
        let now = Instant::now();
        self.state
            .tick(self.registry.occupancy(), now, &mut self.rng);
        self.registry.broadcast(&self.state, now);
    }

    /// Main server loop coordinating all operations
    pub async fn run(mut self) -> Result<(), ServerError> {
        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks: u64 = 0;

        info!("Server started successfully");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => self.handle_accept(stream, addr),
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                },

                // Handle network events
                event = self.event_rx.recv() => {
                    // The server keeps a sender of its own, so the channel never closes.
                    if let Some(event) = event {
                        self.handle_event(event);
                    }
                },

                // Handle server tick events
                _ = tick_interval.tick() => {
                    self.tick();
                    ticks += 1;

                    // Periodic monitoring
                    if ticks % u64::from(TICK_RATE) == 0 && !self.registry.is_empty() {
                        debug!(
                            "Tick {}: {} players, phase {:?}, score {}-{}",
                            ticks,
                            self.registry.len(),
                            self.state.phase,
                            self.state.scores[0],
                            self.state.scores[1]
                        );
                    }
                },
            }
        }
    }
}

/// Drives one upgraded connection until either side closes it.
///
/// Inbound frames are parsed here and forwarded as events; the writer task
/// owns the outbound half and finishes once the registry drops the sender.
async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    id: ConnectionId,
    addr: SocketAddr,
    events: mpsc::UnboundedSender<NetworkEvent>,
) {
    let (ws_sender, mut ws_receiver) = ws.split();
    let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

    if events
        .send(NetworkEvent::Connected { id, addr, outbound })
        .is_err()
    {
        error!("Server loop gone, dropping connection {}", id);
        return;
    }

    let mut writer = tokio::spawn(write_loop(ws_sender, outbound_rx, id));

    loop {
        tokio::select! {
            frame = ws_receiver.next() => {
                let payload = match frame {
                    Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
                    Some(Ok(Message::Binary(data))) => data.to_vec(),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!("Connection {} read error: {}", id, e);
                        break;
                    }
                };

                match ClientMessage::parse(&payload) {
                    Some(ClientMessage::Input { direction }) => {
                        let _ = events.send(NetworkEvent::Input { id, direction });
                    }
                    None => debug!("Dropping malformed message from connection {}", id),
                }
            },

            _ = &mut writer => {
                debug!("Connection {} closed by server", id);
                break;
            },
        }
    }

    let _ = events.send(NetworkEvent::Disconnected { id });
    info!("Connection {} from {} closed", id, addr);
}

/// Serializes queued messages onto the socket. Sends a close frame once the
/// registry drops the sending half.
async fn write_loop(
    mut ws_sender: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut outbound_rx: mpsc::Receiver<ServerMessage>,
    id: ConnectionId,
) {
    while let Some(message) = outbound_rx.recv().await {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize message for {}: {}", id, e);
                continue;
            }
        };

        if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
            debug!("Connection {} write failed: {}", id, e);
            return;
        }
    }

    let _ = ws_sender.close().await;
}
