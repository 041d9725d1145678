//! Game server implementation.

use crate::config::Config;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use protocol::packets::MAX_LABEL_LEN;
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{RwLock, broadcast};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, error, info, warn};

pub mod admission;
pub mod client;
pub mod events;
pub mod game;
pub mod realm;
pub mod round;
pub mod scheduler;

pub use client::{Client, Identity, LifeState};
pub use events::Outgoing;
pub use game::{GameState, StatusReport, now_ms, run_game_loop};
pub use realm::{LocalRealm, OfflineRealm, Realm, RealmRequest, RewardEconomy, RewardGrant};
pub use round::{RoundSummary, RoundStanding};

/// Game state shared between the game loop, connections and the status endpoint.
pub type SharedState = Arc<RwLock<GameState>>;

/// Capacity of the outgoing frame channel.
const OUTGOING_CAPACITY: usize = 1024;

/// Connection tracking state (shared across connection handlers).
struct ConnectionState {
    /// Number of connections per IP address.
    ip_connections: HashMap<IpAddr, usize>,
    /// Total number of connections.
    total_connections: usize,
    /// Banned IP addresses.
    ban_list: HashSet<IpAddr>,
    /// Addresses allowed to moderate.
    mod_list: HashSet<IpAddr>,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            ip_connections: HashMap::new(),
            total_connections: 0,
            ban_list: HashSet::new(),
            mod_list: HashSet::new(),
        }
    }

    /// Check if an IP is banned.
    fn is_banned(&self, ip: &IpAddr) -> bool {
        self.ban_list.contains(ip)
    }

    fn is_mod(&self, ip: &IpAddr) -> bool {
        self.mod_list.contains(ip)
    }

    /// Try to add a connection, returns true if allowed.
    fn try_add_connection(&mut self, ip: IpAddr, max_total: usize, max_per_ip: usize) -> bool {
        if self.total_connections >= max_total {
            return false;
        }
        let current = self.ip_connections.get(&ip).copied().unwrap_or(0);
        if current >= max_per_ip {
            return false;
        }
        *self.ip_connections.entry(ip).or_insert(0) += 1;
        self.total_connections += 1;
        true
    }

    /// Remove a connection.
    fn remove_connection(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_connections.get_mut(&ip) {
            if *count > 0 {
                *count -= 1;
                self.total_connections = self.total_connections.saturating_sub(1);
            }
            if *count == 0 {
                self.ip_connections.remove(&ip);
            }
        }
    }
}

/// Load one IP per line, skipping blanks and `#` comments.
fn load_ip_list(path: &Path) -> HashSet<IpAddr> {
    let mut list = HashSet::new();
    if !path.exists() {
        info!("No list file found at {:?}", path);
        return list;
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                match line.parse::<IpAddr>() {
                    Ok(ip) => {
                        list.insert(ip);
                    }
                    Err(_) => warn!("Invalid IP in {:?}: {}", path, line),
                }
            }
            info!("Loaded {} addresses from {:?}", list.len(), path);
        }
        Err(e) => warn!("Failed to load {:?}: {}", path, e),
    }
    list
}

/// Build the shared game state.
pub fn shared_state(config: &Config, realm: Arc<dyn Realm>) -> SharedState {
    Arc::new(RwLock::new(GameState::new(config, realm, now_ms())))
}

/// Run the game server. Returns an error when the game loop dies.
pub async fn run(config: Config, state: SharedState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    let conn_state = Arc::new(RwLock::new(ConnectionState::new()));
    {
        let mut conns = conn_state.write().await;
        conns.ban_list = load_ip_list(Path::new("banlist.txt"));
        conns.mod_list = load_ip_list(Path::new("modlist.txt"));
    }

    let (outgoing_tx, _outgoing_rx) = broadcast::channel::<Outgoing>(OUTGOING_CAPACITY);
    let mut game_loop = tokio::spawn(run_game_loop(Arc::clone(&state), outgoing_tx.clone()));

    let max_connections = config.server.max_connections;
    let ip_limit = config.server.ip_limit;

    loop {
        tokio::select! {
            result = &mut game_loop => {
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.into()),
                    Err(e) => Err(e.into()),
                };
            }
            accepted = listener.accept() => {
                let (stream, addr) = accepted?;
                let ip = addr.ip();
                let is_mod = {
                    let mut conns = conn_state.write().await;
                    if conns.is_banned(&ip) {
                        warn!("Connection rejected (IP banned): {}", addr);
                        continue;
                    }
                    if !conns.try_add_connection(ip, max_connections, ip_limit) {
                        warn!("Connection rejected (limit reached): {}", addr);
                        continue;
                    }
                    conns.is_mod(&ip)
                };

                let state = Arc::clone(&state);
                let conn_state = Arc::clone(&conn_state);
                let outgoing_tx = outgoing_tx.clone();
                tokio::spawn(async move {
                    let result = handle_connection(stream, addr, is_mod, state, outgoing_tx).await;
                    conn_state.write().await.remove_connection(addr.ip());
                    if let Err(e) = result {
                        error!("Connection error from {}: {}", addr, e);
                    }
                });
            }
        }
    }
}

/// Display name from a `?name=` query parameter.
fn display_name(query: Option<&str>) -> String {
    let raw = query
        .and_then(|q| q.split('&').find_map(|kv| kv.strip_prefix("name=")))
        .unwrap_or_default();
    let name: String = raw
        .chars()
        .map(|c| if c == '+' { ' ' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '_')
        .take(MAX_LABEL_LEN)
        .collect();
    let name = name.trim();
    if name.is_empty() { "Guest".to_string() } else { name.to_string() }
}

/// Send compiled frames to every connection task.
fn dispatch(tx: &broadcast::Sender<Outgoing>, frames: Vec<Outgoing>) {
    for frame in frames {
        // No receivers just means nobody is connected.
        let _ = tx.send(frame);
    }
}

/// Every connection shares the compiled frame buffer.
fn frame_message(payload: Bytes) -> Message {
    Message::Binary(payload)
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    is_mod: bool,
    state: SharedState,
    outgoing_tx: broadcast::Sender<Outgoing>,
) -> anyhow::Result<()> {
    let mut name = String::new();
    let ws_stream = accept_hdr_async(stream, |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        name = display_name(req.uri().query());
        Ok(resp)
    })
    .await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();
    let mut outgoing_rx = outgoing_tx.subscribe();

    let identity = Identity { address: addr.to_string(), name, is_mod };
    let client_id = {
        let mut game = state.write().await;
        let id = game.connect(identity, now_ms());
        dispatch(&outgoing_tx, game.take_outgoing());
        id
    };

    loop {
        tokio::select! {
            msg = read.next() => {
                let data = match msg {
                    Some(Ok(Message::Text(text))) => text.as_str().as_bytes().to_vec(),
                    Some(Ok(Message::Binary(data))) => data.to_vec(),
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client {} closed the connection", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    Some(Ok(_)) => continue,
                };
                let mut game = state.write().await;
                if let Err(e) = game.handle_message(client_id, &data, now_ms()) {
                    debug!("Rejected intent from {}: {}", addr, e);
                }
                dispatch(&outgoing_tx, game.take_outgoing());
            }
            frame = outgoing_rx.recv() => {
                match frame {
                    Ok(frame) if frame.is_for(client_id) => match frame {
                        Outgoing::Broadcast(payload) | Outgoing::Direct { payload, .. } => {
                            if let Err(e) = write.send(frame_message(payload)).await {
                                warn!("Failed to send to {}: {}", addr, e);
                                break;
                            }
                        }
                        Outgoing::Close { .. } => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    },
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Connection {} lagged, {} frames dropped", addr, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    {
        let mut game = state.write().await;
        game.disconnect(client_id, "left", true, now_ms());
        dispatch(&outgoing_tx, game.take_outgoing());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_from_query() {
        assert_eq!(display_name(Some("name=Ada+L")), "Ada L");
        assert_eq!(display_name(Some("x=1&name=bob")), "bob");
        assert_eq!(display_name(Some("name=<script>")), "script");
        assert_eq!(display_name(None), "Guest");
        assert_eq!(display_name(Some("name=")), "Guest");
    }

    #[test]
    fn test_frames_share_the_payload() {
        let payload = Bytes::from_static(b"{\"type\":\"events\"}");
        let Message::Binary(sent) = frame_message(payload.clone()) else {
            panic!("expected a binary frame");
        };
        assert_eq!(sent.as_ptr(), payload.as_ptr());
    }

    #[test]
    fn test_connection_limits() {
        let mut conns = ConnectionState::new();
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(conns.try_add_connection(ip, 10, 2));
        assert!(conns.try_add_connection(ip, 10, 2));
        assert!(!conns.try_add_connection(ip, 10, 2));
        conns.remove_connection(ip);
        assert!(conns.try_add_connection(ip, 10, 2));
    }
}
