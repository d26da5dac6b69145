use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketError {
    /// Outbound queue full: the frame was dropped, the connection stays up.
    BufferFull,
    Closed,
    Transport(String),
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketError::BufferFull => write!(f, "send queue full, frame dropped"),
            SocketError::Closed => write!(f, "socket closed"),
            SocketError::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for SocketError {}

pub type FrameHandler<'a> = Box<dyn FnMut(Bytes) + Send + 'a>;

/// What the hub and session need from a transport connection. The hub never
/// sees a concrete transport type.
pub trait ClientSocket: Send + Sync {
    /// Queue one frame. Must not block: a slow consumer's full queue fails
    /// fast with [`SocketError::BufferFull`].
    fn send(&self, frame: Bytes) -> Result<(), SocketError>;

    /// Run the receive loop, invoking `on_frame` once per inbound frame.
    /// Resolves Ok on a clean peer-initiated close, Err on anything else.
    fn listen<'a>(&'a self, on_frame: FrameHandler<'a>) -> BoxFuture<'a, Result<(), SocketError>>;

    /// Idempotent: concurrent or repeated calls perform one effective close.
    fn close(&self, code: u16);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// Per-room registry of live sockets with best-effort fan-out.
///
/// Guarded by its own lock, never acquired while a room lock is held, so the
/// two can never deadlock against each other.
#[derive(Default)]
pub struct ConnectionHub {
    clients: RwLock<HashMap<String, HashMap<ClientId, Arc<dyn ClientSocket>>>>,
    next_id: AtomicU64,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_client(&self, room_id: &str, socket: Arc<dyn ClientSocket>) -> ClientId {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut clients = self.clients.write().expect("hub lock poisoned");
        clients
            .entry(room_id.to_string())
            .or_default()
            .insert(id, socket);
        id
    }

    /// Deregister a socket. Removing the last socket for a room drops the
    /// room's hub entry; the room aggregate itself persists elsewhere.
    pub fn remove_client(&self, room_id: &str, id: ClientId) {
        let mut clients = self.clients.write().expect("hub lock poisoned");
        if let Some(room) = clients.get_mut(room_id) {
            room.remove(&id);
            if room.is_empty() {
                clients.remove(room_id);
            }
        }
    }

    /// Send `frame` to every socket registered for the room. A failed send
    /// is logged and the socket stays registered: dropping a frame to a slow
    /// client is acceptable, forcibly disconnecting it is not our call.
    pub fn broadcast(&self, room_id: &str, frame: &Bytes) {
        let clients = self.clients.read().expect("hub lock poisoned");
        let Some(room) = clients.get(room_id) else {
            return;
        };
        for socket in room.values() {
            if let Err(e) = socket.send(frame.clone()) {
                warn!(room_id = %room_id, err = %e, "dropping frame to slow client");
            }
        }
    }

    pub fn client_count(&self, room_id: &str) -> usize {
        let clients = self.clients.read().expect("hub lock poisoned");
        clients.get(room_id).map(|room| room.len()).unwrap_or(0)
    }

    pub fn has_room(&self, room_id: &str) -> bool {
        let clients = self.clients.read().expect("hub lock poisoned");
        clients.contains_key(room_id)
    }
}
