use std::sync::Arc;

use bytes::Bytes;
use colonyproto::wire::{self, Command, Delta, ServerMsg};
use tracing::{debug, info, warn};

use crate::hub::{ClientSocket, ConnectionHub, SocketError};
use crate::registry::RoomRegistry;
use crate::room::Room;

/// Drives one connected client: room lookup, init snapshot, command loop,
/// guaranteed hub deregistration. Transport-agnostic; the daemon hands it an
/// accepted socket, tests hand it an in-memory one.
#[derive(Clone)]
pub struct ColonyService {
    registry: Arc<RoomRegistry>,
    hub: Arc<ConnectionHub>,
}

impl ColonyService {
    pub fn new(registry: Arc<RoomRegistry>, hub: Arc<ConnectionHub>) -> Self {
        Self { registry, hub }
    }

    pub fn hub(&self) -> &Arc<ConnectionHub> {
        &self.hub
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    pub async fn handle_client(
        &self,
        room_id: &str,
        socket: Arc<dyn ClientSocket>,
    ) -> anyhow::Result<()> {
        let (room, created) = self.registry.get_or_create(room_id);
        if created {
            info!(room_id = %room_id, "room created");
        }

        let client_id = self.hub.add_client(room_id, socket.clone());
        debug!(room_id = %room_id, clients = self.hub.client_count(room_id), "client registered");

        if let Err(e) = socket.send(wire::encode(&ServerMsg::Init(room.snapshot()))) {
            // Without the init snapshot the client has nothing to render.
            self.hub.remove_client(room_id, client_id);
            anyhow::bail!("send init snapshot: {e}");
        }

        let res = {
            let hub = self.hub.clone();
            let room = room.clone();
            let sock = socket.clone();
            let room_key = room_id.to_string();
            socket
                .listen(Box::new(move |frame| {
                    handle_frame(&room, &hub, &room_key, sock.as_ref(), frame);
                }))
                .await
        };

        // Every exit path deregisters, clean close or not.
        self.hub.remove_client(room_id, client_id);

        match res {
            Ok(()) => {
                debug!(room_id = %room_id, "client closed cleanly");
                Ok(())
            }
            Err(SocketError::Transport(e)) => Err(anyhow::anyhow!("client transport: {e}")),
            Err(e) => Err(anyhow::anyhow!("client session: {e}")),
        }
    }
}

fn handle_frame(
    room: &Room,
    hub: &ConnectionHub,
    room_id: &str,
    socket: &dyn ClientSocket,
    frame: Bytes,
) {
    let envelope = match wire::parse_envelope(&frame) {
        Ok(env) => env,
        Err(e) => {
            // Malformed input is logged and discarded; the connection lives on.
            warn!(room_id = %room_id, err = %e, "malformed client frame");
            return;
        }
    };

    match envelope.kind.as_str() {
        wire::MSG_CMD => match wire::parse_command(envelope.payload) {
            Ok(cmd) => handle_command(room, hub, room_id, cmd),
            Err(e) => {
                warn!(room_id = %room_id, err = %e, "bad command payload");
            }
        },
        other => {
            // Diagnostic echo for anything well-formed we don't understand.
            debug!(room_id = %room_id, kind = %other, "echoing non-command message");
            let _ = socket.send(wire::encode(&ServerMsg::Echo(envelope.payload)));
        }
    }
}

fn handle_command(room: &Room, hub: &ConnectionHub, room_id: &str, cmd: Command) {
    match cmd {
        Command::Click { x, y } => {
            // Out-of-bounds or non-cycling terrain: silent no-op, nothing to
            // broadcast and nothing reported back to the client.
            let Some(tile) = room.toggle_tile(x, y) else {
                return;
            };
            let delta = Delta {
                tiles: vec![tile],
                gophers: Vec::new(),
                resources: room.resources(),
            };
            hub.broadcast(room_id, &wire::encode(&ServerMsg::Update(delta)));
        }
    }
}
