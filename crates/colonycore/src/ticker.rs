use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use colonyproto::wire::{self, ServerMsg};
use tokio::sync::watch;
use tracing::info;

use crate::hub::ConnectionHub;
use crate::mapgen;
use crate::registry::RoomLifecycle;
use crate::room::Room;
use crate::sim::Simulation;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Stop signal for one room's ticker. Dropping the handle also stops the
/// task, so holders keep it for the room's lifetime.
pub struct TickerHandle {
    stop: watch::Sender<bool>,
}

impl TickerHandle {
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }
}

/// One recurring task per room: tick the simulation, broadcast the delta
/// when it carries changes. Runs until stopped; never restarts.
pub fn spawn_room_ticker(
    room: Arc<Room>,
    hub: Arc<ConnectionHub>,
    mut sim: Simulation,
    period: Duration,
) -> TickerHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);

    tokio::spawn(async move {
        // First tick one full period out, like a wall-clock ticker.
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);

        info!(room_id = %room.id(), "room ticker started");
        loop {
            tokio::select! {
                _ = stop_rx.changed() => {
                    info!(room_id = %room.id(), "room ticker stopped");
                    return;
                }
                _ = interval.tick() => {
                    let delta = sim.tick(&room);
                    if delta.has_changes() {
                        let frame = wire::encode(&ServerMsg::Update(delta));
                        hub.broadcast(room.id(), &frame);
                    }
                }
            }
        }
    });

    TickerHandle { stop: stop_tx }
}

/// Room lifecycle observer that gives every new room its ticker. Handles are
/// retained for the process lifetime, matching the rooms they drive.
pub struct TickerLifecycle {
    hub: Arc<ConnectionHub>,
    period: Duration,
    sim_seed: Option<u64>,
    handles: Mutex<HashMap<String, TickerHandle>>,
}

impl TickerLifecycle {
    pub fn new(hub: Arc<ConnectionHub>, period: Duration, sim_seed: Option<u64>) -> Self {
        Self {
            hub,
            period,
            sim_seed,
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn stop_all(&self) {
        let handles = self.handles.lock().expect("ticker handles lock poisoned");
        for handle in handles.values() {
            handle.stop();
        }
    }
}

impl RoomLifecycle for TickerLifecycle {
    fn on_room_created(&self, room: &Arc<Room>) {
        let seed = self
            .sim_seed
            .map(|s| s ^ mapgen::seed_for_room(room.id()))
            .unwrap_or_else(crate::process_seed);
        let handle = spawn_room_ticker(
            room.clone(),
            self.hub.clone(),
            Simulation::new(seed),
            self.period,
        );
        let mut handles = self.handles.lock().expect("ticker handles lock poisoned");
        handles.insert(room.id().to_string(), handle);
    }
}
