use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::mapgen;
use crate::room::Room;

/// Observer invoked synchronously when a room is created. This is how a new
/// room gets its ticker without the registry knowing about scheduling.
pub trait RoomLifecycle: Send + Sync {
    fn on_room_created(&self, room: &Arc<Room>);
}

#[derive(Clone, Copy, Debug)]
pub struct WorldConfig {
    pub width: i32,
    pub height: i32,
    /// Base world seed. When None, a process-random base is drawn once at
    /// registry construction, so maps differ across restarts.
    pub seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            seed: None,
        }
    }
}

/// Get-or-create map from room identifier to room. Rooms live for the
/// process lifetime; nothing reaps them. A long-running deployment would
/// need an eviction policy here.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Arc<Room>>>,
    cfg: WorldConfig,
    base_seed: u64,
    lifecycle: Option<Arc<dyn RoomLifecycle>>,
}

impl RoomRegistry {
    pub fn new(cfg: WorldConfig, lifecycle: Option<Arc<dyn RoomLifecycle>>) -> Self {
        let base_seed = cfg.seed.unwrap_or_else(crate::process_seed);
        Self {
            rooms: Mutex::new(HashMap::new()),
            cfg,
            base_seed,
            lifecycle,
        }
    }

    /// Returns the room for `id`, creating it (and generating its world) on
    /// first access. `created` is true exactly once per identifier: lookup
    /// and insert happen under one lock, so concurrent first accesses race
    /// to a single world generation.
    pub fn get_or_create(&self, id: &str) -> (Arc<Room>, bool) {
        let mut rooms = self.rooms.lock().expect("room registry lock poisoned");
        if let Some(room) = rooms.get(id) {
            return (room.clone(), false);
        }

        let seed = self.base_seed ^ mapgen::seed_for_room(id);
        let world = mapgen::generate(self.cfg.width, self.cfg.height, seed);
        let room = Arc::new(Room::new(id, world));
        rooms.insert(id.to_string(), room.clone());

        if let Some(lifecycle) = &self.lifecycle {
            lifecycle.on_room_created(&room);
        }
        (room, true)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Room>> {
        let rooms = self.rooms.lock().expect("room registry lock poisoned");
        rooms.get(id).cloned()
    }

    pub fn room_count(&self) -> usize {
        let rooms = self.rooms.lock().expect("room registry lock poisoned");
        rooms.len()
    }
}
