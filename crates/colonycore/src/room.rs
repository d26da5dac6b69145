use std::collections::HashMap;
use std::sync::RwLock;

use colonyproto::{Gopher, GopherState, Snapshot, Terrain, Tile};

use crate::world::World;

/// One isolated simulation instance: a world, its gophers, and a resource
/// ledger. All three live behind a single lock; every method synchronizes
/// internally and hands out copies, never references into the guarded state.
pub struct Room {
    id: String,
    state: RwLock<RoomState>,
}

struct RoomState {
    world: World,
    gophers: HashMap<String, Gopher>,
    resources: HashMap<String, u64>,
}

impl Room {
    pub fn new(id: impl Into<String>, world: World) -> Self {
        Self {
            id: id.into(),
            state: RwLock::new(RoomState {
                world,
                gophers: HashMap::new(),
                resources: HashMap::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dimensions(&self) -> (i32, i32) {
        let s = self.state.read().expect("room lock poisoned");
        (s.world.width(), s.world.height())
    }

    /// Depot reference point: the world center, where the chest is generated.
    pub fn depot(&self) -> (i32, i32) {
        let s = self.state.read().expect("room lock poisoned");
        s.world.center()
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<Tile> {
        let s = self.state.read().expect("room lock poisoned");
        s.world.tile(x, y).copied()
    }

    /// Set the terrain at (x, y). Returns false when out of bounds or when
    /// the terrain is already what was asked for.
    pub fn set_tile(&self, x: i32, y: i32, terrain: Terrain) -> bool {
        let mut s = self.state.write().expect("room lock poisoned");
        match s.world.tile_mut(x, y) {
            Some(tile) if tile.terrain != terrain => {
                tile.terrain = terrain;
                true
            }
            _ => false,
        }
    }

    /// Cycle the terrain at (x, y) through Grass -> Stone -> Water -> Grass.
    /// Returns the updated tile, or None when out of bounds or when the
    /// terrain does not participate in the cycle.
    pub fn toggle_tile(&self, x: i32, y: i32) -> Option<Tile> {
        let mut s = self.state.write().expect("room lock poisoned");
        let tile = s.world.tile_mut(x, y)?;
        tile.terrain = tile.terrain.toggled()?;
        Some(*tile)
    }

    /// Insert a gopher, overwriting any existing entry with the same id.
    pub fn add_agent(&self, gopher: Gopher) {
        let mut s = self.state.write().expect("room lock poisoned");
        s.gophers.insert(gopher.id.clone(), gopher);
    }

    /// A defensive copy of all gophers, sorted by id so callers iterate in a
    /// stable order.
    pub fn agents(&self) -> Vec<Gopher> {
        let s = self.state.read().expect("room lock poisoned");
        let mut v: Vec<Gopher> = s.gophers.values().cloned().collect();
        v.sort_by(|a, b| a.id.cmp(&b.id));
        v
    }

    pub fn agent_count(&self) -> usize {
        let s = self.state.read().expect("room lock poisoned");
        s.gophers.len()
    }

    /// Write a gopher back by id. Unknown ids are a silent no-op.
    pub fn update_agent(&self, gopher: Gopher) {
        let mut s = self.state.write().expect("room lock poisoned");
        if let Some(slot) = s.gophers.get_mut(&gopher.id) {
            *slot = gopher;
        }
    }

    /// Move a gopher to (x, y). Fails when the id is unknown, the target is
    /// out of bounds, or the target terrain is impassable. Success also sets
    /// the gopher's state to Moving.
    pub fn move_agent(&self, id: &str, x: i32, y: i32) -> bool {
        let mut s = self.state.write().expect("room lock poisoned");
        let passable = match s.world.tile(x, y) {
            Some(tile) => tile.terrain.passable(),
            None => false,
        };
        if !passable {
            return false;
        }
        match s.gophers.get_mut(id) {
            Some(g) => {
                g.x = x;
                g.y = y;
                g.state = GopherState::Moving;
                true
            }
            None => false,
        }
    }

    /// Add to the ledger entry for `kind`. Amounts are unsigned, so the
    /// ledger can never go negative.
    pub fn deposit_resource(&self, kind: &str, amount: u32) {
        let mut s = self.state.write().expect("room lock poisoned");
        let entry = s.resources.entry(kind.to_string()).or_insert(0);
        *entry = entry.saturating_add(u64::from(amount));
    }

    pub fn resources(&self) -> HashMap<String, u64> {
        let s = self.state.read().expect("room lock poisoned");
        s.resources.clone()
    }

    /// Full state for initial client synchronization, read under one lock
    /// acquisition so the view is internally consistent.
    pub fn snapshot(&self) -> Snapshot {
        let s = self.state.read().expect("room lock poisoned");
        let mut gophers: Vec<Gopher> = s.gophers.values().cloned().collect();
        gophers.sort_by(|a, b| a.id.cmp(&b.id));
        Snapshot {
            room_id: self.id.clone(),
            width: s.world.width(),
            height: s.world.height(),
            tiles: s.world.tiles().to_vec(),
            gophers,
            resources: s.resources.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    fn grass_room() -> Room {
        Room::new("test", World::new(8, 8))
    }

    #[test]
    fn set_then_get_returns_the_new_terrain() {
        let room = grass_room();
        assert!(room.set_tile(2, 3, Terrain::Tree));
        assert_eq!(room.tile(2, 3).unwrap().terrain, Terrain::Tree);

        // Setting the same terrain again reports no change.
        assert!(!room.set_tile(2, 3, Terrain::Tree));
    }

    #[test]
    fn set_tile_out_of_bounds_is_a_no_op() {
        let room = grass_room();
        assert!(!room.set_tile(8, 0, Terrain::Water));
        assert!(!room.set_tile(-1, -1, Terrain::Water));
    }

    #[test]
    fn toggle_cycles_grass_stone_water_grass() {
        let room = grass_room();
        assert_eq!(room.toggle_tile(1, 1).unwrap().terrain, Terrain::Stone);
        assert_eq!(room.toggle_tile(1, 1).unwrap().terrain, Terrain::Water);
        assert_eq!(room.toggle_tile(1, 1).unwrap().terrain, Terrain::Grass);
    }

    #[test]
    fn toggle_skips_out_of_bounds_and_non_cycle_terrain() {
        let room = grass_room();
        assert!(room.toggle_tile(99, 0).is_none());

        room.set_tile(1, 1, Terrain::Chest);
        assert!(room.toggle_tile(1, 1).is_none());
        assert_eq!(room.tile(1, 1).unwrap().terrain, Terrain::Chest);
    }

    #[test]
    fn move_agent_rejects_impassable_unknown_and_out_of_bounds() {
        let room = grass_room();
        room.add_agent(Gopher::new("g1", 1, 1));
        room.set_tile(2, 1, Terrain::Water);
        room.set_tile(1, 2, Terrain::Stone);

        assert!(!room.move_agent("g1", 2, 1));
        assert!(!room.move_agent("g1", 1, 2));
        assert!(!room.move_agent("g1", -1, 1));
        assert!(!room.move_agent("nobody", 3, 3));

        let g = &room.agents()[0];
        assert_eq!((g.x, g.y), (1, 1));
        assert_eq!(g.state, GopherState::Idle);
    }

    #[test]
    fn move_agent_onto_passable_terrain_sets_moving() {
        let room = grass_room();
        room.add_agent(Gopher::new("g1", 1, 1));
        assert!(room.move_agent("g1", 2, 1));

        let g = &room.agents()[0];
        assert_eq!((g.x, g.y), (2, 1));
        assert_eq!(g.state, GopherState::Moving);
    }

    #[test]
    fn deposits_accumulate_and_ledger_copies_are_detached() {
        let room = grass_room();
        room.deposit_resource("wood", 3);
        room.deposit_resource("wood", 4);
        room.deposit_resource("stone", 0);

        let mut ledger = room.resources();
        assert_eq!(ledger["wood"], 7);
        assert_eq!(ledger["stone"], 0);

        ledger.insert("wood".to_string(), 999);
        assert_eq!(room.resources()["wood"], 7);
    }

    #[test]
    fn agents_returns_detached_copies_sorted_by_id() {
        let room = grass_room();
        room.add_agent(Gopher::new("b", 2, 2));
        room.add_agent(Gopher::new("a", 1, 1));

        let mut agents = room.agents();
        assert_eq!(agents[0].id, "a");
        assert_eq!(agents[1].id, "b");

        agents[0].x = 99;
        assert_eq!(room.agents()[0].x, 1);
    }

    #[test]
    fn update_agent_writes_back_known_ids_only() {
        let room = grass_room();
        room.add_agent(Gopher::new("g1", 1, 1));

        let mut g = room.agents()[0].clone();
        g.inventory.wood = 5;
        room.update_agent(g);
        assert_eq!(room.agents()[0].inventory.wood, 5);

        room.update_agent(Gopher::new("ghost", 0, 0));
        assert_eq!(room.agent_count(), 1);
    }

    #[test]
    fn snapshot_is_internally_consistent() {
        let room = grass_room();
        room.add_agent(Gopher::new("g1", 1, 1));
        room.deposit_resource("wood", 2);

        let snap = room.snapshot();
        assert_eq!(snap.room_id, "test");
        assert_eq!((snap.width, snap.height), (8, 8));
        assert_eq!(snap.tiles.len(), 64);
        assert_eq!(snap.gophers.len(), 1);
        assert_eq!(snap.resources["wood"], 2);
    }
}
