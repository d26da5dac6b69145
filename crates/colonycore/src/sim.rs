use colonyproto::{Delta, Gopher, GopherState, Terrain, Tile, WOOD_CAP};

use crate::mapgen::WorldRng;
use crate::room::Room;

/// No new gopher spawns once a room holds this many.
pub const SPAWN_CAP: usize = 5;

const SPAWN_CHANCE: f64 = 0.05;
const WANDER_CHANCE: f64 = 0.2;
const GROWTH_CHANCE: f64 = 0.1;

/// Cardinal neighbors in fixed scan order: N, S, E, W.
const CARDINALS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Advances one room by one discrete step. Holds the only randomness the
/// simulation uses, so a seeded engine replays a room identically. All
/// mutation goes through the room's locked API; a tick serializes against
/// concurrent client commands at operation granularity.
pub struct Simulation {
    rng: WorldRng,
}

impl Simulation {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: WorldRng::from_seed(seed),
        }
    }

    pub fn tick(&mut self, room: &Room) -> Delta {
        let mut delta = Delta::default();

        // A spawn pre-empts agent behavior for the tick; plants still grow.
        if !self.spawn_gopher(room, &mut delta) {
            self.step_gophers(room, &mut delta);
        }
        self.grow_plants(room, &mut delta);

        delta.resources = room.resources();
        delta
    }

    fn spawn_gopher(&mut self, room: &Room, delta: &mut Delta) -> bool {
        if room.agent_count() >= SPAWN_CAP {
            return false;
        }
        if self.rng.next_f64() >= SPAWN_CHANCE {
            return false;
        }
        let (w, h) = room.dimensions();
        if w <= 0 || h <= 0 {
            return false;
        }

        let x = self.rng.gen_range_i32(w);
        let y = self.rng.gen_range_i32(h);
        let id = format!("{:08x}", self.rng.next_u64() as u32);

        let gopher = Gopher::new(id, x, y);
        room.add_agent(gopher.clone());
        delta.gophers.push(gopher);
        true
    }

    fn step_gophers(&mut self, room: &Room, delta: &mut Delta) {
        for gopher in room.agents() {
            // Priority order, first applicable action wins, one action per
            // gopher per tick.
            if gopher.inventory.wood > 0 && self.try_deliver(room, &gopher, delta) {
                continue;
            }
            if gopher.inventory.wood < WOOD_CAP && self.try_harvest(room, &gopher, delta) {
                continue;
            }
            self.wander(room, &gopher, delta);
        }
    }

    /// Deposit into an adjacent chest, or when fully laden take one greedy
    /// step toward the depot. Returns true when the gopher's turn is spent.
    fn try_deliver(&mut self, room: &Room, gopher: &Gopher, delta: &mut Delta) -> bool {
        for (ox, oy) in CARDINALS {
            let (tx, ty) = (gopher.x + ox, gopher.y + oy);
            if room.tile(tx, ty).map(|t| t.terrain) == Some(Terrain::Chest) {
                room.deposit_resource("wood", gopher.inventory.wood);
                let mut updated = gopher.clone();
                updated.inventory.wood = 0;
                updated.state = GopherState::Idle;
                room.update_agent(updated.clone());
                delta.gophers.push(updated);
                return true;
            }
        }

        if gopher.inventory.wood < WOOD_CAP {
            return false;
        }

        // Fully laden: one single-axis step per axis toward the depot, no
        // obstacle avoidance. A rejected step still spends the turn, which
        // is how a gopher wedges for good against a rock on the depot path.
        let (dx, dy) = {
            let (cx, cy) = room.depot();
            ((cx - gopher.x).signum(), (cy - gopher.y).signum())
        };
        if (dx, dy) != (0, 0) && room.move_agent(&gopher.id, gopher.x + dx, gopher.y + dy) {
            let mut updated = gopher.clone();
            updated.x += dx;
            updated.y += dy;
            updated.state = GopherState::Moving;
            delta.gophers.push(updated);
        }
        true
    }

    /// Convert the first adjacent mature tree to a sapling and pocket the
    /// wood. Returns true when a harvest happened.
    fn try_harvest(&mut self, room: &Room, gopher: &Gopher, delta: &mut Delta) -> bool {
        for (ox, oy) in CARDINALS {
            let (tx, ty) = (gopher.x + ox, gopher.y + oy);
            if room.tile(tx, ty).map(|t| t.terrain) != Some(Terrain::Tree) {
                continue;
            }
            if !room.set_tile(tx, ty, Terrain::Sapling) {
                continue;
            }
            let mut updated = gopher.clone();
            updated.inventory.wood += 1;
            updated.state = GopherState::Harvesting;
            room.update_agent(updated.clone());
            delta.tiles.push(Tile {
                x: tx,
                y: ty,
                terrain: Terrain::Sapling,
            });
            delta.gophers.push(updated);
            return true;
        }
        false
    }

    fn wander(&mut self, room: &Room, gopher: &Gopher, delta: &mut Delta) {
        if self.rng.next_f64() >= WANDER_CHANCE {
            return;
        }
        let dx = self.rng.gen_range_i32(3) - 1;
        let dy = self.rng.gen_range_i32(3) - 1;
        if (dx, dy) == (0, 0) {
            return;
        }
        if room.move_agent(&gopher.id, gopher.x + dx, gopher.y + dy) {
            let mut updated = gopher.clone();
            updated.x += dx;
            updated.y += dy;
            updated.state = GopherState::Moving;
            delta.gophers.push(updated);
        }
    }

    fn grow_plants(&mut self, room: &Room, delta: &mut Delta) {
        // Work a snapshot: growth rolls must not see this tick's conversions.
        let snapshot = room.snapshot();
        for tile in &snapshot.tiles {
            if tile.terrain != Terrain::Sapling {
                continue;
            }
            if self.rng.next_f64() >= GROWTH_CHANCE {
                continue;
            }
            if room.set_tile(tile.x, tile.y, Terrain::Tree) {
                delta.tiles.push(Tile {
                    x: tile.x,
                    y: tile.y,
                    terrain: Terrain::Tree,
                });
            }
        }
    }
}
