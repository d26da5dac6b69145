use colonyproto::Terrain;

use crate::world::World;

const WATER_BAND: f64 = 0.20;
const STONE_BAND: f64 = 0.25;
const SAPLING_BAND: f64 = 0.28;

/// Deterministic world RNG. The sequence is part of the map format: two
/// servers with the same seed must agree on every tile.
#[derive(Debug, Clone)]
pub struct WorldRng {
    state: u64,
}

impl WorldRng {
    pub fn from_seed(seed: u64) -> Self {
        let mut s = seed;
        if s == 0 {
            s = 0x9e3779b97f4a7c15;
        }
        Self { state: s }
    }

    pub fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Uniform in [0, 1), 53-bit mantissa.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in [0, n). n must be positive.
    pub fn gen_range_i32(&mut self, n: i32) -> i32 {
        debug_assert!(n > 0);
        (self.next_u64() % n as u64) as i32
    }
}

/// Seed-driven terrain fill: one draw per cell, scanned row-major, assigned
/// by cumulative probability band, then exactly one chest at the geometric
/// center.
pub fn generate(width: i32, height: i32, seed: u64) -> World {
    let mut rng = WorldRng::from_seed(seed);
    let mut world = World::new(width, height);

    for y in 0..world.height() {
        for x in 0..world.width() {
            let r = rng.next_f64();
            let terrain = if r < WATER_BAND {
                Terrain::Water
            } else if r < STONE_BAND {
                Terrain::Stone
            } else if r < SAPLING_BAND {
                Terrain::Sapling
            } else {
                Terrain::Grass
            };
            if let Some(tile) = world.tile_mut(x, y) {
                tile.terrain = terrain;
            }
        }
    }

    let (cx, cy) = world.center();
    if let Some(tile) = world.tile_mut(cx, cy) {
        tile.terrain = Terrain::Chest;
    }

    world
}

/// FNV-1a over the room identifier: the per-room component of a world seed.
pub fn seed_for_room(id: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in id.as_bytes() {
        h ^= u64::from(*b);
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_generate_identical_grids() {
        let a = generate(20, 20, 12345);
        let b = generate(20, 20, 12345);
        assert_eq!(a.tiles(), b.tiles());
    }

    #[test]
    fn different_seeds_diverge() {
        let a = generate(20, 20, 1);
        let b = generate(20, 20, 2);
        assert_ne!(a.tiles(), b.tiles());
    }

    #[test]
    fn generated_world_has_expected_dimensions_and_terrain_mix() {
        let w = generate(32, 32, 99);
        assert_eq!(w.width(), 32);
        assert_eq!(w.height(), 32);

        let mut grass = 0;
        let mut water = 0;
        for t in w.tiles() {
            match t.terrain {
                Terrain::Grass => grass += 1,
                Terrain::Water => water += 1,
                _ => {}
            }
        }
        // With 1024 draws both the ~72% and ~20% bands are always populated.
        assert!(grass > 0, "expected some grass");
        assert!(water > 0, "expected some water");
    }

    #[test]
    fn exactly_one_chest_sits_at_the_center() {
        let w = generate(32, 32, 7);
        let chests: Vec<_> = w
            .tiles()
            .iter()
            .filter(|t| t.terrain == Terrain::Chest)
            .collect();
        assert_eq!(chests.len(), 1);
        assert_eq!((chests[0].x, chests[0].y), w.center());
    }

    #[test]
    fn non_positive_dimensions_generate_an_empty_world() {
        assert!(generate(0, 0, 1).tiles().is_empty());
        assert!(generate(-4, 10, 1).tiles().is_empty());
    }

    #[test]
    fn room_seed_is_stable_and_id_sensitive() {
        assert_eq!(seed_for_room("lobby"), seed_for_room("lobby"));
        assert_ne!(seed_for_room("lobby"), seed_for_room("arena"));
    }
}
