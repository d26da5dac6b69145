use colonyproto::{Terrain, Tile};

/// A fixed-size tile grid, row-major. Dimensions never change after
/// creation; only terrain mutates.
#[derive(Clone, Debug)]
pub struct World {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl World {
    /// A grass-filled world. Non-positive dimensions yield an empty grid on
    /// which every lookup misses.
    pub fn new(width: i32, height: i32) -> Self {
        let (width, height) = (width.max(0), height.max(0));
        let mut tiles = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                tiles.push(Tile {
                    x,
                    y,
                    terrain: Terrain::Grass,
                });
            }
        }
        Self {
            width,
            height,
            tiles,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<&Tile> {
        if !self.in_bounds(x, y) {
            return None;
        }
        self.tiles.get((y * self.width + x) as usize)
    }

    pub(crate) fn tile_mut(&mut self, x: i32, y: i32) -> Option<&mut Tile> {
        if !self.in_bounds(x, y) {
            return None;
        }
        self.tiles.get_mut((y * self.width + x) as usize)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// The geometric center: where the chest sits, and the depot reference
    /// point laden gophers walk toward.
    pub fn center(&self) -> (i32, i32) {
        (self.width / 2, self.height / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_world_is_all_grass_with_fixed_coordinates() {
        let w = World::new(4, 3);
        assert_eq!(w.tiles().len(), 12);
        for y in 0..3 {
            for x in 0..4 {
                let t = w.tile(x, y).unwrap();
                assert_eq!((t.x, t.y, t.terrain), (x, y, Terrain::Grass));
            }
        }
    }

    #[test]
    fn out_of_bounds_lookups_miss() {
        let w = World::new(4, 3);
        assert!(w.tile(-1, 0).is_none());
        assert!(w.tile(0, -1).is_none());
        assert!(w.tile(4, 0).is_none());
        assert!(w.tile(0, 3).is_none());
    }

    #[test]
    fn non_positive_dimensions_yield_an_empty_grid() {
        let w = World::new(0, 5);
        assert!(w.tiles().is_empty());
        assert!(w.tile(0, 0).is_none());

        let w = World::new(-3, -3);
        assert!(w.tiles().is_empty());
        assert_eq!(w.width(), 0);
        assert_eq!(w.height(), 0);
    }
}
