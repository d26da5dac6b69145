use serde::{Deserialize, Serialize};

/// Most wood a single gopher can carry before it must head for a chest.
pub const WOOD_CAP: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Grass,
    Water,
    Stone,
    Sapling,
    Tree,
    Chest,
}

impl Terrain {
    /// Whether an agent may stand on this terrain.
    pub fn passable(self) -> bool {
        !matches!(self, Terrain::Water | Terrain::Stone)
    }

    /// The click cycle: Grass -> Stone -> Water -> Grass. Terrain outside the
    /// cycle does not toggle.
    pub fn toggled(self) -> Option<Terrain> {
        match self {
            Terrain::Grass => Some(Terrain::Stone),
            Terrain::Stone => Some(Terrain::Water),
            Terrain::Water => Some(Terrain::Grass),
            Terrain::Sapling | Terrain::Tree | Terrain::Chest => None,
        }
    }
}

/// One grid cell. Coordinates are fixed at creation; only terrain mutates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub terrain: Terrain,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GopherState {
    #[default]
    Idle,
    Moving,
    Harvesting,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub wood: u32,
}

/// An autonomous colony agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gopher {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub state: GopherState,
    pub inventory: Inventory,
}

impl Gopher {
    pub fn new(id: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            state: GopherState::Idle,
            inventory: Inventory::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_and_stone_are_impassable() {
        assert!(!Terrain::Water.passable());
        assert!(!Terrain::Stone.passable());
        assert!(Terrain::Grass.passable());
        assert!(Terrain::Sapling.passable());
        assert!(Terrain::Tree.passable());
        assert!(Terrain::Chest.passable());
    }

    #[test]
    fn toggle_cycle_returns_to_grass_after_three_steps() {
        let mut t = Terrain::Grass;
        for _ in 0..3 {
            t = t.toggled().expect("cycle terrain toggles");
        }
        assert_eq!(t, Terrain::Grass);
    }

    #[test]
    fn growth_stages_do_not_toggle() {
        assert_eq!(Terrain::Sapling.toggled(), None);
        assert_eq!(Terrain::Tree.toggled(), None);
        assert_eq!(Terrain::Chest.toggled(), None);
    }

    #[test]
    fn tile_serializes_terrain_under_the_type_key() {
        let tile = Tile {
            x: 3,
            y: 4,
            terrain: Terrain::Sapling,
        };
        let v = serde_json::to_value(&tile).unwrap();
        assert_eq!(v["type"], "sapling");
        assert_eq!(v["x"], 3);
        assert_eq!(v["y"], 4);
    }
}
