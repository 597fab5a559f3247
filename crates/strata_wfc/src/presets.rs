//! Hand-authored geology rules and the strata weight bias.
//!
//! The geology table stacks three bands vertically: air on top, a one-voxel
//! surface layer (forest, grass, sand or rock) and deep material (limestone,
//! granite, water) below. Horizontally every tile may touch every other tile;
//! which tile wins at a given cell is left to the weights.
//!
//! `StrataBias` turns per-voxel terrain attributes (computed elsewhere) into
//! weight multipliers that push each band toward the expected material.

use crate::bias::WeightBias;
use crate::direction::Direction;
use crate::rules::{RuleTable, TileId, TileRule};

/// Tile ids of the geology table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum GeologyTile {
    Air = 0,
    SurfaceForest = 1,
    SurfaceGrass = 2,
    SurfaceSand = 3,
    SurfaceRock = 4,
    DeepLimestone = 5,
    DeepGranite = 6,
    DeepWater = 7,
}

impl GeologyTile {
    pub const ALL: [GeologyTile; 8] = [
        GeologyTile::Air,
        GeologyTile::SurfaceForest,
        GeologyTile::SurfaceGrass,
        GeologyTile::SurfaceSand,
        GeologyTile::SurfaceRock,
        GeologyTile::DeepLimestone,
        GeologyTile::DeepGranite,
        GeologyTile::DeepWater,
    ];

    pub const SURFACES: [GeologyTile; 4] = [
        GeologyTile::SurfaceForest,
        GeologyTile::SurfaceGrass,
        GeologyTile::SurfaceSand,
        GeologyTile::SurfaceRock,
    ];

    pub const DEEP: [GeologyTile; 3] = [
        GeologyTile::DeepLimestone,
        GeologyTile::DeepGranite,
        GeologyTile::DeepWater,
    ];

    #[inline]
    pub fn id(self) -> TileId {
        self as TileId
    }

    pub fn from_id(id: TileId) -> Option<Self> {
        Self::ALL.get(id).copied()
    }

    pub fn is_surface(self) -> bool {
        Self::SURFACES.contains(&self)
    }

    pub fn is_deep(self) -> bool {
        Self::DEEP.contains(&self)
    }

    fn name(self) -> &'static str {
        match self {
            GeologyTile::Air => "air",
            GeologyTile::SurfaceForest => "forest",
            GeologyTile::SurfaceGrass => "grass",
            GeologyTile::SurfaceSand => "sand",
            GeologyTile::SurfaceRock => "rock",
            GeologyTile::DeepLimestone => "limestone",
            GeologyTile::DeepGranite => "granite",
            GeologyTile::DeepWater => "water",
        }
    }

    fn color(self) -> [f32; 3] {
        match self {
            GeologyTile::Air => [0.0, 0.0, 0.0],
            GeologyTile::SurfaceForest => [0.05, 0.5, 0.1],
            GeologyTile::SurfaceGrass => [0.2, 0.8, 0.2],
            GeologyTile::SurfaceSand => [0.9, 0.8, 0.5],
            GeologyTile::SurfaceRock => [0.5, 0.5, 0.5],
            GeologyTile::DeepLimestone => [0.6, 0.55, 0.4],
            GeologyTile::DeepGranite => [0.3, 0.3, 0.35],
            GeologyTile::DeepWater => [0.2, 0.4, 0.9],
        }
    }

    fn base_weight(self) -> f64 {
        match self {
            GeologyTile::Air => 10.0,
            // Water is only reachable through forced edits or the zero-weight fallback
            GeologyTile::DeepWater => 0.0,
            _ => 1.0,
        }
    }
}

fn ids(tiles: &[GeologyTile]) -> impl Iterator<Item = TileId> + '_ {
    tiles.iter().map(|t| t.id())
}

/// The eight-tile strata table.
pub fn geology_rules() -> RuleTable {
    let horizontal = [
        Direction::NegX,
        Direction::PosX,
        Direction::NegZ,
        Direction::PosZ,
    ];

    let rules = GeologyTile::ALL
        .iter()
        .map(|&tile| {
            let mut rule = TileRule::new(tile.id())
                .with_weight(tile.base_weight())
                .with_color(tile.color())
                .with_name(tile.name());
            for d in horizontal {
                rule = rule.allow(d, ids(&GeologyTile::ALL));
            }

            if tile == GeologyTile::Air {
                rule.allow(Direction::PosY, [GeologyTile::Air.id()])
                    .allow(Direction::NegY, [GeologyTile::Air.id()])
                    .allow(Direction::NegY, ids(&GeologyTile::SURFACES))
            } else if tile.is_surface() {
                rule.allow(Direction::PosY, [GeologyTile::Air.id()])
                    .allow(Direction::NegY, ids(&GeologyTile::DEEP))
            } else {
                rule.allow(Direction::PosY, ids(&GeologyTile::SURFACES))
                    .allow(Direction::PosY, ids(&GeologyTile::DEEP))
                    .allow(Direction::NegY, ids(&GeologyTile::DEEP))
            }
        })
        .collect();

    RuleTable::from_validated(rules)
}

/// Terrain attributes of one voxel, produced by terrain and hydrology passes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VoxelAttributes {
    /// 0..1, high values favor granite and rock
    pub hardness: f32,
    /// 0..1, drives the surface band (sand, grass, forest)
    pub humidity: f32,
    /// 0..1, accumulated water
    pub water_amount: f32,
}

/// Weight bias from a surface height map and per-voxel attributes.
///
/// Above the surface air dominates, the surface voxel picks its material
/// from hardness and humidity, and below the surface hardness chooses
/// between granite and limestone.
#[derive(Debug, Clone)]
pub struct StrataBias {
    mx: usize,
    my: usize,
    mz: usize,
    /// Surface height per column, indexed `x + z * mx`
    surface_levels: Vec<usize>,
    /// Indexed like the solver: `x + y * mx + z * mx * my`
    attributes: Vec<VoxelAttributes>,
}

/// Near-zero weight for tiles that should almost never win.
pub const STRATA_EPSILON: f64 = 0.0001;

impl StrataBias {
    /// Flat surface at height 0 with default attributes.
    pub fn new(mx: usize, my: usize, mz: usize) -> Self {
        Self {
            mx,
            my,
            mz,
            surface_levels: vec![0; mx * mz],
            attributes: vec![VoxelAttributes::default(); mx * my * mz],
        }
    }

    /// Build from a height function `(x, z)` and an attribute function `(x, y, z)`.
    pub fn from_fn(
        mx: usize,
        my: usize,
        mz: usize,
        surface: impl Fn(usize, usize) -> usize,
        attributes: impl Fn(usize, usize, usize) -> VoxelAttributes,
    ) -> Self {
        let mut bias = Self::new(mx, my, mz);
        for z in 0..mz {
            for x in 0..mx {
                bias.set_surface_level(x, z, surface(x, z));
                for y in 0..my {
                    bias.set_attributes(x, y, z, attributes(x, y, z));
                }
            }
        }
        bias
    }

    pub fn set_surface_level(&mut self, x: usize, z: usize, level: usize) {
        if x < self.mx && z < self.mz {
            self.surface_levels[x + z * self.mx] = level;
        }
    }

    pub fn surface_level(&self, x: usize, z: usize) -> Option<usize> {
        if x < self.mx && z < self.mz {
            Some(self.surface_levels[x + z * self.mx])
        } else {
            None
        }
    }

    pub fn set_attributes(&mut self, x: usize, y: usize, z: usize, attributes: VoxelAttributes) {
        if x < self.mx && y < self.my && z < self.mz {
            self.attributes[x + y * self.mx + z * self.mx * self.my] = attributes;
        }
    }

    pub fn attributes(&self, x: usize, y: usize, z: usize) -> Option<VoxelAttributes> {
        if x < self.mx && y < self.my && z < self.mz {
            Some(self.attributes[x + y * self.mx + z * self.mx * self.my])
        } else {
            None
        }
    }
}

impl WeightBias for StrataBias {
    fn weight(&self, tile: TileId, x: usize, y: usize, z: usize) -> f64 {
        let (Some(surface), Some(data), Some(tile)) = (
            self.surface_level(x, z),
            self.attributes(x, y, z),
            GeologyTile::from_id(tile),
        ) else {
            return 1.0;
        };

        if y > surface {
            return if tile == GeologyTile::Air {
                100.0
            } else {
                STRATA_EPSILON
            };
        }

        if y < surface {
            if tile == GeologyTile::Air || tile.is_surface() {
                return 0.0;
            }
            if data.water_amount > 0.8 && tile == GeologyTile::DeepWater {
                return 20.0;
            }
            let favored = if data.hardness > 0.6 {
                GeologyTile::DeepGranite
            } else {
                GeologyTile::DeepLimestone
            };
            return if tile == favored { 10.0 } else { STRATA_EPSILON };
        }

        if tile == GeologyTile::Air {
            return 0.0;
        }
        if data.hardness > 0.7 {
            return if tile == GeologyTile::SurfaceRock {
                10.0
            } else {
                STRATA_EPSILON
            };
        }

        let h = data.humidity;
        if h > 0.6 {
            match tile {
                GeologyTile::SurfaceForest => 20.0,
                GeologyTile::SurfaceGrass => 5.0,
                _ => STRATA_EPSILON,
            }
        } else if h > 0.3 {
            match tile {
                GeologyTile::SurfaceGrass => 20.0,
                GeologyTile::SurfaceForest | GeologyTile::SurfaceSand => 2.0,
                _ => STRATA_EPSILON,
            }
        } else {
            match tile {
                GeologyTile::SurfaceSand => 20.0,
                GeologyTile::SurfaceGrass => 1.0,
                _ => STRATA_EPSILON,
            }
        }
    }
}
