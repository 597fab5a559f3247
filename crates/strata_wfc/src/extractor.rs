//! Learning adjacency rules from a labeled sample volume.
//!
//! Every pair of face-adjacent voxels in the sample contributes one
//! permission: the neighbor's id becomes allowed in that direction of the
//! voxel's id. Nothing else is inferred. In particular, a direction in which
//! an id was never seen next to anything (because every occurrence sits on
//! the sample boundary on that side) ends up with an empty set, which the
//! solver reads as "nothing may go there".

use crate::direction::Direction;
use crate::rules::{RuleTable, TileId, TileRule};
use bevy::log::{debug, warn};

/// Id returned for reads outside the sample bounds.
pub const EMPTY_TILE: TileId = 0;

/// Fixed-size 3D array of tile ids used as training input.
///
/// Indexing follows the solver convention: `index = x + y * mx + z * mx * my`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleVolume {
    data: Vec<TileId>,
    mx: usize,
    my: usize,
    mz: usize,
    max_id: TileId,
}

impl SampleVolume {
    /// A volume filled with `EMPTY_TILE`.
    pub fn new(mx: usize, my: usize, mz: usize) -> Self {
        Self {
            data: vec![EMPTY_TILE; mx * my * mz],
            mx,
            my,
            mz,
            max_id: EMPTY_TILE,
        }
    }

    /// Build from a flat id array. Returns `None` if the length does not match.
    pub fn from_data(mx: usize, my: usize, mz: usize, data: Vec<TileId>) -> Option<Self> {
        if data.len() != mx * my * mz {
            return None;
        }
        let max_id = data.iter().copied().max().unwrap_or(EMPTY_TILE);
        Some(Self {
            data,
            mx,
            my,
            mz,
            max_id,
        })
    }

    pub fn dims(&self) -> (usize, usize, usize) {
        (self.mx, self.my, self.mz)
    }

    /// Largest id written so far.
    pub fn max_id(&self) -> TileId {
        self.max_id
    }

    #[inline]
    fn in_bounds(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.mx && y < self.my && z < self.mz
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.mx + z * self.mx * self.my
    }

    /// Write `id` at `(x, y, z)`. Writes outside the bounds are ignored.
    pub fn set(&mut self, x: usize, y: usize, z: usize, id: TileId) {
        if self.in_bounds(x, y, z) {
            let i = self.index(x, y, z);
            self.data[i] = id;
            self.max_id = self.max_id.max(id);
        }
    }

    /// Id at `(x, y, z)`, or `EMPTY_TILE` outside the bounds.
    pub fn get(&self, x: usize, y: usize, z: usize) -> TileId {
        if self.in_bounds(x, y, z) {
            self.data[self.index(x, y, z)]
        } else {
            EMPTY_TILE
        }
    }

    /// Learn one rule per id in `0..=max_id()`.
    ///
    /// `colors[id]` becomes the display color of each rule; ids without an
    /// entry get black. All extracted rules have base weight 1.0.
    pub fn extract_rules(&self, colors: &[[f32; 3]]) -> RuleTable {
        let count = self.max_id + 1;
        if colors.len() < count {
            warn!(
                "color table has {} entries for {} tile ids; missing ids are black",
                colors.len(),
                count
            );
        }

        let mut rules: Vec<TileRule> = (0..count)
            .map(|id| TileRule::new(id).with_color(colors.get(id).copied().unwrap_or([0.0; 3])))
            .collect();

        let dims = self.dims();
        for z in 0..self.mz {
            for y in 0..self.my {
                for x in 0..self.mx {
                    let current = self.data[self.index(x, y, z)];
                    for d in Direction::ALL {
                        if let Some((nx, ny, nz)) = d.step((x, y, z), dims) {
                            let neighbor = self.data[self.index(nx, ny, nz)];
                            rules[current].neighbors[d.index()].insert(neighbor);
                        }
                    }
                }
            }
        }

        debug!(
            "extracted {} rules from {}x{}x{} sample",
            count, self.mx, self.my, self.mz
        );

        // Ids are dense, neighbors come from the same volume, weights are 1.0
        RuleTable::from_validated(rules)
    }
}
