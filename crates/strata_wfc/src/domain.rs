//! Per-cell possibility tracking.
//!
//! The domain grid stores, for every lattice cell, which tile ids are still
//! possible. Storage is a flat `Vec<bool>` indexed `cell * T + tile`, plus a
//! running count of possibilities per cell so entropy lookups are O(1).
//!
//! A cell is collapsed only once an edit or an observation resolves it.
//! Propagation can shrink a domain to a single tile without collapsing it;
//! such a cell is still scheduled and still re-checked by its neighbors.

use crate::rules::TileId;

/// Possibility state for every cell of the lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainGrid {
    /// `data[cell * tiles + tile]` = true if `tile` is still possible at `cell`.
    data: Vec<bool>,

    /// Number of remaining possible tiles per cell.
    sums_of_ones: Vec<usize>,

    /// Cells resolved by an edit or an observation
    collapsed: Vec<bool>,

    /// Number of cells
    length: usize,

    /// Number of tiles
    tiles: usize,
}

impl DomainGrid {
    /// Create a grid with every tile possible at every cell.
    pub fn new(length: usize, tiles: usize) -> Self {
        Self {
            data: vec![true; length * tiles],
            sums_of_ones: vec![tiles; length],
            collapsed: vec![false; length],
            length,
            tiles,
        }
    }

    /// Make every tile possible at every cell again.
    pub fn reset(&mut self) {
        self.data.fill(true);
        self.sums_of_ones.fill(self.tiles);
        self.collapsed.fill(false);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles
    }

    /// Whether `tile` is still possible at `cell`.
    #[inline]
    pub fn contains(&self, cell: usize, tile: TileId) -> bool {
        self.data[cell * self.tiles + tile]
    }

    /// Number of tiles still possible at `cell`.
    #[inline]
    pub fn remaining(&self, cell: usize) -> usize {
        self.sums_of_ones[cell]
    }

    /// Whether `cell` has been resolved. Implies exactly one tile remains.
    #[inline]
    pub fn is_collapsed(&self, cell: usize) -> bool {
        self.collapsed[cell]
    }

    /// Mark a cell with a single remaining tile as resolved.
    pub fn mark_collapsed(&mut self, cell: usize) {
        debug_assert_eq!(self.sums_of_ones[cell], 1);
        self.collapsed[cell] = true;
    }

    /// The single remaining tile at `cell`, if collapsed.
    pub fn collapsed_tile(&self, cell: usize) -> Option<TileId> {
        if !self.is_collapsed(cell) {
            return None;
        }
        self.possible(cell).iter().position(|&p| p)
    }

    /// Possibility flags for `cell`, indexed by tile id.
    #[inline]
    pub fn possible(&self, cell: usize) -> &[bool] {
        &self.data[cell * self.tiles..(cell + 1) * self.tiles]
    }

    /// Remaining tile ids at `cell`, ascending.
    pub fn tiles_at(&self, cell: usize) -> impl Iterator<Item = TileId> + '_ {
        self.possible(cell)
            .iter()
            .enumerate()
            .filter_map(|(t, &p)| p.then_some(t))
    }

    /// Reduce `cell` to exactly `{tile}` and mark it collapsed.
    pub fn collapse_to(&mut self, cell: usize, tile: TileId) {
        let start = cell * self.tiles;
        let row = &mut self.data[start..start + self.tiles];
        row.fill(false);
        row[tile] = true;
        self.sums_of_ones[cell] = 1;
        self.collapsed[cell] = true;
    }

    /// Remove `tile` from `cell`. Returns false if it was already absent.
    pub fn remove(&mut self, cell: usize, tile: TileId) -> bool {
        let idx = cell * self.tiles + tile;
        if !self.data[idx] {
            return false;
        }
        self.data[idx] = false;
        self.sums_of_ones[cell] -= 1;
        true
    }

    /// Intersect `cell` with `allowed` (indexed by tile id).
    ///
    /// Returns how many tiles were removed.
    pub fn retain(&mut self, cell: usize, allowed: &[bool]) -> usize {
        let start = cell * self.tiles;
        let mut removed = 0;
        for (possible, &keep) in self.data[start..start + self.tiles]
            .iter_mut()
            .zip(allowed)
        {
            if *possible && !keep {
                *possible = false;
                removed += 1;
            }
        }
        self.sums_of_ones[cell] -= removed;
        removed
    }
}

/// Read-only view of one cell's domain.
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    possible: &'a [bool],
    remaining: usize,
    collapsed: bool,
}

impl<'a> Cell<'a> {
    pub(crate) fn new(grid: &'a DomainGrid, cell: usize) -> Self {
        Self {
            possible: grid.possible(cell),
            remaining: grid.remaining(cell),
            collapsed: grid.is_collapsed(cell),
        }
    }

    /// Domain cardinality.
    #[inline]
    pub fn entropy(&self) -> usize {
        self.remaining
    }

    #[inline]
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// The resolved tile, if collapsed.
    pub fn collapsed_tile(&self) -> Option<TileId> {
        if self.is_collapsed() {
            self.possible.iter().position(|&p| p)
        } else {
            None
        }
    }

    pub fn contains(&self, tile: TileId) -> bool {
        self.possible.get(tile).copied().unwrap_or(false)
    }

    /// Remaining tile ids, ascending.
    pub fn tiles(&self) -> impl Iterator<Item = TileId> + 'a {
        let possible: &'a [bool] = self.possible;
        possible
            .iter()
            .enumerate()
            .filter_map(|(t, &p)| p.then_some(t))
    }
}
