//! Per-cell weight bias.
//!
//! A bias scales each candidate tile's base weight during a collapse. It is
//! supplied by the caller (typically from terrain attributes computed
//! elsewhere) and is called synchronously, once per candidate tile per
//! `Solver::step()`.

use crate::rules::TileId;

/// Multiplier applied to a tile's base weight at a given cell.
///
/// Must return a finite value >= 0. The solver clamps anything else to 0.
pub trait WeightBias: Send + Sync {
    fn weight(&self, tile: TileId, x: usize, y: usize, z: usize) -> f64;
}

impl<F> WeightBias for F
where
    F: Fn(TileId, usize, usize, usize) -> f64 + Send + Sync,
{
    fn weight(&self, tile: TileId, x: usize, y: usize, z: usize) -> f64 {
        self(tile, x, y, z)
    }
}
