//! The six axis directions of the lattice.
//!
//! Order is fixed: -X, +X, -Y, +Y, -Z, +Z. Rule tables store one neighbor
//! set per direction in this order, so `Direction::index()` is also the
//! slot in `TileRule::neighbors`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six face-adjacent directions of a 3D lattice cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    NegX,
    PosX,
    NegY,
    PosY,
    NegZ,
    PosZ,
}

/// Number of neighbor directions on the lattice.
pub const DIRECTION_COUNT: usize = 6;

/// Offsets indexed by `Direction::index()`.
const DX: [i64; DIRECTION_COUNT] = [-1, 1, 0, 0, 0, 0];
const DY: [i64; DIRECTION_COUNT] = [0, 0, -1, 1, 0, 0];
const DZ: [i64; DIRECTION_COUNT] = [0, 0, 0, 0, -1, 1];

impl Direction {
    /// All directions in canonical order.
    pub const ALL: [Direction; DIRECTION_COUNT] = [
        Direction::NegX,
        Direction::PosX,
        Direction::NegY,
        Direction::PosY,
        Direction::NegZ,
        Direction::PosZ,
    ];

    /// Slot of this direction in per-direction arrays.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Direction for a slot index, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Unit offset `(dx, dy, dz)`.
    #[inline]
    pub fn offset(self) -> (i64, i64, i64) {
        let i = self.index();
        (DX[i], DY[i], DZ[i])
    }

    /// The direction pointing the other way along the same axis.
    pub fn opposite(self) -> Self {
        match self {
            Direction::NegX => Direction::PosX,
            Direction::PosX => Direction::NegX,
            Direction::NegY => Direction::PosY,
            Direction::PosY => Direction::NegY,
            Direction::NegZ => Direction::PosZ,
            Direction::PosZ => Direction::NegZ,
        }
    }

    /// Step `(x, y, z)` one cell in this direction inside `[0, dims)`.
    ///
    /// Returns `None` when the neighbor would leave the bounds. Never wraps.
    #[inline]
    pub fn step(
        self,
        (x, y, z): (usize, usize, usize),
        (mx, my, mz): (usize, usize, usize),
    ) -> Option<(usize, usize, usize)> {
        let (dx, dy, dz) = self.offset();
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        let nz = z as i64 + dz;
        if nx < 0 || ny < 0 || nz < 0 || nx >= mx as i64 || ny >= my as i64 || nz >= mz as i64 {
            return None;
        }
        Some((nx as usize, ny as usize, nz as usize))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::NegX => "-X",
            Direction::PosX => "+X",
            Direction::NegY => "-Y",
            Direction::PosY => "+Y",
            Direction::NegZ => "-Z",
            Direction::PosZ => "+Z",
        };
        f.write_str(s)
    }
}
