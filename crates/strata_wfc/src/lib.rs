//! 3D wave function collapse for voxel terrain.
//!
//! This crate provides:
//! - Face-adjacency rule tables, hand-authored or loaded from JSON
//! - Rule extraction from labeled sample volumes
//! - A seeded solver with arc-consistency propagation and weight biasing
//! - The geology preset and its strata weight bias
//! - A Bevy plugin that spreads generation across app updates

pub mod bias;
pub mod config;
pub mod direction;
pub mod domain;
pub mod extractor;
pub mod plugin;
pub mod presets;
pub mod rng;
pub mod rules;
pub mod solver;


pub use bias::WeightBias;
pub use config::{ConfigError, ConfigResult, GenerationConfig};
pub use direction::{Direction, DIRECTION_COUNT};
pub use domain::{Cell, DomainGrid};
pub use extractor::{SampleVolume, EMPTY_TILE};
pub use plugin::{GenerationStatus, WfcGeneration, WfcGenerationPlugin};
pub use presets::{geology_rules, GeologyTile, StrataBias, VoxelAttributes, STRATA_EPSILON};
pub use rng::{StdRandom, WfcRng};
pub use rules::{RuleTable, RuleTableError, TileId, TileRule};
pub use solver::{Solver, SolverState};
