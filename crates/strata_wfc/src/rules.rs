//! Tile adjacency rules.
//!
//! A `RuleTable` is the immutable input to a solver: one `TileRule` per tile
//! id (ids dense from 0), each listing which tiles may sit next to it in each
//! of the six directions. Directions are independent. If tile A allows B on
//! its +X side, nothing is implied about what B allows on its -X side; use
//! `RuleTable::asymmetries()` to list such one-sided permissions.

use crate::direction::{Direction, DIRECTION_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Dense tile identifier, `0..RuleTable::len()`.
pub type TileId = usize;

/// Error type for rule table construction.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleTableError {
    /// Table has no tiles
    Empty,
    /// Rule at `index` carries a different `id`
    IdMismatch { index: usize, id: TileId },
    /// A neighbor set references a tile id outside the table
    NeighborOutOfRange {
        tile: TileId,
        direction: Direction,
        neighbor: TileId,
    },
    /// Base weight is negative, NaN or infinite
    InvalidWeight { tile: TileId, weight: f64 },
    /// JSON (de)serialization error
    Json(String),
}

impl fmt::Display for RuleTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleTableError::Empty => write!(f, "rule table has no tiles"),
            RuleTableError::IdMismatch { index, id } => {
                write!(f, "rule at index {} has id {} (ids must be dense)", index, id)
            }
            RuleTableError::NeighborOutOfRange {
                tile,
                direction,
                neighbor,
            } => write!(
                f,
                "tile {} allows unknown neighbor {} in direction {}",
                tile, neighbor, direction
            ),
            RuleTableError::InvalidWeight { tile, weight } => {
                write!(f, "tile {} has invalid base weight {}", tile, weight)
            }
            RuleTableError::Json(msg) => write!(f, "JSON error: {}", msg),
        }
    }
}

impl std::error::Error for RuleTableError {}

fn default_weight() -> f64 {
    1.0
}

/// Adjacency, weight and display data for one tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRule {
    pub id: TileId,
    /// Relative likelihood when no bias is applied.
    #[serde(default = "default_weight")]
    pub base_weight: f64,
    /// Allowed neighbor ids per direction, indexed by `Direction::index()`.
    #[serde(default)]
    pub neighbors: [BTreeSet<TileId>; DIRECTION_COUNT],
    /// Display color (RGB, 0..1). Ignored by the solver.
    #[serde(default)]
    pub color: [f32; 3],
    /// Display name. Ignored by the solver.
    #[serde(default)]
    pub name: String,
}

impl TileRule {
    /// A rule with weight 1.0 that allows nothing in any direction.
    pub fn new(id: TileId) -> Self {
        Self {
            id,
            base_weight: default_weight(),
            neighbors: Default::default(),
            color: [0.0; 3],
            name: String::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.base_weight = weight;
        self
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Permit `ids` as neighbors in `direction` (added to any existing set).
    pub fn allow(mut self, direction: Direction, ids: impl IntoIterator<Item = TileId>) -> Self {
        self.neighbors[direction.index()].extend(ids);
        self
    }

    /// Neighbor ids permitted in `direction`.
    #[inline]
    pub fn allowed(&self, direction: Direction) -> &BTreeSet<TileId> {
        &self.neighbors[direction.index()]
    }

    /// Whether `neighbor` may sit in `direction` of this tile.
    #[inline]
    pub fn allows(&self, direction: Direction, neighbor: TileId) -> bool {
        self.neighbors[direction.index()].contains(&neighbor)
    }
}

/// Validated, immutable set of tile rules.
///
/// Deserializes from a JSON array of `TileRule` and validates on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TileRule>", into = "Vec<TileRule>")]
pub struct RuleTable {
    rules: Vec<TileRule>,
}

impl RuleTable {
    /// Validate and wrap a list of rules.
    ///
    /// Requires a non-empty list where `rules[i].id == i`, every neighbor id
    /// is in range, and every base weight is finite and non-negative.
    pub fn new(rules: Vec<TileRule>) -> Result<Self, RuleTableError> {
        Self::validate(&rules)?;
        Ok(Self { rules })
    }

    /// Wrap rules built in-crate whose ids, neighbors and weights are
    /// correct by construction. Checked only in debug builds.
    pub(crate) fn from_validated(rules: Vec<TileRule>) -> Self {
        debug_assert!(Self::validate(&rules).is_ok());
        Self { rules }
    }

    fn validate(rules: &[TileRule]) -> Result<(), RuleTableError> {
        if rules.is_empty() {
            return Err(RuleTableError::Empty);
        }
        let count = rules.len();
        for (index, rule) in rules.iter().enumerate() {
            if rule.id != index {
                return Err(RuleTableError::IdMismatch { index, id: rule.id });
            }
            if !rule.base_weight.is_finite() || rule.base_weight < 0.0 {
                return Err(RuleTableError::InvalidWeight {
                    tile: rule.id,
                    weight: rule.base_weight,
                });
            }
            for direction in Direction::ALL {
                if let Some(&neighbor) = rule.allowed(direction).iter().find(|&&n| n >= count) {
                    return Err(RuleTableError::NeighborOutOfRange {
                        tile: rule.id,
                        direction,
                        neighbor,
                    });
                }
            }
        }
        Ok(())
    }

    /// Parse a JSON array of rules.
    pub fn from_json_str(json: &str) -> Result<Self, RuleTableError> {
        serde_json::from_str(json).map_err(|e| RuleTableError::Json(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String, RuleTableError> {
        serde_json::to_string_pretty(self).map_err(|e| RuleTableError::Json(e.to_string()))
    }

    /// Number of tiles.
    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Always false for a constructed table.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule for `id`. Panics if `id` is out of range.
    #[inline]
    pub fn get(&self, id: TileId) -> &TileRule {
        &self.rules[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileRule> {
        self.rules.iter()
    }

    /// Flattened adjacency lists: `propagator[direction][tile]` = allowed ids.
    pub fn propagator(&self) -> Vec<Vec<Vec<TileId>>> {
        Direction::ALL
            .iter()
            .map(|&d| {
                self.rules
                    .iter()
                    .map(|r| r.allowed(d).iter().copied().collect())
                    .collect()
            })
            .collect()
    }

    /// One-sided permissions: `(tile, direction, neighbor)` where `tile`
    /// allows `neighbor` in `direction` but `neighbor` does not allow `tile`
    /// in the opposite direction.
    pub fn asymmetries(&self) -> Vec<(TileId, Direction, TileId)> {
        let mut out = Vec::new();
        for rule in &self.rules {
            for direction in Direction::ALL {
                for &neighbor in rule.allowed(direction) {
                    if !self.rules[neighbor].allows(direction.opposite(), rule.id) {
                        out.push((rule.id, direction, neighbor));
                    }
                }
            }
        }
        out
    }
}

impl TryFrom<Vec<TileRule>> for RuleTable {
    type Error = RuleTableError;

    fn try_from(rules: Vec<TileRule>) -> Result<Self, Self::Error> {
        RuleTable::new(rules)
    }
}

impl From<RuleTable> for Vec<TileRule> {
    fn from(table: RuleTable) -> Self {
        table.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tiles() -> Vec<TileRule> {
        vec![
            TileRule::new(0).allow(Direction::PosX, [1]),
            TileRule::new(1).allow(Direction::NegX, [0]).with_weight(3.0),
        ]
    }

    #[test]
    fn test_new_validates_dense_ids() {
        let rules = vec![TileRule::new(0), TileRule::new(2)];
        assert_eq!(
            RuleTable::new(rules),
            Err(RuleTableError::IdMismatch { index: 1, id: 2 })
        );
    }

    #[test]
    fn test_new_rejects_empty() {
        assert_eq!(RuleTable::new(Vec::new()), Err(RuleTableError::Empty));
    }

    #[test]
    fn test_new_rejects_unknown_neighbor() {
        let rules = vec![TileRule::new(0).allow(Direction::PosY, [4])];
        assert_eq!(
            RuleTable::new(rules),
            Err(RuleTableError::NeighborOutOfRange {
                tile: 0,
                direction: Direction::PosY,
                neighbor: 4
            })
        );
    }

    #[test]
    fn test_new_rejects_bad_weight() {
        let negative = vec![TileRule::new(0).with_weight(-1.0)];
        assert!(matches!(
            RuleTable::new(negative),
            Err(RuleTableError::InvalidWeight { tile: 0, .. })
        ));
        let nan = vec![TileRule::new(0).with_weight(f64::NAN)];
        assert!(RuleTable::new(nan).is_err());
    }

    #[test]
    fn test_zero_weight_is_allowed() {
        let table = RuleTable::new(vec![TileRule::new(0).with_weight(0.0)]).unwrap();
        assert_eq!(table.get(0).base_weight, 0.0);
    }

    #[test]
    fn test_propagator_layout() {
        let table = RuleTable::new(two_tiles()).unwrap();
        let prop = table.propagator();
        assert_eq!(prop.len(), 6);
        assert_eq!(prop[Direction::PosX.index()][0], vec![1]);
        assert!(prop[Direction::PosX.index()][1].is_empty());
        assert_eq!(prop[Direction::NegX.index()][1], vec![0]);
    }

    #[test]
    fn test_asymmetries_reports_one_sided_rules() {
        let table = RuleTable::new(two_tiles()).unwrap();
        assert!(table.asymmetries().is_empty());

        let rules = vec![
            TileRule::new(0).allow(Direction::PosX, [1]),
            TileRule::new(1),
        ];
        let table = RuleTable::new(rules).unwrap();
        assert_eq!(table.asymmetries(), vec![(0, Direction::PosX, 1)]);
    }

    #[test]
    fn test_json_roundtrip_keeps_rules() {
        let table = RuleTable::new(two_tiles()).unwrap();
        let json = table.to_json_string().unwrap();
        let loaded = RuleTable::from_json_str(&json).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_json_load_is_validated() {
        let json = r#"[{"id": 0, "neighbors": [[], [7], [], [], [], []]}]"#;
        let err = RuleTable::from_json_str(json).unwrap_err();
        assert!(matches!(err, RuleTableError::Json(_)));
        assert!(err.to_string().contains("unknown neighbor 7"));
    }

    #[test]
    fn test_from_validated_matches_new() {
        let table = RuleTable::from_validated(two_tiles());
        assert_eq!(table, RuleTable::new(two_tiles()).unwrap());
        assert_eq!(table.get(1).base_weight, 3.0);
    }

    #[test]
    fn test_json_defaults() {
        let table = RuleTable::from_json_str(r#"[{"id": 0}]"#).unwrap();
        let rule = table.get(0);
        assert_eq!(rule.base_weight, 1.0);
        assert!(rule.neighbors.iter().all(|s| s.is_empty()));
        assert_eq!(rule.name, "");
    }
}
