//! The collapse solver.
//!
//! `Solver` owns a lattice of domains, a copy of the rule table and a seeded
//! RNG. It provides:
//! - `reset()` - restore every domain to the full tile range
//! - `force_collapse()` / `ban_tile()` - externally imposed constraints
//! - `step()` - collapse the minimum-entropy cell to a weighted-random tile
//! - queue-based arc consistency propagation after every edit
//!
//! A cell counts as collapsed once `force_collapse()`, `step()` or a ban
//! that leaves one tile resolves it. Propagation may narrow a domain to one
//! tile without collapsing it; `step()` still visits such cells.
//!
//! There is no backtracking. Once a domain empties the solver is `Failed`
//! and every mutating call is a no-op returning false until `reset()`.

use crate::bias::WeightBias;
use crate::direction::Direction;
use crate::domain::{Cell, DomainGrid};
use crate::rng::{StdRandom, WfcRng};
use crate::rules::{RuleTable, TileId, TileRule};
use bevy::log::{debug, info, warn};
use std::collections::VecDeque;

/// Solver lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// Edits and steps are accepted
    Active,
    /// A domain emptied; terminal until `reset()`
    Failed,
}

/// Entropy-guided tile solver over a fixed 3D lattice.
pub struct Solver {
    /// Possibility state per cell
    domains: DomainGrid,

    /// Rules this solver was built with
    rules: RuleTable,

    /// `propagator[direction][tile]` = tiles allowed next to `tile` in `direction`
    propagator: Vec<Vec<Vec<TileId>>>,

    rng: Box<dyn WfcRng>,

    bias: Option<Box<dyn WeightBias>>,

    state: SolverState,

    /// Propagation worklist and its membership flags
    queue: VecDeque<usize>,
    queued: Vec<bool>,

    /// Scratch buffers reused across calls
    allowed: Vec<bool>,
    options: Vec<TileId>,
    distribution: Vec<f64>,
    candidates: Vec<usize>,

    /// Grid dimensions
    mx: usize,
    my: usize,
    mz: usize,
}

impl Solver {
    /// Create a solver seeded with a `StdRandom`.
    pub fn new(mx: usize, my: usize, mz: usize, rules: RuleTable, seed: u64) -> Self {
        info!(
            "WFC solver {}x{}x{} with {} tiles (seed {})",
            mx,
            my,
            mz,
            rules.len(),
            seed
        );
        Self::with_rng(mx, my, mz, rules, Box::new(StdRandom::from_u64_seed(seed)))
    }

    /// Create a solver driven by a caller-supplied random source.
    pub fn with_rng(
        mx: usize,
        my: usize,
        mz: usize,
        rules: RuleTable,
        rng: Box<dyn WfcRng>,
    ) -> Self {
        let length = mx * my * mz;
        let tiles = rules.len();
        let propagator = rules.propagator();

        Self {
            domains: DomainGrid::new(length, tiles),
            rules,
            propagator,
            rng,
            bias: None,
            state: SolverState::Active,
            queue: VecDeque::new(),
            queued: vec![false; length],
            allowed: vec![false; tiles],
            options: Vec::with_capacity(tiles),
            distribution: Vec::with_capacity(tiles),
            candidates: Vec::new(),
            mx,
            my,
            mz,
        }
    }

    /// Install a weight bias used by every subsequent `step()`.
    pub fn set_weight_bias(&mut self, bias: impl WeightBias + 'static) {
        self.bias = Some(Box::new(bias));
    }

    pub fn clear_weight_bias(&mut self) {
        self.bias = None;
    }

    /// Restore every domain to the full tile range and leave `Failed`.
    pub fn reset(&mut self) {
        self.domains.reset();
        self.queue.clear();
        self.queued.fill(false);
        self.state = SolverState::Active;
        debug!("WFC solver reset ({} cells)", self.domains.len());
    }

    /// Collapse `(x, y, z)` to `tile` and propagate.
    ///
    /// Returns false without touching anything if the solver has failed or
    /// `tile` is not in the cell's current domain. Otherwise returns whether
    /// the solver is still active after propagation.
    pub fn force_collapse(&mut self, x: usize, y: usize, z: usize, tile: TileId) -> bool {
        if self.state == SolverState::Failed {
            return false;
        }
        let cell = self.index(x, y, z);
        if tile >= self.rules.len() || !self.domains.contains(cell, tile) {
            return false;
        }

        self.domains.collapse_to(cell, tile);
        self.propagate(cell);
        self.state == SolverState::Active
    }

    /// Remove `tile` from the domain at `(x, y, z)` and propagate.
    ///
    /// Removing an absent tile is a successful no-op. Removing the last tile
    /// fails the solver. A ban that leaves one tile collapses the cell.
    pub fn ban_tile(&mut self, x: usize, y: usize, z: usize, tile: TileId) -> bool {
        if self.state == SolverState::Failed {
            return false;
        }
        let cell = self.index(x, y, z);
        if tile >= self.rules.len() || !self.domains.remove(cell, tile) {
            return true;
        }

        match self.domains.remaining(cell) {
            0 => {
                self.fail(cell);
                return false;
            }
            1 => self.domains.mark_collapsed(cell),
            _ => {}
        }

        self.propagate(cell);
        self.state == SolverState::Active
    }

    /// Perform one observation.
    ///
    /// Returns false if the solver has failed or no uncollapsed cell is left.
    /// Returns true after collapsing a cell, even if that collapse led to a
    /// contradiction; check `is_failed()` afterwards.
    pub fn step(&mut self) -> bool {
        if self.state == SolverState::Failed {
            return false;
        }

        let Some(cell) = self.next_unobserved_cell() else {
            return false;
        };

        let tile = self.pick_tile(cell);
        self.domains.collapse_to(cell, tile);
        self.propagate(cell);
        true
    }

    /// Call `step()` until it returns false or `max_steps` steps have run.
    ///
    /// Returns the number of cells collapsed.
    pub fn run(&mut self, max_steps: usize) -> usize {
        let mut steps = 0;
        while steps < max_steps && self.step() {
            steps += 1;
        }
        if self.is_failed() {
            info!("WFC failed after {} steps", steps);
        } else if self.is_complete() {
            info!("WFC complete after {} steps", steps);
        }
        steps
    }

    /// Find the minimum-entropy uncollapsed cell, breaking ties uniformly.
    fn next_unobserved_cell(&mut self) -> Option<usize> {
        let mut min_entropy = usize::MAX;
        self.candidates.clear();

        for i in 0..self.domains.len() {
            if self.domains.is_collapsed(i) {
                continue;
            }
            let remaining = self.domains.remaining(i);
            if remaining < min_entropy {
                min_entropy = remaining;
                self.candidates.clear();
                self.candidates.push(i);
            } else if remaining == min_entropy {
                self.candidates.push(i);
            }
        }

        if self.candidates.is_empty() {
            return None;
        }
        let pick = self.rng.next_usize_max(self.candidates.len());
        Some(self.candidates[pick])
    }

    /// Weighted-random choice among the tiles still possible at `cell`.
    ///
    /// Weight is `base_weight * bias(tile, x, y, z)`. If every weight is 0
    /// the last possible tile is chosen.
    fn pick_tile(&mut self, cell: usize) -> TileId {
        let (x, y, z) = self.position(cell);
        self.options.clear();
        self.distribution.clear();

        let mut total = 0.0;
        for t in self.domains.tiles_at(cell) {
            let mut w = self.rules.get(t).base_weight;
            if let Some(bias) = &self.bias {
                w *= sanitize_multiplier(bias.weight(t, x, y, z), t, (x, y, z));
            }
            self.options.push(t);
            self.distribution.push(w);
            total += w;
        }

        let mut picked = self.options.last().copied().unwrap_or_default();
        if total <= 0.0 {
            return picked;
        }

        let threshold = self.rng.next_double() * total;
        let mut partial_sum = 0.0;
        for (&t, &w) in self.options.iter().zip(&self.distribution) {
            partial_sum += w;
            if partial_sum >= threshold {
                picked = t;
                break;
            }
        }
        picked
    }

    /// Propagate domain reductions outward from `origin` to a fixed point.
    ///
    /// Collapsed neighbors are checked like any other: their single tile
    /// either survives the intersection or the solve fails. Stops at the
    /// first emptied domain and marks the solver failed.
    fn propagate(&mut self, origin: usize) {
        let dims = (self.mx, self.my, self.mz);
        self.queue.push_back(origin);
        self.queued[origin] = true;

        while let Some(i1) = self.queue.pop_front() {
            self.queued[i1] = false;
            let p1 = self.position(i1);

            for d in Direction::ALL {
                let Some((x2, y2, z2)) = d.step(p1, dims) else {
                    continue;
                };
                let i2 = self.index(x2, y2, z2);

                // Union of what every tile still possible at i1 allows toward i2
                self.allowed.fill(false);
                for t1 in self.domains.tiles_at(i1) {
                    for &t2 in &self.propagator[d.index()][t1] {
                        self.allowed[t2] = true;
                    }
                }

                if self.domains.retain(i2, &self.allowed) == 0 {
                    continue;
                }
                if self.domains.remaining(i2) == 0 {
                    self.fail(i2);
                    return;
                }
                if !self.queued[i2] {
                    self.queued[i2] = true;
                    self.queue.push_back(i2);
                }
            }
        }
    }

    fn fail(&mut self, cell: usize) {
        self.state = SolverState::Failed;
        for i in self.queue.drain(..) {
            self.queued[i] = false;
        }
        let (x, y, z) = self.position(cell);
        debug!("WFC contradiction at ({}, {}, {})", x, y, z);
    }

    /// Flat index of `(x, y, z)`: `x + y * mx + z * mx * my`.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.mx + z * self.mx * self.my
    }

    /// Inverse of `index()`.
    #[inline]
    pub fn position(&self, i: usize) -> (usize, usize, usize) {
        let x = i % self.mx;
        let y = (i / self.mx) % self.my;
        let z = i / (self.mx * self.my);
        (x, y, z)
    }

    /// Domain view of `(x, y, z)`. Coordinates are not range checked.
    pub fn cell(&self, x: usize, y: usize, z: usize) -> Cell<'_> {
        Cell::new(&self.domains, self.index(x, y, z))
    }

    /// Rule for `id`. Panics if `id` is out of range.
    pub fn tile(&self, id: TileId) -> &TileRule {
        self.rules.get(id)
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn dims(&self) -> (usize, usize, usize) {
        (self.mx, self.my, self.mz)
    }

    pub fn width(&self) -> usize {
        self.mx
    }

    pub fn height(&self) -> usize {
        self.my
    }

    pub fn depth(&self) -> usize {
        self.mz
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn is_failed(&self) -> bool {
        self.state == SolverState::Failed
    }

    /// Active and every cell collapsed.
    pub fn is_complete(&self) -> bool {
        self.state == SolverState::Active
            && (0..self.domains.len()).all(|i| self.domains.is_collapsed(i))
    }

    pub fn collapsed_count(&self) -> usize {
        (0..self.domains.len())
            .filter(|&i| self.domains.is_collapsed(i))
            .count()
    }

    /// Resolved tile per cell in flat index order.
    pub fn collapsed_tiles(&self) -> Vec<Option<TileId>> {
        (0..self.domains.len())
            .map(|i| self.domains.collapsed_tile(i))
            .collect()
    }
}

fn sanitize_multiplier(m: f64, tile: TileId, (x, y, z): (usize, usize, usize)) -> f64 {
    if m.is_finite() && m >= 0.0 {
        m
    } else {
        warn!(
            "weight bias returned {} for tile {} at ({}, {}, {}); using 0",
            m, tile, x, y, z
        );
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::TileRule;

    fn free_tiles(n: usize) -> RuleTable {
        let all: Vec<TileId> = (0..n).collect();
        let rules = (0..n)
            .map(|id| {
                Direction::ALL
                    .iter()
                    .fold(TileRule::new(id), |r, &d| r.allow(d, all.iter().copied()))
            })
            .collect();
        RuleTable::new(rules).unwrap()
    }

    #[test]
    fn test_index_position_roundtrip() {
        let solver = Solver::new(3, 4, 5, free_tiles(2), 0);
        for i in 0..60 {
            let (x, y, z) = solver.position(i);
            assert!(x < 3 && y < 4 && z < 5);
            assert_eq!(solver.index(x, y, z), i);
        }
        assert_eq!(solver.index(1, 2, 3), 1 + 2 * 3 + 3 * 12);
    }

    #[test]
    fn test_new_starts_full_and_active() {
        let solver = Solver::new(2, 2, 2, free_tiles(3), 7);
        assert_eq!(solver.state(), SolverState::Active);
        assert_eq!(solver.dims(), (2, 2, 2));
        assert_eq!(solver.cell(1, 1, 1).entropy(), 3);
        assert_eq!(solver.collapsed_count(), 0);
        assert!(!solver.is_complete());
    }

    #[test]
    fn test_unconstrained_grid_completes() {
        let mut solver = Solver::new(4, 3, 2, free_tiles(3), 11);
        let steps = solver.run(usize::MAX);
        assert_eq!(steps, 24);
        assert!(solver.is_complete());
        assert!(solver.collapsed_tiles().iter().all(|t| t.is_some()));
        assert!(!solver.step(), "nothing left to collapse");
        assert!(!solver.is_failed());
    }

    #[test]
    fn test_run_respects_step_cap() {
        let mut solver = Solver::new(4, 4, 1, free_tiles(2), 3);
        assert_eq!(solver.run(5), 5);
        assert_eq!(solver.collapsed_count(), 5);
    }

    #[test]
    fn test_zero_total_weight_picks_last_option() {
        let rules = free_tiles(3);
        let rules: Vec<TileRule> = rules
            .iter()
            .cloned()
            .map(|r| r.with_weight(0.0))
            .collect();
        let mut solver = Solver::new(1, 1, 1, RuleTable::new(rules).unwrap(), 5);
        assert!(solver.step());
        assert_eq!(solver.cell(0, 0, 0).collapsed_tile(), Some(2));

        solver.reset();
        assert!(solver.ban_tile(0, 0, 0, 2));
        assert!(solver.step());
        assert_eq!(solver.cell(0, 0, 0).collapsed_tile(), Some(1));
    }

    #[test]
    fn test_bias_can_exclude_tiles() {
        let mut solver = Solver::new(3, 3, 1, free_tiles(3), 9);
        solver.set_weight_bias(|tile: TileId, _x: usize, _y: usize, _z: usize| {
            if tile == 1 {
                1.0
            } else {
                0.0
            }
        });
        solver.run(usize::MAX);
        assert!(solver.is_complete());
        assert!(solver.collapsed_tiles().iter().all(|&t| t == Some(1)));
    }

    #[test]
    fn test_negative_bias_is_treated_as_zero() {
        let mut solver = Solver::new(2, 1, 1, free_tiles(2), 1);
        solver.set_weight_bias(|tile: TileId, _x: usize, _y: usize, _z: usize| {
            if tile == 0 {
                -5.0
            } else {
                2.0
            }
        });
        solver.run(usize::MAX);
        assert_eq!(solver.collapsed_tiles(), vec![Some(1), Some(1)]);

        solver.clear_weight_bias();
        solver.reset();
        assert_eq!(solver.run(usize::MAX), 2);
    }

    #[test]
    fn test_out_of_range_tile_edits() {
        let mut solver = Solver::new(1, 1, 1, free_tiles(2), 0);
        assert!(!solver.force_collapse(0, 0, 0, 5));
        assert!(solver.ban_tile(0, 0, 0, 5));
        assert_eq!(solver.cell(0, 0, 0).entropy(), 2);
        assert!(!solver.is_failed());
    }

    /// A (0) wants B on +X; C (2) accepts only A or C on its -X side.
    fn one_sided_tiles() -> RuleTable {
        let mut rules: Vec<TileRule> = free_tiles(3).iter().cloned().collect();
        rules[0].neighbors[Direction::PosX.index()] = [1].into_iter().collect();
        rules[2].neighbors[Direction::NegX.index()] = [0, 2].into_iter().collect();
        RuleTable::new(rules).unwrap()
    }

    #[test]
    fn test_narrowed_cell_is_rechecked() {
        let mut solver = Solver::new(3, 1, 1, one_sided_tiles(), 0);
        assert!(solver.force_collapse(0, 0, 0, 0));

        // Propagation leaves only B in the middle without collapsing it
        let middle = solver.cell(1, 0, 0);
        assert_eq!(middle.tiles().collect::<Vec<_>>(), vec![1]);
        assert!(!middle.is_collapsed());
        assert!(!solver.is_complete());

        // C refuses B on its -X side, so placing it empties the middle cell
        assert!(!solver.force_collapse(2, 0, 0, 2));
        assert!(solver.is_failed());
        assert!(!solver.is_complete());
        assert_eq!(solver.cell(1, 0, 0).entropy(), 0);
    }

    #[test]
    fn test_narrowed_cell_is_still_observed() {
        let mut solver = Solver::new(2, 1, 1, one_sided_tiles(), 0);
        assert!(solver.force_collapse(0, 0, 0, 0));
        assert_eq!(solver.collapsed_count(), 1);
        assert_eq!(solver.collapsed_tiles(), vec![Some(0), None]);

        assert!(solver.step());
        assert_eq!(solver.collapsed_tiles(), vec![Some(0), Some(1)]);
        assert!(solver.is_complete());
        assert!(!solver.step());
    }

    #[test]
    fn test_ban_to_one_tile_collapses() {
        let mut solver = Solver::new(1, 1, 1, free_tiles(3), 0);
        assert!(solver.ban_tile(0, 0, 0, 0));
        assert!(!solver.cell(0, 0, 0).is_collapsed());
        assert!(solver.ban_tile(0, 0, 0, 2));
        assert_eq!(solver.cell(0, 0, 0).collapsed_tile(), Some(1));
        assert!(solver.is_complete());
    }

    #[test]
    fn test_worklist_is_clean_between_calls() {
        // Tile 0 only tolerates itself along X; tile 1 is free
        let mut rules: Vec<TileRule> = free_tiles(2).iter().cloned().collect();
        rules[0].neighbors[Direction::NegX.index()] = [0].into_iter().collect();
        rules[0].neighbors[Direction::PosX.index()] = [0].into_iter().collect();
        let mut solver = Solver::new(3, 1, 1, RuleTable::new(rules).unwrap(), 0);

        assert!(solver.force_collapse(2, 0, 0, 1));
        assert!(solver.queue.is_empty());
        assert!(solver.queued.iter().all(|&q| !q));

        // -X narrows (0,0,0) and queues it, then +X empties (2,0,0)
        assert!(!solver.force_collapse(1, 0, 0, 0));
        assert!(solver.is_failed());
        assert_eq!(solver.cell(0, 0, 0).tiles().collect::<Vec<_>>(), vec![0]);
        assert!(solver.queue.is_empty());
        assert!(solver.queued.iter().all(|&q| !q));

        solver.reset();
        assert!(solver.force_collapse(0, 0, 0, 0));
        assert_eq!(solver.cell(1, 0, 0).tiles().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_empty_grid_is_trivially_complete() {
        let mut solver = Solver::new(0, 4, 4, free_tiles(2), 0);
        assert!(!solver.step());
        assert!(solver.is_complete());
        assert!(solver.collapsed_tiles().is_empty());
    }
}
