//! Per-tick generation driver.
//!
//! The solver has no notion of time, so a long run would block whatever
//! calls it. `WfcGenerationPlugin` spreads the work across app updates: each
//! `Update` runs at most `steps_per_tick` steps on the `WfcGeneration`
//! resource and records whether generation is still running.
//!
//! ## Usage
//!
//! ```ignore
//! let config = GenerationConfig::default();
//! App::new()
//!     .add_plugins(WfcGenerationPlugin)
//!     .insert_resource(WfcGeneration::new(config.build_solver(geology_rules()), &config))
//!     .run();
//! ```

use crate::config::GenerationConfig;
use crate::solver::Solver;
use bevy::log::{info, warn};
use bevy::prelude::*;

/// Where a generation run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    /// Cells remain to be collapsed
    Running,
    /// Every cell resolved
    Complete,
    /// The solver hit a contradiction
    Failed,
    /// `max_ticks` elapsed before completion
    TimedOut,
}

/// A solver plus its per-tick budget.
#[derive(Resource)]
pub struct WfcGeneration {
    pub solver: Solver,
    /// Maximum `step()` calls per tick
    pub steps_per_tick: usize,
    /// Give up after this many ticks
    pub max_ticks: Option<u64>,
    status: GenerationStatus,
    ticks: u64,
    total_steps: usize,
}

impl WfcGeneration {
    pub fn new(solver: Solver, config: &GenerationConfig) -> Self {
        Self {
            solver,
            steps_per_tick: config.steps_per_tick,
            max_ticks: config.max_ticks,
            status: GenerationStatus::Running,
            ticks: 0,
            total_steps: 0,
        }
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Cells collapsed by `step()` since the last restart.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn is_finished(&self) -> bool {
        self.status != GenerationStatus::Running
    }

    /// Reset the solver and start counting again.
    pub fn restart(&mut self) {
        self.solver.reset();
        self.status = GenerationStatus::Running;
        self.ticks = 0;
        self.total_steps = 0;
    }

    /// Run one tick worth of steps and update the status.
    pub fn tick(&mut self) -> GenerationStatus {
        if self.status != GenerationStatus::Running {
            return self.status;
        }

        let mut steps = 0;
        let mut exhausted = false;
        while steps < self.steps_per_tick {
            if !self.solver.step() {
                exhausted = true;
                break;
            }
            steps += 1;
            if self.solver.is_failed() {
                break;
            }
        }
        self.ticks += 1;
        self.total_steps += steps;

        if self.solver.is_failed() {
            self.status = GenerationStatus::Failed;
            info!(
                "WFC generation failed after {} steps ({} ticks)",
                self.total_steps, self.ticks
            );
        } else if exhausted {
            self.status = GenerationStatus::Complete;
            info!(
                "WFC generation complete after {} steps ({} ticks)",
                self.total_steps, self.ticks
            );
        } else if self.max_ticks.is_some_and(|max| self.ticks >= max) {
            self.status = GenerationStatus::TimedOut;
            warn!(
                "WFC generation stopped after {} ticks with {} cells collapsed",
                self.ticks,
                self.solver.collapsed_count()
            );
        }
        self.status
    }
}

/// System that advances generation by one tick.
fn step_generation(generation: Option<ResMut<WfcGeneration>>) {
    if let Some(mut generation) = generation {
        if !generation.is_finished() {
            generation.tick();
        }
    }
}

/// Plugin that steps a `WfcGeneration` resource every `Update`.
///
/// Does nothing until the resource is inserted.
pub struct WfcGenerationPlugin;

impl Plugin for WfcGenerationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, step_generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::Direction;
    use crate::rules::{RuleTable, TileRule};

    fn free_rules() -> RuleTable {
        let rules = (0..2)
            .map(|i| {
                Direction::ALL
                    .iter()
                    .fold(TileRule::new(i), |r, &d| r.allow(d, 0..2))
            })
            .collect();
        RuleTable::new(rules).unwrap()
    }

    fn config(steps_per_tick: usize, max_ticks: Option<u64>) -> GenerationConfig {
        GenerationConfig {
            width: 4,
            height: 4,
            depth: 2,
            seed: 5,
            steps_per_tick,
            max_ticks,
        }
    }

    #[test]
    fn test_tick_respects_budget() {
        let config = config(10, None);
        let mut generation = WfcGeneration::new(config.build_solver(free_rules()), &config);

        assert_eq!(generation.tick(), GenerationStatus::Running);
        assert_eq!(generation.solver.collapsed_count(), 10);
        assert_eq!(generation.tick(), GenerationStatus::Running);
        assert_eq!(generation.solver.collapsed_count(), 20);

        // 32 cells: the fourth tick collapses the last two and stops early
        assert_eq!(generation.tick(), GenerationStatus::Running);
        assert_eq!(generation.tick(), GenerationStatus::Complete);
        assert_eq!(generation.total_steps(), 32);
        assert_eq!(generation.ticks(), 4);
        assert!(generation.solver.is_complete());
    }

    #[test]
    fn test_tick_times_out() {
        let config = config(3, Some(2));
        let mut generation = WfcGeneration::new(config.build_solver(free_rules()), &config);
        generation.tick();
        assert_eq!(generation.tick(), GenerationStatus::TimedOut);
        assert_eq!(generation.tick(), GenerationStatus::TimedOut);
        assert_eq!(generation.total_steps(), 6);

        generation.restart();
        assert_eq!(generation.status(), GenerationStatus::Running);
        assert_eq!(generation.solver.collapsed_count(), 0);
    }

    #[test]
    fn test_tick_reports_failure() {
        let config = config(10, None);
        let mut generation = WfcGeneration::new(config.build_solver(free_rules()), &config);
        generation.solver.ban_tile(0, 0, 0, 0);
        generation.solver.ban_tile(0, 0, 0, 1);
        assert_eq!(generation.tick(), GenerationStatus::Failed);
        assert_eq!(generation.total_steps(), 0);
    }

    #[test]
    fn test_plugin_drives_generation() {
        let config = config(8, None);
        let mut app = App::new();
        app.add_plugins(WfcGenerationPlugin)
            .insert_resource(WfcGeneration::new(config.build_solver(free_rules()), &config));

        for _ in 0..10 {
            app.update();
        }

        let generation = app.world().resource::<WfcGeneration>();
        assert_eq!(generation.status(), GenerationStatus::Complete);
        assert_eq!(generation.ticks(), 5);
        assert!(generation.solver.is_complete());
    }
}
