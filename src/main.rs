//! Headless strata generation.
//!
//! Usage: `strata_studio [config.json]`
//!
//! Generates a geology volume with the strata bias, stepping the solver
//! through `WfcGenerationPlugin`, then logs how many cells hold each tile.

use bevy::log::LogPlugin;
use bevy::prelude::*;
use strata_wfc::{
    geology_rules, GenerationConfig, GenerationStatus, StrataBias, VoxelAttributes, WfcGeneration,
    WfcGenerationPlugin,
};

fn main() {
    let mut app = App::new();
    app.add_plugins(LogPlugin::default())
        .add_plugins(WfcGenerationPlugin);

    let config = match std::env::args().nth(1) {
        Some(path) => match GenerationConfig::load(&path) {
            Ok(config) => {
                info!("Loaded generation config from {}", path);
                config
            }
            Err(e) => {
                error!("Failed to load config {}: {}", path, e);
                return;
            }
        },
        None => GenerationConfig::default(),
    };

    let mut solver = config.build_solver(geology_rules());
    solver.set_weight_bias(rolling_hills(&config));
    app.insert_resource(WfcGeneration::new(solver, &config));

    loop {
        app.update();
        let generation = app.world().resource::<WfcGeneration>();
        if generation.is_finished() {
            break;
        }
    }

    let generation = app.world().resource::<WfcGeneration>();
    if generation.status() != GenerationStatus::Complete {
        warn!("Generation ended as {:?}", generation.status());
    }
    log_histogram(generation);
}

/// Gently rolling surface with humidity rising along X and harder rock at depth.
fn rolling_hills(config: &GenerationConfig) -> StrataBias {
    let (mx, my, mz) = (config.width, config.height, config.depth);
    let top = my.saturating_sub(2).max(1) as f64;
    StrataBias::from_fn(
        mx,
        my,
        mz,
        |x, z| {
            let wave = (x as f64 * 0.2).sin() * 2.0 + (z as f64 * 0.15).cos() * 2.0;
            (my as f64 / 2.0 + wave).clamp(1.0, top) as usize
        },
        |x, y, _z| VoxelAttributes {
            hardness: 1.0 - y as f32 / my as f32,
            humidity: x as f32 / mx.max(1) as f32,
            water_amount: 0.0,
        },
    )
}

fn log_histogram(generation: &WfcGeneration) {
    let solver = &generation.solver;
    let mut counts = vec![0usize; solver.rules().len()];
    let mut open = 0;
    for tile in solver.collapsed_tiles() {
        match tile {
            Some(id) => counts[id] += 1,
            None => open += 1,
        }
    }

    info!(
        "{}x{}x{} volume after {} steps:",
        solver.width(),
        solver.height(),
        solver.depth(),
        generation.total_steps()
    );
    for (id, count) in counts.iter().enumerate() {
        info!("  {:>2} {:<16} {}", id, solver.tile(id).name, count);
    }
    if open > 0 {
        info!("  {} cells left uncollapsed", open);
    }
}
