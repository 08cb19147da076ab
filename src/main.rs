//! A small FPV drone simulator.
//!
//! Notably, we use Y-up right handed with the nose along -Z, the same frame
//! bevy renders in.

// Recommended alias.
extern crate nalgebra as na;

use std::path::Path;

use anyhow::Context;
use bevy::{log::LogPlugin, prelude::*};
use drone_physics::{Simulator, VehicleConfig};

mod drone;
mod scene;
mod ui;

/// Vehicle config read at startup when present.
const DEFAULT_CONFIG_PATH: &str = "assets/drone.json";

fn main() -> anyhow::Result<()> {
    let config = load_vehicle_config()?;
    let simulator = Simulator::new(config).context("building the flight simulator")?;

    App::new()
        .add_plugins(DefaultPlugins.set(LogPlugin {
            filter: "wgpu=error,naga=warn,dronesim=debug,drone_physics=debug".to_string(),
            ..default()
        }))
        .insert_resource(simulator)
        .add_plugins((scene::ScenePlugin, drone::DronePlugin, ui::UIPlugin))
        .run();
    Ok(())
}

/// Read the vehicle config named by `DRONESIM_CONFIG`, or the default path.
/// A missing default file just means stock tuning.
fn load_vehicle_config() -> anyhow::Result<VehicleConfig> {
    let (path, explicit) = match std::env::var("DRONESIM_CONFIG") {
        Ok(path) => (path, true),
        Err(_) => (DEFAULT_CONFIG_PATH.to_string(), false),
    };
    if !explicit && !Path::new(&path).exists() {
        return Ok(VehicleConfig::default());
    }
    VehicleConfig::load(&path).with_context(|| format!("loading vehicle config from {}", path))
}
