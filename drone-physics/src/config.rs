//! Vehicle tuning parameters.

use std::path::Path;

use bevy::prelude::*;
use na::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{FlightError, Result};

/// Immutable description of the airframe, read by every control law.
///
/// Units follow a normalized-mass convention: thrust is an acceleration, so
/// `mass` and `angular_drag` only document the airframe and are not read by
/// the integrator.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Thrust acceleration at full throttle, units/s².
    pub max_thrust: f64,
    pub mass: f64,
    /// Linear drag coefficient, 1/s.
    pub linear_drag: f64,
    pub angular_drag: f64,
    /// Angular rate at full stick deflection, rad/s.
    pub acro_rate: f64,
    /// Maximum commanded pitch/roll in level mode, radians.
    pub level_angle_limit: f64,
    /// Proportional gain of the level-mode angle controller, 1/s.
    pub level_gain: f64,
    /// Magnitude of gravity, applied along -Y.
    pub gravity: f64,
    /// Minimum lookahead distance for the collision ray.
    pub collision_radius: f64,
    /// Lowest height the vehicle may occupy.
    pub ground_clearance: f64,
    /// Camera mount position in the body frame.
    pub camera_offset: Vector3<f64>,
    /// Upper bound on linear speed, keeps the state finite under extreme input.
    pub max_speed: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        VehicleConfig {
            max_thrust: 20.0,
            mass: 1.0,
            linear_drag: 0.3,
            angular_drag: 2.0,
            acro_rate: 4.0,
            level_angle_limit: 0.6,
            level_gain: 5.0,
            gravity: 9.81,
            collision_radius: 0.5,
            ground_clearance: 0.2,
            // Slightly ahead of and above the body origin. Forward is -Z.
            camera_offset: Vector3::new(0.0, 0.1, -0.2),
            max_speed: 120.0,
        }
    }
}

impl VehicleConfig {
    /// Parse a config from JSON. Missing fields take their default values.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: VehicleConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!("Loaded vehicle config from {}", path.display());
        Ok(config)
    }

    /// Check every field for values the integrator cannot handle.
    pub fn validate(&self) -> Result<()> {
        non_negative("max_thrust", self.max_thrust)?;
        positive("mass", self.mass)?;
        non_negative("linear_drag", self.linear_drag)?;
        non_negative("angular_drag", self.angular_drag)?;
        non_negative("acro_rate", self.acro_rate)?;
        positive("level_angle_limit", self.level_angle_limit)?;
        if self.level_angle_limit > std::f64::consts::FRAC_PI_2 {
            return Err(invalid("level_angle_limit", "must not exceed pi/2"));
        }
        non_negative("level_gain", self.level_gain)?;
        non_negative("gravity", self.gravity)?;
        positive("collision_radius", self.collision_radius)?;
        finite("ground_clearance", self.ground_clearance)?;
        if !self.camera_offset.iter().all(|c| c.is_finite()) {
            return Err(invalid("camera_offset", "must be finite"));
        }
        positive("max_speed", self.max_speed)?;
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> FlightError {
    FlightError::InvalidConfig {
        field,
        reason: reason.to_string(),
    }
}

fn finite(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, "must be finite"))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<()> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(invalid(field, "must be non-negative"));
    }
    Ok(())
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(invalid(field, "must be positive"));
    }
    Ok(())
}
