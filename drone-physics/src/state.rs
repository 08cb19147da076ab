//! Kinematic state of the vehicle.

use bevy::prelude::*;
use na::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Which control law turns stick input into angular velocity.
#[derive(Resource, Component, Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightMode {
    /// Rate control: deflection commands an angular velocity.
    #[default]
    Acro,
    /// Angle control: pitch/roll deflection commands an attitude, yaw stays rate.
    Level,
}

impl FlightMode {
    pub fn toggled(self) -> Self {
        match self {
            FlightMode::Acro => FlightMode::Level,
            FlightMode::Level => FlightMode::Acro,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FlightMode::Acro => "ACRO",
            FlightMode::Level => "LEVEL",
        }
    }
}

#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// World-space position.
    pub position: Point3<f64>,
    /// Orientation: body -> world
    pub orientation: UnitQuaternion<f64>,
    /// World-space velocity, units/s.
    pub linear_velocity: Vector3<f64>,
    /// Body-frame angular velocity, rad/s: x = pitch, y = yaw, z = roll.
    pub angular_velocity: Vector3<f64>,
    pub mode: FlightMode,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::at_rest(Point3::origin())
    }
}

impl VehicleState {
    /// A level, motionless vehicle at `position`.
    pub fn at_rest(position: Point3<f64>) -> Self {
        VehicleState {
            position,
            orientation: UnitQuaternion::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            mode: FlightMode::default(),
        }
    }

    pub fn speed(&self) -> f64 {
        self.linear_velocity.norm()
    }

    /// True when no component of the state has gone NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
            && self.orientation.coords.iter().all(|c| c.is_finite())
            && self.linear_velocity.iter().all(|c| c.is_finite())
            && self.angular_velocity.iter().all(|c| c.is_finite())
    }
}
