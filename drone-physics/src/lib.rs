//! Flight dynamics for a small stick-controlled drone.
//!
//! The crate owns the vehicle's kinematic state and nothing else: rendering,
//! device plumbing and scene management belong to the host. Each frame the
//! host samples an [`InputNormalizer`] and hands the result, along with the
//! frame time and whatever geometry is nearby, to [`Simulator::update`].

extern crate nalgebra as na;

pub mod attitude;
pub mod collision;
pub mod config;
pub mod error;
pub mod input;
pub mod simulator;
pub mod state;

pub use attitude::{YawPitchRoll, rotate};
pub use collision::{BoxCollider, Collidable, SphereCollider, nearest_hit};
pub use config::VehicleConfig;
pub use error::FlightError;
pub use input::{ControlInput, FlightKey, InputNormalizer, StickAxes};
pub use simulator::{CameraPose, FrameReport, Simulator};
pub use state::{FlightMode, VehicleState};
