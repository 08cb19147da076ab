//! Stick and keyboard input, reduced to one command record per frame.
//!
//! The host application owns the devices. It reports key transitions and the
//! current stick position here, and the simulator pulls a [`ControlInput`]
//! with [`InputNormalizer::sample`] once per frame.

use bevy::input::ButtonInput;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Stick magnitudes below this are treated as exactly zero.
pub const DEADZONE: f64 = 0.1;

/// One frame of pilot commands.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ControlInput {
    /// Throttle, 0..=1.
    pub thrust: f64,
    /// -1..=1, positive turns the nose left.
    pub yaw: f64,
    /// -1..=1, positive raises the nose.
    pub pitch: f64,
    /// -1..=1, positive raises the right side.
    pub roll: f64,
    pub mode_toggle_requested: bool,
}

impl ControlInput {
    /// Copy with every axis forced into its documented range. NaN reads as zero.
    pub fn sanitized(&self) -> Self {
        fn axis(v: f64, lo: f64) -> f64 {
            if v.is_nan() { 0.0 } else { v.clamp(lo, 1.0) }
        }
        ControlInput {
            thrust: axis(self.thrust, 0.0),
            yaw: axis(self.yaw, -1.0),
            pitch: axis(self.pitch, -1.0),
            roll: axis(self.roll, -1.0),
            mode_toggle_requested: self.mode_toggle_requested,
        }
    }
}

/// Logical flight controls a physical key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightKey {
    ThrottleUp,
    ThrottleCut,
    PitchUp,
    PitchDown,
    RollLeft,
    RollRight,
    YawLeft,
    YawRight,
    ModeToggle,
}

impl FlightKey {
    pub const ALL: [FlightKey; 9] = [
        FlightKey::ThrottleUp,
        FlightKey::ThrottleCut,
        FlightKey::PitchUp,
        FlightKey::PitchDown,
        FlightKey::RollLeft,
        FlightKey::RollRight,
        FlightKey::YawLeft,
        FlightKey::YawRight,
        FlightKey::ModeToggle,
    ];
}

/// Raw stick deflections in gamepad-API convention: each axis spans -1..=1
/// and pushing a stick away from the pilot reads negative.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StickAxes {
    pub left_x: f64,
    pub left_y: f64,
    pub right_x: f64,
    pub right_y: f64,
}

impl StickAxes {
    fn to_control(self) -> ControlInput {
        ControlInput {
            thrust: ((-self.left_y + 1.0) / 2.0).clamp(0.0, 1.0),
            yaw: (-self.left_x).clamp(-1.0, 1.0),
            pitch: self.right_y.clamp(-1.0, 1.0),
            roll: self.right_x.clamp(-1.0, 1.0),
            mode_toggle_requested: false,
        }
    }
}

fn apply_deadzone(value: f64) -> f64 {
    if value.abs() < DEADZONE { 0.0 } else { value }
}

#[derive(Resource, Debug, Default)]
pub struct InputNormalizer {
    keys: ButtonInput<FlightKey>,
    analog: Option<StickAxes>,
}

impl InputNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: FlightKey) {
        self.keys.press(key);
    }

    pub fn release(&mut self, key: FlightKey) {
        self.keys.release(key);
    }

    /// Drop every held key, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.keys.release_all();
    }

    pub fn is_pressed(&self, key: FlightKey) -> bool {
        self.keys.pressed(key)
    }

    /// Report the current stick position. While a stick is attached it
    /// replaces keyboard input entirely.
    pub fn attach_analog(&mut self, axes: StickAxes) {
        if self.analog.is_none() {
            debug!("Analog input attached");
        }
        self.analog = Some(axes);
    }

    pub fn detach_analog(&mut self) {
        if self.analog.take().is_some() {
            debug!("Analog input detached, falling back to keyboard");
        }
    }

    pub fn has_analog(&self) -> bool {
        self.analog.is_some()
    }

    /// Produce this frame's command record and consume any pending mode toggle.
    pub fn sample(&mut self) -> ControlInput {
        let mut input = match self.analog {
            Some(axes) => axes.to_control(),
            None => self.discrete(),
        };
        input.yaw = apply_deadzone(input.yaw);
        input.pitch = apply_deadzone(input.pitch);
        input.roll = apply_deadzone(input.roll);
        input.mode_toggle_requested = self.keys.just_pressed(FlightKey::ModeToggle);

        // Held keys stay held; only the press edges are consumed.
        self.keys.clear();
        input
    }

    fn discrete(&self) -> ControlInput {
        let mut thrust = 0.0;
        if self.keys.pressed(FlightKey::ThrottleUp) {
            thrust = 1.0;
        }
        if self.keys.pressed(FlightKey::ThrottleCut) {
            thrust = 0.0;
        }

        ControlInput {
            thrust,
            yaw: self.key_pair(FlightKey::YawLeft, FlightKey::YawRight),
            pitch: self.key_pair(FlightKey::PitchUp, FlightKey::PitchDown),
            roll: self.key_pair(FlightKey::RollLeft, FlightKey::RollRight),
            mode_toggle_requested: false,
        }
    }

    fn key_pair(&self, positive: FlightKey, negative: FlightKey) -> f64 {
        match (self.keys.pressed(positive), self.keys.pressed(negative)) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }
}
