//! The per-frame flight step.

use bevy::prelude::*;
use na::{Point3, Unit, UnitQuaternion, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::attitude::{YawPitchRoll, rotate};
use crate::collision::{Collidable, nearest_hit};
use crate::config::VehicleConfig;
use crate::error::{FlightError, Result};
use crate::input::ControlInput;
use crate::state::{FlightMode, VehicleState};

/// Rate blend per second of the angular velocity toward its target.
const RATE_RESPONSE: f64 = 10.0;
/// Below this speed the collision ray is not cast.
const COLLISION_MIN_SPEED: f64 = 0.1;
/// Scale applied to velocity when the vehicle flies into something.
const CRASH_DAMPING: f64 = 0.5;
/// Bound of each component of the random tumble after a crash, rad/s.
const CRASH_TUMBLE: f64 = 5.0;
const GROUND_BOUNCE: f64 = 0.5;
const GROUND_FRICTION: f64 = 0.8;
/// Longest step integrated in one call, matching bevy's virtual clock cap.
pub const MAX_TIMESTEP: f64 = 0.25;

/// Where the camera should sit this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraPose {
    pub position: Point3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

/// What happened during one call to [`Simulator::update`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Distance to the surface that triggered the crash impulse, if one fired.
    pub crash_distance: Option<f64>,
    /// The vehicle was pushed back up to the ground clearance.
    pub ground_contact: bool,
}

impl FrameReport {
    pub fn crashed(&self) -> bool {
        self.crash_distance.is_some()
    }
}

/// Owns the vehicle state and advances it one frame at a time.
#[derive(Resource)]
pub struct Simulator {
    config: VehicleConfig,
    state: VehicleState,
    rng: ChaCha8Rng,
}

impl Simulator {
    /// Build a simulator with an entropy-seeded tumble generator.
    pub fn new(config: VehicleConfig) -> Result<Self> {
        Self::build(config, ChaCha8Rng::from_entropy())
    }

    /// Build a simulator whose crash tumble is reproducible.
    pub fn with_seed(config: VehicleConfig, seed: u64) -> Result<Self> {
        Self::build(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn build(config: VehicleConfig, rng: ChaCha8Rng) -> Result<Self> {
        if let Err(e) = config.validate() {
            warn!("Rejected vehicle config: {}", e);
            return Err(e);
        }
        let state = VehicleState::at_rest(Point3::new(0.0, config.ground_clearance, 0.0));
        Ok(Simulator { config, state, rng })
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Replace the state wholesale, e.g. on restart.
    pub fn reset(&mut self, mut state: VehicleState) {
        state.position.y = state.position.y.max(self.config.ground_clearance);
        state.orientation.renormalize();
        self.state = state;
    }

    pub fn mode(&self) -> FlightMode {
        self.state.mode
    }

    pub fn set_mode(&mut self, mode: FlightMode) {
        if self.state.mode != mode {
            info!("Flight mode {} -> {}", self.state.mode.label(), mode.label());
        }
        self.state.mode = mode;
    }

    pub fn toggle_mode(&mut self) {
        self.set_mode(self.state.mode.toggled());
    }

    /// Advance the vehicle by `dt` seconds.
    ///
    /// A zero `dt` is a no-op. Negative or non-finite `dt` is rejected.
    /// Steps longer than [`MAX_TIMESTEP`] are integrated as `MAX_TIMESTEP`.
    pub fn update(
        &mut self,
        dt: f64,
        input: &ControlInput,
        collidables: &[&dyn Collidable],
    ) -> Result<FrameReport> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(FlightError::InvalidTimestep(dt));
        }
        let mut report = FrameReport::default();
        if dt == 0.0 {
            return Ok(report);
        }
        if dt > MAX_TIMESTEP {
            debug!("Clamping {:.3}s step to {:.3}s", dt, MAX_TIMESTEP);
        }
        let dt = dt.min(MAX_TIMESTEP);
        let input = input.sanitized();
        let cfg = &self.config;
        let state = &mut self.state;
        let rng = &mut self.rng;

        // 1. Angular velocity from the active control law.
        state.angular_velocity = angular_velocity(cfg, state, &input, dt);

        // 2. Attitude.
        state.orientation = rotate(&state.orientation, &state.angular_velocity, dt);

        // 3-4. Thrust along body up, gravity, linear drag.
        let thrust = state.orientation * Vector3::y() * (input.thrust * cfg.max_thrust);
        let gravity = Vector3::new(0.0, -cfg.gravity, 0.0);
        let drag = state.linear_velocity * -cfg.linear_drag;
        let accel = gravity + thrust + drag;

        // 5. Forward Euler velocity step.
        state.linear_velocity += accel * dt;
        state.linear_velocity = limit_speed(state.linear_velocity, cfg.max_speed);

        // 6. Lookahead along the direction of travel.
        let speed = state.linear_velocity.norm();
        if speed > COLLISION_MIN_SPEED && !collidables.is_empty() {
            let direction = Unit::new_unchecked(state.linear_velocity / speed);
            let lookahead = cfg.collision_radius.max(speed * dt * 2.0);
            if let Some(distance) = nearest_hit(collidables, &state.position, &direction) {
                if distance < lookahead {
                    state.linear_velocity *= -CRASH_DAMPING;
                    state.angular_velocity =
                        Vector3::from_fn(|_, _| rng.gen_range(-CRASH_TUMBLE..=CRASH_TUMBLE));
                    debug!(
                        "Crash at {:.3} (lookahead {:.3}), speed {:.2}",
                        distance, lookahead, speed
                    );
                    report.crash_distance = Some(distance);
                }
            }
        }

        // 7. Position.
        state.position += state.linear_velocity * dt;

        // 8. Ground plane.
        if state.position.y < cfg.ground_clearance {
            state.position.y = cfg.ground_clearance;
            if state.linear_velocity.y < 0.0 {
                state.linear_velocity.y *= -GROUND_BOUNCE;
            }
            state.linear_velocity.x *= GROUND_FRICTION;
            state.linear_velocity.z *= GROUND_FRICTION;
            report.ground_contact = true;
        }

        guard_finite(state, cfg);
        Ok(report)
    }

    /// Camera mount position and heading for the current state.
    pub fn camera_pose(&self) -> CameraPose {
        CameraPose {
            position: self.state.position + self.state.orientation * self.config.camera_offset,
            orientation: self.state.orientation,
        }
    }
}

/// Scale `v` down to at most `max_speed`. A velocity whose norm overflows
/// keeps its heading; one with no usable heading is zeroed.
fn limit_speed(v: Vector3<f64>, max_speed: f64) -> Vector3<f64> {
    let speed = v.norm();
    if speed.is_finite() {
        return if speed > max_speed { v * (max_speed / speed) } else { v };
    }

    let largest = v.amax();
    let heading = if largest.is_finite() {
        v / largest
    } else {
        v.map(|c| if c.is_infinite() { c.signum() } else { 0.0 })
    };
    match Unit::try_new(heading, f64::EPSILON) {
        Some(dir) if dir.iter().all(|c| c.is_finite()) => dir.into_inner() * max_speed,
        _ => Vector3::zeros(),
    }
}

fn angular_velocity(
    cfg: &VehicleConfig,
    state: &VehicleState,
    input: &ControlInput,
    dt: f64,
) -> Vector3<f64> {
    let blend = (dt * RATE_RESPONSE).min(1.0);
    let current = state.angular_velocity;

    match state.mode {
        FlightMode::Acro => {
            let target = Vector3::new(input.pitch, input.yaw, input.roll) * cfg.acro_rate;
            current.lerp(&target, blend)
        }
        FlightMode::Level => {
            // Yaw keeps the acro rate law; only pitch and roll seek an angle.
            let yaw_rate = lerp(current.y, input.yaw * cfg.acro_rate, blend);
            let angles = YawPitchRoll::from_quaternion(&state.orientation);
            let target_pitch = input.pitch * cfg.level_angle_limit;
            let target_roll = input.roll * cfg.level_angle_limit;
            Vector3::new(
                (target_pitch - angles.pitch) * cfg.level_gain,
                yaw_rate,
                (target_roll - angles.roll) * cfg.level_gain,
            )
        }
    }
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Last line of defence against NaN reaching the renderer.
fn guard_finite(state: &mut VehicleState, cfg: &VehicleConfig) {
    if state.is_finite() {
        return;
    }
    debug_assert!(false, "vehicle state went non-finite: {:?}", state);
    error!("Vehicle state went non-finite, zeroing motion: {:?}", state);
    state.linear_velocity = Vector3::zeros();
    state.angular_velocity = Vector3::zeros();
    if !state.orientation.coords.iter().all(|c| c.is_finite()) {
        state.orientation = UnitQuaternion::identity();
    }
    if !state.position.iter().all(|c| c.is_finite()) {
        state.position = Point3::new(0.0, cfg.ground_clearance, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::SphereCollider;
    use approx::assert_relative_eq;

    const DT: f64 = 1.0 / 60.0;

    fn sim() -> Simulator {
        Simulator::with_seed(VehicleConfig::default(), 7).unwrap()
    }

    fn airborne(sim: &mut Simulator, height: f64) {
        sim.reset(VehicleState::at_rest(Point3::new(0.0, height, 0.0)));
    }

    /// Always reports a hit at a fixed distance.
    struct FixedHit(f64);

    impl Collidable for FixedHit {
        fn cast_ray(&self, _: &Point3<f64>, _: &Unit<Vector3<f64>>) -> Option<f64> {
            Some(self.0)
        }
    }

    #[test]
    fn rejects_bad_timesteps() {
        let mut sim = sim();
        let input = ControlInput::default();
        assert!(matches!(
            sim.update(-0.01, &input, &[]),
            Err(FlightError::InvalidTimestep(_))
        ));
        assert!(sim.update(f64::NAN, &input, &[]).is_err());
        assert!(sim.update(f64::INFINITY, &input, &[]).is_err());
    }

    #[test]
    fn huge_timestep_stays_finite() {
        let mut sim = sim();
        airborne(&mut sim, 5.0);
        let input = ControlInput {
            thrust: 1.0,
            pitch: 1.0,
            ..Default::default()
        };
        for dt in [1e6, 1e306, f64::MAX] {
            sim.update(dt, &input, &[&FixedHit(1e300)]).unwrap();
            let state = sim.state();
            assert!(state.is_finite(), "dt {} left {:?}", dt, state);
            assert!(state.speed() <= sim.config().max_speed + 1e-9);
            assert!(state.position.y >= sim.config().ground_clearance);
        }
    }

    #[test]
    fn overflowing_velocity_keeps_heading() {
        let limited = limit_speed(Vector3::new(1.5e308, -1.5e308, 0.0), 120.0);
        assert_relative_eq!(limited.norm(), 120.0, epsilon = 1e-9);
        assert!(limited.x > 0.0 && limited.y < 0.0);
        assert_relative_eq!(limited.x, -limited.y, epsilon = 1e-9);

        let limited = limit_speed(Vector3::new(0.0, f64::NEG_INFINITY, 3.0), 120.0);
        assert_eq!(limited, Vector3::new(0.0, -120.0, 0.0));

        let limited = limit_speed(Vector3::new(f64::NAN, f64::NAN, f64::NAN), 120.0);
        assert_eq!(limited, Vector3::zeros());

        let slow = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(limit_speed(slow, 120.0), slow);
    }

    #[test]
    fn zero_timestep_changes_nothing() {
        let mut sim = sim();
        airborne(&mut sim, 5.0);
        let before = sim.state().clone();
        let input = ControlInput {
            thrust: 1.0,
            pitch: 1.0,
            ..Default::default()
        };
        sim.update(0.0, &input, &[]).unwrap();
        assert_eq!(sim.state(), &before);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = VehicleConfig {
            max_thrust: f64::INFINITY,
            ..Default::default()
        };
        assert!(Simulator::new(config).is_err());
    }

    #[test]
    fn acro_rate_blends_toward_target() {
        let mut sim = sim();
        airborne(&mut sim, 50.0);
        let input = ControlInput {
            pitch: 1.0,
            ..Default::default()
        };
        sim.update(DT, &input, &[]).unwrap();
        let expected = VehicleConfig::default().acro_rate * (DT * RATE_RESPONSE);
        assert_relative_eq!(sim.state().angular_velocity.x, expected, epsilon = 1e-12);

        // A full-frame blend reaches the target outright.
        sim.update(0.2, &input, &[]).unwrap();
        assert_relative_eq!(
            sim.state().angular_velocity.x,
            VehicleConfig::default().acro_rate,
            epsilon = 1e-12
        );
    }

    #[test]
    fn level_mode_drives_pitch_toward_limit() {
        let mut sim = sim();
        airborne(&mut sim, 50.0);
        sim.set_mode(FlightMode::Level);
        let input = ControlInput {
            pitch: 1.0,
            thrust: 0.5,
            ..Default::default()
        };
        for _ in 0..600 {
            sim.update(DT, &input, &[]).unwrap();
        }
        let angles = YawPitchRoll::from_quaternion(&sim.state().orientation);
        assert_relative_eq!(
            angles.pitch,
            VehicleConfig::default().level_angle_limit,
            epsilon = 1e-3
        );
    }

    #[test]
    fn level_mode_returns_to_level_when_released() {
        let mut sim = sim();
        let tilted = VehicleState {
            orientation: YawPitchRoll {
                yaw: 1.0,
                pitch: 0.3,
                roll: -0.4,
            }
            .to_quaternion(),
            ..VehicleState::at_rest(Point3::new(0.0, 100.0, 0.0))
        };
        sim.reset(tilted);
        sim.set_mode(FlightMode::Level);
        for _ in 0..300 {
            sim.update(DT, &ControlInput::default(), &[]).unwrap();
        }
        let angles = YawPitchRoll::from_quaternion(&sim.state().orientation);
        assert!(angles.pitch.abs() < 1e-3, "pitch {}", angles.pitch);
        assert!(angles.roll.abs() < 1e-3, "roll {}", angles.roll);
    }

    #[test]
    fn full_throttle_climbs_and_gravity_falls() {
        let mut sim = sim();
        airborne(&mut sim, 10.0);
        let full = ControlInput {
            thrust: 1.0,
            ..Default::default()
        };
        sim.update(DT, &full, &[]).unwrap();
        assert!(sim.state().linear_velocity.y > 0.0);

        let mut sim = self::sim();
        airborne(&mut sim, 10.0);
        sim.update(DT, &ControlInput::default(), &[]).unwrap();
        assert_relative_eq!(
            sim.state().linear_velocity.y,
            -VehicleConfig::default().gravity * DT,
            epsilon = 1e-12
        );
    }

    #[test]
    fn crash_reflects_and_damps_velocity() {
        let mut sim = sim();
        let moving = VehicleState {
            linear_velocity: Vector3::new(0.0, 0.0, -10.0),
            ..VehicleState::at_rest(Point3::new(0.0, 20.0, 0.0))
        };
        sim.reset(moving);
        let wall = FixedHit(0.1);

        let report = sim.update(DT, &ControlInput::default(), &[&wall]).unwrap();
        assert!(report.crashed());
        let v = sim.state().linear_velocity;
        assert!(v.z > 0.0);
        assert!(sim.state().angular_velocity.iter().all(|w| w.abs() <= CRASH_TUMBLE));
    }

    #[test]
    fn distant_geometry_is_ignored() {
        let mut sim = sim();
        let moving = VehicleState {
            linear_velocity: Vector3::new(0.0, 0.0, -10.0),
            ..VehicleState::at_rest(Point3::new(0.0, 20.0, 0.0))
        };
        sim.reset(moving);
        let far = SphereCollider::new(Point3::new(0.0, 20.0, -50.0), 1.0);
        let report = sim.update(DT, &ControlInput::default(), &[&far]).unwrap();
        assert!(!report.crashed());
        assert!(sim.state().linear_velocity.z < 0.0);
    }

    #[test]
    fn slow_vehicle_skips_collision_ray() {
        let weightless = VehicleConfig {
            gravity: 0.0,
            ..Default::default()
        };
        let mut sim = Simulator::with_seed(weightless, 1).unwrap();
        airborne(&mut sim, 10.0);
        let report = sim
            .update(DT, &ControlInput::default(), &[&FixedHit(0.0)])
            .unwrap();
        assert!(!report.crashed());
        assert_eq!(sim.state().angular_velocity, Vector3::zeros());
    }

    #[test]
    fn ground_clamp_bounces_and_slows() {
        let mut sim = sim();
        let falling = VehicleState {
            linear_velocity: Vector3::new(4.0, -10.0, -2.0),
            ..VehicleState::at_rest(Point3::new(0.0, 0.25, 0.0))
        };
        sim.reset(falling);
        let report = sim.update(DT, &ControlInput::default(), &[]).unwrap();
        assert!(report.ground_contact);

        let state = sim.state();
        assert_eq!(state.position.y, 0.2);
        assert!(state.linear_velocity.y > 0.0);
        assert!(state.linear_velocity.x < 4.0 * GROUND_FRICTION + 1e-9);
        assert!(state.linear_velocity.z > -2.0 * GROUND_FRICTION - 1e-9);
    }

    #[test]
    fn camera_follows_orientation() {
        let mut sim = sim();
        let turned = VehicleState {
            orientation: UnitQuaternion::from_axis_angle(
                &Vector3::y_axis(),
                std::f64::consts::FRAC_PI_2,
            ),
            ..VehicleState::at_rest(Point3::new(1.0, 2.0, 3.0))
        };
        sim.reset(turned);
        let before = sim.state().clone();

        let pose = sim.camera_pose();
        let offset = VehicleConfig::default().camera_offset;
        // A quarter turn left maps body -Z onto world -X.
        assert_relative_eq!(
            pose.position,
            Point3::new(1.0 + offset.z, 2.0 + offset.y, 3.0 - offset.x),
            epsilon = 1e-12
        );
        assert_eq!(pose.orientation, before.orientation);
        assert_eq!(sim.state(), &before);
    }

    #[test]
    fn toggle_mode_flips_law() {
        let mut sim = sim();
        assert_eq!(sim.mode(), FlightMode::Acro);
        sim.toggle_mode();
        assert_eq!(sim.mode(), FlightMode::Level);
        sim.toggle_mode();
        assert_eq!(sim.mode(), FlightMode::Acro);
    }

    #[test]
    fn same_seed_same_tumble() {
        let run = |seed| {
            let mut sim = Simulator::with_seed(VehicleConfig::default(), seed).unwrap();
            sim.reset(VehicleState {
                linear_velocity: Vector3::new(5.0, 0.0, 0.0),
                ..VehicleState::at_rest(Point3::new(0.0, 10.0, 0.0))
            });
            sim.update(DT, &ControlInput::default(), &[&FixedHit(0.0)])
                .unwrap();
            sim.state().angular_velocity
        };
        assert_eq!(run(42), run(42));
    }
}
