//! The player's drone.
//!
//! All flight physics lives in `drone_physics`. This module wires bevy's
//! keyboard and gamepad state into the input normalizer, steps the simulator
//! once per rendered frame, and copies the resulting pose onto the drone mesh
//! and the first-person camera.

use bevy::prelude::*;
use drone_physics::{
    Collidable, ControlInput, FlightKey, InputNormalizer, Simulator, StickAxes, VehicleState,
};

use crate::scene::Obstacle;

/// Where the drone appears at startup and after a restart.
const SPAWN: [f64; 3] = [0.0, 0.2, 8.0];

#[derive(Component)]
pub struct DroneMarker;

#[derive(Component)]
pub struct MainCameraMarker;

/// Physical keys bound to each flight control.
#[derive(Resource, Clone, Debug)]
pub struct KeyBindings {
    pub keys: Vec<(KeyCode, FlightKey)>,
    pub gamepad_toggle: GamepadButton,
    pub restart: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            keys: vec![
                (KeyCode::Space, FlightKey::ThrottleUp),
                (KeyCode::ShiftLeft, FlightKey::ThrottleCut),
                (KeyCode::KeyS, FlightKey::PitchUp),
                (KeyCode::ArrowDown, FlightKey::PitchUp),
                (KeyCode::KeyW, FlightKey::PitchDown),
                (KeyCode::ArrowUp, FlightKey::PitchDown),
                (KeyCode::KeyA, FlightKey::RollLeft),
                (KeyCode::ArrowLeft, FlightKey::RollLeft),
                (KeyCode::KeyD, FlightKey::RollRight),
                (KeyCode::ArrowRight, FlightKey::RollRight),
                (KeyCode::KeyQ, FlightKey::YawLeft),
                (KeyCode::KeyE, FlightKey::YawRight),
                (KeyCode::KeyM, FlightKey::ModeToggle),
            ],
            gamepad_toggle: GamepadButton::North,
            restart: KeyCode::Backspace,
        }
    }
}

/// What the last flight step did, for the HUD.
#[derive(Resource, Debug, Default)]
pub struct FlightTelemetry {
    pub input: ControlInput,
    pub crashes: u32,
    pub ground_contact: bool,
}

#[derive(Default)]
pub struct DronePlugin;

impl Plugin for DronePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InputNormalizer>();
        app.init_resource::<KeyBindings>();
        app.init_resource::<FlightTelemetry>();
        app.add_systems(Startup, setup_drone);
        app.add_systems(
            Update,
            (
                release_on_focus_loss,
                read_devices,
                restart_on_key,
                step_flight,
                sync_drone_transform,
                follow_camera,
            )
                .chain(),
        );
    }
}

fn spawn_state() -> VehicleState {
    VehicleState::at_rest(na::Point3::from(SPAWN))
}

fn setup_drone(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut simulator: ResMut<Simulator>,
) {
    simulator.reset(spawn_state());

    let frame = materials.add(StandardMaterial {
        base_color: Color::srgb(0.15, 0.15, 0.18),
        perceptual_roughness: 0.6,
        ..default()
    });
    let rotor = materials.add(StandardMaterial {
        base_color: Color::srgb(0.9, 0.3, 0.1),
        ..default()
    });
    let rotor_mesh = meshes.add(Cylinder {
        radius: 0.12,
        half_height: 0.01,
    });

    let mut drone = commands.spawn((
        Name::new("Drone"),
        Mesh3d(meshes.add(Cuboid::new(0.3, 0.08, 0.3))),
        MeshMaterial3d(frame),
        Transform::default(),
        DroneMarker,
    ));
    for (x, z) in [(-0.2, -0.2), (0.2, -0.2), (-0.2, 0.2), (0.2, 0.2)] {
        drone.with_child((
            Mesh3d(rotor_mesh.clone()),
            MeshMaterial3d(rotor.clone()),
            Transform::from_xyz(x, 0.05, z),
        ));
    }

    commands.spawn((
        Camera3d::default(),
        Name::new("FPV Camera"),
        Projection::Perspective(PerspectiveProjection {
            fov: 100f32.to_radians(),
            near: 0.05,
            far: 2_000.0,
            ..default()
        }),
        Transform::default(),
        MainCameraMarker,
    ));
}

/// Translate bevy device state into normalizer calls.
fn read_devices(
    kb: Res<ButtonInput<KeyCode>>,
    gamepads: Query<&Gamepad>,
    bindings: Res<KeyBindings>,
    mut normalizer: ResMut<InputNormalizer>,
) {
    // The first connected pad wins.
    let pad = gamepads.iter().next();
    match pad {
        Some(pad) => {
            let axis = |a: GamepadAxis| pad.get(a).unwrap_or(0.0) as f64;
            // Bevy reports stick-up as positive; the normalizer expects the
            // gamepad-API convention where up is negative.
            normalizer.attach_analog(StickAxes {
                left_x: axis(GamepadAxis::LeftStickX),
                left_y: -axis(GamepadAxis::LeftStickY),
                right_x: axis(GamepadAxis::RightStickX),
                right_y: -axis(GamepadAxis::RightStickY),
            });
        }
        None => normalizer.detach_analog(),
    }

    let pad_toggle = pad.is_some_and(|pad| pad.pressed(bindings.gamepad_toggle));
    sync_flight_keys(&mut normalizer, &bindings, &kb, pad_toggle);
}

/// Hold each flight control while any of its bindings is down.
///
/// Several physical keys can share a control, so the held state is worked
/// out from all of them and only changes are passed on.
fn sync_flight_keys(
    normalizer: &mut InputNormalizer,
    bindings: &KeyBindings,
    kb: &ButtonInput<KeyCode>,
    pad_toggle: bool,
) {
    for key in FlightKey::ALL {
        let codes = bindings
            .keys
            .iter()
            .filter(|(_, bound)| *bound == key)
            .map(|(code, _)| *code);
        let mut held = kb.any_pressed(codes);
        if key == FlightKey::ModeToggle {
            held |= pad_toggle;
        }

        match (held, normalizer.is_pressed(key)) {
            (true, false) => normalizer.press(key),
            (false, true) => normalizer.release(key),
            _ => {}
        }
    }
}

/// Keys held while the window loses focus never see their release, so drop
/// them all.
fn release_on_focus_loss(
    windows: Query<&Window>,
    mut was_focused: Local<bool>,
    mut normalizer: ResMut<InputNormalizer>,
) {
    let focused = windows.iter().any(|w| w.focused);
    if *was_focused && !focused {
        debug!("Window lost focus, releasing flight keys");
        normalizer.release_all();
    }
    *was_focused = focused;
}

fn restart_on_key(
    kb: Res<ButtonInput<KeyCode>>,
    bindings: Res<KeyBindings>,
    mut simulator: ResMut<Simulator>,
    mut telemetry: ResMut<FlightTelemetry>,
) {
    if kb.just_pressed(bindings.restart) {
        info!("Restarting flight");
        simulator.reset(spawn_state());
        *telemetry = FlightTelemetry::default();
    }
}

fn step_flight(
    time: Res<Time>,
    obstacles: Query<&Obstacle>,
    mut normalizer: ResMut<InputNormalizer>,
    mut simulator: ResMut<Simulator>,
    mut telemetry: ResMut<FlightTelemetry>,
) {
    let input = normalizer.sample();
    if input.mode_toggle_requested {
        simulator.toggle_mode();
    }

    let collidables: Vec<&dyn Collidable> =
        obstacles.iter().map(|o| o as &dyn Collidable).collect();
    match simulator.update(time.delta_secs_f64(), &input, &collidables) {
        Ok(report) => {
            if report.crashed() {
                telemetry.crashes += 1;
            }
            telemetry.ground_contact = report.ground_contact;
        }
        Err(e) => error!("Flight step failed: {}", e),
    }
    telemetry.input = input;
}

fn sync_drone_transform(
    simulator: Res<Simulator>,
    mut drone: Query<&mut Transform, With<DroneMarker>>,
) {
    let Ok(mut transform) = drone.single_mut() else {
        return;
    };
    let state = simulator.state();
    transform.translation = sim_to_bevy(&state.position.coords);
    transform.rotation = sim_quat_to_bevy(&state.orientation);
}

fn follow_camera(
    simulator: Res<Simulator>,
    mut camera: Query<&mut Transform, With<MainCameraMarker>>,
) {
    let Ok(mut transform) = camera.single_mut() else {
        return;
    };
    let pose = simulator.camera_pose();
    transform.translation = sim_to_bevy(&pose.position.coords);
    transform.rotation = sim_quat_to_bevy(&pose.orientation);
}

/// The sim and bevy share a Y-up, -Z-forward frame, so this is just a cast.
pub fn sim_to_bevy(v: &na::Vector3<f64>) -> Vec3 {
    Vec3::new(v.x as f32, v.y as f32, v.z as f32)
}

pub fn sim_quat_to_bevy(q: &na::UnitQuaternion<f64>) -> Quat {
    Quat::from_xyzw(q.i as f32, q.j as f32, q.k as f32, q.w as f32)
}
