//! The basic HUD.
//!
//! Flight mode, stick positions and a few numbers about the drone, drawn
//! over the FPV camera.

use bevy::{color::palettes::css::GOLD, diagnostic::DiagnosticsStore, prelude::*};
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use drone_physics::{InputNormalizer, Simulator, YawPitchRoll};
use std::io::Write;

use crate::drone::FlightTelemetry;

#[derive(Component)]
pub struct FpsText;

#[derive(Component)]
pub struct InfoText;

#[derive(Default)]
pub struct UIPlugin;

impl Plugin for UIPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(FrameTimeDiagnosticsPlugin::default());
        app.add_systems(Startup, setup_ui);
        app.add_systems(Update, (update_fps, update_info));
    }
}

fn setup_ui(mut commands: Commands) {
    commands
        .spawn((
            Text::new("FPS: "),
            TextFont {
                font_size: 20.0,
                ..default()
            },
            Node {
                position_type: PositionType::Absolute,
                top: px(5.0),
                right: px(5.0),
                ..default()
            },
            Name::new("FPS Text"),
        ))
        .with_child((
            TextSpan::new(""),
            TextFont {
                font_size: 20.0,
                ..default()
            },
            TextColor(GOLD.into()),
            FpsText,
        ));

    commands.spawn((
        Text::new(""),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        Node {
            position_type: PositionType::Absolute,
            bottom: px(5.0),
            left: px(5.0),
            ..default()
        },
        Name::new("Info Text"),
        InfoText,
    ));
}

fn update_fps(diagnostics: Res<DiagnosticsStore>, mut span: Query<&mut TextSpan, With<FpsText>>) {
    let Some(fps) = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|d| d.smoothed())
    else {
        return;
    };
    for mut span in span.iter_mut() {
        **span = format!("{:.0}", fps);
    }
}

fn update_info(
    simulator: Res<Simulator>,
    normalizer: Res<InputNormalizer>,
    telemetry: Res<FlightTelemetry>,
    mut text: Query<&mut Text, With<InfoText>>,
) {
    let Ok(mut text) = text.single_mut() else {
        return;
    };
    let state = simulator.state();
    let angles = YawPitchRoll::from_quaternion(&state.orientation);
    let input = &telemetry.input;

    let mut message = Vec::new();
    let source = if normalizer.has_analog() { "pad" } else { "keys" };
    writeln!(message, "Mode: {}  ({})", state.mode.label(), source).unwrap();
    writeln!(
        message,
        "Stick: thr {:.2}  yaw {:+.2}  pitch {:+.2}  roll {:+.2}",
        input.thrust, input.yaw, input.pitch, input.roll
    )
    .unwrap();
    writeln!(
        message,
        "Alt: {:.1}  Speed: {:.1}/{:.0}",
        state.position.y,
        state.speed(),
        simulator.config().max_speed
    )
    .unwrap();
    writeln!(
        message,
        "Attitude: hdg {:+.0}  pitch {:+.0}  roll {:+.0}",
        angles.yaw.to_degrees(),
        angles.pitch.to_degrees(),
        angles.roll.to_degrees()
    )
    .unwrap();
    write!(message, "Crashes: {}", telemetry.crashes).unwrap();
    if telemetry.ground_contact {
        write!(message, "  [ground]").unwrap();
    }

    **text = String::from_utf8(message).unwrap();
}
