//! The course: a ground plane, a few obstacles and the lights.

use bevy::prelude::*;
use drone_physics::{BoxCollider, Collidable, SphereCollider};

/// Something the drone can crash into. Holds the collision shape in sim
/// coordinates; the mesh is spawned alongside it.
#[derive(Component, Debug, Clone)]
pub enum Obstacle {
    Pillar(BoxCollider),
    Balloon(SphereCollider),
}

impl Collidable for Obstacle {
    fn cast_ray(
        &self,
        origin: &na::Point3<f64>,
        direction: &na::Unit<na::Vector3<f64>>,
    ) -> Option<f64> {
        match self {
            Obstacle::Pillar(b) => b.cast_ray(origin, direction),
            Obstacle::Balloon(s) => s.cast_ray(origin, direction),
        }
    }
}

#[derive(Default)]
pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_course);
    }
}

fn setup_course(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Name::new("Ground"),
        Mesh3d(meshes.add(Plane3d::default().mesh().size(400.0, 400.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.3, 0.5, 0.25),
            perceptual_roughness: 0.95,
            ..default()
        })),
        Transform::default(),
    ));

    let concrete = materials.add(StandardMaterial {
        base_color: Color::srgb(0.6, 0.6, 0.62),
        ..default()
    });
    // A slalom of pillars down -Z.
    for i in 0..6 {
        let x = if i % 2 == 0 { -3.0 } else { 3.0 };
        let z = -10.0 - 12.0 * i as f64;
        let half = na::Vector3::new(1.0, 6.0, 1.0);
        let center = na::Point3::new(x, half.y, z);
        commands.spawn((
            Name::new(format!("Pillar {}", i)),
            Mesh3d(meshes.add(Cuboid::new(
                2.0 * half.x as f32,
                2.0 * half.y as f32,
                2.0 * half.z as f32,
            ))),
            MeshMaterial3d(concrete.clone()),
            Transform::from_xyz(center.x as f32, center.y as f32, center.z as f32),
            Obstacle::Pillar(BoxCollider::from_center(center, half)),
        ));
    }

    let balloon = materials.add(StandardMaterial {
        base_color: Color::srgb(0.85, 0.1, 0.15),
        perceptual_roughness: 0.3,
        ..default()
    });
    let balloons = [
        (0.0, 8.0, -30.0, 1.5),
        (-6.0, 12.0, -55.0, 2.0),
        (5.0, 5.0, -70.0, 1.0),
    ];
    for (i, (x, y, z, r)) in balloons.into_iter().enumerate() {
        commands.spawn((
            Name::new(format!("Balloon {}", i)),
            Mesh3d(meshes.add(Sphere::new(r as f32).mesh().uv(24, 24))),
            MeshMaterial3d(balloon.clone()),
            Transform::from_xyz(x as f32, y as f32, z as f32),
            Obstacle::Balloon(SphereCollider::new(na::Point3::new(x, y, z), r)),
        ));
    }

    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            illuminance: 10_000.0,
            ..default()
        },
        Transform::default().looking_to(Vec3::new(-0.4, -1.0, -0.3).normalize(), Vec3::Y),
        Name::new("Sun"),
    ));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 300.0,
        ..default()
    });
}
