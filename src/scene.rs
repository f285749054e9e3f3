use crate::input::MoveState;
use crate::sim::{mount_scene, AppState, SceneEntity, SceneSession};
use bevy::prelude::*;
use rand::Rng;

const DESK_ORIGIN: Vec3 = Vec3::new(0.0, 0.0, -8.0);
const HAND_OFFSET: Vec3 = Vec3::new(0.4, -0.3, -0.6);
const STAR_COUNT: usize = 100;

const ORB_POSITIONS: [Vec3; 20] = [
    Vec3::new(-15.0, 12.0, -10.0),
    Vec3::new(20.0, 15.0, -5.0),
    Vec3::new(-8.0, 18.0, 8.0),
    Vec3::new(12.0, 14.0, 15.0),
    Vec3::new(-25.0, 16.0, -20.0),
    Vec3::new(18.0, 13.0, -25.0),
    Vec3::new(0.0, 17.0, 20.0),
    Vec3::new(-12.0, 19.0, -15.0),
    Vec3::new(25.0, 11.0, 5.0),
    Vec3::new(-18.0, 14.0, 12.0),
    Vec3::new(30.0, 10.0, -30.0),
    Vec3::new(-30.0, 12.0, 25.0),
    Vec3::new(5.0, 20.0, -35.0),
    Vec3::new(-22.0, 8.0, -8.0),
    Vec3::new(35.0, 16.0, 10.0),
    Vec3::new(-10.0, 22.0, 30.0),
    Vec3::new(15.0, 9.0, -18.0),
    Vec3::new(-35.0, 15.0, -5.0),
    Vec3::new(8.0, 25.0, 22.0),
    Vec3::new(-5.0, 11.0, -40.0),
];

/// Desk, chair and monitor. Presence means the void is already furnished.
#[derive(Component)]
struct Furniture;

#[derive(Component)]
struct Orb {
    base: Vec3,
    material: Handle<StandardMaterial>,
}

#[derive(Component, Default)]
struct PlayerHand {
    bob: f32,
}

pub struct ScenePlugin;
impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(AppState::Void), furnish_scene.after(mount_scene))
            .add_systems(
                Update,
                (flicker_orbs, bob_hand).run_if(in_state(AppState::Void)),
            );
    }
}

fn srgb(hex: u32) -> Color {
    Color::srgb_u8((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

fn glow(hex: u32, intensity: f32) -> LinearRgba {
    let c = LinearRgba::from(srgb(hex));
    LinearRgba::rgb(c.red * intensity, c.green * intensity, c.blue * intensity)
}

fn furnish_scene(
    mut commands: Commands,
    session: Option<Res<SceneSession>>,
    furnished: Query<(), With<Furniture>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if !furnished.is_empty() {
        return;
    }
    let mut rng = rand::thread_rng();

    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Plane3d::default().mesh().size(200.0, 200.0)),
            material: materials.add(StandardMaterial {
                base_color: srgb(0x002244),
                emissive: glow(0x001133, 0.4),
                perceptual_roughness: 0.8,
                ..default()
            }),
            ..default()
        },
        SceneEntity,
    ));

    // (size, local offset, colour, emissive)
    let parts: [(Vec3, Vec3, u32, f32); 16] = [
        (Vec3::new(2.0, 0.1, 1.0), Vec3::new(0.0, 1.0, 0.0), 0x003388, 0.2),
        (Vec3::new(0.1, 1.0, 0.1), Vec3::new(-0.9, 0.5, -0.4), 0x002266, 0.0),
        (Vec3::new(0.1, 1.0, 0.1), Vec3::new(0.9, 0.5, -0.4), 0x002266, 0.0),
        (Vec3::new(0.1, 1.0, 0.1), Vec3::new(-0.9, 0.5, 0.4), 0x002266, 0.0),
        (Vec3::new(0.1, 1.0, 0.1), Vec3::new(0.9, 0.5, 0.4), 0x002266, 0.0),
        (Vec3::new(0.8, 0.6, 0.1), Vec3::new(0.0, 1.4, -0.3), 0x001144, 0.1),
        (Vec3::new(0.7, 0.5, 0.05), Vec3::new(0.0, 1.4, -0.25), 0x004488, 1.5),
        (Vec3::new(0.1, 0.2, 0.1), Vec3::new(0.0, 1.1, -0.3), 0x002266, 0.0),
        (Vec3::new(0.5, 0.05, 0.2), Vec3::new(0.0, 1.05, 0.1), 0x002255, 0.1),
        (Vec3::new(0.08, 0.03, 0.12), Vec3::new(0.3, 1.05, 0.1), 0x002255, 0.1),
        // chair
        (Vec3::new(0.5, 0.1, 0.5), Vec3::new(0.0, 0.6, 0.4), 0x003366, 0.0),
        (Vec3::new(0.5, 0.8, 0.1), Vec3::new(0.0, 1.0, 0.6), 0x003366, 0.0),
        (Vec3::new(0.05, 0.6, 0.05), Vec3::new(-0.2, 0.3, 0.2), 0x002244, 0.0),
        (Vec3::new(0.05, 0.6, 0.05), Vec3::new(0.2, 0.3, 0.2), 0x002244, 0.0),
        (Vec3::new(0.05, 0.6, 0.05), Vec3::new(-0.2, 0.3, 0.6), 0x002244, 0.0),
        (Vec3::new(0.05, 0.6, 0.05), Vec3::new(0.2, 0.3, 0.6), 0x002244, 0.0),
    ];
    for (size, offset, color, emissive) in parts {
        commands.spawn((
            PbrBundle {
                mesh: meshes.add(Cuboid::from_size(size)),
                material: materials.add(StandardMaterial {
                    base_color: srgb(color),
                    emissive: glow(color, emissive),
                    ..default()
                }),
                transform: Transform::from_translation(DESK_ORIGIN + offset),
                ..default()
            },
            Furniture,
            SceneEntity,
        ));
    }

    let star_mesh = meshes.add(Cuboid::from_length(0.08));
    for _ in 0..STAR_COUNT {
        let position = Vec3::new(
            rng.gen_range(-100.0..100.0),
            rng.gen_range(15.0..45.0),
            rng.gen_range(-120.0..80.0),
        );
        commands.spawn((
            PbrBundle {
                mesh: star_mesh.clone(),
                material: materials.add(StandardMaterial {
                    base_color: Color::WHITE,
                    emissive: glow(0xAACCFF, rng.gen_range(0.3..0.8)),
                    ..default()
                }),
                transform: Transform::from_translation(position),
                ..default()
            },
            SceneEntity,
        ));
    }

    let orb_mesh = meshes.add(Cuboid::from_length(0.15));
    for base in ORB_POSITIONS {
        let material = materials.add(StandardMaterial {
            base_color: srgb(0x88CCFF).with_alpha(0.8),
            emissive: glow(0x4499CC, 0.8),
            alpha_mode: AlphaMode::Blend,
            ..default()
        });
        commands
            .spawn((
                PbrBundle {
                    mesh: orb_mesh.clone(),
                    material: material.clone(),
                    transform: Transform::from_translation(base),
                    ..default()
                },
                Orb { base, material },
                SceneEntity,
            ))
            .with_children(|orb| {
                orb.spawn(PointLightBundle {
                    point_light: PointLight {
                        color: srgb(0x88CCFF),
                        intensity: 40_000.0,
                        range: 8.0,
                        ..default()
                    },
                    ..default()
                });
            });
    }

    for (position, intensity) in [
        (Vec3::new(0.0, 8.0, 0.0), 400_000.0),
        (Vec3::new(10.0, 5.0, 10.0), 250_000.0),
        (Vec3::new(-10.0, 5.0, -10.0), 250_000.0),
    ] {
        commands.spawn((
            PointLightBundle {
                point_light: PointLight {
                    color: srgb(0x0066FF),
                    intensity,
                    range: 40.0,
                    ..default()
                },
                transform: Transform::from_translation(position),
                ..default()
            },
            SceneEntity,
        ));
    }
    commands.spawn((
        SpotLightBundle {
            spot_light: SpotLight {
                color: srgb(0x0088FF),
                intensity: 1_000_000.0,
                range: 40.0,
                outer_angle: std::f32::consts::FRAC_PI_3 / 2.0,
                inner_angle: std::f32::consts::FRAC_PI_3 / 4.0,
                shadows_enabled: true,
                ..default()
            },
            transform: Transform::from_xyz(0.0, 15.0, 0.0).looking_at(Vec3::ZERO, Vec3::Z),
            ..default()
        },
        SceneEntity,
    ));

    match session {
        Some(session) => {
            spawn_hand(&mut commands, session.camera, &mut meshes, &mut materials);
        }
        None => warn!("void furnished without a mounted camera; no hand"),
    }
    debug!("void furnished");
}

fn spawn_hand(
    commands: &mut Commands,
    camera: Entity,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) {
    let dark = materials.add(StandardMaterial {
        base_color: srgb(0x002266),
        emissive: glow(0x001133, 0.3),
        ..default()
    });
    let sleeve = materials.add(StandardMaterial {
        base_color: srgb(0x001155),
        ..default()
    });
    commands.entity(camera).with_children(|cam| {
        cam.spawn((
            SpatialBundle::from_transform(Transform::from_translation(HAND_OFFSET)),
            PlayerHand::default(),
        ))
        .with_children(|hand| {
            for (size, offset, material) in [
                (Vec3::new(0.15, 0.15, 0.4), Vec3::new(0.0, 0.0, 0.2), sleeve.clone()),
                (Vec3::new(0.18, 0.18, 0.25), Vec3::new(0.0, 0.0, -0.1), dark.clone()),
                (Vec3::new(0.08, 0.12, 0.08), Vec3::new(0.12, 0.0, -0.05), dark.clone()),
            ] {
                hand.spawn(PbrBundle {
                    mesh: meshes.add(Cuboid::from_size(size)),
                    material,
                    transform: Transform::from_translation(offset),
                    ..default()
                });
            }
        });
    });
}

/// Emissive pulse in `[0.4, 1.0]`, de-phased by the orb's x position.
fn flicker(elapsed: f32, base: Vec3) -> f32 {
    (elapsed * 3.0 + base.x).sin() * 0.3 + 0.7
}

fn flicker_orbs(
    time: Res<Time>,
    mut orbs: Query<(&Orb, &mut Transform)>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let t = time.elapsed_seconds();
    for (orb, mut transform) in &mut orbs {
        transform.translation.y = orb.base.y + (t * 0.5 + orb.base.x).sin() * 0.5;
        if let Some(material) = materials.get_mut(&orb.material) {
            material.emissive = glow(0x4499CC, flicker(t, orb.base));
        }
    }
}

/// Bob phase after one tick: advances while walking, eases back to rest otherwise.
fn advance_bob(bob: f32, walking: bool) -> f32 {
    if walking {
        bob + 0.15
    } else {
        bob * 0.95
    }
}

fn hand_transform(bob: f32) -> Transform {
    let sway = Vec3::new((bob * 0.5).cos() * 0.02, bob.sin() * 0.05, 0.0);
    Transform::from_translation(HAND_OFFSET + sway).with_rotation(Quat::from_rotation_z(bob.sin() * 0.1))
}

// Reads MoveState only; never writes core state.
fn bob_hand(moves: Option<Res<MoveState>>, mut hands: Query<(&mut PlayerHand, &mut Transform)>) {
    let walking = moves.is_some_and(|m| m.is_walking());
    for (mut hand, mut transform) in &mut hands {
        hand.bob = advance_bob(hand.bob, walking);
        *transform = hand_transform(hand.bob);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flicker_stays_in_band() {
        for i in 0..200 {
            let f = flicker(i as f32 * 0.1, ORB_POSITIONS[i % ORB_POSITIONS.len()]);
            assert!((0.4..=1.0).contains(&f), "{f}");
        }
    }

    #[test]
    fn bob_settles_when_idle() {
        let mut bob = 0.0;
        for _ in 0..20 {
            bob = advance_bob(bob, true);
        }
        assert!((bob - 3.0).abs() < 1e-4);
        for _ in 0..200 {
            bob = advance_bob(bob, false);
        }
        assert!(bob < 1e-3);
        let rest = hand_transform(bob);
        assert!((rest.translation - HAND_OFFSET).length() < 0.021);
    }
}
