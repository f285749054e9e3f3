use crate::desktop::{Desktop, DesktopPlugin};
use crate::error::MountError;
use crate::input::{drop_capture, AutoCapture, MoveState, PointerCapture};
use crate::interaction::{InteractableAnchor, InteractionGate, InteractionPlugin, ANCHOR_POSITION};
use crate::movement::{CameraPose, MovementPlugin, Velocity, DAMPING, VELOCITY_EPSILON};
use crate::terminal::{TerminalPlugin, TerminalSession};
use crate::MainCamera;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use std::f32::consts::PI;
use std::time::Duration;

/// Top-level visibility: the site, or the void overlay on top of it.
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppState {
    #[default]
    Site,
    Void,
}

#[derive(SubStates, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[source(AppState = AppState::Void)]
pub enum VoidMode {
    #[default]
    Exploring,
    Terminal,
}

/// One void tick, in order.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum VoidSet {
    Input,
    Movement,
    Interaction,
    Terminal,
}

/// What hiding the overlay does to the terminal and its desktop.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SessionPolicy {
    /// Hiding the overlay unmounts everything, login included.
    #[default]
    ResetOnOverlayClose,
    /// Keep the login and open windows for the life of the process.
    Preserve,
}

#[derive(Resource, Clone, Debug)]
pub struct VoidSettings {
    /// Units per tick folded into velocity while a direction key is held.
    pub move_speed: f32,
    pub boost_multiplier: f32,
    pub damping: f32,
    pub velocity_epsilon: f32,
    /// Radians per pixel of mouse motion.
    pub look_sensitivity: f32,
    pub spawn_position: Vec3,
    pub spawn_yaw: f32,
    pub auto_capture_delay: Duration,
    pub session_policy: SessionPolicy,
    pub show_help: bool,
}

impl Default for VoidSettings {
    fn default() -> Self {
        Self {
            move_speed: 0.003,
            boost_multiplier: 2.0,
            damping: DAMPING,
            velocity_epsilon: VELOCITY_EPSILON,
            look_sensitivity: 0.002,
            // Left of the desk, looking away from it down +z. The computer is behind
            // the player on arrival.
            spawn_position: Vec3::new(-1.5, 1.6, -6.0),
            spawn_yaw: PI - 30f32.to_radians(),
            auto_capture_delay: Duration::from_millis(100),
            session_policy: SessionPolicy::default(),
            show_help: false,
        }
    }
}

/// Handles owned by the mounted scene. Present exactly while the void is mounted.
#[derive(Resource, Debug, Clone, Copy)]
pub struct SceneSession {
    pub camera: Entity,
    pub anchor: Entity,
}

/// Root entities despawned on teardown.
#[derive(Component)]
pub struct SceneEntity;

pub struct SimPlugin;
impl Plugin for SimPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<AppState>()
            .add_sub_state::<VoidMode>()
            .init_resource::<VoidSettings>()
            .configure_sets(
                Update,
                (
                    VoidSet::Input,
                    VoidSet::Movement,
                    VoidSet::Interaction,
                    VoidSet::Terminal,
                )
                    .chain(),
            )
            .add_systems(OnEnter(AppState::Void), mount_scene)
            .add_systems(OnExit(AppState::Void), teardown_scene)
            .add_plugins((MovementPlugin, InteractionPlugin, TerminalPlugin, DesktopPlugin));
    }
}

pub(crate) fn mount_scene(
    mut commands: Commands,
    settings: Res<VoidSettings>,
    existing: Option<Res<SceneSession>>,
) {
    if let Some(session) = existing {
        let err = MountError::AlreadyMounted {
            camera: session.camera,
        };
        warn!("{err}; skipping second mount");
        return;
    }

    let pose = CameraPose::new(settings.spawn_position, settings.spawn_yaw);
    let camera = commands
        .spawn((
            Camera3dBundle {
                projection: PerspectiveProjection {
                    fov: 75f32.to_radians(),
                    near: 0.1,
                    far: 100.0,
                    ..default()
                }
                .into(),
                transform: pose.to_transform(),
                ..default()
            },
            FogSettings {
                color: Color::srgb_u8(0x00, 0x00, 0x22),
                falloff: FogFalloff::Linear {
                    start: 10.0,
                    end: 40.0,
                },
                ..default()
            },
            pose,
            Velocity::default(),
            MainCamera,
            SceneEntity,
        ))
        .id();
    let anchor = commands
        .spawn((
            InteractableAnchor::default(),
            SpatialBundle::from_transform(Transform::from_translation(ANCHOR_POSITION)),
            SceneEntity,
        ))
        .id();

    commands.insert_resource(SceneSession { camera, anchor });
    commands.insert_resource(MoveState::default());
    commands.insert_resource(InteractionGate::default());
    commands.insert_resource(AutoCapture::after(settings.auto_capture_delay));
    info!("void mounted (camera {camera:?}, anchor {anchor:?})");
}

pub(crate) fn teardown_scene(
    mut commands: Commands,
    settings: Res<VoidSettings>,
    session: Option<Res<SceneSession>>,
    scene_q: Query<Entity, With<SceneEntity>>,
    terminal: Option<ResMut<TerminalSession>>,
    mut capture: ResMut<PointerCapture>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    for e in &scene_q {
        commands.entity(e).despawn_recursive();
    }
    commands.remove_resource::<SceneSession>();
    commands.remove_resource::<MoveState>();
    commands.remove_resource::<AutoCapture>();
    commands.insert_resource(InteractionGate::default());
    drop_capture(&mut capture, &mut windows);

    match settings.session_policy {
        SessionPolicy::ResetOnOverlayClose => {
            commands.remove_resource::<TerminalSession>();
            commands.remove_resource::<Desktop>();
        }
        SessionPolicy::Preserve => {
            if let Some(mut terminal) = terminal {
                terminal.cancel_boot();
            }
        }
    }
    match session {
        Some(s) => info!(
            "void torn down (camera {:?}, anchor {:?}, {:?})",
            s.camera, s.anchor, settings.session_policy
        ),
        None => debug!("teardown without a mounted void"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    fn scene_app(settings: VoidSettings) -> App {
        let mut app = App::new();
        app.insert_resource(settings)
            .init_resource::<PointerCapture>();
        app
    }

    fn count_cameras(app: &mut App) -> usize {
        app.world_mut()
            .query_filtered::<(), With<MainCamera>>()
            .iter(app.world())
            .count()
    }

    #[test]
    fn mount_spawns_camera_at_spawn_pose() {
        let settings = VoidSettings::default();
        let mut app = scene_app(settings.clone());
        app.world_mut().run_system_once(mount_scene);

        let session = *app.world().resource::<SceneSession>();
        let pose = app.world().get::<CameraPose>(session.camera).copied();
        assert_eq!(pose, Some(CameraPose::new(settings.spawn_position, settings.spawn_yaw)));
        assert!(app.world().get::<InteractableAnchor>(session.anchor).is_some());
        assert_eq!(app.world().resource::<MoveState>(), &MoveState::default());
        assert!(app.world().contains_resource::<AutoCapture>());
    }

    #[test]
    fn second_mount_is_refused() {
        let mut app = scene_app(VoidSettings::default());
        app.world_mut().run_system_once(mount_scene);
        let first = *app.world().resource::<SceneSession>();
        app.world_mut().run_system_once(mount_scene);

        assert_eq!(count_cameras(&mut app), 1);
        assert_eq!(app.world().resource::<SceneSession>().camera, first.camera);
    }

    #[test]
    fn remount_after_teardown_resets_pose() {
        let mut app = scene_app(VoidSettings::default());
        app.world_mut().run_system_once(mount_scene);
        let old = *app.world().resource::<SceneSession>();
        app.world_mut()
            .get_mut::<CameraPose>(old.camera)
            .unwrap()
            .position = Vec3::new(9.0, 1.6, 9.0);

        app.world_mut().run_system_once(teardown_scene);
        assert_eq!(count_cameras(&mut app), 0);
        assert!(!app.world().contains_resource::<SceneSession>());
        assert!(!app.world().contains_resource::<MoveState>());

        app.world_mut().run_system_once(mount_scene);
        let new = *app.world().resource::<SceneSession>();
        let pose = app.world().get::<CameraPose>(new.camera).unwrap();
        assert_eq!(pose.position, VoidSettings::default().spawn_position);
    }

    fn teardown_with(policy: SessionPolicy) -> App {
        let mut app = scene_app(VoidSettings {
            session_policy: policy,
            ..default()
        });
        app.world_mut().run_system_once(mount_scene);
        // Torn down halfway through boot, with the ready phase pending.
        let mut terminal = TerminalSession::default();
        terminal.tick(crate::terminal::BOOT_LOADING);
        assert!(terminal.is_booting());
        app.insert_resource(terminal).init_resource::<Desktop>();
        app.world_mut().run_system_once(teardown_scene);
        app
    }

    #[test]
    fn overlay_close_resets_session_by_default() {
        let app = teardown_with(SessionPolicy::ResetOnOverlayClose);
        assert!(!app.world().contains_resource::<TerminalSession>());
        assert!(!app.world().contains_resource::<Desktop>());
    }

    #[test]
    fn preserve_policy_keeps_session_with_boot_cancelled() {
        let app = teardown_with(SessionPolicy::Preserve);
        let terminal = app.world().resource::<TerminalSession>();
        assert!(!terminal.is_booting());
        assert!(!terminal.boot_complete());
        assert_eq!(terminal.phase(), crate::terminal::TerminalPhase::Boot);
        assert!(app.world().contains_resource::<Desktop>());
    }

    #[test]
    fn spawn_looks_away_from_the_computer() {
        let settings = VoidSettings::default();
        let pose = CameraPose::new(settings.spawn_position, settings.spawn_yaw);
        let forward = pose.look_direction();
        assert!(forward.z > 0.8);
        assert!((ANCHOR_POSITION - settings.spawn_position).dot(forward) < 0.0);
    }
}
