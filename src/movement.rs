use crate::input::{MoveState, PointerCapture};
use crate::sim::{AppState, VoidMode, VoidSet, VoidSettings};
use crate::MainCamera;
use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

/// Per-tick multiplicative velocity decay.
pub const DAMPING: f32 = 0.9;
/// Speed below which residual drift is snapped to rest.
pub const VELOCITY_EPSILON: f32 = 1e-4;
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

/// First-person camera pose. The camera `Transform` is derived from it.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl CameraPose {
    pub fn new(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            yaw,
            pitch: 0.0,
        }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Unit view direction, pitch included.
    pub fn look_direction(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    /// Horizontal walking basis; pitch never lifts the camera off the ground plane.
    pub fn flat_forward(&self) -> Vec3 {
        Quat::from_rotation_y(self.yaw) * Vec3::NEG_Z
    }

    pub fn flat_right(&self) -> Vec3 {
        Quat::from_rotation_y(self.yaw) * Vec3::X
    }

    pub fn look(&mut self, delta: Vec2, sensitivity: f32) {
        self.yaw -= delta.x * sensitivity;
        self.pitch = (self.pitch - delta.y * sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Moves along the camera-relative basis: `x` is lateral, `y` is forward.
    pub fn translate_local(&mut self, displacement: Vec2) {
        self.position += self.flat_right() * displacement.x + self.flat_forward() * displacement.y;
    }

    pub fn to_transform(&self) -> Transform {
        Transform::from_translation(self.position).with_rotation(self.rotation())
    }
}

/// Walking velocity as (lateral, forward). Reset whenever the camera respawns.
#[derive(Component, Default, Clone, Copy, Debug, PartialEq)]
pub struct Velocity(pub Vec2);

/// Unit intent from held keys; opposite keys cancel on their axis.
pub fn desired_direction(moves: &MoveState) -> Vec2 {
    let axis = |pos: bool, neg: bool| pos as i8 as f32 - neg as i8 as f32;
    Vec2::new(
        axis(moves.right, moves.left),
        axis(moves.forward, moves.backward),
    )
    .normalize_or_zero()
}

impl Velocity {
    /// Advances one tick and returns the displacement to apply this tick.
    pub fn step(&mut self, moves: &MoveState, settings: &VoidSettings) -> Vec2 {
        let speed = if moves.boost {
            settings.move_speed * settings.boost_multiplier
        } else {
            settings.move_speed
        };
        self.0 += desired_direction(moves) * speed;
        let displacement = self.0;
        self.0 *= settings.damping;
        if self.0.length() < settings.velocity_epsilon {
            self.0 = Vec2::ZERO;
        }
        displacement
    }

    pub fn is_resting(&self) -> bool {
        self.0 == Vec2::ZERO
    }
}

pub struct MovementPlugin;
impl Plugin for MovementPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                mouse_look.run_if(in_state(VoidMode::Exploring)),
                integrate_movement,
                sync_camera_transform,
            )
                .chain()
                .in_set(VoidSet::Movement)
                .run_if(in_state(AppState::Void)),
        );
    }
}

fn mouse_look(
    capture: Res<PointerCapture>,
    settings: Res<VoidSettings>,
    mut motion: EventReader<MouseMotion>,
    mut cameras: Query<&mut CameraPose, With<MainCamera>>,
) {
    let Ok(mut pose) = cameras.get_single_mut() else {
        motion.clear();
        return;
    };
    if !capture.is_captured() {
        motion.clear();
        return;
    }
    for m in motion.read() {
        pose.look(m.delta, settings.look_sensitivity);
    }
}

pub(crate) fn integrate_movement(
    settings: Res<VoidSettings>,
    moves: Option<Res<MoveState>>,
    mut cameras: Query<(&mut CameraPose, &mut Velocity), With<MainCamera>>,
) {
    let Some(moves) = moves else {
        return;
    };
    let Ok((mut pose, mut velocity)) = cameras.get_single_mut() else {
        return;
    };
    if velocity.is_resting() && !moves.is_walking() {
        return;
    }
    let displacement = velocity.step(&moves, &settings);
    pose.translate_local(displacement);
}

fn sync_camera_transform(
    mut cameras: Query<(&CameraPose, &mut Transform), (With<MainCamera>, Changed<CameraPose>)>,
) {
    for (pose, mut transform) in &mut cameras {
        *transform = pose.to_transform();
    }
}
