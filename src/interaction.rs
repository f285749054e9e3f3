use crate::input::{drop_capture, Keybinds, MoveState, PointerCapture};
use crate::movement::CameraPose;
use crate::sim::{AppState, VoidMode, VoidSet};
use crate::MainCamera;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

/// Centre of the computer screen on the desk.
pub const ANCHOR_POSITION: Vec3 = Vec3::new(0.0, 1.4, -8.25);
pub const MAX_DISTANCE: f32 = 1.5;
/// Cosine of the largest allowed angle between gaze and anchor (about 32 degrees).
pub const MIN_ALIGNMENT: f32 = 0.85;

/// The one thing in the void that can be used.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct InteractableAnchor {
    pub position: Vec3,
    pub min_alignment: f32,
    pub max_distance: f32,
}

impl Default for InteractableAnchor {
    fn default() -> Self {
        Self {
            position: ANCHOR_POSITION,
            min_alignment: MIN_ALIGNMENT,
            max_distance: MAX_DISTANCE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GateReading {
    pub distance: f32,
    pub alignment: f32,
    pub in_range: bool,
}

impl InteractableAnchor {
    pub fn measure(&self, pose: &CameraPose) -> GateReading {
        let offset = self.position - pose.position;
        let distance = offset.length();
        // A zero offset has no direction; it counts as looking away.
        let alignment = pose.look_direction().dot(offset.normalize_or_zero());
        GateReading {
            distance,
            alignment,
            in_range: distance < self.max_distance && alignment > self.min_alignment,
        }
    }
}

/// Latest gate reading, refreshed every tick after movement.
#[derive(Resource, Default, Debug)]
pub struct InteractionGate {
    pub reading: Option<GateReading>,
}

impl InteractionGate {
    pub fn in_range(&self) -> bool {
        self.reading.is_some_and(|r| r.in_range)
    }

    /// Decides a discrete press against the current reading.
    pub fn fires_on_press(&self, just_pressed: bool) -> bool {
        just_pressed && self.in_range()
    }
}

#[derive(Event, Debug, Default)]
pub struct ComputerInteract;

pub struct InteractionPlugin;
impl Plugin for InteractionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InteractionGate>()
            .add_event::<ComputerInteract>()
            .add_systems(
                Update,
                (
                    update_gate,
                    trigger_interaction.run_if(in_state(VoidMode::Exploring)),
                    use_computer,
                )
                    .chain()
                    .in_set(VoidSet::Interaction)
                    .run_if(in_state(AppState::Void)),
            );
    }
}

pub(crate) fn update_gate(
    mut gate: ResMut<InteractionGate>,
    cameras: Query<&CameraPose, With<MainCamera>>,
    anchors: Query<&InteractableAnchor>,
) {
    let (Ok(pose), Ok(anchor)) = (cameras.get_single(), anchors.get_single()) else {
        gate.reading = None;
        return;
    };
    gate.reading = Some(anchor.measure(pose));
}

pub(crate) fn trigger_interaction(
    keys: Res<ButtonInput<KeyCode>>,
    keybinds: Res<Keybinds>,
    gate: Res<InteractionGate>,
    mut ev_interact: EventWriter<ComputerInteract>,
) {
    let pressed = keys.just_pressed(keybinds.interact);
    if gate.fires_on_press(pressed) {
        ev_interact.send(ComputerInteract);
    } else if pressed {
        debug!("interact pressed out of range: {:?}", gate.reading);
    }
}

fn use_computer(
    mut ev_interact: EventReader<ComputerInteract>,
    mut capture: ResMut<PointerCapture>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
    moves: Option<ResMut<MoveState>>,
    mut next_mode: ResMut<NextState<VoidMode>>,
) {
    if ev_interact.read().count() == 0 {
        return;
    }
    drop_capture(&mut capture, &mut windows);
    if let Some(mut moves) = moves {
        moves.clear();
    }
    info!("computer in use, opening terminal");
    next_mode.set(VoidMode::Terminal);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pose `distance` units in front of the anchor, looking straight at it.
    fn facing_anchor(distance: f32) -> CameraPose {
        CameraPose::new(ANCHOR_POSITION + Vec3::new(0.0, 0.0, distance), 0.0)
    }

    #[test]
    fn direct_gaze_within_reach_is_in_range() {
        let reading = InteractableAnchor::default().measure(&facing_anchor(1.0));
        assert!((reading.distance - 1.0).abs() < 1e-5);
        assert!((reading.alignment - 1.0).abs() < 1e-5);
        assert!(reading.in_range);
    }

    #[test]
    fn too_far_is_out_of_range_even_with_direct_gaze() {
        let reading = InteractableAnchor::default().measure(&facing_anchor(2.0));
        assert!((reading.alignment - 1.0).abs() < 1e-5);
        assert!(!reading.in_range);
    }

    #[test]
    fn looking_away_is_out_of_range() {
        let mut pose = facing_anchor(1.0);
        // 40 degrees off axis: cos(40°) ≈ 0.77 < 0.85.
        pose.yaw = 40f32.to_radians();
        assert!(!InteractableAnchor::default().measure(&pose).in_range);

        // 25 degrees is still inside the cone.
        pose.yaw = 25f32.to_radians();
        assert!(InteractableAnchor::default().measure(&pose).in_range);
    }

    #[test]
    fn coincident_camera_is_not_aligned() {
        let pose = CameraPose::new(ANCHOR_POSITION, 0.0);
        let reading = InteractableAnchor::default().measure(&pose);
        assert_eq!(reading.alignment, 0.0);
        assert!(!reading.in_range);
    }

    #[test]
    fn missing_reading_never_fires() {
        let gate = InteractionGate::default();
        assert!(!gate.in_range());
        assert!(!gate.fires_on_press(true));
    }

    #[derive(Resource, Default)]
    struct Hits(usize);

    fn count_hits(mut evr: EventReader<ComputerInteract>, mut hits: ResMut<Hits>) {
        hits.0 += evr.read().count();
    }

    fn gate_app(distance: f32) -> App {
        let mut app = App::new();
        app.init_resource::<ButtonInput<KeyCode>>()
            .init_resource::<Keybinds>()
            .init_resource::<InteractionGate>()
            .init_resource::<Hits>()
            .add_event::<ComputerInteract>()
            .add_systems(Update, (update_gate, trigger_interaction, count_hits).chain());
        app.world_mut().spawn((MainCamera, facing_anchor(distance)));
        app.world_mut().spawn(InteractableAnchor::default());
        app
    }

    fn press_interact(app: &mut App) {
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::KeyE);
    }

    /// Mirrors the per-frame reset the input plugin does before `Update`.
    fn next_frame(app: &mut App) {
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .clear();
    }

    #[test]
    fn one_press_in_range_fires_exactly_once() {
        let mut app = gate_app(1.0);
        press_interact(&mut app);
        app.update();
        // Key stays held for several frames.
        for _ in 0..5 {
            next_frame(&mut app);
            press_interact(&mut app);
            app.update();
        }
        assert_eq!(app.world().resource::<Hits>().0, 1);
    }

    #[test]
    fn press_out_of_range_does_not_fire() {
        let mut app = gate_app(2.0);
        press_interact(&mut app);
        app.update();
        assert_eq!(app.world().resource::<Hits>().0, 0);
        assert!(!app.world().resource::<InteractionGate>().in_range());
    }

    #[test]
    fn gate_without_anchor_reads_nothing() {
        let mut app = App::new();
        app.init_resource::<InteractionGate>()
            .add_systems(Update, update_gate);
        app.world_mut().spawn((MainCamera, facing_anchor(1.0)));
        app.update();
        assert!(app.world().resource::<InteractionGate>().reading.is_none());
    }
}
