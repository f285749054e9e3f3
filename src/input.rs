use crate::error::CaptureError;
use crate::sim::{AppState, VoidMode, VoidSet, VoidSettings};
use bevy::input::keyboard::KeyboardInput;
use bevy::input::ButtonState;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, PrimaryWindow, WindowFocused};
use std::time::Duration;

#[derive(Resource, Clone, Debug)]
pub struct Keybinds {
    pub forward: KeyCode,
    pub backward: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub boost: KeyCode,
    pub interact: KeyCode,
    pub exit: KeyCode,
    pub overlay_toggle: KeyCode,
    pub release_capture: KeyCode,
    pub help: KeyCode,
}

impl Default for Keybinds {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            backward: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            boost: KeyCode::ShiftLeft,
            interact: KeyCode::KeyE,
            exit: KeyCode::Space,
            overlay_toggle: KeyCode::F2,
            release_capture: KeyCode::Escape,
            help: KeyCode::F1,
        }
    }
}

impl Keybinds {
    pub fn move_key(&self, key: KeyCode) -> Option<MoveKey> {
        match key {
            k if k == self.forward => Some(MoveKey::Forward),
            k if k == self.backward => Some(MoveKey::Backward),
            k if k == self.left => Some(MoveKey::Left),
            k if k == self.right => Some(MoveKey::Right),
            k if k == self.boost => Some(MoveKey::Boost),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveKey {
    Forward,
    Backward,
    Left,
    Right,
    Boost,
}

/// Held movement keys. Only lives while a void scene is mounted.
#[derive(Resource, Default, Clone, Copy, PartialEq, Eq, Debug)]
pub struct MoveState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub boost: bool,
}

impl MoveState {
    /// Records a down (`true`) or up (`false`) transition. Repeats are idempotent.
    pub fn set(&mut self, key: MoveKey, down: bool) {
        let flag = match key {
            MoveKey::Forward => &mut self.forward,
            MoveKey::Backward => &mut self.backward,
            MoveKey::Left => &mut self.left,
            MoveKey::Right => &mut self.right,
            MoveKey::Boost => &mut self.boost,
        };
        *flag = down;
    }

    pub fn get(&self, key: MoveKey) -> bool {
        match key {
            MoveKey::Forward => self.forward,
            MoveKey::Backward => self.backward,
            MoveKey::Left => self.left,
            MoveKey::Right => self.right,
            MoveKey::Boost => self.boost,
        }
    }

    pub fn is_walking(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Something that can hand out exclusive raw mouse capture.
pub trait CaptureTarget {
    fn lock(&mut self) -> Result<(), CaptureError>;
    fn unlock(&mut self);
}

impl CaptureTarget for Window {
    fn lock(&mut self) -> Result<(), CaptureError> {
        // Platforms only grant a grab to the focused window.
        if !self.focused {
            return Err(CaptureError::Unfocused);
        }
        self.cursor.grab_mode = CursorGrabMode::Locked;
        self.cursor.visible = false;
        Ok(())
    }

    fn unlock(&mut self) {
        self.cursor.grab_mode = CursorGrabMode::None;
        self.cursor.visible = true;
    }
}

/// Book-keeping for the single pointer capture. Acquire and release are idempotent,
/// so any number of overlapping requests collapse into one active capture.
#[derive(Resource, Default, Debug)]
pub struct PointerCapture {
    captured: bool,
}

impl PointerCapture {
    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Returns `Ok(false)` when capture was already held.
    pub fn acquire(&mut self, target: &mut dyn CaptureTarget) -> Result<bool, CaptureError> {
        if self.captured {
            return Ok(false);
        }
        target.lock()?;
        self.captured = true;
        Ok(true)
    }

    /// Returns `false` when there was nothing to release.
    pub fn release(&mut self, target: &mut dyn CaptureTarget) -> bool {
        if !self.captured {
            return false;
        }
        target.unlock();
        self.captured = false;
        true
    }

    /// Forgets the capture without touching the target.
    pub fn revoke(&mut self) -> bool {
        std::mem::take(&mut self.captured)
    }
}

/// One-shot capture request armed when the scene mounts.
#[derive(Resource)]
pub struct AutoCapture(pub Timer);

impl AutoCapture {
    pub fn after(delay: Duration) -> Self {
        Self(Timer::new(delay, TimerMode::Once))
    }
}

pub struct InputPlugin;
impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Keybinds>()
            .init_resource::<PointerCapture>()
            .add_systems(Update, (overlay_toggle, help_toggle))
            .add_systems(
                Update,
                (
                    track_move_keys,
                    auto_capture.run_if(resource_exists::<AutoCapture>),
                    capture_on_click.run_if(in_state(VoidMode::Exploring)),
                    release_on_key,
                    release_on_focus_lost,
                )
                    .in_set(VoidSet::Input)
                    .run_if(in_state(AppState::Void)),
            );
    }
}

pub fn request_capture(
    capture: &mut PointerCapture,
    windows: &mut Query<&mut Window, With<PrimaryWindow>>,
) {
    let result = match windows.get_single_mut() {
        Ok(mut window) => capture.acquire(&mut *window),
        Err(_) => Err(CaptureError::NoWindow),
    };
    match result {
        Ok(true) => debug!("pointer captured"),
        Ok(false) => {}
        Err(err) => warn!("{err}; click the void to try again"),
    }
}

pub fn drop_capture(
    capture: &mut PointerCapture,
    windows: &mut Query<&mut Window, With<PrimaryWindow>>,
) {
    let released = match windows.get_single_mut() {
        Ok(mut window) => capture.release(&mut *window),
        Err(_) => capture.revoke(),
    };
    if released {
        debug!("pointer released");
    }
}

// Runs in every void mode so its reader never replays keys typed into the terminal.
fn track_move_keys(
    mut key_evr: EventReader<KeyboardInput>,
    keybinds: Res<Keybinds>,
    mode: Option<Res<State<VoidMode>>>,
    moves: Option<ResMut<MoveState>>,
) {
    let exploring = mode.is_some_and(|m| *m.get() == VoidMode::Exploring);
    let (Some(mut moves), true) = (moves, exploring) else {
        key_evr.clear();
        return;
    };
    for ev in key_evr.read() {
        let Some(key) = keybinds.move_key(ev.key_code) else {
            continue;
        };
        let down = ev.state == ButtonState::Pressed;
        if moves.get(key) != down {
            moves.set(key, down);
        }
    }
}

fn auto_capture(
    mut commands: Commands,
    time: Res<Time>,
    mut pending: ResMut<AutoCapture>,
    mut capture: ResMut<PointerCapture>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    if pending.0.tick(time.delta()).finished() {
        request_capture(&mut capture, &mut windows);
        commands.remove_resource::<AutoCapture>();
    }
}

fn capture_on_click(
    buttons: Res<ButtonInput<MouseButton>>,
    mut capture: ResMut<PointerCapture>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    if buttons.just_pressed(MouseButton::Left) && !capture.is_captured() {
        request_capture(&mut capture, &mut windows);
    }
}

fn release_on_key(
    keys: Res<ButtonInput<KeyCode>>,
    keybinds: Res<Keybinds>,
    mut capture: ResMut<PointerCapture>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    if keys.just_pressed(keybinds.release_capture) {
        drop_capture(&mut capture, &mut windows);
    }
}

fn release_on_focus_lost(
    mut focus_evr: EventReader<WindowFocused>,
    mut capture: ResMut<PointerCapture>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
    moves: Option<ResMut<MoveState>>,
) {
    let lost = focus_evr.read().any(|ev| !ev.focused);
    if !lost {
        return;
    }
    if capture.revoke() {
        // The OS already dropped the grab. Mirror it on the window so the next lock
        // is a real change and reaches the OS again.
        if let Ok(mut window) = windows.get_single_mut() {
            window.unlock();
        }
        debug!("pointer capture revoked by focus loss");
    }
    // Key-up events for held keys never arrive once focus is gone.
    if let Some(mut moves) = moves {
        moves.clear();
    }
}

fn overlay_toggle(
    keys: Res<ButtonInput<KeyCode>>,
    keybinds: Res<Keybinds>,
    state: Res<State<AppState>>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if keys.just_pressed(keybinds.overlay_toggle) {
        let next = match state.get() {
            AppState::Site => AppState::Void,
            AppState::Void => AppState::Site,
        };
        info!("overlay toggled: {:?} -> {:?}", state.get(), next);
        next_state.set(next);
    }
}

fn help_toggle(
    mut settings: ResMut<VoidSettings>,
    keys: Res<ButtonInput<KeyCode>>,
    keybinds: Res<Keybinds>,
) {
    if keys.just_pressed(keybinds.help) {
        settings.show_help = !settings.show_help;
    }
}
