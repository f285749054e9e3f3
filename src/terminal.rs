use crate::desktop::Desktop;
use crate::input::Keybinds;
use crate::sim::{AppState, VoidMode, VoidSet};
use bevy::input::keyboard::{Key, KeyboardInput};
use bevy::input::ButtonState;
use bevy::prelude::*;
use std::time::Duration;

/// Access code for the void terminal. A puzzle answer, not a credential.
pub const SECRET: &str = "candy";
pub const BOOT_LOADING: Duration = Duration::from_secs(3);
pub const BOOT_READY: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TerminalPhase {
    #[default]
    Boot,
    PasswordEntry,
    Authenticated,
}

/// Logical keystrokes the terminal understands.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TerminalKey {
    Char(char),
    Delete,
    Submit,
    Exit,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum KeyOutcome {
    Typed,
    Deleted,
    Accepted,
    /// Wrong code: buffer cleared, still waiting for a password.
    Rejected,
    Close,
    Ignored,
}

#[derive(Debug)]
enum BootTimer {
    Loading(Timer),
    Ready(Timer),
}

/// The nested terminal. Outlives terminal close/re-open; removed with the scene.
#[derive(Resource, Debug, Default)]
pub struct TerminalSession {
    phase: TerminalPhase,
    buffer: String,
    boot: Option<BootTimer>,
    boot_complete: bool,
    failed_attempts: u32,
}

impl TerminalSession {
    pub fn phase(&self) -> TerminalPhase {
        self.phase
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// The buffer as it is shown on screen.
    pub fn masked(&self) -> String {
        "*".repeat(self.buffer.chars().count())
    }

    /// First boot phase done; the screen reports the system as ready.
    pub fn boot_complete(&self) -> bool {
        self.boot_complete
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn show_hint(&self) -> bool {
        self.phase == TerminalPhase::PasswordEntry
            && (self.failed_attempts > 0 || (!self.buffer.is_empty() && self.buffer != SECRET))
    }

    pub fn is_booting(&self) -> bool {
        self.boot.is_some()
    }

    /// Advances the boot sequence while the terminal is visible. Returns `true` on the
    /// tick that hands over to password entry.
    pub fn tick(&mut self, delta: Duration) -> bool {
        if self.phase != TerminalPhase::Boot {
            self.boot = None;
            return false;
        }
        let timer = self
            .boot
            .get_or_insert_with(|| BootTimer::Loading(Timer::new(BOOT_LOADING, TimerMode::Once)));
        match timer {
            BootTimer::Loading(t) => {
                if t.tick(delta).finished() {
                    self.boot_complete = true;
                    self.boot = Some(BootTimer::Ready(Timer::new(BOOT_READY, TimerMode::Once)));
                }
                false
            }
            BootTimer::Ready(t) => {
                if !t.tick(delta).finished() {
                    return false;
                }
                self.boot = None;
                self.phase = TerminalPhase::PasswordEntry;
                true
            }
        }
    }

    /// Drops any pending boot timer. A later [`tick`](Self::tick) restarts the boot
    /// from the beginning, so nothing stale can fire into a closed terminal.
    pub fn cancel_boot(&mut self) {
        if self.is_booting() {
            debug!("terminal boot cancelled");
        }
        self.boot = None;
        if self.phase == TerminalPhase::Boot {
            self.boot_complete = false;
        }
    }

    pub fn handle_key(&mut self, key: TerminalKey) -> KeyOutcome {
        match (self.phase, key) {
            // Exit is disabled while typing so a stray key cannot close the terminal.
            (TerminalPhase::PasswordEntry, TerminalKey::Exit) => KeyOutcome::Ignored,
            (TerminalPhase::PasswordEntry, TerminalKey::Char(c)) => {
                self.buffer.push(c);
                KeyOutcome::Typed
            }
            (TerminalPhase::PasswordEntry, TerminalKey::Delete) => {
                self.buffer.pop();
                KeyOutcome::Deleted
            }
            (TerminalPhase::PasswordEntry, TerminalKey::Submit) => self.submit(),
            (_, TerminalKey::Exit) => KeyOutcome::Close,
            _ => KeyOutcome::Ignored,
        }
    }

    fn submit(&mut self) -> KeyOutcome {
        let matched = self.buffer == SECRET;
        self.buffer.clear();
        if matched {
            self.phase = TerminalPhase::Authenticated;
            KeyOutcome::Accepted
        } else {
            self.failed_attempts += 1;
            KeyOutcome::Rejected
        }
    }
}

/// Maps a raw key press onto the terminal's vocabulary.
pub fn translate(ev: &KeyboardInput, keybinds: &Keybinds) -> Vec<TerminalKey> {
    if ev.state != ButtonState::Pressed {
        return Vec::new();
    }
    if ev.key_code == keybinds.exit {
        return vec![TerminalKey::Exit];
    }
    match &ev.logical_key {
        Key::Enter => vec![TerminalKey::Submit],
        Key::Backspace => vec![TerminalKey::Delete],
        Key::Character(s) => s
            .chars()
            .filter(|c| !c.is_control())
            .map(TerminalKey::Char)
            .collect(),
        _ => Vec::new(),
    }
}

pub struct TerminalPlugin;
impl Plugin for TerminalPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(VoidMode::Terminal), open_terminal)
            .add_systems(OnExit(VoidMode::Terminal), close_terminal)
            .add_systems(
                Update,
                (
                    boot_terminal.run_if(in_state(VoidMode::Terminal)),
                    route_terminal_keys,
                )
                    .chain()
                    .in_set(VoidSet::Terminal)
                    .run_if(in_state(AppState::Void)),
            );
    }
}

fn open_terminal(mut commands: Commands, session: Option<Res<TerminalSession>>) {
    match session {
        Some(session) => info!("terminal re-opened in {:?}", session.phase()),
        None => {
            info!("terminal mounted, booting");
            commands.init_resource::<TerminalSession>();
            commands.init_resource::<Desktop>();
        }
    }
}

fn close_terminal(session: Option<ResMut<TerminalSession>>, desktop: Option<ResMut<Desktop>>) {
    if let Some(mut session) = session {
        session.cancel_boot();
    }
    if let Some(mut desktop) = desktop {
        desktop.start_menu_open = false;
    }
    debug!("terminal hidden");
}

fn boot_terminal(time: Res<Time>, session: Option<ResMut<TerminalSession>>) {
    let Some(mut session) = session else {
        return;
    };
    if session.tick(time.delta()) {
        info!("terminal boot finished, requesting authentication");
    }
}

// Reads in every void mode so keys pressed while exploring never replay here.
fn route_terminal_keys(
    mut key_evr: EventReader<KeyboardInput>,
    keybinds: Res<Keybinds>,
    mode: Option<Res<State<VoidMode>>>,
    session: Option<ResMut<TerminalSession>>,
    mut next_mode: ResMut<NextState<VoidMode>>,
) {
    let visible = mode.is_some_and(|m| *m.get() == VoidMode::Terminal);
    let (Some(mut session), true) = (session, visible) else {
        key_evr.clear();
        return;
    };
    for ev in key_evr.read() {
        for key in translate(ev, &keybinds) {
            match session.handle_key(key) {
                KeyOutcome::Accepted => info!("terminal authenticated"),
                KeyOutcome::Rejected => {
                    debug!("wrong access code ({} so far)", session.failed_attempts())
                }
                KeyOutcome::Close => {
                    next_mode.set(VoidMode::Exploring);
                    return;
                }
                KeyOutcome::Typed | KeyOutcome::Deleted => {
                    debug!("terminal buffer at {} chars", session.buffer().chars().count())
                }
                KeyOutcome::Ignored => {}
            }
        }
    }
}
