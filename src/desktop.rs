use crate::sim::{AppState, VoidMode};
use bevy::prelude::*;
use rand::Rng;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const WINDOW_SIZE: Vec2 = Vec2::new(500.0, 400.0);
/// New windows land at `SPAWN_ORIGIN + [0, SPAWN_SPREAD)` on each axis.
pub const SPAWN_ORIGIN: Vec2 = Vec2::new(50.0, 50.0);
pub const SPAWN_SPREAD: Vec2 = Vec2::new(200.0, 100.0);
pub const ICON_ORIGIN: Vec2 = Vec2::new(20.0, 20.0);
pub const ICON_PITCH: f32 = 80.0;
const ICON_COLUMNS: usize = 3;
pub const SHUTDOWN_ID: &str = "shutdown";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProgramKind {
    Program,
    Folder,
    Document,
    Menu,
}

impl ProgramKind {
    pub fn label(self) -> &'static str {
        match self {
            ProgramKind::Program => "Application",
            ProgramKind::Folder => "File folder",
            ProgramKind::Document => "Text document",
            ProgramKind::Menu => "Menu",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Program {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub kind: ProgramKind,
}

const fn program(id: &'static str, name: &'static str, icon: &'static str, kind: ProgramKind) -> Program {
    Program {
        id,
        name,
        icon,
        kind,
    }
}

pub const DESKTOP_ICONS: &[Program] = &[
    program("portfolio", "Portfolio.exe", "💼", ProgramKind::Program),
    program("projects", "Projects", "📁", ProgramKind::Folder),
    program("about", "About.txt", "📄", ProgramKind::Document),
    program("contact", "Contact", "📧", ProgramKind::Program),
    program("void", "VoidSim.exe", "🌌", ProgramKind::Program),
];

pub const START_MENU: &[Program] = &[
    program("programs", "Programs", "📂", ProgramKind::Menu),
    program("documents", "Documents", "📄", ProgramKind::Menu),
    program("settings", "Settings", "⚙", ProgramKind::Menu),
    program(SHUTDOWN_ID, "Shutdown", "🔌", ProgramKind::Menu),
];

/// Fixed program tables, handed to the desktop by reference.
#[derive(Resource, Clone, Copy, Debug)]
pub struct ProgramCatalog {
    pub desktop: &'static [Program],
    pub start_menu: &'static [Program],
}

impl Default for ProgramCatalog {
    fn default() -> Self {
        Self {
            desktop: DESKTOP_ICONS,
            start_menu: START_MENU,
        }
    }
}

impl ProgramCatalog {
    pub fn find(&self, id: &str) -> Option<&'static Program> {
        self.desktop
            .iter()
            .chain(self.start_menu.iter())
            .find(|p| p.id == id)
    }
}

/// Top-left corner of the `index`th desktop icon.
pub fn icon_slot(index: usize) -> Vec2 {
    let col = (index % ICON_COLUMNS) as f32;
    let row = (index / ICON_COLUMNS) as f32;
    ICON_ORIGIN + Vec2::new(col, row) * ICON_PITCH
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindowInstance {
    pub program: Program,
    /// Distinct per open; a reopened program gets a fresh one.
    pub serial: u64,
    pub position: Vec2,
    pub size: Vec2,
    pub minimized: bool,
}

impl WindowInstance {
    pub fn id(&self) -> &'static str {
        self.program.id
    }
}

/// Open program windows in the order they were launched; at most one per id.
#[derive(Default, Debug)]
pub struct WindowRegistry {
    windows: Vec<WindowInstance>,
    next_serial: u64,
}

impl WindowRegistry {
    /// Returns `false` when the program already has a window.
    pub fn open_program(&mut self, program: &Program, rng: &mut impl Rng) -> bool {
        if self.get(program.id).is_some() {
            return false;
        }
        let jitter = Vec2::new(
            rng.gen_range(0.0..SPAWN_SPREAD.x),
            rng.gen_range(0.0..SPAWN_SPREAD.y),
        );
        self.next_serial += 1;
        self.windows.push(WindowInstance {
            program: *program,
            serial: self.next_serial,
            position: SPAWN_ORIGIN + jitter,
            size: WINDOW_SIZE,
            minimized: false,
        });
        true
    }

    pub fn close_window(&mut self, id: &str) -> bool {
        let before = self.windows.len();
        self.windows.retain(|w| w.id() != id);
        self.windows.len() != before
    }

    /// Flips the minimized flag and returns the new value.
    pub fn minimize_window(&mut self, id: &str) -> Option<bool> {
        let window = self.windows.iter_mut().find(|w| w.id() == id)?;
        window.minimized = !window.minimized;
        Some(window.minimized)
    }

    pub fn get(&self, id: &str) -> Option<&WindowInstance> {
        self.windows.iter().find(|w| w.id() == id)
    }

    /// Every running program, minimized or not.
    pub fn running(&self) -> impl Iterator<Item = &WindowInstance> {
        self.windows.iter()
    }

    pub fn visible(&self) -> impl Iterator<Item = &WindowInstance> {
        self.windows.iter().filter(|w| !w.minimized)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Launch {
    Opened,
    AlreadyOpen,
    Shutdown,
}

/// The retro desktop behind the terminal login.
#[derive(Resource, Default, Debug)]
pub struct Desktop {
    pub registry: WindowRegistry,
    pub start_menu_open: bool,
}

impl Desktop {
    /// Launches from an icon or the start menu; either way the menu closes.
    pub fn launch(&mut self, program: &Program, rng: &mut impl Rng) -> Launch {
        self.start_menu_open = false;
        if program.id == SHUTDOWN_ID {
            return Launch::Shutdown;
        }
        if self.registry.open_program(program, rng) {
            debug!("opened window {}", program.id);
            Launch::Opened
        } else {
            Launch::AlreadyOpen
        }
    }
}

/// Tray clock text, refreshed once a second.
#[derive(Resource)]
pub struct TrayClock {
    timer: Timer,
    text: String,
}

impl Default for TrayClock {
    fn default() -> Self {
        Self {
            timer: Timer::from_seconds(1.0, TimerMode::Repeating),
            text: now_hhmm(),
        }
    }
}

impl TrayClock {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Tray text, zone included.
    pub fn label(&self) -> String {
        format!("{} UTC", self.text)
    }
}

/// `HH:MM` of a wall-clock offset from the Unix epoch, in UTC.
pub fn format_clock(since_epoch: Duration) -> String {
    let secs = since_epoch.as_secs() % 86_400;
    format!("{:02}:{:02}", secs / 3_600, (secs % 3_600) / 60)
}

fn now_hhmm() -> String {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format_clock(since_epoch)
}

pub struct DesktopPlugin;
impl Plugin for DesktopPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ProgramCatalog>()
            .init_resource::<TrayClock>()
            .add_systems(
                Update,
                refresh_clock
                    .run_if(in_state(VoidMode::Terminal))
                    .run_if(in_state(AppState::Void)),
            );
    }
}

fn refresh_clock(time: Res<Time>, mut clock: ResMut<TrayClock>) {
    if clock.timer.tick(time.delta()).just_finished() {
        clock.text = now_hhmm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn portfolio() -> &'static Program {
        ProgramCatalog::default().find("portfolio").unwrap()
    }

    #[test]
    fn opening_twice_keeps_one_window() {
        let mut rng = rng();
        let mut registry = WindowRegistry::default();
        assert!(registry.open_program(portfolio(), &mut rng));
        let first = registry.get("portfolio").cloned();
        assert!(!registry.open_program(portfolio(), &mut rng));
        assert_eq!(registry.running().filter(|w| w.id() == "portfolio").count(), 1);
        // No re-roll of the position either.
        assert_eq!(registry.get("portfolio").cloned(), first);
    }

    #[test]
    fn reopened_window_gets_a_fresh_serial() {
        let mut rng = rng();
        let mut registry = WindowRegistry::default();
        registry.open_program(portfolio(), &mut rng);
        let first = registry.get("portfolio").map(|w| w.serial);
        registry.close_window("portfolio");
        registry.open_program(portfolio(), &mut rng);
        let second = registry.get("portfolio").map(|w| w.serial);
        assert!(first.is_some() && second.is_some());
        assert_ne!(first, second);
    }

    #[test]
    fn new_windows_land_inside_the_spawn_rect() {
        let mut rng = rng();
        let catalog = ProgramCatalog::default();
        let mut registry = WindowRegistry::default();
        for program in catalog.desktop {
            registry.open_program(program, &mut rng);
        }
        assert_eq!(registry.running().count(), catalog.desktop.len());
        for w in registry.running() {
            assert!(w.position.cmpge(SPAWN_ORIGIN).all());
            assert!(w.position.cmplt(SPAWN_ORIGIN + SPAWN_SPREAD).all());
            assert_eq!(w.size, WINDOW_SIZE);
            assert!(!w.minimized);
        }
    }

    #[test]
    fn minimize_twice_restores_state() {
        let mut registry = WindowRegistry::default();
        registry.open_program(portfolio(), &mut rng());
        assert_eq!(registry.minimize_window("portfolio"), Some(true));
        assert_eq!(registry.visible().count(), 0);
        assert_eq!(registry.running().count(), 1);
        assert_eq!(registry.minimize_window("portfolio"), Some(false));
        assert_eq!(registry.visible().count(), 1);
        assert_eq!(registry.minimize_window("missing"), None);
    }

    #[test]
    fn close_removes_even_minimized_windows() {
        let mut registry = WindowRegistry::default();
        registry.open_program(portfolio(), &mut rng());
        registry.minimize_window("portfolio");
        assert!(registry.close_window("portfolio"));
        assert_eq!(registry.running().count(), 0);
        assert!(!registry.close_window("portfolio"));
    }

    #[test]
    fn taskbar_keeps_launch_order() {
        let mut rng = rng();
        let catalog = ProgramCatalog::default();
        let mut registry = WindowRegistry::default();
        for id in ["about", "portfolio", "projects"] {
            registry.open_program(catalog.find(id).unwrap(), &mut rng);
        }
        let order: Vec<_> = registry.running().map(|w| w.id()).collect();
        assert_eq!(order, ["about", "portfolio", "projects"]);
    }

    #[test]
    fn start_menu_launch_closes_menu_and_shutdown_opens_nothing() {
        let catalog = ProgramCatalog::default();
        let mut desktop = Desktop {
            start_menu_open: true,
            ..default()
        };
        let mut rng = rng();
        assert_eq!(
            desktop.launch(catalog.find("settings").unwrap(), &mut rng),
            Launch::Opened
        );
        assert!(!desktop.start_menu_open);

        desktop.start_menu_open = true;
        assert_eq!(
            desktop.launch(catalog.find(SHUTDOWN_ID).unwrap(), &mut rng),
            Launch::Shutdown
        );
        assert!(!desktop.start_menu_open);
        assert!(desktop.registry.get(SHUTDOWN_ID).is_none());
        assert_eq!(
            desktop.launch(catalog.find("settings").unwrap(), &mut rng),
            Launch::AlreadyOpen
        );
    }

    #[test]
    fn icons_fill_a_three_column_grid() {
        assert_eq!(icon_slot(0), Vec2::new(20.0, 20.0));
        assert_eq!(icon_slot(2), Vec2::new(180.0, 20.0));
        assert_eq!(icon_slot(4), Vec2::new(100.0, 100.0));
    }

    #[test]
    fn tray_label_names_the_zone() {
        let clock = TrayClock::default();
        assert_eq!(clock.label(), format!("{} UTC", clock.text()));
        assert_eq!(clock.text().len(), 5);
    }

    #[test]
    fn clock_formats_utc_hours_and_minutes() {
        assert_eq!(format_clock(Duration::from_secs(0)), "00:00");
        assert_eq!(format_clock(Duration::from_secs(14 * 3_600 + 30 * 60 + 59)), "14:30");
        assert_eq!(format_clock(Duration::from_secs(86_400 + 61)), "00:01");
    }
}
