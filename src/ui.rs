use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPlugin};

use crate::content::{document_for, Block};
use crate::desktop::{icon_slot, Desktop, Launch, Program, ProgramCatalog, TrayClock};
use crate::input::{Keybinds, PointerCapture};
use crate::interaction::InteractionGate;
use crate::sim::{AppState, VoidMode, VoidSet, VoidSettings};
use crate::terminal::{TerminalPhase, TerminalSession};

const SCREEN_GREEN: egui::Color32 = egui::Color32::from_rgb(0x33, 0xff, 0x66);
const SCREEN_BLACK: egui::Color32 = egui::Color32::from_rgb(0x00, 0x05, 0x0a);
const DESKTOP_TEAL: egui::Color32 = egui::Color32::from_rgb(0x00, 0x80, 0x80);
const CHROME_GREY: egui::Color32 = egui::Color32::from_rgb(0xc0, 0xc0, 0xc0);
const TITLE_BLUE: egui::Color32 = egui::Color32::from_rgb(0x00, 0x00, 0x80);

const BOOT_LINES: [&str; 4] = [
    "Initializing quantum processors...",
    "Loading neural pathways...",
    "Establishing void connection...",
    "Calibrating reality matrix...",
];
const HINT: &str = "Hint: Something sweet...";

pub struct UiPlugin;
impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin)
            .add_systems(Update, site_ui.run_if(in_state(AppState::Site)))
            .add_systems(Update, help_ui)
            .add_systems(
                Update,
                exploring_hud
                    .after(VoidSet::Interaction)
                    .run_if(in_state(VoidMode::Exploring)),
            )
            .add_systems(
                Update,
                terminal_ui
                    .after(VoidSet::Terminal)
                    .run_if(in_state(VoidMode::Terminal)),
            );
    }
}

fn site_ui(
    mut contexts: EguiContexts,
    keybinds: Res<Keybinds>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    egui::CentralPanel::default().show(contexts.ctx_mut(), |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(120.0);
            ui.heading("mem0");
            ui.label("Portfolio, projects and writing.");
            ui.add_space(24.0);
            if ui.button("Enter the void").clicked() {
                next_state.set(AppState::Void);
            }
            ui.small(format!("or press {:?}", keybinds.overlay_toggle));
        });
    });
}

fn help_ui(
    mut contexts: EguiContexts,
    settings: Res<VoidSettings>,
    keybinds: Res<Keybinds>,
    gate: Res<InteractionGate>,
    diagnostics: Res<DiagnosticsStore>,
) {
    if !settings.show_help {
        return;
    }
    egui::Window::new("Help").show(contexts.ctx_mut(), |ui| {
        ui.label(format!(
            "{:?}/{:?}/{:?}/{:?}: Move",
            keybinds.forward, keybinds.left, keybinds.backward, keybinds.right
        ));
        ui.label(format!("{:?}: Run", keybinds.boost));
        ui.label("Mouse: Look around (click to capture)");
        ui.label(format!("{:?}: Release mouse", keybinds.release_capture));
        ui.label(format!("{:?}: Use computer", keybinds.interact));
        ui.label(format!("{:?}: Leave terminal", keybinds.exit));
        ui.label(format!("{:?}: Toggle void", keybinds.overlay_toggle));
        ui.label(format!("{:?}: Toggle help", keybinds.help));
        if let Some(reading) = gate.reading {
            ui.separator();
            ui.label(format!(
                "Computer: {:.2} away, facing {:.2}",
                reading.distance, reading.alignment
            ));
        }
        if let Some(fps) = diagnostics
            .get(&FrameTimeDiagnosticsPlugin::FPS)
            .and_then(|fps| fps.smoothed())
        {
            ui.separator();
            ui.label(format!("FPS: {:.1}", fps));
        }
    });
}

fn exploring_hud(
    mut contexts: EguiContexts,
    gate: Res<InteractionGate>,
    capture: Res<PointerCapture>,
    keybinds: Res<Keybinds>,
) {
    let ctx = contexts.ctx_mut();
    let center = ctx.screen_rect().center();
    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Foreground,
        egui::Id::new("crosshair"),
    ));
    let stroke = egui::Stroke::new(2.0, egui::Color32::from_white_alpha(200));
    painter.line_segment([center - egui::vec2(8.0, 0.0), center + egui::vec2(8.0, 0.0)], stroke);
    painter.line_segment([center - egui::vec2(0.0, 8.0), center + egui::vec2(0.0, 8.0)], stroke);

    if gate.in_range() {
        egui::Area::new(egui::Id::new("interact_prompt"))
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 60.0))
            .show(ctx, |ui| {
                prompt_frame().show(ui, |ui| {
                    ui.label(
                        egui::RichText::new(format!("Press {:?} to use computer", keybinds.interact))
                            .color(egui::Color32::WHITE),
                    );
                });
            });
    }

    if !capture.is_captured() {
        egui::Area::new(egui::Id::new("capture_hint"))
            .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 24.0))
            .show(ctx, |ui| {
                prompt_frame().show(ui, |ui| {
                    ui.label(
                        egui::RichText::new("Click to look around")
                            .color(egui::Color32::LIGHT_GRAY),
                    );
                });
            });
    }
}

fn prompt_frame() -> egui::Frame {
    egui::Frame::none()
        .fill(egui::Color32::from_black_alpha(180))
        .inner_margin(egui::Margin::symmetric(12.0, 6.0))
        .rounding(4.0)
}

/// Things the desktop asked for while being drawn; applied once drawing is done.
enum DesktopAction {
    Launch(&'static Program),
    Close(&'static str),
    ToggleMinimized(&'static str),
    ToggleStartMenu,
}

fn terminal_ui(
    mut contexts: EguiContexts,
    session: Option<Res<TerminalSession>>,
    desktop: Option<ResMut<Desktop>>,
    catalog: Res<ProgramCatalog>,
    clock: Res<TrayClock>,
    keybinds: Res<Keybinds>,
    mut next_mode: ResMut<NextState<VoidMode>>,
) {
    let Some(session) = session else {
        return;
    };
    let ctx = contexts.ctx_mut();
    match session.phase() {
        TerminalPhase::Boot => screen(ctx, |ui| boot_screen(ui, &session, &keybinds)),
        TerminalPhase::PasswordEntry => screen(ctx, |ui| password_screen(ui, &session)),
        TerminalPhase::Authenticated => {
            let Some(mut desktop) = desktop else {
                return;
            };
            let actions = desktop_ui(ctx, &desktop, &catalog, &clock);
            let mut rng = rand::thread_rng();
            for action in actions {
                match action {
                    DesktopAction::Launch(program) => {
                        if desktop.launch(program, &mut rng) == Launch::Shutdown {
                            info!("desktop shut down, leaving terminal");
                            next_mode.set(VoidMode::Exploring);
                        }
                    }
                    DesktopAction::Close(id) => {
                        desktop.registry.close_window(id);
                    }
                    DesktopAction::ToggleMinimized(id) => {
                        desktop.registry.minimize_window(id);
                    }
                    DesktopAction::ToggleStartMenu => {
                        desktop.start_menu_open = !desktop.start_menu_open;
                    }
                }
            }
        }
    }
}

fn screen(ctx: &egui::Context, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::CentralPanel::default()
        .frame(egui::Frame::none().fill(SCREEN_BLACK).inner_margin(40.0))
        .show(ctx, add_contents);
}

fn green(text: impl Into<String>) -> egui::RichText {
    egui::RichText::new(text).monospace().color(SCREEN_GREEN)
}

fn boot_screen(ui: &mut egui::Ui, session: &TerminalSession, keybinds: &Keybinds) {
    ui.label(green("VOID SYSTEM v3.7.1").size(22.0).strong());
    ui.add_space(16.0);
    for line in BOOT_LINES {
        ui.label(green(line));
    }
    if session.boot_complete() {
        ui.label(green("✓ System ready").strong());
        ui.label(green("Requesting authentication..."));
    }
    ui.add_space(24.0);
    ui.label(green(format!("[{:?}] exit", keybinds.exit)).small().weak());
}

fn password_screen(ui: &mut egui::Ui, session: &TerminalSession) {
    ui.label(green("VOID ACCESS TERMINAL").size(22.0).strong());
    ui.add_space(16.0);
    ui.label(green("Enter access code:"));
    ui.label(green(format!("> {}_", session.masked())));
    if session.show_hint() {
        ui.add_space(8.0);
        ui.label(green(HINT).italics().weak());
    }
}

fn desktop_ui(
    ctx: &egui::Context,
    desktop: &Desktop,
    catalog: &ProgramCatalog,
    clock: &TrayClock,
) -> Vec<DesktopAction> {
    let mut actions = Vec::new();

    egui::TopBottomPanel::bottom("taskbar")
        .frame(egui::Frame::none().fill(CHROME_GREY).inner_margin(4.0))
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button(egui::RichText::new("Start").strong()).clicked() {
                    actions.push(DesktopAction::ToggleStartMenu);
                }
                ui.separator();
                for window in desktop.registry.running() {
                    let label = format!("{} {}", window.program.icon, window.program.name);
                    if ui.selectable_label(!window.minimized, label).clicked() {
                        actions.push(DesktopAction::ToggleMinimized(window.id()));
                    }
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(egui::RichText::new(clock.label()).monospace().color(egui::Color32::BLACK));
                });
            });
        });

    egui::CentralPanel::default()
        .frame(egui::Frame::none().fill(DESKTOP_TEAL))
        .show(ctx, |ui| {
            let origin = ui.max_rect().min;
            for (i, program) in catalog.desktop.iter().enumerate() {
                let slot = icon_slot(i);
                let rect = egui::Rect::from_min_size(
                    origin + egui::vec2(slot.x, slot.y),
                    egui::vec2(72.0, 72.0),
                );
                let icon = egui::Button::new(
                    egui::RichText::new(format!("{}\n{}", program.icon, program.name))
                        .color(egui::Color32::WHITE),
                )
                .frame(false);
                if ui.put(rect, icon).on_hover_text(program.kind.label()).double_clicked() {
                    actions.push(DesktopAction::Launch(program));
                }
            }
        });

    for window in desktop.registry.visible() {
        let program = &window.program;
        egui::Window::new(program.name)
            .id(egui::Id::new(("program", program.id, window.serial)))
            .default_pos(egui::pos2(window.position.x, window.position.y))
            .fixed_size(egui::vec2(window.size.x, window.size.y))
            .title_bar(false)
            .frame(egui::Frame::window(&ctx.style()).fill(CHROME_GREY))
            .show(ctx, |ui| {
                egui::Frame::none()
                    .fill(TITLE_BLUE)
                    .inner_margin(4.0)
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.label(
                                egui::RichText::new(format!("{} {}", program.icon, program.name))
                                    .color(egui::Color32::WHITE)
                                    .strong(),
                            );
                            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                if ui.small_button("×").clicked() {
                                    actions.push(DesktopAction::Close(program.id));
                                }
                                ui.add_enabled(false, egui::Button::new("□").small());
                                if ui.small_button("_").clicked() {
                                    actions.push(DesktopAction::ToggleMinimized(program.id));
                                }
                            });
                        });
                    });
                ui.add_space(8.0);
                show_blocks(ui, &document_for(program.id, program.name));
                if program.id == "portfolio" {
                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        for (label, target) in [
                            ("View Projects", "projects"),
                            ("About Me", "about"),
                            ("Contact", "contact"),
                        ] {
                            if ui.button(label).clicked() {
                                if let Some(p) = catalog.find(target) {
                                    actions.push(DesktopAction::Launch(p));
                                }
                            }
                        }
                    });
                }
            });
    }

    if desktop.start_menu_open {
        egui::Area::new(egui::Id::new("start_menu"))
            .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(4.0, -40.0))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::popup(&ctx.style()).fill(CHROME_GREY).show(ui, |ui| {
                    egui::Frame::none().fill(TITLE_BLUE).inner_margin(6.0).show(ui, |ui| {
                        ui.label(egui::RichText::new("mem0 OS").color(egui::Color32::WHITE).strong());
                        ui.label(egui::RichText::new("v3.7.1").color(egui::Color32::LIGHT_GRAY).small());
                    });
                    for program in catalog.start_menu {
                        let label = format!("{} {}", program.icon, program.name);
                        if ui.button(label).clicked() {
                            actions.push(DesktopAction::Launch(program));
                        }
                    }
                });
            });
    }

    actions
}

/// Plain-label rendering; block text is never parsed as markup.
fn show_blocks(ui: &mut egui::Ui, blocks: &[Block]) {
    for block in blocks {
        match block {
            Block::Heading(text) => {
                ui.heading(text.as_str());
            }
            Block::List(items) => {
                for item in items {
                    ui.label(format!("• {item}"));
                }
            }
            Block::Paragraph(text) => {
                ui.label(text.as_str());
            }
        }
        ui.add_space(4.0);
    }
}
