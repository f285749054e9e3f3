mod content;
mod desktop;
mod error;
mod input;
mod interaction;
mod movement;
mod scene;
mod sim;
mod terminal;
mod ui;

use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use input::InputPlugin;
use scene::ScenePlugin;
use sim::{AppState, SimPlugin};
use ui::UiPlugin;

fn main() {
    App::new()
        .insert_resource(ClearColor(Color::srgb_u8(0x00, 0x00, 0x11)))
        .insert_resource(Msaa::Sample4)
        .insert_resource(AmbientLight {
            color: Color::srgb_u8(0x00, 0x22, 0x88),
            brightness: 300.0,
        })
        .add_plugins(FrameTimeDiagnosticsPlugin)
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "mem0 · the void".into(),
                        resolution: (1400., 900.).into(),
                        ..default()
                    }),
                    ..default()
                })
                .set(LogPlugin {
                    level: Level::INFO,
                    filter: "wgpu=error,naga=warn,void_sim=debug".into(),
                    ..default()
                }),
        )
        .add_plugins((SimPlugin, InputPlugin, ScenePlugin, UiPlugin))
        .add_systems(OnEnter(AppState::Site), spawn_site_camera)
        .add_systems(OnExit(AppState::Site), despawn_site_camera)
        .run();
}

/// The first-person camera. Spawned and owned by the mounted void scene.
#[derive(Component)]
pub struct MainCamera;

/// Backdrop camera while only the site panel is showing.
#[derive(Component)]
struct SiteCamera;

fn spawn_site_camera(mut commands: Commands) {
    commands.spawn((Camera2dBundle::default(), SiteCamera));
}

fn despawn_site_camera(mut commands: Commands, cameras: Query<Entity, With<SiteCamera>>) {
    for e in &cameras {
        commands.entity(e).despawn_recursive();
    }
}
