use thiserror::Error;

/// Why a pointer-capture request was turned down.
///
/// Rejection is never fatal: the void keeps rendering uncaptured and waits for the
/// user to click again.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    #[error("pointer capture rejected: window does not have focus")]
    Unfocused,
    #[error("pointer capture rejected: no primary window")]
    NoWindow,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MountError {
    #[error("void scene is already mounted (camera {camera:?})")]
    AlreadyMounted { camera: bevy::prelude::Entity },
}
