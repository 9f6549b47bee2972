//! Error types
//!
//! The movement core is pure arithmetic; errors only come from configuration,
//! arena reshaping and the OS refusing to start a thread.

use thiserror::Error;

/// Errors surfaced by the simulation API.
#[derive(Error, Debug)]
pub enum SimError {
    /// Arena dimensions must be finite and strictly positive.
    #[error("invalid arena size {width}x{height}: dimensions must be positive")]
    InvalidArenaSize {
        /// Requested width.
        width: f32,
        /// Requested height.
        height: f32,
    },

    /// Boards are spawned once per simulation.
    #[error("boards already spawned")]
    AlreadySpawned,

    /// Settings failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// A movement or render thread could not be started.
    #[error("failed to start thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Settings or backdrop file could not be read or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Settings file is not valid JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type SimResult<T> = Result<T, SimError>;
