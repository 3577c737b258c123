//! Render error types.
//!
//! Nothing in this crate treats a render failure as fatal. Errors surface to
//! the [`FrameLoop`](crate::FrameLoop), which logs them and skips the frame.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no compatible GPU adapter was found")]
    NoAdapter,

    #[error("failed to acquire GPU device: {0}")]
    RequestDevice(String),

    #[error("render surface is not ready ({width}x{height})")]
    SurfaceNotReady { width: u32, height: u32 },

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("render resources were already released")]
    Released,

    #[error("buffer size mismatch: expected {expected} floats, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("config error: {0}")]
    Config(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
