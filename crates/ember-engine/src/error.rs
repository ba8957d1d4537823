use thiserror::Error;

/// Fatal display/GPU startup failures.
///
/// These surface only from [`DisplaySurface::initialize`] and are never
/// retried by this core; the caller decides whether to abort or fall back.
/// Non-critical resource failures (cursors, window icons) are logged and
/// skipped instead of raised.
///
/// [`DisplaySurface::initialize`]: crate::display::DisplaySurface::initialize
#[derive(Debug, Error)]
pub enum InitError {
    /// The windowing/GPU backend could not be started (no usable adapter).
    #[error("video backend initialization failed: {0}")]
    BackendInit(String),

    /// Window creation failed.
    #[error("window creation failed: {0}")]
    WindowCreation(String),

    /// GPU context (device/queue or surface) creation failed.
    #[error("GPU context creation failed: {0}")]
    ContextCreation(String),

    /// The driver does not meet the shader capability floor.
    ///
    /// The core only uses fixed internal shaders, but a driver without a
    /// usable shading model cannot run them either.
    #[error("driver reports no usable shader capability")]
    MissingCapability,
}
