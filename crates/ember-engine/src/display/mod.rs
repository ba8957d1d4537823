//! Window, surface and display-mode management.
//!
//! [`DisplayState`] is the pure mode machine (size reporting, fullscreen
//! transitions, the cached desktop resolution); [`DisplaySurface`] applies
//! it to a winit window and a wgpu surface and owns frame
//! acquisition/presentation.

mod state;
mod surface;

pub use state::{DisplayState, FullscreenMode};
pub use surface::{DisplayConfig, DisplaySurface, Frame};
