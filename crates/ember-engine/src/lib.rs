//! Ember engine crate.
//!
//! Immediate-mode 2D rendering backend: draw requests (shapes, images,
//! text, gradients, lines) become GPU commands one call at a time, with no
//! retained scene. The crate also owns GPU-side resource handles (textures,
//! off-screen render targets, cursors) and the display surface's
//! size/fullscreen state machine.

pub mod coords;
pub mod cursor;
pub mod device;
pub mod display;
pub mod paint;
pub mod render;
pub mod text;
pub mod texture;

pub mod error;
pub mod logging;
pub mod vfs;
