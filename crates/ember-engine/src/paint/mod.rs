//! Color model shared between draw calls and the device.
//!
//! Callers pass 0–255 integer channels; the device converts to 0.0–1.0
//! floats at the GPU boundary. Alpha is straight (not premultiplied) to
//! match the `SrcAlpha`/`OneMinusSrcAlpha` blend the device configures.

mod color;

pub use color::Color;
