//! Immediate-mode draw operations.
//!
//! [`Canvas`] owns the render device and issues one GPU draw per primitive
//! call. Stroke geometry lives in `line`; render-to-texture copies in
//! `compositor`.
//!
//! Convention:
//! - All coordinates are logical pixels, top-left origin, +Y down.
//! - Quads are 6-vertex triangle strips in TL,BL,BR,BR,TR,TL order; the
//!   winding keeps texture orientation consistent across every blit path.

mod canvas;
mod compositor;
mod line;

pub use canvas::Canvas;
pub use compositor::copy_region;

/// Quad positions as a 6-vertex strip: TL,BL,BR,BR,TR,TL.
///
/// Negative `h` flips the quad vertically; the compositor relies on this
/// for render-target orientation.
pub(crate) fn quad_strip(x: f32, y: f32, w: f32, h: f32) -> [f32; 12] {
    [
        x, y, //
        x, y + h, //
        x + w, y + h, //
        x + w, y + h, //
        x + w, y, //
        x, y,
    ]
}

/// Texture coordinates matching [`quad_strip`]'s vertex order.
///
/// `(x, y)` is the near corner, `(u, v)` the far corner, both as fractions
/// of the texture extent.
pub(crate) fn quad_uv(x: f32, y: f32, u: f32, v: f32) -> [f32; 12] {
    [
        x, y, //
        x, v, //
        u, v, //
        u, v, //
        u, y, //
        x, y,
    ]
}
