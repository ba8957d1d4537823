//! GPU device abstraction.
//!
//! Fixed-function draw state lives in a single owned device object passed
//! to every draw operation; nothing is process-wide. [`RenderDevice`] models the small stateful surface the draw
//! layer needs (draw color, texturing, wrap, scissor, bindings) plus
//! immediate draw submission: one call, one GPU draw, issued before the call
//! returns.
//!
//! [`WgpuDevice`] is the production implementation; tests use the recording
//! `TraceDevice` to assert call sequences and state restoration.

mod gpu;
mod state;

#[cfg(test)]
pub(crate) mod trace;

pub use gpu::WgpuDevice;

use anyhow::Result;

use crate::coords::Viewport;
use crate::paint::Color;

/// Opaque GPU texture handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u32);

/// Opaque render-target (framebuffer) handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub(crate) u32);

/// Primitive topology for a draw submission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topology {
    Points,
    LineStrip,
    TriangleStrip,
}

/// Texture edge sampling behavior.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
}

/// Scissor rectangle in logical pixels, top-left origin.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Borrowed per-call geometry.
///
/// Slices point into the caller's scratch buffers and are fully consumed
/// before `draw` returns; nothing retains them afterwards.
#[derive(Debug, Copy, Clone)]
pub struct Mesh<'a> {
    /// Vertex positions as x,y pairs (logical pixels).
    pub positions: &'a [f32],
    /// Texture coordinates as u,v pairs; required when `texture` is set.
    pub texcoords: Option<&'a [f32]>,
    /// Per-vertex straight RGBA floats; `None` uses the device draw color.
    pub colors: Option<&'a [f32]>,
    /// Texture to bind for this draw. Sampled only while texturing is on.
    pub texture: Option<TextureId>,
}

impl<'a> Mesh<'a> {
    /// Untextured geometry drawn with the current draw color.
    #[inline]
    pub fn colored(positions: &'a [f32]) -> Self {
        Self {
            positions,
            texcoords: None,
            colors: None,
            texture: None,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 2
    }
}

/// The owned render context every draw operation goes through.
///
/// State-mutating calls (`set_*`, `bind_*`) persist until changed; callers
/// that alter state for a single call are responsible for restoring it
/// before returning, so no state leaks across draw operations.
pub trait RenderDevice {
    /// Sets the orthographic projection for screen draws.
    fn set_projection(&mut self, viewport: Viewport);

    /// Clears the current target to `color`.
    fn clear(&mut self, color: Color);

    /// Sets the color applied to draws without per-vertex colors.
    fn set_draw_color(&mut self, color: Color);
    fn draw_color(&self) -> Color;

    /// Enables or disables texture sampling for subsequent draws.
    fn set_texturing(&mut self, enabled: bool);
    fn texturing(&self) -> bool;

    /// Sets the wrap mode of a texture.
    fn set_wrap(&mut self, texture: TextureId, wrap: WrapMode);

    /// Sets or clears the scissor rectangle.
    fn set_scissor(&mut self, rect: Option<ScissorRect>);

    /// Binds a texture without drawing.
    ///
    /// `draw` also updates the binding to the mesh's texture, mirroring the
    /// stateful context this models.
    fn bind_texture(&mut self, texture: Option<TextureId>);
    fn bound_texture(&self) -> Option<TextureId>;

    /// Selects the draw target: `None` for the screen, or an off-screen
    /// render target.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    /// Issues one GPU draw for `mesh`, immediately.
    fn draw(&mut self, topology: Topology, mesh: &Mesh<'_>);

    /// Creates a texture, optionally uploading tightly-packed RGBA pixels.
    fn create_texture(&mut self, width: u32, height: u32, pixels: Option<&[u8]>)
    -> Result<TextureId>;

    /// Creates a render target whose color attachment is `texture`.
    fn create_render_target(
        &mut self,
        texture: TextureId,
        width: u32,
        height: u32,
    ) -> Result<FramebufferId>;

    fn delete_texture(&mut self, texture: TextureId);
    fn delete_render_target(&mut self, framebuffer: FramebufferId);
}
