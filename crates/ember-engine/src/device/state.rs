use super::{FramebufferId, ScissorRect, TextureId};
use crate::paint::Color;

/// Bookkeeping shared by device implementations.
///
/// Mirrors the stateful context of the GPU: draw color, texturing flag,
/// scissor, and the active texture/framebuffer bindings.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DeviceState {
    pub draw_color: Color,
    pub texturing: bool,
    pub scissor: Option<ScissorRect>,
    pub bound_texture: Option<TextureId>,
    pub target: Option<FramebufferId>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            draw_color: Color::WHITE,
            texturing: true,
            scissor: None,
            bound_texture: None,
            target: None,
        }
    }
}
