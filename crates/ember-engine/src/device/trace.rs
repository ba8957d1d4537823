//! Recording device used by unit tests.
//!
//! Captures every state change and draw so tests can assert call sequences,
//! state restoration and live resource counts without a GPU.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, ensure};

use super::state::DeviceState;
use super::{FramebufferId, Mesh, RenderDevice, ScissorRect, TextureId, Topology, WrapMode};
use crate::coords::Viewport;
use crate::paint::Color;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TraceEvent {
    Clear(Color),
    SetDrawColor(Color),
    SetTexturing(bool),
    SetWrap(TextureId, WrapMode),
    SetScissor(Option<ScissorRect>),
    BindTexture(Option<TextureId>),
    BindFramebuffer(Option<FramebufferId>),
    Draw(DrawRecord),
}

/// One recorded draw call, with the scratch contents copied out.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DrawRecord {
    pub topology: Topology,
    pub texture: Option<TextureId>,
    pub textured: bool,
    pub positions: Vec<f32>,
    pub colors: Option<Vec<f32>>,
    pub draw_color: Color,
}

impl DrawRecord {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 2
    }
}

#[derive(Default)]
pub(crate) struct TraceDevice {
    state: DeviceState,
    viewport: Viewport,
    events: Vec<TraceEvent>,
    live_textures: HashSet<TextureId>,
    live_framebuffers: HashSet<FramebufferId>,
    wrap: HashMap<TextureId, WrapMode>,
    next_texture: u32,
    next_framebuffer: u32,
}

impl TraceDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn draws(&self) -> Vec<&DrawRecord> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Draw(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn draw_count(&self) -> usize {
        self.draws().len()
    }

    pub fn live_texture_count(&self) -> usize {
        self.live_textures.len()
    }

    pub fn live_framebuffer_count(&self) -> usize {
        self.live_framebuffers.len()
    }

    pub fn wrap_of(&self, texture: TextureId) -> WrapMode {
        self.wrap
            .get(&texture)
            .copied()
            .unwrap_or(WrapMode::ClampToEdge)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}

impl RenderDevice for TraceDevice {
    fn set_projection(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn clear(&mut self, color: Color) {
        self.events.push(TraceEvent::Clear(color));
    }

    fn set_draw_color(&mut self, color: Color) {
        self.state.draw_color = color;
        self.events.push(TraceEvent::SetDrawColor(color));
    }

    fn draw_color(&self) -> Color {
        self.state.draw_color
    }

    fn set_texturing(&mut self, enabled: bool) {
        self.state.texturing = enabled;
        self.events.push(TraceEvent::SetTexturing(enabled));
    }

    fn texturing(&self) -> bool {
        self.state.texturing
    }

    fn set_wrap(&mut self, texture: TextureId, wrap: WrapMode) {
        self.wrap.insert(texture, wrap);
        self.events.push(TraceEvent::SetWrap(texture, wrap));
    }

    fn set_scissor(&mut self, rect: Option<ScissorRect>) {
        self.state.scissor = rect;
        self.events.push(TraceEvent::SetScissor(rect));
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.state.bound_texture = texture;
        self.events.push(TraceEvent::BindTexture(texture));
    }

    fn bound_texture(&self) -> Option<TextureId> {
        self.state.bound_texture
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.state.target = framebuffer;
        self.events.push(TraceEvent::BindFramebuffer(framebuffer));
    }

    fn draw(&mut self, topology: Topology, mesh: &Mesh<'_>) {
        if mesh.vertex_count() == 0 {
            return;
        }
        self.state.bound_texture = mesh.texture;
        self.events.push(TraceEvent::Draw(DrawRecord {
            topology,
            texture: mesh.texture,
            textured: self.state.texturing && mesh.texture.is_some(),
            positions: mesh.positions.to_vec(),
            colors: mesh.colors.map(|c| c.to_vec()),
            draw_color: self.state.draw_color,
        }));
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        _pixels: Option<&[u8]>,
    ) -> Result<TextureId> {
        ensure!(width > 0 && height > 0, "texture must be at least 1x1");
        self.next_texture += 1;
        let id = TextureId(self.next_texture);
        self.live_textures.insert(id);
        Ok(id)
    }

    fn create_render_target(
        &mut self,
        texture: TextureId,
        width: u32,
        height: u32,
    ) -> Result<FramebufferId> {
        ensure!(width > 0 && height > 0, "render target must be at least 1x1");
        ensure!(
            self.live_textures.contains(&texture),
            "render target requested for unknown texture"
        );
        self.next_framebuffer += 1;
        let id = FramebufferId(self.next_framebuffer);
        self.live_framebuffers.insert(id);
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.live_textures.remove(&texture);
        if self.state.bound_texture == Some(texture) {
            self.state.bound_texture = None;
        }
    }

    fn delete_render_target(&mut self, framebuffer: FramebufferId) {
        self.live_framebuffers.remove(&framebuffer);
        if self.state.target == Some(framebuffer) {
            self.state.target = None;
        }
    }
}
