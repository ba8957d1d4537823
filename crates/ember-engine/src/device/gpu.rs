use std::collections::HashMap;

use anyhow::{Context, Result, ensure};
use bytemuck::{Pod, Zeroable};

use super::state::DeviceState;
use super::{FramebufferId, Mesh, RenderDevice, ScissorRect, TextureId, Topology, WrapMode};
use crate::coords::Viewport;
use crate::paint::Color;

/// Pixel format for textures and render targets.
///
/// Chosen by host byte order so GPU texel layout matches the backing pixel
/// buffers produced by the external loading path; a mismatch corrupts colors
/// on render-to-texture copies.
#[cfg(target_endian = "big")]
pub(crate) const TEXEL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;
#[cfg(target_endian = "little")]
pub(crate) const TEXEL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// wgpu-backed [`RenderDevice`].
///
/// Immediate mode: every `draw`/`clear` encodes one tiny render pass and
/// submits it before returning. There is no cross-call batching; the draw
/// layer above relies on submission ordering matching call ordering.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,

    state: DeviceState,
    viewport: Viewport,

    /// Current frame's swapchain view; set by the display surface each frame.
    screen: Option<wgpu::TextureView>,
    screen_format: wgpu::TextureFormat,

    textures: HashMap<TextureId, TextureEntry>,
    framebuffers: HashMap<FramebufferId, FramebufferEntry>,
    next_texture: u32,
    next_framebuffer: u32,

    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    shader: Option<wgpu::ShaderModule>,
    globals_layout: Option<wgpu::BindGroupLayout>,
    texture_layout: Option<wgpu::BindGroupLayout>,
    globals_ubo: Option<wgpu::Buffer>,
    globals_bind_group: Option<wgpu::BindGroup>,

    sampler_clamp: Option<wgpu::Sampler>,
    sampler_repeat: Option<wgpu::Sampler>,

    /// Interleaved vertex scratch, rebuilt per draw call.
    vertex_scratch: Vec<PrimVertex>,
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_capacity: usize,
}

struct TextureEntry {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    wrap: WrapMode,
}

struct FramebufferEntry {
    view: wgpu::TextureView,
    size: (u32, u32),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    format: wgpu::TextureFormat,
    textured: bool,
    topology: Topology,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct PrimVertex {
    pos: [f32; 2],
    uv: [f32; 2],
    color: [f32; 4],
}

impl PrimVertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2, // uv
        2 => Float32x4  // color
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PrimVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct GlobalsUniform {
    viewport: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
}

fn straight_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

impl WgpuDevice {
    /// Wraps an already-created device/queue pair.
    ///
    /// `screen_format` is the surface format frames will be presented in.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        screen_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            queue,
            state: DeviceState::default(),
            viewport: Viewport::default(),
            screen: None,
            screen_format,
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            next_texture: 1,
            next_framebuffer: 1,
            pipelines: HashMap::new(),
            shader: None,
            globals_layout: None,
            texture_layout: None,
            globals_ubo: None,
            globals_bind_group: None,
            sampler_clamp: None,
            sampler_repeat: None,
            vertex_scratch: Vec::new(),
            vertex_buffer: None,
            vertex_capacity: 0,
        }
    }

    /// Points screen draws at the current frame's swapchain view.
    ///
    /// The display surface sets this when a frame is acquired and clears it
    /// after presentation.
    pub fn set_screen_target(&mut self, view: Option<wgpu::TextureView>) {
        self.screen = view;
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn ensure_shared(&mut self) {
        if self.shader.is_none() {
            let shader_src = include_str!("shaders/prim.wgsl");
            self.shader = Some(self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("ember prim shader"),
                source: wgpu::ShaderSource::Wgsl(shader_src.into()),
            }));
        }

        if self.globals_layout.is_none() {
            self.globals_layout = Some(self.device.create_bind_group_layout(
                &wgpu::BindGroupLayoutDescriptor {
                    label: Some("ember globals bgl"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: std::num::NonZeroU64::new(
                                std::mem::size_of::<GlobalsUniform>() as u64,
                            ),
                        },
                        count: None,
                    }],
                },
            ));
        }

        if self.texture_layout.is_none() {
            self.texture_layout = Some(self.device.create_bind_group_layout(
                &wgpu::BindGroupLayoutDescriptor {
                    label: Some("ember texture bgl"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                },
            ));
        }

        if self.globals_ubo.is_none() {
            let ubo = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("ember globals ubo"),
                size: std::mem::size_of::<GlobalsUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let layout = self
                .globals_layout
                .as_ref()
                .expect("globals layout created above");
            self.globals_bind_group = Some(self.device.create_bind_group(
                &wgpu::BindGroupDescriptor {
                    label: Some("ember globals bind group"),
                    layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: ubo.as_entire_binding(),
                    }],
                },
            ));
            self.globals_ubo = Some(ubo);
        }

        if self.sampler_clamp.is_none() {
            self.sampler_clamp = Some(self.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("ember clamp sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            }));
            self.sampler_repeat = Some(self.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("ember repeat sampler"),
                address_mode_u: wgpu::AddressMode::Repeat,
                address_mode_v: wgpu::AddressMode::Repeat,
                address_mode_w: wgpu::AddressMode::Repeat,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            }));
        }
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        self.ensure_shared();

        let shader = self.shader.as_ref().expect("shader created by ensure_shared");
        let globals_layout = self
            .globals_layout
            .as_ref()
            .expect("globals layout created by ensure_shared");

        let mut layouts: Vec<&wgpu::BindGroupLayout> = vec![globals_layout];
        if key.textured {
            layouts.push(
                self.texture_layout
                    .as_ref()
                    .expect("texture layout created by ensure_shared"),
            );
        }

        let pipeline_layout =
            self.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("ember prim pipeline layout"),
                    bind_group_layouts: &layouts,
                    immediate_size: 0,
                });

        let topology = match key.topology {
            Topology::Points => wgpu::PrimitiveTopology::PointList,
            Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        };

        let fs_entry = if key.textured { "fs_textured" } else { "fs_color" };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("ember prim pipeline"),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[PrimVertex::layout()],
                },

                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some(fs_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: key.format,
                        blend: Some(straight_alpha_blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),

                multiview_mask: None,
                cache: None,
            });

        self.pipelines.insert(key, pipeline);
    }

    fn ensure_vertex_capacity(&mut self, required: usize) {
        if required <= self.vertex_capacity && self.vertex_buffer.is_some() {
            return;
        }

        let new_cap = required.next_power_of_two().max(64);
        self.vertex_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ember prim vbo"),
            size: (new_cap * std::mem::size_of::<PrimVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.vertex_capacity = new_cap;
    }

    /// Resolves the current target's view, format and viewport.
    fn target(&self) -> Option<(&wgpu::TextureView, wgpu::TextureFormat, Viewport)> {
        match self.state.target {
            Some(fb) => {
                let entry = self.framebuffers.get(&fb)?;
                let (w, h) = entry.size;
                Some((&entry.view, TEXEL_FORMAT, Viewport::new(w as f32, h as f32)))
            }
            None => {
                let view = self.screen.as_ref()?;
                Some((view, self.screen_format, self.viewport))
            }
        }
    }

    fn scissor_for(&self, viewport: Viewport) -> Option<(u32, u32, u32, u32)> {
        let vw = viewport.width.max(1.0) as u32;
        let vh = viewport.height.max(1.0) as u32;
        match self.state.scissor {
            None => Some((0, 0, vw, vh)),
            Some(ScissorRect { x, y, width, height }) => {
                let x = x.min(vw);
                let y = y.min(vh);
                let w = width.min(vw - x);
                let h = height.min(vh - y);
                if w == 0 || h == 0 { None } else { Some((x, y, w, h)) }
            }
        }
    }
}

impl RenderDevice for WgpuDevice {
    fn set_projection(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn clear(&mut self, color: Color) {
        let [r, g, b, a] = color.to_f32();
        let Some((view, _, _)) = self.target() else {
            log::warn!("clear issued with no active target");
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ember clear encoder"),
            });
        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ember clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn set_draw_color(&mut self, color: Color) {
        self.state.draw_color = color;
    }

    fn draw_color(&self) -> Color {
        self.state.draw_color
    }

    fn set_texturing(&mut self, enabled: bool) {
        self.state.texturing = enabled;
    }

    fn texturing(&self) -> bool {
        self.state.texturing
    }

    fn set_wrap(&mut self, texture: TextureId, wrap: WrapMode) {
        if let Some(entry) = self.textures.get_mut(&texture) {
            entry.wrap = wrap;
        }
    }

    fn set_scissor(&mut self, rect: Option<ScissorRect>) {
        self.state.scissor = rect;
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.state.bound_texture = texture;
    }

    fn bound_texture(&self) -> Option<TextureId> {
        self.state.bound_texture
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.state.target = framebuffer;
    }

    fn draw(&mut self, topology: Topology, mesh: &Mesh<'_>) {
        let vertex_count = mesh.vertex_count();
        if vertex_count == 0 {
            return;
        }

        // The draw binds its texture, like the stateful context it models.
        self.state.bound_texture = mesh.texture;

        let textured = self.state.texturing && mesh.texture.is_some();

        // Interleave into scratch before taking any GPU borrows.
        let fill = self.state.draw_color.to_f32();
        self.vertex_scratch.clear();
        for i in 0..vertex_count {
            let pos = [mesh.positions[i * 2], mesh.positions[i * 2 + 1]];
            let uv = mesh
                .texcoords
                .map_or([0.0, 0.0], |t| [t[i * 2], t[i * 2 + 1]]);
            let color = mesh.colors.map_or(fill, |c| {
                [c[i * 4], c[i * 4 + 1], c[i * 4 + 2], c[i * 4 + 3]]
            });
            self.vertex_scratch.push(PrimVertex { pos, uv, color });
        }

        let format = match self.state.target {
            Some(_) => TEXEL_FORMAT,
            None => self.screen_format,
        };
        let key = PipelineKey { format, textured, topology };
        self.ensure_pipeline(key);
        self.ensure_vertex_capacity(vertex_count);

        let Some((view, _, viewport)) = self.target() else {
            log::warn!("draw issued with no active target");
            return;
        };
        let Some((sx, sy, sw, sh)) = self.scissor_for(viewport) else {
            return;
        };

        let vbo = self.vertex_buffer.as_ref().expect("vertex buffer ensured");
        self.queue
            .write_buffer(vbo, 0, bytemuck::cast_slice(&self.vertex_scratch));

        let ubo = self.globals_ubo.as_ref().expect("globals ubo ensured");
        let globals = GlobalsUniform {
            viewport: [viewport.width.max(1.0), viewport.height.max(1.0)],
            _pad: [0.0; 2],
        };
        self.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&globals));

        // Per-draw texture bind group; immediate mode trades reuse for
        // simplicity here.
        let texture_bind_group = if textured {
            let id = mesh.texture.expect("textured draws carry a texture");
            let Some(entry) = self.textures.get(&id) else {
                log::warn!("draw references unknown texture {id:?}");
                return;
            };
            let sampler = match entry.wrap {
                WrapMode::ClampToEdge => self.sampler_clamp.as_ref(),
                WrapMode::Repeat => self.sampler_repeat.as_ref(),
            }
            .expect("samplers created by ensure_shared");
            Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("ember texture bind group"),
                layout: self
                    .texture_layout
                    .as_ref()
                    .expect("texture layout created by ensure_shared"),
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&entry.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            }))
        } else {
            None
        };

        let pipeline = self.pipelines.get(&key).expect("pipeline ensured");
        let globals_bind_group = self
            .globals_bind_group
            .as_ref()
            .expect("globals bind group ensured");

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ember draw encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ember draw pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(pipeline);
            rpass.set_scissor_rect(sx, sy, sw, sh);
            rpass.set_bind_group(0, globals_bind_group, &[]);
            if let Some(bg) = texture_bind_group.as_ref() {
                rpass.set_bind_group(1, bg, &[]);
            }
            rpass.set_vertex_buffer(0, vbo.slice(..));
            rpass.draw(0..vertex_count as u32, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    ) -> Result<TextureId> {
        ensure!(width > 0 && height > 0, "texture must be at least 1x1");
        if let Some(data) = pixels {
            ensure!(
                data.len() as u64 == u64::from(width) * u64::from(height) * 4,
                "pixel buffer size does not match {width}x{height} RGBA"
            );
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ember texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXEL_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        if let Some(data) = pixels {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * 4),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(
            id,
            TextureEntry {
                texture,
                view,
                wrap: WrapMode::ClampToEdge,
            },
        );
        Ok(id)
    }

    fn create_render_target(
        &mut self,
        texture: TextureId,
        width: u32,
        height: u32,
    ) -> Result<FramebufferId> {
        ensure!(width > 0 && height > 0, "render target must be at least 1x1");
        let entry = self
            .textures
            .get(&texture)
            .context("render target requested for unknown texture")?;

        // A second view of the same texture serves as the color attachment.
        let view = entry
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let id = FramebufferId(self.next_framebuffer);
        self.next_framebuffer += 1;
        self.framebuffers.insert(
            id,
            FramebufferEntry {
                view,
                size: (width, height),
            },
        );
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_none() {
            log::debug!("delete_texture on unknown {texture:?}");
        }
        if self.state.bound_texture == Some(texture) {
            self.state.bound_texture = None;
        }
    }

    fn delete_render_target(&mut self, framebuffer: FramebufferId) {
        if self.framebuffers.remove(&framebuffer).is_none() {
            log::debug!("delete_render_target on unknown {framebuffer:?}");
        }
        if self.state.target == Some(framebuffer) {
            self.state.target = None;
        }
    }
}
