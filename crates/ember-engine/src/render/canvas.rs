use super::line::stroke_geometry;
use super::{quad_strip, quad_uv};
use crate::device::{Mesh, RenderDevice, ScissorRect, TextureId, Topology};
use crate::paint::Color;
use crate::text::FontMetrics;
use crate::texture::{TextureCache, TextureKey};

/// Immediate-mode draw batch.
///
/// Owns the render device plus reusable scratch buffers for per-call
/// vertex/texture/color data. One primitive call fills the scratch, issues
/// exactly one GPU draw (strokes with end caps issue two) and returns; the
/// next call overwrites the same buffers, so no caller may retain scratch
/// contents past a call's return.
pub struct Canvas<D: RenderDevice> {
    device: D,
    positions: Vec<f32>,
    texcoords: Vec<f32>,
    colors: Vec<f32>,
}

impl<D: RenderDevice> Canvas<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            positions: Vec::with_capacity(16),
            texcoords: Vec::with_capacity(16),
            colors: Vec::with_capacity(32),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Clears the current target.
    pub fn clear(&mut self, color: Color) {
        self.device.clear(color);
    }

    /// Restricts subsequent draws to a rectangle; zero width or height
    /// disables clipping entirely.
    pub fn clip_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        if width == 0.0 || height == 0.0 {
            self.device.set_scissor(None);
            return;
        }
        self.device.set_scissor(Some(ScissorRect {
            x: x.max(0.0) as u32,
            y: y.max(0.0) as u32,
            width: width.max(0.0) as u32,
            height: height.max(0.0) as u32,
        }));
    }

    // ── images ────────────────────────────────────────────────────────────

    /// Draws the whole image at (x, y), scaled, tinted by `tint`.
    pub fn draw_image(
        &mut self,
        cache: &TextureCache,
        image: TextureKey,
        x: f32,
        y: f32,
        scale: f32,
        tint: Color,
    ) {
        let Some((texture, w, h)) = resolve(cache, image) else {
            return;
        };
        self.device.set_draw_color(tint);
        self.positions.clear();
        self.positions
            .extend_from_slice(&quad_strip(x, y, w * scale, h * scale));
        self.texcoords.clear();
        self.texcoords.extend_from_slice(&quad_uv(0.0, 0.0, 1.0, 1.0));
        self.device.draw(
            Topology::TriangleStrip,
            &Mesh {
                positions: &self.positions,
                texcoords: Some(&self.texcoords),
                colors: None,
                texture: Some(texture),
            },
        );
    }

    /// Draws the sub-rectangle (x, y, width, height) of the image at
    /// (raster_x, raster_y).
    ///
    /// Texture coordinates are fractions of the full texture extent.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_sub_image(
        &mut self,
        cache: &TextureCache,
        image: TextureKey,
        raster_x: f32,
        raster_y: f32,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        tint: Color,
    ) {
        let Some((texture, img_w, img_h)) = resolve(cache, image) else {
            return;
        };
        self.device.set_draw_color(tint);
        self.positions.clear();
        self.positions
            .extend_from_slice(&quad_strip(raster_x, raster_y, width, height));
        self.texcoords.clear();
        self.texcoords.extend_from_slice(&quad_uv(
            x / img_w,
            y / img_h,
            (x + width) / img_w,
            (y + height) / img_h,
        ));
        self.device.draw(
            Topology::TriangleStrip,
            &Mesh {
                positions: &self.positions,
                texcoords: Some(&self.texcoords),
                colors: None,
                texture: Some(texture),
            },
        );
    }

    /// Draws the whole image rotated by `degrees` around its own center.
    ///
    /// Translation precedes rotation; positive degrees appear clockwise on
    /// screen under the Y-down convention.
    pub fn draw_image_rotated(
        &mut self,
        cache: &TextureCache,
        image: TextureKey,
        x: f32,
        y: f32,
        degrees: f32,
        tint: Color,
        scale: f32,
    ) {
        let Some((texture, w, h)) = resolve(cache, image) else {
            return;
        };
        let half_w = w / 2.0;
        let half_h = h / 2.0;
        let tx = half_w * scale;
        let ty = half_h * scale;

        self.device.set_draw_color(tint);
        self.positions.clear();
        self.positions
            .extend_from_slice(&quad_strip(-tx, -ty, tx * 2.0, ty * 2.0));
        rotate_translate(&mut self.positions, x + half_w, y + half_h, degrees);
        self.texcoords.clear();
        self.texcoords.extend_from_slice(&quad_uv(0.0, 0.0, 1.0, 1.0));
        self.device.draw(
            Topology::TriangleStrip,
            &Mesh {
                positions: &self.positions,
                texcoords: Some(&self.texcoords),
                colors: None,
                texture: Some(texture),
            },
        );
    }

    /// Rotated variant of [`Canvas::draw_sub_image`]; the pivot is the
    /// sub-rectangle's center.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_sub_image_rotated(
        &mut self,
        cache: &TextureCache,
        image: TextureKey,
        raster_x: f32,
        raster_y: f32,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        degrees: f32,
        tint: Color,
    ) {
        let Some((texture, img_w, img_h)) = resolve(cache, image) else {
            return;
        };
        let tx = width / 2.0;
        let ty = height / 2.0;

        self.device.set_draw_color(tint);
        self.positions.clear();
        self.positions
            .extend_from_slice(&quad_strip(-tx, -ty, tx * 2.0, ty * 2.0));
        rotate_translate(&mut self.positions, raster_x + tx, raster_y + ty, degrees);
        self.texcoords.clear();
        self.texcoords.extend_from_slice(&quad_uv(
            x / img_w,
            y / img_h,
            (x + width) / img_w,
            (y + height) / img_h,
        ));
        self.device.draw(
            Topology::TriangleStrip,
            &Mesh {
                positions: &self.positions,
                texcoords: Some(&self.texcoords),
                colors: None,
                texture: Some(texture),
            },
        );
    }

    /// Draws the whole image stretched to `width` x `height`.
    pub fn draw_image_stretched(
        &mut self,
        cache: &TextureCache,
        image: TextureKey,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        tint: Color,
    ) {
        let Some((texture, _, _)) = resolve(cache, image) else {
            return;
        };
        self.device.set_draw_color(tint);
        self.positions.clear();
        self.positions
            .extend_from_slice(&quad_strip(x, y, width, height));
        self.texcoords.clear();
        self.texcoords.extend_from_slice(&quad_uv(0.0, 0.0, 1.0, 1.0));
        self.device.draw(
            Topology::TriangleStrip,
            &Mesh {
                positions: &self.positions,
                texcoords: Some(&self.texcoords),
                colors: None,
                texture: Some(texture),
            },
        );
    }

    /// Tiles the image across `width` x `height`.
    ///
    /// The texture's wrap mode is switched to repeat only for this call and
    /// restored to clamp-to-edge before returning; no wrap state leaks to
    /// later draws.
    pub fn draw_image_repeated(
        &mut self,
        cache: &TextureCache,
        image: TextureKey,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) {
        let Some((texture, img_w, img_h)) = resolve(cache, image) else {
            return;
        };
        self.device.set_draw_color(Color::WHITE);
        self.device
            .set_wrap(texture, crate::device::WrapMode::Repeat);

        self.positions.clear();
        self.positions
            .extend_from_slice(&quad_strip(x, y, width, height));
        self.texcoords.clear();
        self.texcoords
            .extend_from_slice(&quad_uv(0.0, 0.0, width / img_w, height / img_h));
        self.device.draw(
            Topology::TriangleStrip,
            &Mesh {
                positions: &self.positions,
                texcoords: Some(&self.texcoords),
                colors: None,
                texture: Some(texture),
            },
        );

        self.device
            .set_wrap(texture, crate::device::WrapMode::ClampToEdge);
    }

    // ── untextured primitives ─────────────────────────────────────────────

    /// Draws a single pixel, centered on the pixel cell.
    pub fn draw_point(&mut self, x: f32, y: f32, color: Color) {
        self.device.set_texturing(false);
        self.device.set_draw_color(color);

        self.positions.clear();
        self.positions.extend_from_slice(&[x + 0.5, y + 0.5]);
        self.device
            .draw(Topology::Points, &Mesh::colored(&self.positions));

        self.device.set_texturing(true);
    }

    /// Draws an anti-aliased line of the given width.
    pub fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Color, width: f32) {
        self.device.set_texturing(false);
        self.stroke_segment(x1, y1, x2, y2, width, color);
        self.device.set_texturing(true);
    }

    /// Draws a circle (or ellipse via the scale factors) as an N-gon
    /// outline.
    ///
    /// Vertices are produced by repeatedly applying a fixed per-segment
    /// rotation with precomputed cosine/sine, avoiding per-vertex
    /// trigonometry.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_circle(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        color: Color,
        num_segments: u32,
        scale_x: f32,
        scale_y: f32,
    ) {
        if num_segments == 0 {
            return;
        }
        self.device.set_texturing(false);
        self.device.set_draw_color(color);

        let theta = std::f32::consts::TAU / num_segments as f32;
        let (s, c) = theta.sin_cos();

        let mut x = radius;
        let mut y = 0.0f32;

        self.positions.clear();
        for _ in 0..num_segments {
            self.positions.push(x * scale_x + cx);
            self.positions.push(y * scale_y + cy);

            let t = x;
            x = c * x - s * y;
            y = s * t + c * y;
        }
        // Close the loop; the device draws strips, not loops.
        self.positions.push(self.positions[0]);
        self.positions.push(self.positions[1]);

        self.device
            .draw(Topology::LineStrip, &Mesh::colored(&self.positions));
        self.device.set_texturing(true);
    }

    /// Draws a quad with four independently colored corners
    /// (top-left, bottom-left, bottom-right, top-right).
    #[allow(clippy::too_many_arguments)]
    pub fn draw_gradient(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        c1: Color,
        c2: Color,
        c3: Color,
        c4: Color,
    ) {
        self.device.set_texturing(false);

        self.positions.clear();
        self.positions
            .extend_from_slice(&quad_strip(x, y, width, height));

        // Four logical corners onto six strip vertices: the bottom-right
        // and top-left colors each appear twice.
        self.colors.clear();
        for corner in [c1, c2, c3, c3, c4, c1] {
            self.colors.extend_from_slice(&corner.to_f32());
        }

        self.device.draw(
            Topology::TriangleStrip,
            &Mesh {
                positions: &self.positions,
                texcoords: None,
                colors: Some(&self.colors),
                texture: None,
            },
        );

        self.device.set_texturing(true);
    }

    /// Draws a rectangle outline as four strokes.
    ///
    /// The draw color is reset to opaque white before returning.
    pub fn draw_box(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.device.set_texturing(false);

        self.stroke_segment(x, y, x + width, y, 1.0, color);
        self.stroke_segment(x, y, x, y + height + 0.5, 1.0, color);
        self.stroke_segment(x, y + height + 0.5, x + width, y + height + 0.5, 1.0, color);
        self.stroke_segment(x + width, y, x + width, y + height + 0.5, 1.0, color);

        self.device.set_texturing(true);
        self.device.set_draw_color(Color::WHITE);
    }

    /// Draws a filled rectangle.
    pub fn draw_box_filled(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.device.set_draw_color(color);
        self.device.set_texturing(false);

        self.positions.clear();
        self.positions
            .extend_from_slice(&quad_strip(x, y, width, height));
        self.device
            .draw(Topology::TriangleStrip, &Mesh::colored(&self.positions));

        self.device.set_texturing(true);
    }

    // ── text ──────────────────────────────────────────────────────────────

    /// Draws `text` with a loaded font, one glyph quad per byte.
    ///
    /// No-op when the string is empty or the font has no metrics. Input is
    /// iterated byte-by-byte; each byte value indexes the glyph table.
    pub fn draw_text(
        &mut self,
        cache: &TextureCache,
        font: &FontMetrics,
        text: &str,
        x: f32,
        y: f32,
        color: Color,
    ) {
        if text.is_empty() || !font.is_loaded() {
            return;
        }
        let Some(key) = font.texture else {
            return;
        };
        let Some((texture, _, _)) = resolve(cache, key) else {
            return;
        };

        self.device.set_draw_color(color);

        let cell_w = font.glyph_cell_width as f32;
        let cell_h = font.glyph_cell_height as f32;

        let mut offset: i32 = 0;
        for byte in text.bytes() {
            let gm = font.glyph(byte);

            self.positions.clear();
            self.positions
                .extend_from_slice(&quad_strip(x + offset as f32, y, cell_w, cell_h));
            self.texcoords.clear();
            self.texcoords
                .extend_from_slice(&quad_uv(gm.uv_x, gm.uv_y, gm.uv_w, gm.uv_h));

            self.device.draw(
                Topology::TriangleStrip,
                &Mesh {
                    positions: &self.positions,
                    texcoords: Some(&self.texcoords),
                    colors: None,
                    texture: Some(texture),
                },
            );

            // Left-side bearing is added to the advance, not subtracted.
            // Long-standing compatibility quirk: changing it reflows all
            // rendered text.
            offset += gm.advance + gm.min_x;
        }
    }

    // ── internals ─────────────────────────────────────────────────────────

    /// Issues the stroke draws for one segment: core strip, plus caps for
    /// widths above 3.
    fn stroke_segment(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32, color: Color) {
        let geometry = stroke_geometry(x1, y1, x2, y2, width, color);

        self.positions.clear();
        self.positions.extend_from_slice(&geometry.core_positions);
        self.colors.clear();
        self.colors.extend_from_slice(&geometry.core_colors);
        self.device.draw(
            Topology::TriangleStrip,
            &Mesh {
                positions: &self.positions,
                texcoords: None,
                colors: Some(&self.colors),
                texture: None,
            },
        );

        if let Some(caps) = geometry.caps {
            self.positions.clear();
            self.positions.extend_from_slice(&caps.positions);
            self.colors.clear();
            self.colors.extend_from_slice(&caps.colors);
            self.device.draw(
                Topology::TriangleStrip,
                &Mesh {
                    positions: &self.positions,
                    texcoords: None,
                    colors: Some(&self.colors),
                    texture: None,
                },
            );
        }
    }
}

/// Looks up a texture record, returning its id and float extents.
fn resolve(cache: &TextureCache, key: TextureKey) -> Option<(TextureId, f32, f32)> {
    let record = cache.get(key)?;
    Some((record.texture, record.width as f32, record.height as f32))
}

/// Rotates scratch positions around the origin by `degrees`, then
/// translates by (ox, oy).
///
/// With Y pointing down, positive angles rotate clockwise on screen.
fn rotate_translate(positions: &mut [f32], ox: f32, oy: f32, degrees: f32) {
    let (s, c) = degrees.to_radians().sin_cos();
    for v in positions.chunks_exact_mut(2) {
        let (x, y) = (v[0], v[1]);
        v[0] = ox + x * c - y * s;
        v[1] = oy + x * s + y * c;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::WrapMode;
    use crate::device::trace::{TraceDevice, TraceEvent};
    use crate::text::GlyphMetrics;

    fn canvas() -> Canvas<TraceDevice> {
        Canvas::new(TraceDevice::new())
    }

    fn cached_texture(canvas: &mut Canvas<TraceDevice>) -> (TextureCache, TextureKey) {
        let mut cache = TextureCache::new();
        let tex = canvas.device_mut().create_texture(100, 100, None).unwrap();
        let key = cache.register(tex, 100, 100);
        (cache, key)
    }

    fn loaded_font(texture: TextureKey) -> FontMetrics {
        FontMetrics {
            texture: Some(texture),
            glyph_cell_width: 8,
            glyph_cell_height: 16,
            glyphs: vec![
                GlyphMetrics {
                    advance: 7,
                    min_x: 1,
                    ..Default::default()
                };
                256
            ],
        }
    }

    // ── box scenario ──────────────────────────────────────────────────────

    #[test]
    fn filled_box_then_outline_issues_expected_draws() {
        let mut canvas = canvas();
        canvas.draw_box_filled(10.0, 10.0, 50.0, 20.0, Color::rgba(255, 0, 0, 255));
        canvas.draw_box(10.0, 10.0, 50.0, 20.0, Color::rgba(255, 0, 0, 255));

        let draws = canvas.device().draws();
        assert_eq!(draws.len(), 5, "one fill + four border strokes");

        // The fill is a 6-vertex quad strip drawn with the draw color.
        assert_eq!(draws[0].vertex_count(), 6);
        assert_eq!(draws[0].draw_color, Color::rgba(255, 0, 0, 255));
        assert!(draws[0].colors.is_none());

        // Each border stroke is an 8-vertex AA strip (width 1, no caps).
        for stroke in &draws[1..] {
            assert_eq!(stroke.vertex_count(), 8);
            assert!(stroke.colors.is_some());
        }

        // Draw color resets to opaque white after the outline.
        assert_eq!(canvas.device().draw_color(), Color::WHITE);
    }

    #[test]
    fn untextured_primitives_restore_texturing() {
        let mut canvas = canvas();
        canvas.draw_point(1.0, 1.0, Color::BLACK);
        canvas.draw_line(0.0, 0.0, 5.0, 5.0, Color::BLACK, 1.0);
        canvas.draw_circle(10.0, 10.0, 4.0, Color::BLACK, 16, 1.0, 1.0);
        canvas.draw_gradient(
            0.0,
            0.0,
            8.0,
            8.0,
            Color::WHITE,
            Color::WHITE,
            Color::WHITE,
            Color::WHITE,
        );
        assert!(canvas.device().texturing());
    }

    // ── gradient ──────────────────────────────────────────────────────────

    #[test]
    fn gradient_duplicates_corner_colors_onto_strip() {
        let mut canvas = canvas();
        let (tl, bl, br, tr) = (
            Color::rgb(1, 0, 0),
            Color::rgb(0, 1, 0),
            Color::rgb(0, 0, 1),
            Color::rgb(1, 1, 0),
        );
        canvas.draw_gradient(0.0, 0.0, 10.0, 10.0, tl, bl, br, tr);

        let draws = canvas.device().draws();
        let colors = draws[0].colors.as_ref().unwrap();
        assert_eq!(colors.len(), 24);

        let vertex = |i: usize| &colors[i * 4..i * 4 + 4];
        assert_eq!(vertex(2), vertex(3), "bottom-right duplicated");
        assert_eq!(vertex(0), vertex(5), "top-left closes the strip");
    }

    // ── repeated image ────────────────────────────────────────────────────

    #[test]
    fn repeated_image_restores_clamp_wrap() {
        let mut canvas = canvas();
        let (cache, key) = cached_texture(&mut canvas);
        let texture = cache.get(key).unwrap().texture;

        canvas.draw_image_repeated(&cache, key, 0.0, 0.0, 250.0, 250.0);

        assert_eq!(canvas.device().wrap_of(texture), WrapMode::ClampToEdge);

        // Wrap flips to repeat before the draw and back after it.
        let events = canvas.device().events();
        let wrap_events: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, TraceEvent::SetWrap(..)))
            .collect();
        assert_eq!(
            wrap_events,
            vec![
                &TraceEvent::SetWrap(texture, WrapMode::Repeat),
                &TraceEvent::SetWrap(texture, WrapMode::ClampToEdge),
            ]
        );
        assert_eq!(canvas.device().draw_count(), 1);
    }

    #[test]
    fn sub_image_uses_fractional_texcoords() {
        let mut canvas = canvas();
        let (cache, key) = cached_texture(&mut canvas);

        // 100x100 texture, sub-rect (25, 50, 50, 25).
        canvas.draw_sub_image(&cache, key, 0.0, 0.0, 25.0, 50.0, 50.0, 25.0, Color::WHITE);
        assert_eq!(canvas.device().draw_count(), 1);
    }

    // ── text ──────────────────────────────────────────────────────────────

    #[test]
    fn empty_text_issues_no_draws() {
        let mut canvas = canvas();
        let (cache, key) = cached_texture(&mut canvas);
        let font = loaded_font(key);

        canvas.draw_text(&cache, &font, "", 0.0, 0.0, Color::WHITE);
        assert_eq!(canvas.device().draw_count(), 0);
    }

    #[test]
    fn unloaded_font_issues_no_draws() {
        let mut canvas = canvas();
        let (cache, _) = cached_texture(&mut canvas);
        let font = FontMetrics::default();

        canvas.draw_text(&cache, &font, "hello", 0.0, 0.0, Color::WHITE);
        assert_eq!(canvas.device().draw_count(), 0);
    }

    #[test]
    fn text_draws_one_quad_per_byte_with_bearing_added() {
        let mut canvas = canvas();
        let (cache, key) = cached_texture(&mut canvas);
        let font = loaded_font(key);

        canvas.draw_text(&cache, &font, "ab", 10.0, 0.0, Color::WHITE);

        let draws = canvas.device().draws();
        assert_eq!(draws.len(), 2);

        // advance(7) + min_x(1) = 8 px between glyph origins.
        assert_eq!(draws[0].positions[0], 10.0);
        assert_eq!(draws[1].positions[0], 18.0);
    }

    // ── point/line geometry ───────────────────────────────────────────────

    #[test]
    fn point_is_pixel_centered() {
        let mut canvas = canvas();
        canvas.draw_point(3.0, 4.0, Color::WHITE);
        let draws = canvas.device().draws();
        assert_eq!(draws[0].positions, vec![3.5, 4.5]);
        assert_eq!(draws[0].topology, Topology::Points);
    }

    #[test]
    fn wide_line_issues_core_and_cap_draws() {
        let mut canvas = canvas();
        canvas.draw_line(0.0, 0.0, 20.0, 10.0, Color::WHITE, 5.0);
        let draws = canvas.device().draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].vertex_count(), 8);
        assert_eq!(draws[1].vertex_count(), 12);
    }

    #[test]
    fn circle_closes_its_loop() {
        let mut canvas = canvas();
        canvas.draw_circle(0.0, 0.0, 10.0, Color::WHITE, 12, 1.0, 1.0);
        let draws = canvas.device().draws();
        assert_eq!(draws[0].vertex_count(), 13, "12 segments + closing vertex");
        let p = &draws[0].positions;
        assert_eq!(&p[0..2], &p[p.len() - 2..]);
    }

    // ── clip rect ─────────────────────────────────────────────────────────

    #[test]
    fn zero_size_clip_disables_scissor() {
        let mut canvas = canvas();
        canvas.clip_rect(10.0, 10.0, 100.0, 50.0);
        canvas.clip_rect(10.0, 10.0, 0.0, 50.0);

        let scissors: Vec<_> = canvas
            .device()
            .events()
            .iter()
            .filter_map(|e| match e {
                TraceEvent::SetScissor(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(scissors.len(), 2);
        assert!(scissors[0].is_some());
        assert!(scissors[1].is_none());
    }
}
