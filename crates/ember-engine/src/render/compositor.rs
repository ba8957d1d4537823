//! Render-to-texture copies.
//!
//! Copies a region of one cached texture into another through the
//! destination's off-screen render target. Render targets and sampled
//! textures disagree in orientation under the top-left/Y-down convention,
//! so the source quad is emitted with a vertical flip; that flip and the
//! logical coordinate convention are one rule and must change together.

use anyhow::{Context, Result};

use super::{quad_strip, quad_uv};
use crate::coords::Rect;
use crate::device::{Mesh, RenderDevice, Topology};
use crate::paint::Color;
use crate::texture::{TextureCache, TextureKey};

/// Copies the source texture into the destination at `(dest_x, dest_y)`.
///
/// The copied extent is clipped so it never exceeds destination bounds
/// (clamp only, never upsample). Silent no-op when the source placed at the
/// destination point lies fully outside the destination, or when the
/// clipped region is under 1 pixel in either dimension.
///
/// Restores the active texture binding to the destination's own texture and
/// unbinds the render target before returning; no bind state leaks.
pub fn copy_region<D: RenderDevice>(
    device: &mut D,
    cache: &mut TextureCache,
    source: TextureKey,
    destination: TextureKey,
    dest_x: f32,
    dest_y: f32,
) -> Result<()> {
    let src = cache.get(source).context("unregistered source texture")?;
    let dst = cache
        .get(destination)
        .context("unregistered destination texture")?;

    let (src_texture, src_w, src_h) = (src.texture, src.width, src.height);
    let (dst_texture, dst_w, dst_h) = (dst.texture, dst.width, dst.height);

    device.set_draw_color(Color::WHITE);

    let Some((clip_w, clip_h)) = clip_copy(src_w, src_h, dest_x, dest_y, dst_w, dst_h) else {
        return Ok(());
    };

    let framebuffer = cache.ensure_render_target(device, destination)?;
    device.bind_framebuffer(Some(framebuffer));

    // Vertical flip: anchor at the bottom of the destination row and emit
    // negative height.
    let positions = quad_strip(dest_x, dst_h as f32 - dest_y, clip_w, -clip_h);
    let texcoords = quad_uv(0.0, 0.0, 1.0, 1.0);

    device.draw(
        Topology::TriangleStrip,
        &Mesh {
            positions: &positions,
            texcoords: Some(&texcoords),
            colors: None,
            texture: Some(src_texture),
        },
    );

    device.bind_texture(Some(dst_texture));
    device.bind_framebuffer(None);
    Ok(())
}

/// Clips a source extent placed at `(dest_x, dest_y)` against destination
/// bounds.
///
/// Returns `None` when there is no overlap at all or when the clipped
/// region is under 1 pixel in either dimension. Only the right/bottom edges
/// are clipped; the extent is never grown.
fn clip_copy(
    src_w: u32,
    src_h: u32,
    dest_x: f32,
    dest_y: f32,
    dst_w: u32,
    dst_h: u32,
) -> Option<(f32, f32)> {
    let (src_w, src_h) = (src_w as f32, src_h as f32);
    let (dst_w, dst_h) = (dst_w as f32, dst_h as f32);

    let placed = Rect::new(dest_x, dest_y, src_w, src_h);
    placed.intersect(Rect::new(0.0, 0.0, dst_w, dst_h))?;

    let mut clip_w = src_w;
    let mut clip_h = src_h;

    if dest_x + src_w > dst_w {
        clip_w = src_w - (dest_x + src_w - dst_w);
    }
    if dest_y + src_h > dst_h {
        clip_h = src_h - (dest_y + src_h - dst_h);
    }

    if clip_w < 1.0 || clip_h < 1.0 {
        return None;
    }
    Some((clip_w, clip_h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::trace::{TraceDevice, TraceEvent};

    fn two_textures(device: &mut TraceDevice) -> (TextureCache, TextureKey, TextureKey) {
        let mut cache = TextureCache::new();
        let src_tex = device.create_texture(100, 100, None).unwrap();
        let dst_tex = device.create_texture(100, 100, None).unwrap();
        let src = cache.register(src_tex, 100, 100);
        let dst = cache.register(dst_tex, 100, 100);
        (cache, src, dst)
    }

    // ── clip math ─────────────────────────────────────────────────────────

    #[test]
    fn fully_outside_is_none() {
        assert_eq!(clip_copy(100, 100, 100.0, 0.0, 100, 100), None);
        assert_eq!(clip_copy(100, 100, 0.0, 100.0, 100, 100), None);
        assert_eq!(clip_copy(100, 100, 500.0, 500.0, 100, 100), None);
    }

    #[test]
    fn corner_overlap_clips_to_ten_by_ten() {
        assert_eq!(clip_copy(100, 100, 90.0, 90.0, 100, 100), Some((10.0, 10.0)));
    }

    #[test]
    fn fully_inside_is_unclipped() {
        assert_eq!(clip_copy(10, 10, 5.0, 5.0, 100, 100), Some((10.0, 10.0)));
    }

    #[test]
    fn sub_pixel_remainder_is_none() {
        // 99.5 leaves half a pixel of overlap on each axis.
        assert_eq!(clip_copy(100, 100, 99.5, 0.0, 100, 100), None);
    }

    // ── device interaction ────────────────────────────────────────────────

    #[test]
    fn out_of_bounds_copy_issues_no_draws() {
        let mut device = TraceDevice::new();
        let (mut cache, src, dst) = two_textures(&mut device);

        copy_region(&mut device, &mut cache, src, dst, 100.0, 0.0).unwrap();
        assert_eq!(device.draw_count(), 0);
        assert_eq!(device.live_framebuffer_count(), 0, "no render target allocated");
    }

    #[test]
    fn copy_restores_destination_binding_and_unbinds_target() {
        let mut device = TraceDevice::new();
        let (mut cache, src, dst) = two_textures(&mut device);
        let dst_texture = cache.get(dst).unwrap().texture;

        copy_region(&mut device, &mut cache, src, dst, 10.0, 10.0).unwrap();

        assert_eq!(device.draw_count(), 1);
        assert_eq!(device.bound_texture(), Some(dst_texture));

        // The framebuffer is bound for the draw and unbound afterwards.
        let binds: Vec<_> = device
            .events()
            .iter()
            .filter_map(|e| match e {
                TraceEvent::BindFramebuffer(fb) => Some(fb.is_some()),
                _ => None,
            })
            .collect();
        assert_eq!(binds, vec![true, false]);
    }

    #[test]
    fn repeat_copies_reuse_the_render_target() {
        let mut device = TraceDevice::new();
        let (mut cache, src, dst) = two_textures(&mut device);

        copy_region(&mut device, &mut cache, src, dst, 0.0, 0.0).unwrap();
        copy_region(&mut device, &mut cache, src, dst, 20.0, 20.0).unwrap();
        assert_eq!(device.live_framebuffer_count(), 1);
    }

    #[test]
    fn clipped_copy_emits_flipped_quad() {
        let mut device = TraceDevice::new();
        let (mut cache, src, dst) = two_textures(&mut device);

        copy_region(&mut device, &mut cache, src, dst, 90.0, 90.0).unwrap();

        let draws = device.draws();
        assert_eq!(draws.len(), 1);
        let p = &draws[0].positions;
        // Quad anchored at (90, dst_h - 90) with height -10: the strip's
        // second vertex sits 10 px above the anchor.
        assert_eq!(p[0], 90.0);
        assert_eq!(p[1], 10.0);
        assert_eq!(p[3], 0.0);
    }
}
