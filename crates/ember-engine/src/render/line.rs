//! Anti-aliased variable-width stroke geometry.
//!
//! A stroke is an 8-vertex triangle strip: transparent fade edge, opaque
//! core, transparent fade edge. Strokes wider than 3 px get an extra
//! 12-vertex strip covering both end caps, with alternating full/zero alpha
//! so the cap's outer corners fade while the inner corners stay opaque.
//!
//! The width-band constants are empirically tuned, not derived; they are
//! preserved exactly as a lookup table. Any replacement stroke technique
//! must be validated against the same visual falloff.

use crate::paint::Color;

/// Direction components below this magnitude snap the stroke to a pure axis
/// offset, keeping thin axis-aligned lines crisp and avoiding a degenerate
/// normalization.
const AXIS_SNAP_EPSILON: f32 = 0.01;

/// Widths above this get end-cap geometry.
const CAP_WIDTH_THRESHOLD: f32 = 3.0;

/// Vertex data for one stroke.
///
/// Built fresh per call; consumed (drawn) before the caller's next stroke
/// overwrites its scratch.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StrokeGeometry {
    /// 8 vertices: fade edge, core pair, core pair, fade edge.
    pub core_positions: [f32; 16],
    pub core_colors: [f32; 32],
    /// 12 cap vertices (6 per endpoint) when width > 3.
    pub caps: Option<CapGeometry>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CapGeometry {
    pub positions: [f32; 24],
    pub colors: [f32; 48],
}

/// Core half-thickness `t` and fade half-thickness `R` for a stroke width.
///
/// Bands interpolate linearly on the fractional part of the width:
///
/// | width    | t             | R                |
/// |----------|---------------|------------------|
/// | [0, 1)   | 0.05          | 0.48  + 0.32·f   |
/// | [1, 2)   | 0.05 + 0.33·f | 0.768 + 0.312·f  |
/// | [2, 3)   | 0.38 + 0.58·f | 1.08             |
/// | [3, 4)   | 0.96 + 0.48·f | 1.08             |
/// | [4, 5)   | 1.44 + 0.46·f | 1.08             |
/// | [5, 6)   | 1.9  + 0.6·f  | 1.08             |
/// | [6, ∞)   | 2.5  + 0.5·(w−6) | 1.08          |
pub(crate) fn width_band(w: f32) -> (f32, f32) {
    let f = w - w.floor();

    if w < 0.0 {
        // Degenerate stroke.
        (0.0, 0.0)
    } else if w < 1.0 {
        (0.05, 0.48 + 0.32 * f)
    } else if w < 2.0 {
        (0.05 + 0.33 * f, 0.768 + 0.312 * f)
    } else if w < 3.0 {
        (0.38 + 0.58 * f, 1.08)
    } else if w < 4.0 {
        (0.96 + 0.48 * f, 1.08)
    } else if w < 5.0 {
        (1.44 + 0.46 * f, 1.08)
    } else if w < 6.0 {
        (1.9 + 0.6 * f, 1.08)
    } else {
        (2.5 + 0.5 * (w - 6.0), 1.08)
    }
}

/// Builds stroke geometry for the segment (x1,y1)–(x2,y2) with width `w`.
pub(crate) fn stroke_geometry(
    mut x1: f32,
    mut y1: f32,
    mut x2: f32,
    mut y2: f32,
    w: f32,
    color: Color,
) -> StrokeGeometry {
    let (t, r) = width_band(w);

    // Core offset (tx,ty), fade offset (rx,ry), cap offset (cx,cy).
    let mut tx = 0.0;
    let mut ty = 0.0;
    let mut rx = 0.0;
    let mut ry = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;

    let dx = x2 - x1;
    let dy = y2 - y1;

    if dx.abs() < AXIS_SNAP_EPSILON {
        // Near-vertical: perpendicular is the X axis.
        tx = t;
        rx = r;
        if w > 0.0 && w <= 1.0 {
            tx = 0.5;
            rx = 0.0;
        }
    } else if dy.abs() < AXIS_SNAP_EPSILON {
        // Near-horizontal: perpendicular is the Y axis.
        ty = t;
        ry = r;
        if w > 0.0 && w <= 1.0 {
            ty = 0.5;
            ry = 0.0;
        }
    } else {
        // General direction: normalized perpendicular scaled by t and R.
        let mut px = y1 - y2;
        let mut py = x2 - x1;
        let len = (px * px + py * py).sqrt();
        px /= len;
        py /= len;

        cx = -py;
        cy = px;

        tx = t * px;
        ty = t * py;
        rx = r * px;
        ry = r * py;
    }

    // Shrink the endpoints inward by half the cap offset so caps don't
    // extend the visible line length.
    x1 += cx * 0.5;
    y1 += cy * 0.5;
    x2 -= cx * 0.5;
    y2 -= cy * 0.5;

    let core_positions = [
        x1 - tx - rx - cx, y1 - ty - ry - cy, // fading edge
        x2 - tx - rx + cx, y2 - ty - ry + cy,
        x1 - tx - cx, y1 - ty - cy, // core
        x2 - tx + cx, y2 - ty + cy,
        x1 + tx - cx, y1 + ty - cy,
        x2 + tx + cx, y2 + ty + cy,
        x1 + tx + rx - cx, y1 + ty + ry - cy, // fading edge
        x2 + tx + rx + cx, y2 + ty + ry + cy,
    ];

    let [cr, cg, cb, ca] = color.to_f32();
    let core_alphas = [0.0, 0.0, ca, ca, ca, ca, 0.0, 0.0];
    let mut core_colors = [0.0; 32];
    for (i, a) in core_alphas.iter().enumerate() {
        core_colors[i * 4] = cr;
        core_colors[i * 4 + 1] = cg;
        core_colors[i * 4 + 2] = cb;
        core_colors[i * 4 + 3] = *a;
    }

    let caps = (w > CAP_WIDTH_THRESHOLD).then(|| {
        let positions = [
            // cap at (x1,y1)
            x1 - tx - rx - cx, y1 - ty - ry - cy,
            x1 - tx - rx, y1 - ty - ry,
            x1 - tx - cx, y1 - ty - cy,
            x1 + tx + rx, y1 + ty + ry,
            x1 + tx - cx, y1 + ty - cy,
            x1 + tx + rx - cx, y1 + ty + ry - cy,
            // cap at (x2,y2)
            x2 - tx - rx + cx, y2 - ty - ry + cy,
            x2 - tx - rx, y2 - ty - ry,
            x2 - tx + cx, y2 - ty + cy,
            x2 + tx + rx, y2 + ty + ry,
            x2 + tx + cx, y2 + ty + cy,
            x2 + tx + rx + cx, y2 + ty + ry + cy,
        ];

        let cap_alphas = [0.0, 0.0, ca, 0.0, ca, 0.0, 0.0, 0.0, ca, 0.0, ca, 0.0];
        let mut colors = [0.0; 48];
        for (i, a) in cap_alphas.iter().enumerate() {
            colors[i * 4] = cr;
            colors[i * 4 + 1] = cg;
            colors[i * 4 + 2] = cb;
            colors[i * 4 + 3] = *a;
        }

        CapGeometry { positions, colors }
    });

    StrokeGeometry {
        core_positions,
        core_colors,
        caps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{a} != {b}");
    }

    // ── width bands ───────────────────────────────────────────────────────

    #[test]
    fn band_half_width() {
        let (t, r) = width_band(0.5);
        close(t, 0.05);
        close(r, 0.48 + 0.32 * 0.5);
    }

    #[test]
    fn band_one_and_a_half() {
        let (t, r) = width_band(1.5);
        close(t, 0.05 + 0.33 * 0.5);
        close(r, 0.768 + 0.312 * 0.5);
    }

    #[test]
    fn band_fade_plateaus_at_two() {
        let (t, r) = width_band(2.5);
        close(t, 0.38 + 0.58 * 0.5);
        close(r, 1.08);
    }

    #[test]
    fn band_wide_tail() {
        let (t, r) = width_band(8.0);
        close(t, 2.5 + 0.5 * 2.0);
        close(r, 1.08);
    }

    #[test]
    fn band_is_continuous_at_boundaries() {
        // The table is interpolated; values approaching a boundary from the
        // left should land near the next band's start.
        let (t_lo, _) = width_band(1.999_9);
        let (t_hi, _) = width_band(2.0);
        assert!((t_lo - t_hi).abs() < 0.01);
    }

    // ── geometry ──────────────────────────────────────────────────────────

    #[test]
    fn core_is_eight_vertices_with_fade_edges() {
        let g = stroke_geometry(0.0, 0.0, 10.0, 10.0, 2.0, Color::rgb(255, 0, 0));
        assert_eq!(g.core_positions.len(), 16);

        // Alpha pattern: fade, fade, core x4, fade, fade.
        let alphas: Vec<f32> = (0..8).map(|i| g.core_colors[i * 4 + 3]).collect();
        assert_eq!(alphas, vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn caps_only_above_threshold() {
        assert!(stroke_geometry(0.0, 0.0, 10.0, 10.0, 3.0, Color::WHITE).caps.is_none());
        let g = stroke_geometry(0.0, 0.0, 10.0, 10.0, 4.0, Color::WHITE);
        let caps = g.caps.expect("width 4 has caps");
        assert_eq!(caps.positions.len(), 24);

        // Inner cap corners opaque, outer corners transparent.
        let alphas: Vec<f32> = (0..12).map(|i| caps.colors[i * 4 + 3]).collect();
        assert_eq!(
            alphas,
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn vertical_line_snaps_to_axis_offsets() {
        // A thin vertical line widens along X only; Y coordinates stay on
        // the endpoints (no cap shrink in the axis-snapped path).
        let g = stroke_geometry(5.0, 0.0, 5.0, 20.0, 1.0, Color::WHITE);
        for i in 0..8 {
            let y = g.core_positions[i * 2 + 1];
            assert!(y == 0.0 || y == 20.0, "unexpected y {y}");
        }
        // Width <= 1 collapses the fade offset and uses a half-pixel core.
        let xs: Vec<f32> = (0..8).map(|i| g.core_positions[i * 2]).collect();
        assert!(xs.iter().all(|x| (*x - 5.0).abs() <= 0.5 + 1e-6));
    }

    #[test]
    fn diagonal_endpoints_shrink_by_half_cap() {
        let g = stroke_geometry(0.0, 0.0, 10.0, 10.0, 2.0, Color::WHITE);
        // Core vertex pair 2/3 straddle the shrunken start point; its x is
        // pulled inward from 0 toward the segment interior.
        let first_core_x = g.core_positions[4];
        assert!(first_core_x > -2.0 && first_core_x < 2.0);
    }
}
