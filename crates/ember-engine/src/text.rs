//! Glyph metrics interface.
//!
//! Font rasterization and atlas upload live in an external loading path;
//! this core only consumes the resulting per-byte metrics table and the
//! atlas texture key. Text iterates input bytes, not characters: each byte
//! value indexes the 256-entry glyph table directly.

use crate::texture::TextureKey;

/// Placement of one glyph inside the font atlas, plus its advance.
///
/// `uv_*` are fractions of the atlas extent. `min_x` is the glyph's
/// left-side bearing.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct GlyphMetrics {
    pub uv_x: f32,
    pub uv_y: f32,
    pub uv_w: f32,
    pub uv_h: f32,
    pub advance: i32,
    pub min_x: i32,
}

/// A loaded font: atlas texture, cell extents and the per-byte glyph table.
#[derive(Debug, Clone, Default)]
pub struct FontMetrics {
    pub texture: Option<TextureKey>,
    pub glyph_cell_width: u32,
    pub glyph_cell_height: u32,
    /// Indexed by byte value; expected to hold 256 entries when loaded.
    pub glyphs: Vec<GlyphMetrics>,
}

impl FontMetrics {
    /// Whether the loading path produced usable metrics.
    pub fn is_loaded(&self) -> bool {
        self.texture.is_some() && !self.glyphs.is_empty()
    }

    /// Glyph for a byte value, clamped into the table range.
    pub fn glyph(&self, byte: u8) -> GlyphMetrics {
        let index = (byte as usize).min(self.glyphs.len().saturating_sub(1));
        self.glyphs.get(index).copied().unwrap_or_default()
    }
}
