use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::device::{FramebufferId, RenderDevice, TextureId};

/// Opaque handle returned at registration time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureKey(u32);

/// One registered texture and its lazily-created render target.
///
/// At most one record exists per key. The framebuffer is allocated on first
/// use as a render target and reused for the record's whole lifetime; it is
/// never recreated.
#[derive(Debug)]
pub struct TextureRecord {
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
    framebuffer: Option<FramebufferId>,
}

impl TextureRecord {
    pub fn framebuffer(&self) -> Option<FramebufferId> {
        self.framebuffer
    }
}

/// Maps resource keys to GPU texture handles.
///
/// No eviction: a record lives until the owning image resource is destroyed,
/// at which point the owner must call [`TextureCache::release`] or the GPU
/// memory leaks.
#[derive(Debug, Default)]
pub struct TextureCache {
    records: HashMap<TextureKey, TextureRecord>,
    next: u32,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an already-uploaded texture, returning its key.
    pub fn register(&mut self, texture: TextureId, width: u32, height: u32) -> TextureKey {
        self.next += 1;
        let key = TextureKey(self.next);
        self.records.insert(
            key,
            TextureRecord {
                texture,
                width,
                height,
                framebuffer: None,
            },
        );
        key
    }

    pub fn get(&self, key: TextureKey) -> Option<&TextureRecord> {
        self.records.get(&key)
    }

    /// Returns the render target for `key`, allocating it on first use.
    ///
    /// Idempotent: repeat calls return the same framebuffer handle.
    pub fn ensure_render_target<D: RenderDevice>(
        &mut self,
        device: &mut D,
        key: TextureKey,
    ) -> Result<FramebufferId> {
        let record = self
            .records
            .get_mut(&key)
            .context("render target requested for unregistered texture key")?;

        if let Some(fb) = record.framebuffer {
            return Ok(fb);
        }

        let fb = device.create_render_target(record.texture, record.width, record.height)?;
        record.framebuffer = Some(fb);
        Ok(fb)
    }

    /// Releases the texture and any render target for `key`.
    ///
    /// Called by the external owner when the image resource is destroyed.
    pub fn release<D: RenderDevice>(&mut self, device: &mut D, key: TextureKey) {
        let Some(record) = self.records.remove(&key) else {
            log::debug!("release of unregistered texture key {key:?}");
            return;
        };
        if let Some(fb) = record.framebuffer {
            device.delete_render_target(fb);
        }
        device.delete_texture(record.texture);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::trace::TraceDevice;

    fn registered(device: &mut TraceDevice) -> (TextureCache, TextureKey) {
        let mut cache = TextureCache::new();
        let tex = device.create_texture(64, 64, None).unwrap();
        let key = cache.register(tex, 64, 64);
        (cache, key)
    }

    // ── render target lifecycle ───────────────────────────────────────────

    #[test]
    fn render_target_is_created_lazily_once() {
        let mut device = TraceDevice::new();
        let (mut cache, key) = registered(&mut device);
        assert!(cache.get(key).unwrap().framebuffer().is_none());

        let fb1 = cache.ensure_render_target(&mut device, key).unwrap();
        let fb2 = cache.ensure_render_target(&mut device, key).unwrap();
        assert_eq!(fb1, fb2);
        assert_eq!(device.live_framebuffer_count(), 1);
    }

    #[test]
    fn release_frees_texture_and_render_target() {
        let mut device = TraceDevice::new();
        let (mut cache, key) = registered(&mut device);
        cache.ensure_render_target(&mut device, key).unwrap();

        cache.release(&mut device, key);
        assert_eq!(device.live_texture_count(), 0);
        assert_eq!(device.live_framebuffer_count(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn release_without_render_target_frees_texture_only() {
        let mut device = TraceDevice::new();
        let (mut cache, key) = registered(&mut device);

        cache.release(&mut device, key);
        assert_eq!(device.live_texture_count(), 0);
        assert_eq!(device.live_framebuffer_count(), 0);
    }

    #[test]
    fn unregistered_key_errors() {
        let mut device = TraceDevice::new();
        let mut cache = TextureCache::new();
        let bogus = TextureKey(99);
        assert!(cache.ensure_render_target(&mut device, bogus).is_err());
    }
}
