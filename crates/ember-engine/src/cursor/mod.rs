//! Native cursor loading and activation by integer id.
//!
//! Cursor resources are decoration: a missing or undecodable image is
//! logged and skipped, never raised. Activating an id that was never
//! registered is an explicit error, though, since that is a programming
//! mistake rather than a bad asset.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use winit::event_loop::ActiveEventLoop;
use winit::window::{CustomCursor, Window};

use crate::vfs::Vfs;

/// Native cursor creation/activation, abstracted from the windowing layer.
pub trait CursorHost {
    type Cursor;

    /// Creates a native cursor from straight-alpha RGBA pixels.
    fn create_cursor(
        &mut self,
        rgba: &[u8],
        width: u16,
        height: u16,
        hot_x: u16,
        hot_y: u16,
    ) -> Result<Self::Cursor>;

    fn activate(&mut self, cursor: &Self::Cursor);
}

/// Cursor records keyed by integer id.
///
/// Replacing an id releases the prior native handle; the first successful
/// registration becomes the active cursor automatically.
///
/// Generic over the native handle type, not the host: hosts borrow live
/// windowing objects and are rebuilt per call site.
pub struct CursorRegistry<C> {
    cursors: HashMap<i32, C>,
}

impl<C> Default for CursorRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CursorRegistry<C> {
    pub fn new() -> Self {
        Self {
            cursors: HashMap::new(),
        }
    }

    /// Loads an image resource and registers it as cursor `id`.
    ///
    /// Best-effort: an empty or unreadable resource, a decode failure or a
    /// native creation failure is logged and skipped.
    pub fn add_cursor<H: CursorHost<Cursor = C>>(
        &mut self,
        host: &mut H,
        vfs: &dyn Vfs,
        path: &str,
        id: i32,
        hot_x: i32,
        hot_y: i32,
    ) {
        let bytes = match vfs.open(path) {
            Ok(b) if !b.is_empty() => b,
            Ok(_) => {
                log::warn!("cursor '{path}' is empty, skipping");
                return;
            }
            Err(e) => {
                log::warn!("failed to read cursor '{path}': {e:#}");
                return;
            }
        };

        let rgba = match image::load_from_memory(&bytes) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                log::warn!("failed to decode cursor '{path}': {e}");
                return;
            }
        };

        let (width, height) = rgba.dimensions();
        match self.register(
            host,
            id,
            &rgba,
            width,
            height,
            hot_x.max(0) as u32,
            hot_y.max(0) as u32,
        ) {
            Ok(()) => log::debug!("registered cursor {id} from '{path}'"),
            Err(e) => log::warn!("failed to create cursor '{path}': {e:#}"),
        }
    }

    /// Registers already-decoded RGBA pixels as cursor `id`.
    pub fn register<H: CursorHost<Cursor = C>>(
        &mut self,
        host: &mut H,
        id: i32,
        rgba: &[u8],
        width: u32,
        height: u32,
        hot_x: u32,
        hot_y: u32,
    ) -> Result<()> {
        let width = u16::try_from(width).context("cursor wider than 65535")?;
        let height = u16::try_from(height).context("cursor taller than 65535")?;
        let hot_x = hot_x.min(width.saturating_sub(1) as u32) as u16;
        let hot_y = hot_y.min(height.saturating_sub(1) as u32) as u16;

        let cursor = host.create_cursor(rgba, width, height, hot_x, hot_y)?;

        let first = self.cursors.is_empty();
        // Replacing an id drops (releases) the prior handle.
        self.cursors.insert(id, cursor);

        if first {
            self.set_cursor(host, id)?;
        }
        Ok(())
    }

    /// Activates a registered cursor.
    pub fn set_cursor<H: CursorHost<Cursor = C>>(&mut self, host: &mut H, id: i32) -> Result<()> {
        let Some(cursor) = self.cursors.get(&id) else {
            bail!("cursor id {id} is not registered");
        };
        host.activate(cursor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}

/// [`CursorHost`] over a winit window.
///
/// Custom cursor creation needs the live event loop, so this host borrows
/// it for the duration of the call site.
pub struct WinitCursorHost<'a> {
    pub event_loop: &'a ActiveEventLoop,
    pub window: &'a Window,
}

impl CursorHost for WinitCursorHost<'_> {
    type Cursor = CustomCursor;

    fn create_cursor(
        &mut self,
        rgba: &[u8],
        width: u16,
        height: u16,
        hot_x: u16,
        hot_y: u16,
    ) -> Result<CustomCursor> {
        let source = CustomCursor::from_rgba(rgba.to_vec(), width, height, hot_x, hot_y)
            .context("cursor image rejected")?;
        Ok(self.event_loop.create_custom_cursor(source))
    }

    fn activate(&mut self, cursor: &CustomCursor) {
        self.window.set_cursor(cursor.clone());
    }
}
