//! Pure display-mode state machine.
//!
//! Tracks logical size, fullscreen mode and the cached desktop resolution
//! without touching the window. [`DisplaySurface`] applies each transition
//! to winit; keeping the bookkeeping separate makes the reported-size rules
//! directly unit-testable.
//!
//! [`DisplaySurface`]: super::DisplaySurface

/// Display mode; transitions only via explicit [`DisplayState::set_fullscreen`] calls.
///
/// Desktop fullscreen is a borderless window at the desktop's native
/// resolution; exclusive fullscreen may change the display mode itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FullscreenMode {
    Windowed,
    Exclusive,
    Desktop,
}

/// What the windowing layer must do after a mode change.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ModeTransition {
    /// Already in the requested mode.
    None,
    Enter(FullscreenMode),
    /// Back to windowed; resize to `size` and re-center.
    Leave { size: (u32, u32) },
}

/// Logical size and mode bookkeeping for the display surface.
///
/// Reported-size rules:
/// - Windowed: the last applied size.
/// - Desktop fullscreen: always the desktop resolution cached at
///   initialization, never the backbuffer's actual size.
/// - Exclusive fullscreen: the size the mode was entered with; a `resize`
///   request made while exclusive is recorded and applied on leaving
///   fullscreen rather than reinterpreted as a display-mode change.
#[derive(Debug, Clone)]
pub struct DisplayState {
    size: (u32, u32),
    mode: FullscreenMode,
    desktop: (u32, u32),
    /// Windowed size to restore when leaving fullscreen.
    restore_size: (u32, u32),
    /// Resize requested while fullscreen; applied on leave.
    pending_resize: Option<(u32, u32)>,
    vsync: bool,
    /// User preference; only effective while windowed.
    resizable: bool,
}

impl DisplayState {
    pub fn new(width: u32, height: u32, desktop: (u32, u32), vsync: bool) -> Self {
        Self {
            size: (width, height),
            mode: FullscreenMode::Windowed,
            desktop,
            restore_size: (width, height),
            pending_resize: None,
            vsync,
            resizable: false,
        }
    }

    pub fn width(&self) -> u32 {
        match self.mode {
            FullscreenMode::Desktop => self.desktop.0,
            _ => self.size.0,
        }
    }

    pub fn height(&self) -> u32 {
        match self.mode {
            FullscreenMode::Desktop => self.desktop.1,
            _ => self.size.1,
        }
    }

    pub fn mode(&self) -> FullscreenMode {
        self.mode
    }

    pub fn is_fullscreen(&self) -> bool {
        self.mode != FullscreenMode::Windowed
    }

    pub fn desktop_resolution(&self) -> (u32, u32) {
        self.desktop
    }

    pub fn vsync(&self) -> bool {
        self.vsync
    }

    /// Whether the window should currently accept user resizing.
    pub fn effective_resizable(&self) -> bool {
        self.resizable && self.mode == FullscreenMode::Windowed
    }

    /// Records the resizable preference. Takes effect only while windowed.
    pub fn set_resizable(&mut self, resizable: bool) {
        self.resizable = resizable;
    }

    /// Requests a new logical size.
    ///
    /// Returns `true` when the window itself should be resized now; while
    /// fullscreen the request is deferred until the mode is left.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        match self.mode {
            FullscreenMode::Windowed => {
                self.size = (width, height);
                true
            }
            FullscreenMode::Exclusive | FullscreenMode::Desktop => {
                self.pending_resize = Some((width, height));
                false
            }
        }
    }

    /// Records the actual backbuffer size reported by the windowing layer.
    ///
    /// Only windowed mode follows the backbuffer; the fullscreen modes keep
    /// their own reported size.
    pub fn apply_backbuffer_size(&mut self, width: u32, height: u32) {
        if self.mode == FullscreenMode::Windowed {
            self.size = (width, height);
        }
    }

    pub(crate) fn set_fullscreen(&mut self, fullscreen: bool, exclusive: bool) -> ModeTransition {
        let target = if !fullscreen {
            FullscreenMode::Windowed
        } else if exclusive {
            FullscreenMode::Exclusive
        } else {
            FullscreenMode::Desktop
        };

        if target == self.mode {
            return ModeTransition::None;
        }

        if target == FullscreenMode::Windowed {
            let size = self.pending_resize.take().unwrap_or(self.restore_size);
            self.mode = FullscreenMode::Windowed;
            self.size = size;
            return ModeTransition::Leave { size };
        }

        if self.mode == FullscreenMode::Windowed {
            self.restore_size = self.size;
        }
        self.mode = target;
        ModeTransition::Enter(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> DisplayState {
        DisplayState::new(800, 600, (1920, 1080), true)
    }

    // ── reported size ─────────────────────────────────────────────────────

    #[test]
    fn resize_while_windowed_is_reported_exactly() {
        let mut s = state();
        assert!(s.resize(1024, 768));
        assert_eq!((s.width(), s.height()), (1024, 768));
    }

    #[test]
    fn desktop_fullscreen_always_reports_desktop_resolution() {
        let mut s = state();
        s.set_fullscreen(true, false);
        assert_eq!((s.width(), s.height()), (1920, 1080));

        // Neither resize requests nor backbuffer changes alter the report.
        assert!(!s.resize(640, 480));
        s.apply_backbuffer_size(1234, 567);
        assert_eq!((s.width(), s.height()), (1920, 1080));
    }

    #[test]
    fn exclusive_fullscreen_keeps_entry_size() {
        let mut s = state();
        s.set_fullscreen(true, true);
        assert_eq!((s.width(), s.height()), (800, 600));
    }

    #[test]
    fn fullscreen_start_reports_configured_resolution() {
        // Entering exclusive fullscreen right after construction keeps
        // the configured size; only desktop fullscreen would report the
        // desktop resolution instead.
        let mut s = DisplayState::new(800, 600, (1920, 1080), true);
        s.set_fullscreen(true, true);
        assert_eq!((s.width(), s.height()), (800, 600));
        assert_eq!(s.mode(), FullscreenMode::Exclusive);
    }

    // ── transitions ───────────────────────────────────────────────────────

    #[test]
    fn leaving_fullscreen_restores_prior_windowed_size() {
        let mut s = state();
        s.resize(1024, 768);
        s.set_fullscreen(true, false);

        let t = s.set_fullscreen(false, false);
        assert_eq!(t, ModeTransition::Leave { size: (1024, 768) });
        assert_eq!((s.width(), s.height()), (1024, 768));
        assert_eq!(s.mode(), FullscreenMode::Windowed);
    }

    #[test]
    fn resize_during_fullscreen_applies_on_leave() {
        let mut s = state();
        s.set_fullscreen(true, true);
        assert!(!s.resize(640, 480));
        // Still the entry size while exclusive.
        assert_eq!((s.width(), s.height()), (800, 600));

        let t = s.set_fullscreen(false, false);
        assert_eq!(t, ModeTransition::Leave { size: (640, 480) });
        assert_eq!((s.width(), s.height()), (640, 480));
    }

    #[test]
    fn reentering_same_mode_is_a_no_op() {
        let mut s = state();
        assert_eq!(s.set_fullscreen(true, false), ModeTransition::Enter(FullscreenMode::Desktop));
        assert_eq!(s.set_fullscreen(true, false), ModeTransition::None);
    }

    #[test]
    fn switching_between_fullscreen_modes_keeps_restore_size() {
        let mut s = state();
        s.set_fullscreen(true, true);
        s.set_fullscreen(true, false);
        let t = s.set_fullscreen(false, false);
        assert_eq!(t, ModeTransition::Leave { size: (800, 600) });
    }

    // ── resizable ─────────────────────────────────────────────────────────

    #[test]
    fn resizable_is_suspended_while_fullscreen() {
        let mut s = state();
        s.set_resizable(true);
        assert!(s.effective_resizable());

        s.set_fullscreen(true, false);
        assert!(!s.effective_resizable());

        s.set_fullscreen(false, false);
        assert!(s.effective_resizable());
    }
}
