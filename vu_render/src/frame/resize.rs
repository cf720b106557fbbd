//! Deferred swapchain resize.
//!
//! `resize` only records the request. The next `begin_frame` picks it up,
//! recreates the swapchain and skips that tick. While recreation runs, or
//! while the requested size is zero (minimized window), frames are skipped.

/// Tracks requested and applied frame sizes
#[derive(Debug, Clone)]
pub struct ResizeTracker {
    size: (u32, u32),
    pending: Option<(u32, u32)>,
    recreating: bool,
}

impl ResizeTracker {
    pub fn new(width: u32, height: u32) -> Self {
        Self { size: (width, height), pending: None, recreating: false }
    }

    /// Record a resize to `width` x `height`
    pub fn request(&mut self, width: u32, height: u32) {
        self.pending = Some((width, height));
    }

    /// Schedule a recreation at the current size (surface out of date or suboptimal)
    pub fn schedule(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(self.size);
        }
    }

    /// Whether the next frame must be skipped for a resize
    pub fn is_resizing(&self) -> bool {
        self.recreating || self.pending.is_some()
    }

    /// Take the pending size and enter recreation
    ///
    /// Returns `None` when nothing is pending, recreation is already running,
    /// or the pending size is zero (it stays pending until the window grows).
    pub fn begin_recreate(&mut self) -> Option<(u32, u32)> {
        if self.recreating {
            return None;
        }
        match self.pending {
            Some((w, h)) if w > 0 && h > 0 => {
                self.pending = None;
                self.recreating = true;
                Some((w, h))
            }
            _ => None,
        }
    }

    /// Recreation done at the given (clamped) size
    pub fn finish(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.recreating = false;
    }

    /// Recreation failed: leave recreation and retry on the next frame
    pub fn fail(&mut self, width: u32, height: u32) {
        self.recreating = false;
        self.pending.get_or_insert((width, height));
    }

    /// Size of the current swapchain
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

#[cfg(test)]
#[path = "resize_tests.rs"]
mod tests;
