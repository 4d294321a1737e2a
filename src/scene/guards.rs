//! Scoped changes to scene state.
//!
//! Each guard borrows the source mutably, applies a change and restores the
//! previous value when dropped, including during error propagation. The
//! source stays usable through the guard via `Deref`/`DerefMut`.

use std::ops::{Deref, DerefMut};

use tracing::trace;

use super::{DisplayState, NodeId, SceneSource};

/// Restores the current frame on drop.
pub struct FrameGuard<'a, S: SceneSource + ?Sized> {
    source: &'a mut S,
    restore: i32,
}

impl<'a, S: SceneSource + ?Sized> FrameGuard<'a, S> {
    /// Remember the current frame and move to `frame`.
    pub fn new(source: &'a mut S, frame: i32) -> Self {
        let restore = source.current_frame();
        source.set_frame(frame);
        Self { source, restore }
    }

    /// Frame that will be restored.
    pub fn restore_frame(&self) -> i32 {
        self.restore
    }
}

impl<S: SceneSource + ?Sized> Deref for FrameGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.source
    }
}

impl<S: SceneSource + ?Sized> DerefMut for FrameGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.source
    }
}

impl<S: SceneSource + ?Sized> Drop for FrameGuard<'_, S> {
    fn drop(&mut self) {
        trace!(frame = self.restore, "restoring frame");
        self.source.set_frame(self.restore);
    }
}

/// Restores a node's display state on drop.
pub struct DisplayStateGuard<'a, S: SceneSource + ?Sized> {
    source: &'a mut S,
    node: NodeId,
    restore: DisplayState,
}

impl<'a, S: SceneSource + ?Sized> DisplayStateGuard<'a, S> {
    pub fn new(source: &'a mut S, node: NodeId) -> Self {
        let restore = source.display_state(node);
        Self { source, node, restore }
    }

    /// Change the guarded node's state.
    pub fn set(&mut self, state: DisplayState) {
        self.source.set_display_state(self.node, state);
    }
}

impl<S: SceneSource + ?Sized> Deref for DisplayStateGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.source
    }
}

impl<S: SceneSource + ?Sized> DerefMut for DisplayStateGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.source
    }
}

impl<S: SceneSource + ?Sized> Drop for DisplayStateGuard<'_, S> {
    fn drop(&mut self) {
        self.source.set_display_state(self.node, self.restore);
    }
}
