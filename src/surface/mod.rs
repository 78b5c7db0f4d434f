// src/surface/mod.rs

//! Read-only pixel surface the host compositor scans against.
//!
//! The compositor polls `update_counter`/`last_bbox` at repaint and pulls
//! rows on demand. Every method here is forgiving: unknown sessions,
//! frames or AOVs, positions outside a plane, and reads against a frame
//! that is not ready all come back as 0.0 or an empty default, never an
//! error. The read lock is held for at most one row scan.

use std::sync::Arc;

use crate::store::{nearest_frame_index, Rect, RenderStatus, Store};
use crate::wire::AovName;

/// A read-only view of the store for one host compositor.
///
/// Views are cheap to clone; they carry only the shared handle.
#[derive(Debug, Clone)]
pub struct Surface {
    store: Arc<Store>,
}

impl Surface {
    pub fn new(store: Arc<Store>) -> Self {
        Surface { store }
    }

    /// Number of sessions the store currently holds.
    pub fn session_count(&self) -> usize {
        self.store.read_state().sessions.len()
    }

    /// Frame numbers of a session in insertion order (not sorted).
    pub fn frames(&self, session: usize) -> Vec<f64> {
        let state = self.store.read_state();
        state
            .sessions
            .get(session)
            .map(|s| s.frame_numbers())
            .unwrap_or_default()
    }

    /// Maps a viewing time to a frame index: exact match, else nearest
    /// below, else the smallest frame; 0 when the session has no frames.
    pub fn pick_frame(&self, session: usize, time: f64) -> usize {
        let state = self.store.read_state();
        state
            .sessions
            .get(session)
            .map(|s| nearest_frame_index(&s.frame_numbers(), time))
            .unwrap_or(0)
    }

    pub fn is_ready(&self, session: usize, frame_index: usize) -> bool {
        let state = self.store.read_state();
        state
            .sessions
            .get(session)
            .and_then(|s| s.frames().get(frame_index))
            .map(|f| f.is_ready())
            .unwrap_or(false)
    }

    /// Frame resolution, or (0, 0) for an unknown frame.
    pub fn dimensions(&self, session: usize, frame_index: usize) -> (u32, u32) {
        let state = self.store.read_state();
        state
            .sessions
            .get(session)
            .and_then(|s| s.frames().get(frame_index))
            .map(|f| f.dimensions())
            .unwrap_or((0, 0))
    }

    /// `(aov_name, samples-per-pixel)` pairs in plane insertion order.
    pub fn channels(&self, session: usize, frame_index: usize) -> Vec<(AovName, i32)> {
        let state = self.store.read_state();
        state
            .sessions
            .get(session)
            .and_then(|s| s.frames().get(frame_index))
            .map(|f| f.channels())
            .unwrap_or_default()
    }

    /// Render-state snapshot for the host's status line.
    pub fn status(&self, session: usize, frame_index: usize) -> Option<RenderStatus> {
        let state = self.store.read_state();
        state
            .sessions
            .get(session)
            .and_then(|s| s.frames().get(frame_index))
            .map(|f| f.status())
    }

    /// Scans one row of one channel over `x0..x1` in bottom-left
    /// coordinates. Positions outside the plane and reads against a
    /// not-ready frame fill with 0.0.
    pub fn scan_row(
        &self,
        session: usize,
        frame_index: usize,
        aov: &AovName,
        y: u32,
        x0: u32,
        x1: u32,
        channel: usize,
    ) -> Vec<f32> {
        let len = x1.saturating_sub(x0) as usize;
        let state = self.store.read_state();

        let plane = state
            .sessions
            .get(session)
            .and_then(|s| s.frames().get(frame_index))
            .filter(|f| f.is_ready())
            .and_then(|f| f.plane(aov));

        match plane {
            Some(plane) => (x0..x1).map(|x| plane.get(x, y, channel)).collect(),
            None => vec![0.0; len],
        }
    }

    /// Monotonically increasing change counter, see [`Store::update_counter`].
    pub fn update_counter(&self) -> u64 {
        self.store.update_counter()
    }

    /// Bounding box of the last published change.
    pub fn last_bbox(&self) -> Rect {
        self.store.last_bbox()
    }
}
