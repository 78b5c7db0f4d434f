// src/store/mod.rs

//! The concurrent framebuffer store.
//!
//! This is the central data model: a list of sessions, each an ordered list
//! of frames, each frame a set of named AOV planes plus render state. The
//! store lives behind a shared handle (`Arc<Store>`); the session reader
//! mutates it, the surface adapter and the tick loop read it, and the host
//! invalidates its cache off the monotonically increasing update counter.
//!
//! Locking discipline: one `RwLock` over the whole pyramid. The writer
//! holds it across an AOV-set mutation, a resize, or a single bucket copy
//! plus its bookkeeping; a scan holds it for one row. Nothing holds it
//! across a socket read.

mod frame;
mod plane;
mod writer;

#[cfg(test)]
mod tests;

pub use frame::{Camera, Frame, RenderStatus};
pub use plane::{Plane, PlaneData};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info, warn};

use crate::config::DisplayConfig;
use crate::wire::{AovName, SessionHeader};

/// Rectangle in bottom-left pixel coordinates, `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Rect { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }
}

/// Camera state handed to the host when live mirroring is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraUpdate {
    pub frame: f64,
    pub camera: Camera,
}

/// One continuous render job: ordered frames under a renderer-chosen id.
///
/// Created on the first well-formed header with an unseen id; never
/// destroyed until the store is cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: i32,
    frames: Vec<Frame>,
}

impl Session {
    fn new(id: i32) -> Self {
        Session {
            id,
            frames: Vec::new(),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    /// Frames in insertion order, never sorted.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_numbers(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.number()).collect()
    }

    /// Frame index for a viewing time, per [`nearest_frame_index`].
    pub fn frame_index_for(&self, time: f64) -> usize {
        nearest_frame_index(&self.frame_numbers(), time)
    }
}

/// Maps a viewing time to a frame index: an exact match wins, then the
/// largest frame at or below the time, then the smallest frame when every
/// frame is above it. An empty list maps to index 0.
pub fn nearest_frame_index(numbers: &[f64], time: f64) -> usize {
    let mut index = 0;
    let mut nearest_below = f64::NEG_INFINITY;
    let mut smallest = f64::INFINITY;

    for (i, &number) in numbers.iter().enumerate() {
        if number == time {
            return i;
        }
        if time > number && number > nearest_below {
            nearest_below = number;
            index = i;
        } else if number < smallest && nearest_below == f64::NEG_INFINITY {
            smallest = number;
            index = i;
        }
    }
    index
}

/// Per-connection bookkeeping the session reader threads through every
/// dispatch: which frame buckets land in, the AOV set of the current
/// render iteration, the progress base, and the elapsed-time delta that
/// keeps interactive restarts from running the clock backwards.
#[derive(Debug, Default)]
pub struct RenderPass {
    session: Option<usize>,
    frame_index: usize,
    active_aovs: Vec<AovName>,
    remaining_area: i64,
    delta_ms: i32,
    active_ms: i32,
}

/// Lock-guarded store state. Policies sit next to the data they govern so
/// a single write acquisition observes a consistent pair.
#[derive(Debug)]
pub(crate) struct StoreState {
    pub(crate) sessions: Vec<Session>,
    pub(crate) bbox: Rect,
    pub(crate) multiframe: bool,
    pub(crate) enable_aovs: bool,
    pub(crate) live_camera: bool,
    pub(crate) capturing: bool,
}

impl Default for StoreState {
    fn default() -> Self {
        let defaults = DisplayConfig::default();
        StoreState {
            sessions: Vec::new(),
            bbox: Rect::default(),
            multiframe: defaults.multiframe,
            enable_aovs: defaults.enable_aovs,
            live_camera: defaults.live_camera,
            capturing: false,
        }
    }
}

/// The process-wide framebuffer store. Share it as `Arc<Store>`; all
/// methods take `&self` and synchronize internally.
#[derive(Debug, Default)]
pub struct Store {
    state: RwLock<StoreState>,
    update_counter: AtomicU64,
    camera_tx: Mutex<Option<Sender<CameraUpdate>>>,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    /// Creates a store with the host's initial policy toggles.
    pub fn with_config(config: &DisplayConfig) -> Self {
        let store = Store::default();
        {
            let mut state = store.write_state();
            state.multiframe = config.multiframe;
            state.enable_aovs = config.enable_aovs;
            state.live_camera = config.live_camera;
        }
        store
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Monotonically increasing change counter; the host re-pulls whenever
    /// it observes a value it has not seen.
    pub fn update_counter(&self) -> u64 {
        self.update_counter.load(Ordering::Acquire)
    }

    /// Bounding box of the last published change, bottom-left coordinates.
    pub fn last_bbox(&self) -> Rect {
        self.read_state().bbox
    }

    /// Publishes a change: records its bounding box and bumps the counter.
    /// Callers already hold the write lock, so a scan that observes the new
    /// counter value also observes the pixels behind it.
    pub(crate) fn publish(&self, state: &mut StoreState, bbox: Rect) {
        state.bbox = bbox;
        self.update_counter.fetch_add(1, Ordering::Release);
    }

    /// Registers the sink live camera updates are pushed through.
    pub fn set_camera_sink(&self, sink: Sender<CameraUpdate>) {
        let mut guard = self
            .camera_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Some(sink);
    }

    pub(crate) fn push_camera(&self, update: CameraUpdate) {
        let mut guard = self
            .camera_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = guard.as_ref() {
            if tx.send(update).is_err() {
                debug!("camera sink disconnected, dropping it");
                *guard = None;
            }
        }
    }

    /// Empties every session, resets the counter and bbox, and pushes one
    /// final update so the host repaints to black.
    pub fn clear_all(&self) {
        let mut state = self.write_state();
        info!("clearing {} session(s)", state.sessions.len());
        state.sessions.clear();
        self.update_counter.store(0, Ordering::Release);
        self.publish(&mut state, Rect::default());
    }

    /// Suppresses update publication while the host exports frames.
    pub fn set_capturing(&self, capturing: bool) {
        self.write_state().capturing = capturing;
    }

    pub fn set_multiframe(&self, multiframe: bool) {
        self.write_state().multiframe = multiframe;
    }

    pub fn set_enable_aovs(&self, enable_aovs: bool) {
        self.write_state().enable_aovs = enable_aovs;
    }

    pub fn set_live_camera(&self, live_camera: bool) {
        self.write_state().live_camera = live_camera;
    }

    /// Applies an OPEN header: locates or creates the session and its
    /// target frame, re-resolves the frame against the header, and resets
    /// the pass bookkeeping for the new render iteration.
    pub fn open_session(&self, header: &SessionHeader, pass: &mut RenderPass) {
        let mut state = self.write_state();
        let width = header.xres as u32;
        let height = header.yres as u32;
        let number = f64::from(header.frame);

        let multiframe = state.multiframe;
        let live_camera = state.live_camera;

        let s_index = match state
            .sessions
            .iter()
            .position(|s| s.id == header.session_id)
        {
            Some(index) => index,
            None => {
                info!(
                    "new session {} at {}x{}, frame {}",
                    header.session_id, header.xres, header.yres, number
                );
                state.sessions.push(Session::new(header.session_id));
                state.sessions.len() - 1
            }
        };
        let session = &mut state.sessions[s_index];

        if multiframe {
            // Unseen frame numbers extend the timeline; the new frame is
            // cloned from the most recent one so its planes carry over.
            if !session.frames.iter().any(|f| f.number() == number) {
                let frame = match session.frames.last() {
                    Some(last) => last.clone(),
                    None => Frame::new(number, width, height),
                };
                session.frames.push(frame);
            }
        } else {
            // Single-frame mode keeps one slot, carried forward from
            // whichever frame was being displayed.
            let carried = if session.frames.is_empty() {
                Frame::new(number, width, height)
            } else {
                let shown = session.frame_index_for(number);
                session.frames[shown].clone()
            };
            session.frames = vec![carried];
        }

        let f_index = session.frame_index_for(number);
        let frame = &mut session.frames[f_index];

        // Compare the header against the frame it addresses. A changed
        // AOV set is not visible here; the writer detects it on the first
        // buckets of the new pass.
        if frame.number() != number {
            frame.set_number(number);
        }

        if frame.dimensions() != (width, height) {
            frame.set_resolution(width, height);
        }

        let camera = Camera::from_header(header);
        if frame.is_camera_changed(&camera) {
            frame.set_camera(camera);
            if live_camera {
                self.push_camera(CameraUpdate {
                    frame: number,
                    camera,
                });
            }
        }

        if frame.version() != header.version {
            frame.set_version(header.version);
        }
        if frame.samples() != header.samples {
            frame.set_samples(header.samples);
        }

        pass.session = Some(s_index);
        pass.frame_index = f_index;
        pass.remaining_area = if header.region_area > 0 {
            header.region_area
        } else {
            warn!("header declared no region area, assuming the full image");
            i64::from(header.xres) * i64::from(header.yres)
        };
        pass.delta_ms = pass.active_ms;
        pass.active_aovs.clear();
    }

    /// Full-frame update used by the tick loop when the viewing time moves
    /// to a different frame.
    pub fn flag_full_update(&self, session: usize, frame_index: usize) {
        let mut state = self.write_state();
        let Some(frame) = state
            .sessions
            .get(session)
            .and_then(|s| s.frames().get(frame_index))
        else {
            return;
        };
        let (width, height) = frame.dimensions();
        self.publish(&mut state, Rect::new(0, 0, width as i32, height as i32));
    }
}
