// src/tick.rs

//! The tick loop: a small thread that follows the host's viewing time.
//!
//! At a fixed cadence (~20 ms) it samples a [`TimeSource`]; when the time
//! has moved and more than one frame is cached, it recomputes the
//! effective frame index, optionally mirrors that frame's camera, and
//! flags a full update so the compositor repaints. At most one
//! recomputation happens per tick interval.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;

use crate::store::{CameraUpdate, Store};

/// The host's viewing time, sampled once per tick.
pub trait TimeSource: Send + 'static {
    /// Current viewing time, in frames.
    fn frame(&self) -> f64;
}

/// A viewing time the host updates from its own thread. Stores the f64
/// bit pattern in an atomic so ticks never block the host.
#[derive(Debug, Clone, Default)]
pub struct SharedTime(Arc<AtomicU64>);

impl SharedTime {
    pub fn new() -> Self {
        SharedTime::default()
    }

    pub fn set(&self, frame: f64) {
        self.0.store(frame.to_bits(), Ordering::Release);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }
}

impl TimeSource for SharedTime {
    fn frame(&self) -> f64 {
        self.get()
    }
}

/// Handle to the running tick thread. Stops and joins on drop.
#[derive(Debug)]
pub struct TickLoop {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TickLoop {
    /// Spawns the tick thread against a store and a time source.
    pub fn spawn<T: TimeSource>(
        store: Arc<Store>,
        time: T,
        interval: Duration,
    ) -> Result<TickLoop> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("fb-tick".to_string())
            .spawn(move || run(store, time, stop_flag, interval))
            .context("Failed to spawn tick thread")?;
        Ok(TickLoop {
            stop,
            handle: Some(handle),
        })
    }

    /// Stops the loop and joins the thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TickLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<T: TimeSource>(store: Arc<Store>, time: T, stop: Arc<AtomicBool>, interval: Duration) {
    debug!("tick loop started ({:?} cadence)", interval);
    let mut prev = f64::NAN;
    while !stop.load(Ordering::Acquire) {
        let current = time.frame();
        if publish_if_moved(&store, current, prev) {
            prev = current;
        }
        thread::sleep(interval);
    }
    debug!("tick loop stopped");
}

/// Republishes the effective frame when the viewing time moved. Only
/// meaningful with the multiframe policy on and at least two frames
/// cached; otherwise the time is left unclaimed for the next tick.
fn publish_if_moved(store: &Store, current: f64, prev: f64) -> bool {
    if current == prev {
        return false;
    }

    let (session_index, frame_index, number, camera, live_camera) = {
        let state = store.read_state();
        if !state.multiframe {
            return false;
        }
        let Some((session_index, session)) = state.sessions.iter().enumerate().last() else {
            return false;
        };
        if session.frames().len() < 2 {
            return false;
        }
        let frame_index = session.frame_index_for(current);
        let frame = &session.frames()[frame_index];
        (
            session_index,
            frame_index,
            frame.number(),
            frame.camera(),
            state.live_camera,
        )
    };

    if live_camera {
        store.push_camera(CameraUpdate {
            frame: number,
            camera,
        });
    }
    store.flag_full_update(session_index, frame_index);
    true
}
