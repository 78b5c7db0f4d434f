// src/store/frame.rs

//! One rendered frame: its AOV planes plus the render-state snapshot.
//!
//! A `Frame` owns its planes exclusively and keeps the scalar state the
//! host's status line reads (progress, memory, elapsed time, renderer
//! version, sample counts, camera). Mutation goes through methods that
//! uphold the invariants: resolution changes only via the zero-filling
//! resize transition, peak memory never decreases, progress stays within
//! 0..=100, and AOV insertion order is preserved for the frame's lifetime.

use log::debug;

use super::plane::Plane;
use crate::wire::{format_samples, format_version, AovName, SessionHeader, SAMPLE_KINDS};

const BYTES_PER_MB: i64 = 1024 * 1024;

/// Camera state mirrored from the renderer's headers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Camera {
    /// Field of view in degrees.
    pub fov: f32,
    /// Camera-to-world matrix, column-major.
    pub matrix: [f32; 16],
}

impl Camera {
    pub fn from_header(header: &SessionHeader) -> Self {
        Camera {
            fov: header.cam_fov,
            matrix: header.cam_matrix,
        }
    }
}

/// Render-state snapshot the host polls for its status line.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStatus {
    pub frame: f64,
    /// Percentage of the render region written so far, 0..=100.
    pub progress: i64,
    /// Renderer memory at the last bucket, in MB.
    pub ram_mb: i64,
    /// Highest memory seen over the frame's lifetime, in MB.
    pub peak_ram_mb: i64,
    /// Milliseconds since the render pass started, delta-corrected across
    /// interactive restarts.
    pub elapsed_ms: i32,
    /// Renderer version as `arch.major.minor.patch`.
    pub version: String,
    /// Sample counts as `AA/Df/Sp/Tr/SSS/Vol`.
    pub samples: String,
}

/// One frame in a session: ordered AOV planes plus render state.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    number: f64,
    width: u32,
    height: u32,
    camera: Camera,
    version: i32,
    samples: [i32; SAMPLE_KINDS],
    ram_mb: i64,
    peak_ram_mb: i64,
    elapsed_ms: i32,
    progress: i64,
    ready: bool,
    planes: Vec<Plane>,
}

impl Frame {
    /// Creates an empty frame at the given number and resolution. Planes
    /// arrive with the first bucket of each AOV.
    pub fn new(number: f64, width: u32, height: u32) -> Self {
        Frame {
            number,
            width,
            height,
            camera: Camera::default(),
            version: 0,
            samples: [0; SAMPLE_KINDS],
            ram_mb: 0,
            peak_ram_mb: 0,
            elapsed_ms: 0,
            progress: 0,
            ready: false,
            planes: Vec::new(),
        }
    }

    pub fn number(&self) -> f64 {
        self.number
    }

    pub fn set_number(&mut self, number: f64) {
        self.number = number;
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True once at least one bucket has landed since the last readiness
    /// reset. Scans against a not-ready frame read as 0.0.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// True when no AOV has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn plane(&self, name: &AovName) -> Option<&Plane> {
        self.planes.iter().find(|p| p.name() == name)
    }

    pub fn plane_mut(&mut self, name: &AovName) -> Option<&mut Plane> {
        self.planes.iter_mut().find(|p| p.name() == name)
    }

    pub fn has_plane(&self, name: &AovName) -> bool {
        self.plane(name).is_some()
    }

    /// Registers a new AOV sized to the frame's resolution. Names are
    /// unique within a frame; re-adding an existing name is a no-op.
    pub fn add_plane(&mut self, name: AovName, spp: i32) {
        if self.has_plane(&name) {
            return;
        }
        debug!("adding AOV {} (spp {})", name, spp);
        self.planes
            .push(Plane::new(name, spp, self.width, self.height));
    }

    /// The anchor AOV: first in insertion order. Progress accounting and
    /// update flagging fire only on anchor writes.
    pub fn anchor_name(&self) -> Option<&AovName> {
        self.planes.first().map(|p| p.name())
    }

    pub fn is_anchor(&self, name: &AovName) -> bool {
        self.anchor_name() == Some(name)
    }

    /// AOV names in insertion order.
    pub fn plane_names(&self) -> Vec<AovName> {
        self.planes.iter().map(|p| p.name().clone()).collect()
    }

    /// `(name, samples-per-pixel)` for every plane, in insertion order.
    pub fn channels(&self) -> Vec<(AovName, i32)> {
        self.planes
            .iter()
            .map(|p| (p.name().clone(), p.spp()))
            .collect()
    }

    /// Drops every plane after the anchor. Used when a new render pass
    /// arrives with a different AOV set.
    pub fn truncate_to_anchor(&mut self) {
        self.planes.truncate(1);
    }

    /// The resize transition: every plane keeps its identity and spp but
    /// its storage is re-allocated to the new resolution, zero-filled.
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        debug!(
            "frame {} resized {}x{} -> {}x{}",
            self.number, self.width, self.height, width, height
        );
        self.width = width;
        self.height = height;
        for plane in &mut self.planes {
            plane.resize(width, height);
        }
        self.ready = false;
        // Storage was re-created, so the memory watermark starts over.
        self.peak_ram_mb = 0;
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn is_camera_changed(&self, camera: &Camera) -> bool {
        self.camera != *camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    pub fn samples(&self) -> [i32; SAMPLE_KINDS] {
        self.samples
    }

    pub fn set_samples(&mut self, samples: [i32; SAMPLE_KINDS]) {
        self.samples = samples;
    }

    /// Records renderer memory, converting bytes to MB. The peak is the
    /// max seen and never decreases outside the resize transition.
    pub fn record_ram(&mut self, ram_bytes: i64) {
        let ram_mb = ram_bytes / BYTES_PER_MB;
        self.ram_mb = ram_mb;
        self.peak_ram_mb = self.peak_ram_mb.max(ram_mb);
    }

    pub fn set_elapsed(&mut self, elapsed_ms: i32) {
        self.elapsed_ms = elapsed_ms;
    }

    /// Sets progress, clamped into 0..=100.
    pub fn set_progress(&mut self, progress: i64) {
        self.progress = progress.clamp(0, 100);
    }

    pub fn progress(&self) -> i64 {
        self.progress
    }

    pub fn status(&self) -> RenderStatus {
        RenderStatus {
            frame: self.number,
            progress: self.progress,
            ram_mb: self.ram_mb,
            peak_ram_mb: self.peak_ram_mb,
            elapsed_ms: self.elapsed_ms,
            version: format_version(self.version),
            samples: format_samples(&self.samples),
        }
    }
}
