// src/wire/mod.rs

//! The stream wire protocol between renderers and the receiver.
//!
//! A connection carries a sequence of discriminated messages, each headed by
//! a 4-byte little-endian kind tag. This module defines the message model;
//! [`codec`] does the byte-level encoding and decoding over any
//! `Read`/`Write`, with no socket policy of its own.

use std::fmt;

pub mod codec;


/// Id the server echoes back after an OPEN. Always 1; the field stays on
/// the wire for symmetry with the sender library.
pub const ECHO_ID: i32 = 1;

/// Longest AOV name accepted on the wire, in bytes (NUL included).
pub const MAX_AOV_NAME_LEN: u64 = 4096;

/// Most pixel samples a single bucket may declare (256 Mi floats).
pub const MAX_BUCKET_SAMPLES: u64 = 256 * 1024 * 1024;

/// Length of the camera-to-world matrix, column-major.
pub const CAM_MATRIX_LEN: usize = 16;

/// Number of per-frame sample counters: AA, diffuse, specular,
/// transmission, SSS, volume.
pub const SAMPLE_KINDS: usize = 6;

/// Message discriminator as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A renderer announces a new render pass (session header follows).
    Open,
    /// One bucket of pixels for a named AOV.
    Pixels,
    /// The renderer is done with the current image.
    Close,
    /// Sentinel that terminates the listener; sent by a local self-connect.
    Quit,
}

impl MessageKind {
    /// Maps a wire tag to a kind. Unknown tags are a protocol error.
    pub fn from_tag(tag: i32) -> Option<MessageKind> {
        match tag {
            0 => Some(MessageKind::Open),
            1 => Some(MessageKind::Pixels),
            2 => Some(MessageKind::Close),
            9 => Some(MessageKind::Quit),
            _ => None,
        }
    }

    /// The 4-byte tag written ahead of this message.
    pub fn tag(self) -> i32 {
        match self {
            MessageKind::Open => 0,
            MessageKind::Pixels => 1,
            MessageKind::Close => 2,
            MessageKind::Quit => 9,
        }
    }
}

/// An AOV name as sent on the wire: raw bytes, not assumed to be UTF-8.
///
/// The trailing NUL the sender appends is stripped on construction and
/// re-added by the codec on write.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AovName(Vec<u8>);

impl AovName {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let mut bytes = bytes.into();
        if bytes.last() == Some(&0) {
            bytes.pop();
        }
        AovName(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for AovName {
    fn from(name: &str) -> Self {
        AovName::new(name.as_bytes().to_vec())
    }
}

impl fmt::Display for AovName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for AovName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AovName({})", String::from_utf8_lossy(&self.0))
    }
}

/// Payload of an OPEN message: everything the receiver needs to install or
/// re-resolve a frame before any pixels arrive.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHeader {
    /// Renderer-chosen positive session id.
    pub session_id: i32,
    pub xres: i32,
    pub yres: i32,
    /// Pixel area of the render region, the base of progress accounting.
    pub region_area: i64,
    /// Renderer version, packed (see [`pack_version`]).
    pub version: i32,
    /// Frame number this pass renders.
    pub frame: f32,
    pub cam_fov: f32,
    /// Camera-to-world matrix, column-major.
    pub cam_matrix: [f32; CAM_MATRIX_LEN],
    /// AA, diffuse, specular, transmission, SSS, volume sample counts.
    pub samples: [i32; SAMPLE_KINDS],
}

/// Payload of a PIXELS message: one bucket for one AOV.
///
/// Pixels are row-major with a top-left origin and channel-interleaved;
/// the writer flips Y into the store's bottom-left convention.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketPixels {
    pub xres: i32,
    pub yres: i32,
    pub bucket_xo: i32,
    pub bucket_yo: i32,
    pub bucket_w: i32,
    pub bucket_h: i32,
    /// Samples per pixel: 1 (scalar), 3 (RGB) or 4 (RGB + alpha).
    pub spp: i32,
    /// Renderer memory use at emission time, in bytes.
    pub ram_bytes: i64,
    /// Milliseconds since the render started.
    pub elapsed_ms: i32,
    pub aov: AovName,
    pub pixels: Vec<f32>,
}

impl BucketPixels {
    /// Float count this bucket carries.
    pub fn sample_count(&self) -> usize {
        (self.bucket_w as usize) * (self.bucket_h as usize) * (self.spp as usize)
    }
}

/// Packs four version fields into one integer:
/// `arch * 1_000_000 + major * 10_000 + minor * 100 + patch`.
/// Each field must be below 100.
pub fn pack_version(arch: i32, major: i32, minor: i32, patch: i32) -> i32 {
    arch * 1_000_000 + major * 10_000 + minor * 100 + patch
}

/// Unpacks a packed version into `[arch, major, minor, patch]`.
pub fn unpack_version(version: i32) -> [i32; 4] {
    [
        (version % 100_000_000) / 1_000_000,
        (version % 1_000_000) / 10_000,
        (version % 10_000) / 100,
        version % 100,
    ]
}

/// Renders a packed version as `arch.major.minor.patch` for display.
pub fn format_version(version: i32) -> String {
    let v = unpack_version(version);
    format!("{}.{}.{}.{}", v[0], v[1], v[2], v[3])
}

/// Renders the six sample counters as `AA/Df/Sp/Tr/SSS/Vol`.
pub fn format_samples(samples: &[i32; SAMPLE_KINDS]) -> String {
    format!(
        "{}/{}/{}/{}/{}/{}",
        samples[0], samples[1], samples[2], samples[3], samples[4], samples[5]
    )
}
