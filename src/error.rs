// src/error.rs

//! Error kinds for the receiver.
//!
//! Failures are partitioned by blast radius: `BindError` is fatal to the
//! listener, `ProtocolError` closes one session, `StateError` is a
//! client-side misuse, and `OutOfRange` aborts a single bucket copy.

use std::io;
use thiserror::Error;

/// No listening port could be acquired in the requested window.
///
/// Surfaced to the host as a connection-error string; there is no retry.
#[derive(Debug, Error)]
#[error("failed to bind a listening port in {start}..={end}")]
pub struct BindError {
    /// First port attempted.
    pub start: u16,
    /// Last port attempted (equal to `start` when search mode is off).
    pub end: u16,
    #[source]
    pub source: io::Error,
}

/// A malformed or oversized message on the wire. Closes the session; the
/// listener returns to accepting.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown message kind {0}")]
    UnknownKind(i32),

    #[error("AOV name length {0} exceeds the 4 KiB cap")]
    NameTooLong(u64),

    #[error("bucket declares {0} samples, over the 256 Mi cap")]
    OversizedBucket(u64),

    #[error("bucket ({x},{y}) {w}x{h} extends outside the {xres}x{yres} resolution")]
    BucketOutOfRange {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        xres: i32,
        yres: i32,
    },

    #[error("malformed message: {0}")]
    Malformed(&'static str),

    /// Short read, peer disconnect, or any other socket failure mid-message.
    #[error("stream ended mid-message")]
    Io(#[from] io::Error),
}

/// Client-side misuse: pixels sent before `open_image` handed back an id.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot send pixels before open_image returned an image id")]
    NotOpen,
}

/// Failure on the sender side of the wire.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("socket I/O failed")]
    Io(#[from] io::Error),
}

/// Internal invariant breach while addressing a plane. Aborts only the
/// current bucket; the frame remains valid.
#[derive(Debug, Error)]
#[error("pixel ({x},{y}) channel {channel} out of range for {width}x{height} plane")]
pub struct OutOfRange {
    pub x: u32,
    pub y: u32,
    pub channel: usize,
    pub width: u32,
    pub height: u32,
}
