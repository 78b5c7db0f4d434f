// src/lib.rs

//! Live render receiver library.
//!
//! Accepts in-progress image tiles streamed from offline renderers over a
//! little-endian wire protocol, assembles them into multi-AOV, multi-frame
//! framebuffers, and exposes a frame-indexed random-access pixel surface
//! the host compositor scans on demand.
//!
//! Data flow: socket bytes -> `wire` codec -> `net` session reader ->
//! `store` mutation -> update flag and bbox -> host pulls via `surface`.

pub mod config;
pub mod error;
pub mod net;
pub mod store;
pub mod surface;
pub mod tick;
pub mod wire;
