// src/net/session.rs

//! The per-connection reader loop.
//!
//! One message is read at a time, decoded into owned buffers, and
//! dispatched to the store; the store lock is never held across a socket
//! read. Any protocol or I/O failure terminates only this session: the
//! error is logged, the stream is dropped, and pixels already written
//! stay intact for the compositor.

use std::io::Write;
use std::net::TcpStream;

use log::{debug, info, trace, warn};

use super::listener::SessionStream;
use crate::error::ProtocolError;
use crate::store::{RenderPass, Store};
use crate::wire::{codec, MessageKind};

/// Why a session reader returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The renderer closed the image cleanly.
    Closed,
    /// The quit sentinel arrived; the whole service should stop.
    Quit,
    /// Protocol or I/O failure. Never propagates to other sessions.
    Failed,
}

enum Flow {
    Continue,
    Close,
    Quit,
}

/// Runs the reader loop for one accepted session until it ends.
pub fn run_session(session: SessionStream, store: &Store) -> SessionEnd {
    let SessionStream { mut stream, first } = session;
    let mut pass = RenderPass::default();
    let mut kind = first;

    loop {
        match handle_message(&mut stream, kind, store, &mut pass) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Close) => {
                info!("session closed by renderer");
                return SessionEnd::Closed;
            }
            Ok(Flow::Quit) => return SessionEnd::Quit,
            Err(e) => {
                warn!("session terminated: {}", e);
                return SessionEnd::Failed;
            }
        }

        kind = match codec::read_kind(&mut stream) {
            Ok(kind) => kind,
            Err(e) => {
                debug!("session stream ended: {}", e);
                return SessionEnd::Failed;
            }
        };
    }
}

fn handle_message(
    stream: &mut TcpStream,
    kind: MessageKind,
    store: &Store,
    pass: &mut RenderPass,
) -> Result<Flow, ProtocolError> {
    match kind {
        MessageKind::Open => {
            // The sender blocks on the echoed id before it writes the
            // header, so answer first.
            codec::write_echo(stream)?;
            stream.flush()?;
            let header = codec::read_header(stream)?;
            debug!(
                "open: session {} frame {} at {}x{}",
                header.session_id, header.frame, header.xres, header.yres
            );
            store.open_session(&header, pass);
            Ok(Flow::Continue)
        }
        MessageKind::Pixels => {
            let bucket = codec::read_pixels(stream)?;
            trace!(
                "pixels: {} {}x{} at ({},{})",
                bucket.aov,
                bucket.bucket_w,
                bucket.bucket_h,
                bucket.bucket_xo,
                bucket.bucket_yo
            );
            store.write_bucket(&bucket, pass);
            Ok(Flow::Continue)
        }
        MessageKind::Close => {
            let _id = codec::read_close(stream)?;
            Ok(Flow::Close)
        }
        MessageKind::Quit => Ok(Flow::Quit),
    }
}
