// src/net/listener.rs

//! The bound TCP endpoint.
//!
//! One listener owns one socket and hands out at most one live session at
//! a time; further connections wait in the OS backlog. The first kind tag
//! of every accepted connection is read here so the quit sentinel can
//! unblock `accept()` without ever looking like a session.

use std::io::Write;
use std::net::{Ipv4Addr, TcpListener, TcpStream};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::error::BindError;
use crate::wire::{codec, MessageKind};

/// Ports tried in total when search mode is on.
const SEARCH_WINDOW: u16 = 100;

/// Outcome of one `accept()`: a session to read, or the quit sentinel.
#[derive(Debug)]
pub enum Accepted {
    Session(SessionStream),
    Shutdown,
}

/// An accepted connection whose first kind tag was already consumed.
#[derive(Debug)]
pub struct SessionStream {
    pub(crate) stream: TcpStream,
    pub(crate) first: MessageKind,
}

/// A bound listening socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    port: u16,
}

impl Listener {
    /// Binds the requested port. With `search` on, the next 99 ports are
    /// tried before giving up. Port 0 asks the OS for an ephemeral port.
    pub fn bind(port: u16, search: bool) -> Result<Listener, BindError> {
        let end = if search && port != 0 {
            port.saturating_add(SEARCH_WINDOW - 1)
        } else {
            port
        };

        let mut last_error = None;
        for candidate in port..=end {
            match TcpListener::bind((Ipv4Addr::UNSPECIFIED, candidate)) {
                Ok(inner) => {
                    let bound = inner.local_addr().map(|a| a.port()).unwrap_or(candidate);
                    info!("bound listening socket on port {}", bound);
                    return Ok(Listener { inner, port: bound });
                }
                Err(e) => {
                    debug!("port {} unavailable: {}", candidate, e);
                    last_error = Some(e);
                }
            }
        }

        Err(BindError {
            start: port,
            end,
            source: last_error.unwrap_or_else(|| std::io::Error::other("no ports attempted")),
        })
    }

    /// The port actually bound (differs from the requested one after a
    /// search or an ephemeral bind).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Blocks until a renderer connects or the quit sentinel arrives.
    pub fn accept(&self) -> Result<Accepted> {
        let (mut stream, peer) = self
            .inner
            .accept()
            .context("accept failed on the listening socket")?;
        debug!("connection from {}", peer);

        let first = codec::read_kind(&mut stream).context("reading first message kind")?;
        if first == MessageKind::Quit {
            info!("quit sentinel received, leaving the accept loop");
            return Ok(Accepted::Shutdown);
        }
        Ok(Accepted::Session(SessionStream { stream, first }))
    }

    /// Unblocks `accept()` from inside the same process: self-connects to
    /// the bound port and writes the quit sentinel. This is the only
    /// supported way to stop a blocked listener.
    pub fn shutdown(&self) -> std::io::Result<()> {
        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, self.port))?;
        codec::write_quit(&mut stream)?;
        stream.flush()
    }
}
