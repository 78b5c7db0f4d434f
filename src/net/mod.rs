// src/net/mod.rs

//! TCP transport: the listening endpoint, the per-session reader loop,
//! and the protocol-symmetric sender.

pub mod client;
pub mod listener;
pub mod session;

pub use client::RenderClient;
pub use listener::{Accepted, Listener, SessionStream};
pub use session::{run_session, SessionEnd};

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::store::Store;

/// The accept loop: one live session at a time, until the quit sentinel
/// arrives either between sessions or inside one.
pub fn serve(listener: Listener, store: Arc<Store>) -> Result<()> {
    info!("serving on port {}", listener.port());
    loop {
        match listener.accept() {
            Ok(Accepted::Shutdown) => {
                info!("listener shut down");
                return Ok(());
            }
            Ok(Accepted::Session(session)) => {
                if run_session(session, &store) == SessionEnd::Quit {
                    info!("listener shut down mid-session");
                    return Ok(());
                }
            }
            Err(e) => {
                // Transient accept failures (aborted handshakes, bad
                // first tags) leave the listener up.
                warn!("accept failed: {:#}", e);
            }
        }
    }
}

/// Spawns the accept loop on its own named thread.
pub fn spawn(listener: Listener, store: Arc<Store>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("fb-reader".to_string())
        .spawn(move || {
            if let Err(e) = serve(listener, store) {
                error!("reader thread failed: {:#}", e);
            }
        })
        .context("Failed to spawn reader thread")
}
