// src/main.rs

//! Service entry point for `aton-server`.

use std::sync::Arc;

use anyhow::Context;
use log::info;

use aton_server::config::Config;
use aton_server::net::{self, Listener};
use aton_server::store::Store;
use aton_server::tick::{SharedTime, TickLoop};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let config = Config::from_env();
    info!("starting aton-server (port {})", config.network.port);

    let store = Arc::new(Store::with_config(&config.display));

    let listener = Listener::bind(config.network.port, config.network.port_search)
        .context("Failed to acquire a listening port")?;

    // Without an embedding host the viewing time sits still; the tick
    // thread idles until a host wires its own time in.
    let time = SharedTime::new();
    let interval = std::time::Duration::from_millis(config.display.tick_interval_ms);
    let _tick = TickLoop::spawn(Arc::clone(&store), time, interval)
        .context("Failed to start the tick loop")?;

    net::serve(listener, store)?;

    info!("aton-server exited");
    Ok(())
}
