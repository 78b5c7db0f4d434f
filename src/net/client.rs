// src/net/client.rs

//! The renderer-facing sender, symmetric to the receiver's codec.
//!
//! A display driver constructs one `RenderClient` per render pass, calls
//! `open_image`, streams buckets with `send_pixels`, and finishes with
//! `close_image`. The receiver's own quit path reuses the sentinel
//! sender. Sending pixels before the open handshake is a state error,
//! fatal to this client only.

use std::io::Write;
use std::net::TcpStream;

use log::debug;

use crate::config;
use crate::error::{ClientError, StateError};
use crate::wire::{codec, BucketPixels, MessageKind, SessionHeader};

/// Streams one image to a receiver.
#[derive(Debug)]
pub struct RenderClient {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    image_id: Option<i32>,
}

impl RenderClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        RenderClient {
            host: host.into(),
            port,
            stream: None,
            image_id: None,
        }
    }

    /// Client aimed at the endpoint `ATON_HOST`/`ATON_PORT` describe.
    pub fn from_env() -> Self {
        RenderClient::new(config::host_from_env(), config::port_from_env())
    }

    /// Connects and announces a new render pass. The receiver answers
    /// with the image id echoed on every later message.
    pub fn open_image(&mut self, header: &SessionHeader) -> Result<(), ClientError> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))?;
        codec::write_kind(&mut stream, MessageKind::Open)?;
        stream.flush()?;
        let id = codec::read_echo(&mut stream)?;
        codec::write_header(&mut stream, header)?;
        stream.flush()?;
        debug!("opened image {} on {}:{}", id, self.host, self.port);
        self.image_id = Some(id);
        self.stream = Some(stream);
        Ok(())
    }

    /// Streams one bucket for one AOV.
    pub fn send_pixels(&mut self, bucket: &BucketPixels) -> Result<(), ClientError> {
        let id = self.image_id.ok_or(StateError::NotOpen)?;
        let stream = self.stream.as_mut().ok_or(StateError::NotOpen)?;
        codec::write_pixels(stream, id, bucket)?;
        stream.flush()?;
        Ok(())
    }

    /// Tells the receiver the image is complete and disconnects.
    pub fn close_image(&mut self) -> Result<(), ClientError> {
        let id = self.image_id.take().ok_or(StateError::NotOpen)?;
        if let Some(mut stream) = self.stream.take() {
            codec::write_close(&mut stream, id)?;
            stream.flush()?;
        }
        Ok(())
    }

    /// Sends the quit sentinel on a fresh connection, terminating the
    /// receiver's listener.
    pub fn quit(host: &str, port: u16) -> std::io::Result<()> {
        let mut stream = TcpStream::connect((host, port))?;
        codec::write_quit(&mut stream)?;
        stream.flush()
    }
}
