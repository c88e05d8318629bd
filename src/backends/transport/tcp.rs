// SPDX-License-Identifier: MPL-2.0

//! TCP stream transport

use super::{Canceller, Transport, TransportKind, resolve};
use crate::constants::timing::READ_TIMEOUT_MS;
use std::io::{self, Read};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct TcpTransport {
    endpoint: String,
    read_timeout: Option<Duration>,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(endpoint: String, read_timeout: Option<Duration>) -> Self {
        Self {
            endpoint,
            read_timeout,
            stream: None,
        }
    }
}

impl Transport for TcpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.endpoint)
    }

    fn connect(&mut self) -> io::Result<()> {
        let remote = resolve(&self.endpoint)?;
        let connect_timeout = self
            .read_timeout
            .unwrap_or(Duration::from_millis(READ_TIMEOUT_MS));
        let stream = TcpStream::connect_timeout(&remote, connect_timeout)?;
        stream.set_read_timeout(self.read_timeout)?;
        stream.set_nodelay(true)?;
        info!(endpoint = %self.endpoint, "TCP video stream connected");
        self.stream = Some(stream);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "TCP stream not connected"))?;
        stream.read(buf)
    }

    fn canceller(&self) -> Option<Canceller> {
        let clone = self.stream.as_ref()?.try_clone().ok()?;
        Some(Box::new(move || {
            // Makes a blocked read return end of stream
            if let Err(e) = clone.shutdown(Shutdown::Both) {
                debug!(error = %e, "TCP shutdown on cancel failed");
            }
        }))
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.shutdown(Shutdown::Both)
                && e.kind() != io::ErrorKind::NotConnected
            {
                warn!(error = %e, "TCP shutdown failed");
            }
            debug!(endpoint = %self.endpoint, "TCP video stream closed");
        }
        Ok(())
    }
}
