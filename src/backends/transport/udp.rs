// SPDX-License-Identifier: MPL-2.0

//! UDP datagram transport
//!
//! The video endpoint only starts streaming after it has received a
//! kick-off datagram from the client. The kick-off is sent after connecting
//! and again whenever a read times out, so a restarted endpoint picks the
//! client back up.
//!
//! The socket waits at most [`CANCEL_POLL_INTERVAL`] per `recv`, so a read
//! notices its canceller even when no read timeout is configured.

use super::{Canceller, Transport, TransportKind, is_timeout, resolve};
use crate::constants::network::UDP_KICKOFF;
use crate::constants::timing::CANCEL_POLL_INTERVAL;
use std::io;
use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct UdpTransport {
    endpoint: String,
    read_timeout: Option<Duration>,
    socket: Option<UdpSocket>,
    cancelled: Arc<AtomicBool>,
}

impl UdpTransport {
    pub fn new(endpoint: String, read_timeout: Option<Duration>) -> Self {
        Self {
            endpoint,
            read_timeout,
            socket: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    fn send_kickoff(socket: &UdpSocket) -> io::Result<()> {
        socket.send(&UDP_KICKOFF)?;
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        match self.read_timeout {
            Some(timeout) => timeout.min(CANCEL_POLL_INTERVAL),
            None => CANCEL_POLL_INTERVAL,
        }
    }
}

impl Transport for UdpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Datagram
    }

    fn describe(&self) -> String {
        format!("udp://{}", self.endpoint)
    }

    fn connect(&mut self) -> io::Result<()> {
        let remote = resolve(&self.endpoint)?;
        let local = if remote.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(remote)?;
        socket.set_read_timeout(Some(self.poll_interval()))?;
        Self::send_kickoff(&socket)?;
        info!(endpoint = %self.endpoint, local = ?socket.local_addr().ok(), "UDP video socket connected");
        self.cancelled.store(false, Ordering::SeqCst);
        self.socket = Some(socket);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "UDP socket not connected"))?;
        let started = Instant::now();
        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "UDP read cancelled"));
            }
            match socket.recv(buf) {
                Ok(0) => debug!("Skipping empty datagram"),
                Ok(n) => return Ok(n),
                Err(e) if is_timeout(&e) => {
                    if let Some(timeout) = self.read_timeout
                        && started.elapsed() >= timeout
                    {
                        debug!("No datagram before timeout, re-sending kick-off");
                        // Best effort; the timeout is what the caller needs to see
                        let _ = Self::send_kickoff(socket);
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn canceller(&self) -> Option<Canceller> {
        let cancelled = Arc::clone(&self.cancelled);
        Some(Box::new(move || cancelled.store(true, Ordering::SeqCst)))
    }

    fn close(&mut self) -> io::Result<()> {
        if self.socket.take().is_some() {
            debug!(endpoint = %self.endpoint, "UDP video socket closed");
        }
        Ok(())
    }
}
