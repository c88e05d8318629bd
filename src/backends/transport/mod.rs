// SPDX-License-Identifier: MPL-2.0

//! Byte transports feeding the input source stage
//!
//! A transport connects to the video endpoint and hands back raw byte chunks.
//! The engine does not interpret them; the decode filter does.
//!
//! Reads may block. A transport bounds that wait with its read timeout, and
//! may additionally expose a [`Canceller`] that makes a pending read return
//! early when shutdown is requested.

mod replay;
mod tcp;
mod udp;

pub use replay::ReplayTransport;
pub use tcp::TcpTransport;
pub use udp::UdpTransport;

use crate::config::TransportSettings;
use serde::{Deserialize, Serialize};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

/// Closure that unblocks a pending read
pub type Canceller = Box<dyn Fn() + Send + Sync>;

/// Transport kind selected in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// UDP, one datagram per read
    #[default]
    Datagram,
    /// TCP byte stream
    Stream,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Datagram => write!(f, "datagram"),
            TransportKind::Stream => write!(f, "stream"),
        }
    }
}

/// Source of raw bytes for the pipeline
pub trait Transport: Send {
    /// Kind of transport
    fn kind(&self) -> TransportKind;

    /// Human-readable endpoint description for logs
    fn describe(&self) -> String;

    /// Connect to the endpoint
    fn connect(&mut self) -> io::Result<()>;

    /// Read the next chunk into `buf`
    ///
    /// `Ok(0)` means end of stream, so datagram transports skip empty
    /// datagrams. A read timeout is reported as an error of kind
    /// `WouldBlock` or `TimedOut`, a cancelled read as `Interrupted`.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Closure that unblocks a pending read, if the transport supports one
    fn canceller(&self) -> Option<Canceller> {
        None
    }

    /// Disconnect; must tolerate repeated calls
    fn close(&mut self) -> io::Result<()>;
}

/// Check whether a read error only means "no data yet"
pub fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

/// Create the network transport described by the settings
pub fn from_settings(settings: &TransportSettings) -> Box<dyn Transport> {
    match settings.kind {
        TransportKind::Datagram => Box::new(UdpTransport::new(
            settings.endpoint.clone(),
            settings.read_timeout(),
        )),
        TransportKind::Stream => Box::new(TcpTransport::new(
            settings.endpoint.clone(),
            settings.read_timeout(),
        )),
    }
}

/// Resolve an endpoint string to its first socket address
pub(crate) fn resolve(endpoint: &str) -> io::Result<SocketAddr> {
    endpoint.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("endpoint '{}' did not resolve", endpoint),
        )
    })
}
