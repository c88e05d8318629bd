// SPDX-License-Identifier: MPL-2.0

//! Replay transport
//!
//! Feeds the pipeline from a recorded file or any other reader. Used by
//! `--replay` and by tests.

use super::{Transport, TransportKind};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use tracing::{debug, info};

enum Source {
    File(PathBuf),
    Reader(Option<Box<dyn Read + Send>>),
}

pub struct ReplayTransport {
    source: Source,
    reader: Option<Box<dyn Read + Send>>,
    bytes_read: u64,
}

impl ReplayTransport {
    /// Replay a file, opened on connect
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
            reader: None,
            bytes_read: 0,
        }
    }

    /// Replay an arbitrary reader
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            source: Source::Reader(Some(Box::new(reader))),
            reader: None,
            bytes_read: 0,
        }
    }

    /// Bytes handed out so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl Transport for ReplayTransport {
    // A replayed stream has no datagram boundaries
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    fn describe(&self) -> String {
        match &self.source {
            Source::File(path) => format!("file://{}", path.display()),
            Source::Reader(_) => "replay://reader".to_string(),
        }
    }

    fn connect(&mut self) -> io::Result<()> {
        let reader: Box<dyn Read + Send> = match &mut self.source {
            Source::File(path) => {
                let file = File::open(&*path)?;
                info!(path = %path.display(), "Replaying recorded stream");
                Box::new(BufReader::new(file))
            }
            Source::Reader(reader) => reader
                .take()
                .ok_or_else(|| io::Error::other("replay reader already consumed"))?,
        };
        self.reader = Some(reader);
        self.bytes_read = 0;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "replay not connected"))?;
        let n = reader.read(buf)?;
        self.bytes_read += n as u64;
        Ok(n)
    }

    fn close(&mut self) -> io::Result<()> {
        if self.reader.take().is_some() {
            debug!(bytes = self.bytes_read, "Replay closed");
        }
        Ok(())
    }
}
