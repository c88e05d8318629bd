// SPDX-License-Identifier: GPL-3.0-only

//! Raw planar frame format
//!
//! Each frame is a 12-byte little-endian header followed by tightly packed
//! I420 planes:
//!
//! ```text
//! "VSF0" | width: u16 | height: u16 | payload_len: u32 | Y | U | V
//! ```
//!
//! Frames may arrive split across several reads (stream transports) or one
//! per datagram; the decoder reassembles them either way.

use super::FrameDecoder;
use crate::errors::{StageError, StageResult};
use crate::media::picture::{Geometry, PictureDescriptor, PixelFormat};
use std::io::Write;
use tracing::{debug, warn};

/// Frame header magic
pub const FRAME_MAGIC: [u8; 4] = *b"VSF0";

/// Header length in bytes
pub const FRAME_HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameHeader {
    geometry: Geometry,
    payload_len: usize,
}

impl FrameHeader {
    fn parse(bytes: &[u8]) -> StageResult<Self> {
        if bytes[0..4] != FRAME_MAGIC {
            return Err(StageError::Decode(format!(
                "bad frame magic {:02x?}",
                &bytes[0..4]
            )));
        }
        let width = u16::from_le_bytes([bytes[4], bytes[5]]) as u32;
        let height = u16::from_le_bytes([bytes[6], bytes[7]]) as u32;
        let payload_len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;

        let geometry = Geometry::new(width, height);
        let expected = i420_payload_len(geometry);
        if payload_len != expected {
            return Err(StageError::Decode(format!(
                "payload length {} does not match {} I420 ({} bytes)",
                payload_len, geometry, expected
            )));
        }

        Ok(Self {
            geometry,
            payload_len,
        })
    }

    fn frame_len(&self) -> usize {
        FRAME_HEADER_LEN + self.payload_len
    }
}

fn i420_payload_len(geometry: Geometry) -> usize {
    geometry.pixel_count() * 3 / 2
}

/// Decoder for the raw planar frame format
#[derive(Debug, Default)]
pub struct RawFrameDecoder {
    /// Configured geometry, set on open
    geometry: Option<Geometry>,
    /// Reassembly buffer
    pending: Vec<u8>,
    /// Header of the frame at the front of `pending`, once known
    current: Option<FrameHeader>,
    /// Bytes of a rejected frame still to be discarded from the stream
    skip_remaining: usize,
    frames_decoded: u64,
}

impl RawFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames decoded since open
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    fn discard_input(&mut self, data: &[u8]) -> usize {
        let n = self.skip_remaining.min(data.len());
        self.skip_remaining -= n;
        n
    }
}

impl FrameDecoder for RawFrameDecoder {
    fn name(&self) -> &str {
        "raw-i420"
    }

    fn open(&mut self, geometry: Geometry) -> StageResult<()> {
        if geometry.width > u16::MAX as u32 || geometry.height > u16::MAX as u32 {
            return Err(StageError::Decode(format!(
                "geometry {} exceeds the raw frame header range",
                geometry
            )));
        }
        self.geometry = Some(geometry);
        self.pending = Vec::with_capacity(FRAME_HEADER_LEN + i420_payload_len(geometry));
        self.current = None;
        self.skip_remaining = 0;
        self.frames_decoded = 0;
        debug!(%geometry, "Raw frame decoder opened");
        Ok(())
    }

    fn feed(&mut self, data: &[u8]) -> StageResult<Option<Geometry>> {
        let configured = self.geometry.ok_or_else(|| {
            StageError::InvalidState("raw frame decoder used before open".into())
        })?;

        let skipped = self.discard_input(data);
        self.pending.extend_from_slice(&data[skipped..]);

        if self.current.is_none() {
            if self.pending.len() < FRAME_HEADER_LEN {
                return Ok(None);
            }
            match FrameHeader::parse(&self.pending[..FRAME_HEADER_LEN]) {
                Ok(header) => self.current = Some(header),
                Err(e) => {
                    // No way to resynchronise inside a corrupt frame
                    warn!(error = %e, dropped = self.pending.len(), "Dropping corrupt frame data");
                    self.pending.clear();
                    return Err(e);
                }
            }
        }

        match self.current {
            Some(header) if header.geometry != configured => Ok(Some(header.geometry)),
            Some(header) if self.pending.len() >= header.frame_len() => Ok(Some(header.geometry)),
            _ => Ok(None),
        }
    }

    fn has_buffered_frame(&self) -> bool {
        let Some(configured) = self.geometry else {
            return false;
        };
        let header = match self.current {
            Some(header) => header,
            None if self.pending.len() < FRAME_HEADER_LEN => return false,
            None => match FrameHeader::parse(&self.pending[..FRAME_HEADER_LEN]) {
                Ok(header) => header,
                // The next feed reports the corrupt header
                Err(_) => return true,
            },
        };
        header.geometry != configured || self.pending.len() >= header.frame_len()
    }

    fn decode_into(&mut self, picture: &mut PictureDescriptor) -> StageResult<()> {
        let header = self
            .current
            .ok_or_else(|| StageError::InvalidState("no frame ready to decode".into()))?;

        if picture.format() != PixelFormat::I420 {
            return Err(StageError::Decode(format!(
                "cannot decode into {} picture",
                picture.format()
            )));
        }
        if header.geometry != picture.geometry() {
            return Err(StageError::GeometryMismatch {
                expected: picture.geometry(),
                actual: header.geometry,
            });
        }
        if self.pending.len() < header.frame_len() {
            return Err(StageError::InvalidState("frame is incomplete".into()));
        }

        let mut offset = FRAME_HEADER_LEN;
        let (y, u, v) = picture
            .yuv_planes_mut()
            .ok_or_else(|| StageError::Decode("picture has no YUV planes".into()))?;
        for plane in [y, u, v] {
            let row_bytes = plane.row_bytes();
            for row in 0..plane.rows() {
                plane
                    .row_mut(row)
                    .copy_from_slice(&self.pending[offset..offset + row_bytes]);
                offset += row_bytes;
            }
        }

        self.pending.drain(..header.frame_len());
        self.current = None;
        self.frames_decoded += 1;
        Ok(())
    }

    fn skip_frame(&mut self) {
        let Some(header) = self.current.take() else {
            return;
        };
        let buffered = self.pending.len().min(header.frame_len());
        self.pending.drain(..buffered);
        self.skip_remaining = header.frame_len() - buffered;
        debug!(
            geometry = %header.geometry,
            skip_remaining = self.skip_remaining,
            "Skipping frame"
        );
    }

    fn close(&mut self) {
        self.pending = Vec::new();
        self.current = None;
        self.skip_remaining = 0;
        self.geometry = None;
    }
}

/// Write one I420 picture in the raw frame format
pub fn write_frame<W: Write>(writer: &mut W, picture: &PictureDescriptor) -> std::io::Result<()> {
    if picture.format() != PixelFormat::I420 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("raw frames carry I420, got {}", picture.format()),
        ));
    }
    let geometry = picture.geometry();
    let width = u16::try_from(geometry.width)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "width too large"))?;
    let height = u16::try_from(geometry.height)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "height too large"))?;
    let payload_len = i420_payload_len(geometry) as u32;

    writer.write_all(&FRAME_MAGIC)?;
    writer.write_all(&width.to_le_bytes())?;
    writer.write_all(&height.to_le_bytes())?;
    writer.write_all(&payload_len.to_le_bytes())?;

    for plane in picture.planes() {
        for row in 0..plane.rows() {
            writer.write_all(plane.row(row))?;
        }
    }
    Ok(())
}

/// Encode one I420 picture in the raw frame format
pub fn encode_frame(picture: &PictureDescriptor) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + picture.byte_len());
    write_frame(&mut out, picture)?;
    Ok(out)
}
