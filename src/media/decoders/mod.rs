// SPDX-License-Identifier: GPL-3.0-only

//! Frame decoders used by the decode filter
//!
//! A decoder turns the byte chunks delivered by the transport into pictures.
//! It owns whatever reassembly state it needs; the decode filter only asks
//! whether a frame is ready and then lets the decoder write it in place.

mod raw;

pub use raw::{FRAME_HEADER_LEN, FRAME_MAGIC, RawFrameDecoder, encode_frame, write_frame};

use crate::errors::StageResult;
use crate::media::picture::{Geometry, PictureDescriptor};

/// Decoder contract used by the decode filter
pub trait FrameDecoder: Send {
    /// Short name for logging
    fn name(&self) -> &str;

    /// Prepare for frames of the configured geometry
    fn open(&mut self, geometry: Geometry) -> StageResult<()>;

    /// Feed received bytes (possibly empty, to re-check buffered data)
    ///
    /// Returns the geometry of the next frame once the decoder can either
    /// decode it or knows it must be rejected. A frame whose geometry differs
    /// from the configured one is reported as soon as its header is known.
    fn feed(&mut self, data: &[u8]) -> StageResult<Option<Geometry>>;

    /// True when buffered bytes already decide the next frame
    ///
    /// A decoder reporting true must return `Some` from `feed(&[])`, or an
    /// error for corrupt data, without needing more input.
    fn has_buffered_frame(&self) -> bool;

    /// Decode the frame reported by [`FrameDecoder::feed`] into `picture`
    fn decode_into(&mut self, picture: &mut PictureDescriptor) -> StageResult<()>;

    /// Drop the frame reported by [`FrameDecoder::feed`] without decoding it
    fn skip_frame(&mut self);

    /// Release buffers; must tolerate repeated calls
    fn close(&mut self);
}
