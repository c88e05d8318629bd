// SPDX-License-Identifier: GPL-3.0-only

//! Stage contract and the data parcel passed between stages

use super::context::{PictureRef, PipelineContext};
use crate::errors::StageResult;
use crate::media::picture::{Geometry, PixelFormat};

/// Role of a stage in the pipeline topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Pulls bytes from a transport
    InputSource,
    /// Turns received bytes into the decoded picture
    DecodeFilter,
    /// Writes decoded pictures to a file and passes them through
    RecordingTap,
    /// Converts the decoded picture to the output pixel format
    ColorspaceFilter,
    /// Hands the finished picture to the external consumer
    DeliverySink,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::InputSource => "input-source",
            StageKind::DecodeFilter => "decode-filter",
            StageKind::RecordingTap => "recording-tap",
            StageKind::ColorspaceFilter => "colorspace-filter",
            StageKind::DeliverySink => "delivery-sink",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state reported by a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageState {
    #[default]
    Constructed,
    Open,
    Closed,
    /// Open failed; the stage released whatever it had acquired
    Failed,
}

/// Status tag carried by [`IoData`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoStatus {
    /// A frame is moving through the pipeline
    #[default]
    Processing,
    /// Nothing to hand on this iteration, but the stream is alive
    StillRunning,
    /// The source has no more data
    EndOfStream,
    /// A stage reported a failure through the status tag
    Error,
}

impl IoStatus {
    /// Whether the run loop may start another iteration after this status
    pub fn is_continuation(&self) -> bool {
        matches!(self, IoStatus::Processing | IoStatus::StillRunning)
    }
}

/// A buffer handle passed between adjacent stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoBuffer {
    /// Bytes as received from the transport
    Encoded(Vec<u8>),
    /// One of the pictures held by the pipeline context
    Picture(PictureRef),
}

/// Data parcel passed from one stage to the next during one iteration
///
/// A stage owns the parcel only for the duration of its `process` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoData {
    pub status: IoStatus,
    pub buffers: Vec<IoBuffer>,
}

impl IoData {
    /// The empty parcel fed to the first stage
    pub fn initial() -> Self {
        Self::default()
    }

    /// An empty parcel with the given status
    pub fn with_status(status: IoStatus) -> Self {
        Self {
            status,
            buffers: Vec::new(),
        }
    }

    /// A parcel carrying one picture handle
    pub fn picture(picture: PictureRef) -> Self {
        Self {
            status: IoStatus::Processing,
            buffers: vec![IoBuffer::Picture(picture)],
        }
    }

    /// A parcel carrying received bytes
    pub fn encoded(bytes: Vec<u8>) -> Self {
        Self {
            status: IoStatus::Processing,
            buffers: vec![IoBuffer::Encoded(bytes)],
        }
    }

    /// Encoded byte buffers in this parcel
    pub fn encoded_buffers(&self) -> impl Iterator<Item = &[u8]> {
        self.buffers.iter().filter_map(|b| match b {
            IoBuffer::Encoded(bytes) => Some(bytes.as_slice()),
            IoBuffer::Picture(_) => None,
        })
    }

    /// First picture handle in this parcel
    pub fn picture_ref(&self) -> Option<PictureRef> {
        self.buffers.iter().find_map(|b| match b {
            IoBuffer::Picture(picture) => Some(*picture),
            IoBuffer::Encoded(_) => None,
        })
    }

    pub fn has_picture(&self) -> bool {
        self.picture_ref().is_some()
    }
}

/// A pipeline stage
///
/// The runner calls `open` once before any `process`, then `process` once
/// per iteration, then `close` once during draining if `open` succeeded.
/// `close` must tolerate being called again on a closed stage.
pub trait Stage: Send {
    /// Role of this stage
    fn kind(&self) -> StageKind;

    /// Name used in logs and errors
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Acquire resources
    fn open(&mut self, ctx: &mut PipelineContext) -> StageResult<()>;

    /// Handle one parcel and produce the parcel for the next stage
    fn process(&mut self, ctx: &mut PipelineContext, input: IoData) -> StageResult<IoData>;

    /// Release resources acquired in `open`
    fn close(&mut self, ctx: &mut PipelineContext) -> StageResult<()>;

    /// Current lifecycle state
    fn state(&self) -> StageState;

    /// Picture geometry this stage is configured for, if it cares
    fn geometry(&self) -> Option<Geometry> {
        None
    }

    /// Pixel format this stage produces, if it converts pictures
    fn output_format(&self) -> Option<PixelFormat> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_statuses() {
        assert!(IoStatus::Processing.is_continuation());
        assert!(IoStatus::StillRunning.is_continuation());
        assert!(!IoStatus::EndOfStream.is_continuation());
        assert!(!IoStatus::Error.is_continuation());
    }

    #[test]
    fn test_parcel_accessors() {
        let mut data = IoData::encoded(vec![1, 2, 3]);
        assert!(!data.has_picture());
        assert_eq!(data.encoded_buffers().next(), Some(&[1u8, 2, 3][..]));

        data.buffers.push(IoBuffer::Picture(PictureRef::Decoded));
        assert_eq!(data.picture_ref(), Some(PictureRef::Decoded));

        let initial = IoData::initial();
        assert_eq!(initial.status, IoStatus::Processing);
        assert!(initial.buffers.is_empty());
    }
}
