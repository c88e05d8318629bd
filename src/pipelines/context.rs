// SPDX-License-Identifier: GPL-3.0-only

//! Per-pipeline context passed into every stage call
//!
//! Holds the pictures allocated when the pipeline opens and the shutdown
//! coordinator. Nothing here is shared with other threads except the
//! coordinator, which is internally synchronised.

use super::shutdown::ShutdownCoordinator;
use crate::errors::PipelineResult;
use crate::media::picture::{Framerate, Geometry, PictureDescriptor, PixelFormat};

/// Names one of the pictures in the [`FrameStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PictureRef {
    /// The I420 picture written by the decode filter
    Decoded,
    /// The packed picture written by the colorspace filter
    Converted,
}

/// Pictures allocated once at opening and reused for every frame
#[derive(Debug)]
pub struct FrameStore {
    decoded: PictureDescriptor,
    converted: PictureDescriptor,
}

impl FrameStore {
    /// Allocate the decoded I420 picture and the converted output picture
    pub fn allocate(
        geometry: Geometry,
        framerate: Framerate,
        output_format: PixelFormat,
    ) -> PipelineResult<Self> {
        Ok(Self {
            decoded: PictureDescriptor::allocate(PixelFormat::I420, geometry, framerate)?,
            converted: PictureDescriptor::allocate(output_format, geometry, framerate)?,
        })
    }

    pub fn decoded(&self) -> &PictureDescriptor {
        &self.decoded
    }

    pub fn decoded_mut(&mut self) -> &mut PictureDescriptor {
        &mut self.decoded
    }

    pub fn converted(&self) -> &PictureDescriptor {
        &self.converted
    }

    pub fn converted_mut(&mut self) -> &mut PictureDescriptor {
        &mut self.converted
    }

    /// Look up a picture by handle
    pub fn get(&self, picture: PictureRef) -> &PictureDescriptor {
        match picture {
            PictureRef::Decoded => &self.decoded,
            PictureRef::Converted => &self.converted,
        }
    }

    /// Borrow the decoded picture for reading and the converted one for writing
    pub fn conversion_pair(&mut self) -> (&PictureDescriptor, &mut PictureDescriptor) {
        (&self.decoded, &mut self.converted)
    }
}

/// Context handed to stages by the runner
#[derive(Debug)]
pub struct PipelineContext {
    frames: FrameStore,
    shutdown: ShutdownCoordinator,
    sequence: u64,
    frames_buffered: bool,
}

impl PipelineContext {
    pub fn new(frames: FrameStore, shutdown: ShutdownCoordinator) -> Self {
        Self {
            frames,
            shutdown,
            sequence: 0,
            frames_buffered: false,
        }
    }

    pub fn frames(&self) -> &FrameStore {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut FrameStore {
        &mut self.frames
    }

    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Index of the current iteration
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// True while the decoder holds a complete frame it has not emitted yet
    ///
    /// The input source skips its read while this is set, so buffered frames
    /// drain one per iteration before more bytes are pulled in.
    pub fn frames_buffered(&self) -> bool {
        self.frames_buffered
    }

    pub fn set_frames_buffered(&mut self, buffered: bool) {
        self.frames_buffered = buffered;
    }

    pub(crate) fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }
}
