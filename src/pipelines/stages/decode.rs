// SPDX-License-Identifier: GPL-3.0-only

//! Decode filter stage

use crate::errors::{StageError, StageResult};
use crate::media::decoders::{FrameDecoder, RawFrameDecoder};
use crate::media::picture::Geometry;
use crate::pipelines::context::{PictureRef, PipelineContext};
use crate::pipelines::stage::{IoData, IoStatus, Stage, StageKind, StageState};
use tracing::{debug, warn};

/// Feeds received bytes to a decoder and writes complete frames into the
/// decoded picture
pub struct DecodeFilter<D: FrameDecoder = RawFrameDecoder> {
    decoder: D,
    geometry: Geometry,
    state: StageState,
    frames: u64,
}

impl<D: FrameDecoder> DecodeFilter<D> {
    pub fn new(decoder: D, geometry: Geometry) -> Self {
        Self {
            decoder,
            geometry,
            state: StageState::Constructed,
            frames: 0,
        }
    }

    /// Frames decoded since open
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl<D: FrameDecoder> Stage for DecodeFilter<D> {
    fn kind(&self) -> StageKind {
        StageKind::DecodeFilter
    }

    fn open(&mut self, ctx: &mut PipelineContext) -> StageResult<()> {
        let allocated = ctx.frames().decoded().geometry();
        if allocated != self.geometry {
            self.state = StageState::Failed;
            return Err(StageError::GeometryMismatch {
                expected: allocated,
                actual: self.geometry,
            });
        }
        if let Err(e) = self.decoder.open(self.geometry) {
            self.state = StageState::Failed;
            self.decoder.close();
            return Err(e);
        }
        self.frames = 0;
        ctx.set_frames_buffered(false);
        self.state = StageState::Open;
        debug!(decoder = self.decoder.name(), geometry = %self.geometry, "Decode filter opened");
        Ok(())
    }

    fn process(&mut self, ctx: &mut PipelineContext, input: IoData) -> StageResult<IoData> {
        if self.state != StageState::Open {
            return Err(StageError::InvalidState("decode filter is not open".into()));
        }

        let mut ready = None;
        let mut fed = false;
        for chunk in input.encoded_buffers() {
            ready = self.decoder.feed(chunk)?;
            fed = true;
        }
        if !fed {
            // The source skipped its read to let buffered frames drain
            let buffered = self.decoder.has_buffered_frame();
            if input.status != IoStatus::Processing || !buffered {
                ctx.set_frames_buffered(buffered);
                return Ok(input);
            }
            ready = self.decoder.feed(&[])?;
        }

        let output = match ready {
            None => Ok(IoData::with_status(IoStatus::StillRunning)),
            Some(actual) if actual != self.geometry => {
                warn!(expected = %self.geometry, actual = %actual, "Frame geometry mismatch");
                self.decoder.skip_frame();
                Err(StageError::GeometryMismatch {
                    expected: self.geometry,
                    actual,
                })
            }
            Some(_) => {
                self.decoder.decode_into(ctx.frames_mut().decoded_mut())?;
                self.frames += 1;
                Ok(IoData::picture(PictureRef::Decoded))
            }
        };
        ctx.set_frames_buffered(self.decoder.has_buffered_frame());
        output
    }

    fn close(&mut self, ctx: &mut PipelineContext) -> StageResult<()> {
        if self.state != StageState::Closed {
            self.decoder.close();
            ctx.set_frames_buffered(false);
            self.state = StageState::Closed;
            debug!(frames = self.frames, "Decode filter closed");
        }
        Ok(())
    }

    fn state(&self) -> StageState {
        self.state
    }

    fn geometry(&self) -> Option<Geometry> {
        Some(self.geometry)
    }
}
