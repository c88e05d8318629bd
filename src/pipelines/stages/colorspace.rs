// SPDX-License-Identifier: GPL-3.0-only

//! Colorspace filter stage

use crate::errors::{StageError, StageResult};
use crate::media::picture::PixelFormat;
use crate::media::yuv_convert::convert_i420;
use crate::pipelines::context::{PictureRef, PipelineContext};
use crate::pipelines::stage::{IoData, Stage, StageKind, StageState};
use tracing::debug;

/// Converts the decoded I420 picture into the output format
pub struct ColorspaceFilter {
    format: PixelFormat,
    state: StageState,
}

impl ColorspaceFilter {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            state: StageState::Constructed,
        }
    }
}

impl Stage for ColorspaceFilter {
    fn kind(&self) -> StageKind {
        StageKind::ColorspaceFilter
    }

    fn open(&mut self, ctx: &mut PipelineContext) -> StageResult<()> {
        let allocated = ctx.frames().converted().format();
        if self.format.is_planar_yuv() || allocated != self.format {
            self.state = StageState::Failed;
            return Err(StageError::Conversion(format!(
                "cannot convert to {} (output picture is {})",
                self.format, allocated
            )));
        }
        self.state = StageState::Open;
        debug!(format = %self.format, "Colorspace filter opened");
        Ok(())
    }

    fn process(&mut self, ctx: &mut PipelineContext, input: IoData) -> StageResult<IoData> {
        if input.picture_ref() != Some(PictureRef::Decoded) {
            return Ok(input);
        }
        let (decoded, converted) = ctx.frames_mut().conversion_pair();
        convert_i420(decoded, converted)?;
        Ok(IoData::picture(PictureRef::Converted))
    }

    fn close(&mut self, _ctx: &mut PipelineContext) -> StageResult<()> {
        self.state = StageState::Closed;
        Ok(())
    }

    fn state(&self) -> StageState {
        self.state
    }

    fn output_format(&self) -> Option<PixelFormat> {
        Some(self.format)
    }
}
