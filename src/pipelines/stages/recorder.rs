// SPDX-License-Identifier: GPL-3.0-only

//! Recording tap stage
//!
//! Writes every decoded picture to a file in the raw frame format, so a
//! recording can be fed back through the replay transport.

use crate::constants::recording::FILE_EXTENSION;
use crate::errors::{StageError, StageResult};
use crate::media::decoders::write_frame;
use crate::pipelines::context::{PictureRef, PipelineContext};
use crate::pipelines::stage::{IoData, Stage, StageKind, StageState};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where the recorder writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingTarget {
    /// A timestamped file inside this directory
    Directory(PathBuf),
    /// Exactly this file
    File(PathBuf),
}

impl RecordingTarget {
    fn resolve(&self) -> std::io::Result<PathBuf> {
        match self {
            RecordingTarget::Directory(dir) => {
                std::fs::create_dir_all(dir)?;
                let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
                Ok(dir.join(format!("video_{}.{}", timestamp, FILE_EXTENSION)))
            }
            RecordingTarget::File(path) => Ok(path.clone()),
        }
    }
}

pub struct RecorderTap {
    target: RecordingTarget,
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
    frames_written: u64,
    state: StageState,
}

impl RecorderTap {
    pub fn new(target: RecordingTarget) -> Self {
        Self {
            target,
            path: None,
            writer: None,
            frames_written: 0,
            state: StageState::Constructed,
        }
    }

    /// File being written, once opened
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl Stage for RecorderTap {
    fn kind(&self) -> StageKind {
        StageKind::RecordingTap
    }

    fn open(&mut self, _ctx: &mut PipelineContext) -> StageResult<()> {
        let opened = self
            .target
            .resolve()
            .and_then(|path| File::create(&path).map(|file| (path, file)));
        let (path, file) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                self.state = StageState::Failed;
                return Err(StageError::Recording(format!(
                    "cannot create recording for {:?}: {}",
                    self.target, e
                )));
            }
        };

        info!(path = %path.display(), "Recording started");
        self.writer = Some(BufWriter::new(file));
        self.path = Some(path);
        self.frames_written = 0;
        self.state = StageState::Open;
        Ok(())
    }

    fn process(&mut self, ctx: &mut PipelineContext, input: IoData) -> StageResult<IoData> {
        if input.picture_ref() != Some(PictureRef::Decoded) {
            return Ok(input);
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| StageError::InvalidState("recorder is not open".into()))?;
        write_frame(writer, ctx.frames().decoded())
            .map_err(|e| StageError::Recording(e.to_string()))?;
        self.frames_written += 1;
        Ok(input)
    }

    fn close(&mut self, _ctx: &mut PipelineContext) -> StageResult<()> {
        self.state = StageState::Closed;
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer
            .flush()
            .map_err(|e| StageError::Recording(format!("flush failed: {}", e)))?;
        debug!(frames = self.frames_written, "Recording closed");
        if let Some(path) = &self.path {
            info!(path = %path.display(), frames = self.frames_written, "Recording saved");
        }
        Ok(())
    }

    fn state(&self) -> StageState {
        self.state
    }
}
