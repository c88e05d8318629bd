// SPDX-License-Identifier: MPL-2.0

//! Frame consumers reached through the delivery sink
//!
//! The delivery sink owns its consumer behind a mutex. `update` is called
//! with the lock held, so a consumer sees each finished frame exactly once
//! and readers going through a delivery handle never see a frame half
//! written.

use crate::constants::timing::FRAME_LOG_INTERVAL;
use crate::errors::{StageError, StageResult};
use crate::media::picture::{PictureDescriptor, PixelFormat};
use std::time::Instant;
use tracing::{debug, info};

/// External consumer of finished frames
pub trait FrameConsumer: Send {
    /// One-time handshake when the sink opens
    fn init(&mut self) -> StageResult<()>;

    /// Take the next finished frame
    ///
    /// The frame is only borrowed; copy what must outlive the call.
    fn update(&mut self, frame: &PictureDescriptor) -> StageResult<()>;

    /// Called once when the sink closes
    fn close(&mut self) -> StageResult<()>;
}

/// Consumer that logs delivery statistics
#[derive(Debug, Default)]
pub struct FrameStatsConsumer {
    frames: u64,
    started: Option<Instant>,
    last_mean_luma: Option<f64>,
    closed: bool,
}

impl FrameStatsConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames received
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Average delivery rate since the first frame
    pub fn fps(&self) -> f64 {
        match self.started {
            Some(started) if self.frames > 1 => {
                let elapsed = started.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    (self.frames - 1) as f64 / elapsed
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    /// Mean luma of the last frame (0-255)
    pub fn last_mean_luma(&self) -> Option<f64> {
        self.last_mean_luma
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FrameConsumer for FrameStatsConsumer {
    fn init(&mut self) -> StageResult<()> {
        self.frames = 0;
        self.started = None;
        self.last_mean_luma = None;
        self.closed = false;
        debug!("Frame statistics consumer initialised");
        Ok(())
    }

    fn update(&mut self, frame: &PictureDescriptor) -> StageResult<()> {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        self.frames += 1;
        self.last_mean_luma = Some(mean_luma(frame)?);

        if self.frames % FRAME_LOG_INTERVAL == 0 {
            info!(
                frames = self.frames,
                fps = format!("{:.1}", self.fps()),
                luma = format!("{:.1}", self.last_mean_luma.unwrap_or_default()),
                size = %frame.geometry(),
                "Frame statistics"
            );
        }
        Ok(())
    }

    fn close(&mut self) -> StageResult<()> {
        self.closed = true;
        info!(frames = self.frames, fps = format!("{:.1}", self.fps()), "Frame delivery finished");
        Ok(())
    }
}

/// Consumer that keeps a copy of the most recent frame
///
/// Other threads read it through the sink's delivery handle.
#[derive(Debug, Default)]
pub struct LatestFrameConsumer {
    latest: Option<PictureDescriptor>,
    sequence: u64,
    initialized: bool,
    closed: bool,
}

impl LatestFrameConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last delivered frame
    pub fn latest(&self) -> Option<&PictureDescriptor> {
        self.latest.as_ref()
    }

    /// Number of frames delivered so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FrameConsumer for LatestFrameConsumer {
    fn init(&mut self) -> StageResult<()> {
        self.initialized = true;
        Ok(())
    }

    fn update(&mut self, frame: &PictureDescriptor) -> StageResult<()> {
        if !self.initialized || self.closed {
            return Err(StageError::Consumer(
                "frame delivered outside init/close".into(),
            ));
        }
        match &mut self.latest {
            // Reuse the copy's buffers once allocated
            Some(latest)
                if latest.format() == frame.format() && latest.geometry() == frame.geometry() =>
            {
                for (dst, src) in latest.planes_mut().iter_mut().zip(frame.planes()) {
                    dst.data_mut().copy_from_slice(src.data());
                }
            }
            slot => *slot = Some(frame.clone()),
        }
        self.sequence += 1;
        Ok(())
    }

    fn close(&mut self) -> StageResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// Average luma of a packed RGB picture, or of the Y plane for I420
pub fn mean_luma(frame: &PictureDescriptor) -> StageResult<f64> {
    let pixels = frame.geometry().pixel_count();
    if pixels == 0 {
        return Ok(0.0);
    }

    let total: u64 = match frame.format() {
        PixelFormat::I420 => {
            let luma = frame.luma();
            (0..luma.rows())
                .flat_map(|y| luma.row(y).iter())
                .map(|&v| v as u64)
                .sum()
        }
        format => {
            let bpp = format.packed_bytes_per_pixel().ok_or_else(|| {
                StageError::Consumer(format!("cannot measure {} picture", format))
            })?;
            let (r, b) = if format == PixelFormat::BGRA { (2, 0) } else { (0, 2) };
            let plane = frame.plane(0);
            (0..plane.rows())
                .flat_map(|y| plane.row(y).chunks_exact(bpp))
                .map(|px| (77 * px[r] as u64 + 150 * px[1] as u64 + 29 * px[b] as u64) >> 8)
                .sum()
        }
    };
    Ok(total as f64 / pixels as f64)
}
