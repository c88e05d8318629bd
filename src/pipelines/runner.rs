// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline runner
//!
//! Drives a [`PipelineDefinition`] through its lifecycle:
//!
//! ```text
//! Constructed -> Opening -> Running -> Draining -> Closed
//!                   \___________________/
//!                      (open failure)
//! ```
//!
//! Every stage is opened in order before the first iteration. Each iteration
//! pushes one parcel through the chain, left to right. Any stage failure, a
//! terminal status, a shutdown request or the frame limit moves the runner to
//! draining, which closes every opened stage in construction order. A
//! shutdown requested before the run starts goes straight to closed without
//! opening anything.

use super::context::{FrameStore, PipelineContext};
use super::definition::PipelineDefinition;
use super::shutdown::ShutdownCoordinator;
use super::stage::{IoData, IoStatus, Stage};
use crate::errors::{PipelineError, PipelineResult};
use crate::media::picture::{Framerate, Geometry, PixelFormat};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Runner lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunnerState {
    Constructed = 0,
    Opening = 1,
    Running = 2,
    Draining = 3,
    Closed = 4,
}

impl RunnerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunnerState::Constructed,
            1 => RunnerState::Opening,
            2 => RunnerState::Running,
            3 => RunnerState::Draining,
            _ => RunnerState::Closed,
        }
    }
}

/// Runner state shared with the owning handle
#[derive(Debug, Clone)]
struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(RunnerState::Constructed as u8)))
    }

    fn get(&self) -> RunnerState {
        RunnerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: RunnerState) {
        let previous = RunnerState::from_u8(self.0.swap(state as u8, Ordering::SeqCst));
        debug!(from = ?previous, to = ?state, "Runner state transition");
    }
}

/// Why the runner left the running state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source reported end of stream
    EndOfStream,
    /// The shutdown flag was set
    ShutdownRequested,
    /// The configured number of frames was delivered
    FrameLimit,
    /// A stage returned the `Error` status
    ErrorStatus,
    /// A stage's `process` failed
    ProcessFailed,
    /// A stage's `open` failed; the runner never ran
    OpenFailed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            StopReason::EndOfStream => "end of stream",
            StopReason::ShutdownRequested => "shutdown requested",
            StopReason::FrameLimit => "frame limit reached",
            StopReason::ErrorStatus => "stage reported error status",
            StopReason::ProcessFailed => "stage failed",
            StopReason::OpenFailed => "open failed",
        };
        f.write_str(text)
    }
}

/// Outcome of a complete run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stop_reason: StopReason,
    /// Iterations started in the running state
    pub iterations: u64,
    /// Iterations that delivered a picture through the last stage
    pub frames_delivered: u64,
    /// First open or process failure
    pub error: Option<PipelineError>,
    /// Close failures collected while draining
    pub close_errors: Vec<PipelineError>,
}

impl RunReport {
    /// True when the run ended without an open or process failure
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.stop_reason != StopReason::ErrorStatus
    }
}

/// Owns the stages and drives them on a single thread
pub struct PipelineRunner {
    stages: Vec<Box<dyn Stage>>,
    geometry: Geometry,
    framerate: Framerate,
    output_format: PixelFormat,
    shutdown: ShutdownCoordinator,
    max_frames: Option<u64>,
    state: StateCell,
}

impl PipelineRunner {
    pub fn new(definition: PipelineDefinition, shutdown: ShutdownCoordinator) -> Self {
        let geometry = definition.geometry();
        let framerate = definition.framerate();
        let output_format = definition.output_format();
        Self {
            stages: definition.into_stages(),
            geometry,
            framerate,
            output_format,
            shutdown,
            max_frames: None,
            state: StateCell::new(),
        }
    }

    /// Drain once this many frames have been delivered
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn state(&self) -> RunnerState {
        self.state.get()
    }

    /// Run the pipeline to completion on the calling thread
    pub fn run(mut self) -> RunReport {
        info!(
            stages = self.stages.len(),
            geometry = %self.geometry,
            framerate = %self.framerate,
            output = %self.output_format,
            "Starting pipeline"
        );

        if self.shutdown.is_shutdown_requested() {
            info!("Shutdown requested before opening, nothing to run");
            return self.finish(StopReason::ShutdownRequested, 0, 0, None, Vec::new());
        }

        self.state.set(RunnerState::Opening);
        let frames = match FrameStore::allocate(self.geometry, self.framerate, self.output_format)
        {
            Ok(frames) => frames,
            Err(e) => {
                error!(error = %e, "Failed to allocate pictures");
                self.state.set(RunnerState::Draining);
                return self.finish(StopReason::OpenFailed, 0, 0, Some(e), Vec::new());
            }
        };
        let mut ctx = PipelineContext::new(frames, self.shutdown.clone());

        let (opened, open_error) = self.open_stages(&mut ctx);
        if let Some(e) = open_error {
            self.state.set(RunnerState::Draining);
            let close_errors = self.close_stages(&mut ctx, opened);
            return self.finish(StopReason::OpenFailed, 0, 0, Some(e), close_errors);
        }

        self.state.set(RunnerState::Running);
        let mut iterations = 0u64;
        let mut frames_delivered = 0u64;
        let mut failure = None;

        let stop_reason = loop {
            if self.shutdown.is_shutdown_requested() {
                info!(iterations, "Shutdown flag set, draining");
                break StopReason::ShutdownRequested;
            }

            ctx.set_sequence(iterations);
            iterations += 1;

            let output = match run_iteration(&mut self.stages, &mut ctx) {
                Ok(output) => output,
                Err(e) => {
                    error!(error = %e, frame = iterations, "Iteration failed");
                    failure = Some(e);
                    break StopReason::ProcessFailed;
                }
            };

            if output.status == IoStatus::Processing && output.has_picture() {
                frames_delivered += 1;
            }

            match output.status {
                IoStatus::Processing | IoStatus::StillRunning => {}
                IoStatus::EndOfStream => {
                    info!(iterations, "End of stream");
                    break StopReason::EndOfStream;
                }
                IoStatus::Error => {
                    warn!(iterations, "Stage reported error status");
                    break StopReason::ErrorStatus;
                }
            }

            if let Some(max) = self.max_frames
                && frames_delivered >= max
            {
                info!(frames = frames_delivered, "Frame limit reached");
                break StopReason::FrameLimit;
            }
        };

        self.state.set(RunnerState::Draining);
        let close_errors = self.close_stages(&mut ctx, opened);
        self.finish(stop_reason, iterations, frames_delivered, failure, close_errors)
    }

    /// Run the pipeline on a dedicated thread
    pub fn spawn(self, name: &str) -> std::io::Result<RunnerHandle> {
        let state = self.state.clone();
        let shutdown = self.shutdown.clone();
        let thread_name = name.to_string();

        info!(name = %name, "Spawning pipeline thread");
        let thread = thread::Builder::new()
            .name(thread_name)
            .spawn(move || self.run())?;

        Ok(RunnerHandle {
            thread: Some(thread),
            shutdown,
            state,
            name: name.to_string(),
        })
    }

    /// Open stages in order, stopping at the first failure
    ///
    /// Returns how many stages opened and the failure, if any.
    fn open_stages(&mut self, ctx: &mut PipelineContext) -> (usize, Option<PipelineError>) {
        for (index, stage) in self.stages.iter_mut().enumerate() {
            debug!(stage = %stage.name(), "Opening stage");
            if let Err(source) = stage.open(ctx) {
                let e = PipelineError::OpenFailure {
                    stage: stage.name().to_string(),
                    source,
                };
                error!(error = %e, "Pipeline failed to open");
                return (index, Some(e));
            }
        }
        (self.stages.len(), None)
    }

    /// Close the first `opened` stages in construction order
    fn close_stages(&mut self, ctx: &mut PipelineContext, opened: usize) -> Vec<PipelineError> {
        let mut errors = Vec::new();
        for stage in self.stages.iter_mut().take(opened) {
            debug!(stage = %stage.name(), "Closing stage");
            if let Err(source) = stage.close(ctx) {
                let e = PipelineError::CloseFailure {
                    stage: stage.name().to_string(),
                    source,
                };
                warn!(error = %e, "Stage close failed");
                errors.push(e);
            }
        }
        errors
    }

    fn finish(
        &self,
        stop_reason: StopReason,
        iterations: u64,
        frames_delivered: u64,
        error: Option<PipelineError>,
        close_errors: Vec<PipelineError>,
    ) -> RunReport {
        self.state.set(RunnerState::Closed);
        self.shutdown.mark_closed();
        info!(
            reason = %stop_reason,
            iterations,
            frames = frames_delivered,
            close_errors = close_errors.len(),
            "Pipeline closed"
        );
        RunReport {
            stop_reason,
            iterations,
            frames_delivered,
            error,
            close_errors,
        }
    }
}

/// Push one parcel through every stage
///
/// Stops early when a stage fails or reports a terminal status.
fn run_iteration(
    stages: &mut [Box<dyn Stage>],
    ctx: &mut PipelineContext,
) -> PipelineResult<IoData> {
    let mut data = IoData::initial();
    for stage in stages.iter_mut() {
        data = stage
            .process(ctx, data)
            .map_err(|source| PipelineError::ProcessFailure {
                stage: stage.name().to_string(),
                source,
            })?;
        if !data.status.is_continuation() {
            break;
        }
    }
    Ok(data)
}

/// Handle to a runner started with [`PipelineRunner::spawn`]
///
/// Dropping the handle requests shutdown and joins the thread.
pub struct RunnerHandle {
    thread: Option<JoinHandle<RunReport>>,
    shutdown: ShutdownCoordinator,
    state: StateCell,
    name: String,
}

impl RunnerHandle {
    /// Set the shutdown flag without waiting
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting pipeline stop");
        self.shutdown.request_shutdown();
    }

    /// Check if the runner thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn state(&self) -> RunnerState {
        self.state.get()
    }

    /// Wait for the runner to finish
    ///
    /// Returns None if the report was already taken or the thread panicked.
    pub fn join(&mut self) -> Option<RunReport> {
        let handle = self.thread.take()?;
        debug!(name = %self.name, "Waiting for pipeline thread to finish");
        match handle.join() {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(name = %self.name, "Pipeline thread panicked: {:?}", e);
                None
            }
        }
    }

    /// Let the runner thread go without joining it
    ///
    /// For a runner that did not close in time; the thread keeps running
    /// until its stages return.
    pub fn detach(mut self) {
        if self.thread.take().is_some() {
            warn!(name = %self.name, "Detaching pipeline thread");
        }
    }

    /// Request shutdown and wait for the runner to finish
    pub fn stop(&mut self) -> Option<RunReport> {
        self.request_stop();
        self.join()
    }
}

impl Drop for RunnerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            debug!(name = %self.name, "RunnerHandle dropped, stopping pipeline");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip() {
        for state in [
            RunnerState::Constructed,
            RunnerState::Opening,
            RunnerState::Running,
            RunnerState::Draining,
            RunnerState::Closed,
        ] {
            assert_eq!(RunnerState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_report_success() {
        let report = RunReport {
            stop_reason: StopReason::EndOfStream,
            iterations: 3,
            frames_delivered: 2,
            error: None,
            close_errors: Vec::new(),
        };
        assert!(report.is_success());

        let report = RunReport {
            stop_reason: StopReason::ErrorStatus,
            ..report
        };
        assert!(!report.is_success());
    }
}
