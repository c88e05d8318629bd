// SPDX-License-Identifier: GPL-3.0-only

//! Input source stage

use crate::backends::transport::{Transport, is_timeout};
use crate::errors::{StageError, StageResult};
use crate::pipelines::context::PipelineContext;
use crate::pipelines::shutdown::HookId;
use crate::pipelines::stage::{IoData, IoStatus, Stage, StageKind, StageState};
use tracing::{debug, info, warn};

/// Reads one chunk from the transport per iteration
pub struct TransportSource {
    transport: Box<dyn Transport>,
    buffer_size: usize,
    buffer: Vec<u8>,
    cancel_hook: Option<HookId>,
    state: StageState,
    bytes_received: u64,
}

impl TransportSource {
    pub fn new(transport: Box<dyn Transport>, buffer_size: usize) -> Self {
        Self {
            transport,
            buffer_size,
            buffer: Vec::new(),
            cancel_hook: None,
            state: StageState::Constructed,
            bytes_received: 0,
        }
    }

    /// Total bytes read since open
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}

impl Stage for TransportSource {
    fn kind(&self) -> StageKind {
        StageKind::InputSource
    }

    fn open(&mut self, ctx: &mut PipelineContext) -> StageResult<()> {
        if self.state != StageState::Constructed {
            return Err(StageError::InvalidState(format!(
                "input source opened in state {:?}",
                self.state
            )));
        }
        if self.buffer_size == 0 {
            self.state = StageState::Failed;
            return Err(StageError::Transport("receive buffer size is zero".into()));
        }

        if let Err(e) = self.transport.connect() {
            self.state = StageState::Failed;
            // Partially connected transports release themselves on close
            let _ = self.transport.close();
            return Err(StageError::Transport(format!(
                "cannot connect to {}: {}",
                self.transport.describe(),
                e
            )));
        }

        self.buffer = vec![0; self.buffer_size];
        if let Some(cancel) = self.transport.canceller() {
            self.cancel_hook = Some(ctx.shutdown().register_cancel_hook(cancel));
        }
        self.bytes_received = 0;
        self.state = StageState::Open;
        info!(
            transport = %self.transport.describe(),
            kind = %self.transport.kind(),
            buffer = self.buffer_size,
            "Input source opened"
        );
        Ok(())
    }

    fn process(&mut self, ctx: &mut PipelineContext, _input: IoData) -> StageResult<IoData> {
        if self.state != StageState::Open {
            return Err(StageError::InvalidState("input source is not open".into()));
        }

        if ctx.frames_buffered() {
            return Ok(IoData::with_status(IoStatus::Processing));
        }

        match self.transport.read(&mut self.buffer) {
            Ok(0) => {
                debug!(bytes = self.bytes_received, "Transport reached end of stream");
                Ok(IoData::with_status(IoStatus::EndOfStream))
            }
            Ok(n) => {
                self.bytes_received += n as u64;
                Ok(IoData::encoded(self.buffer[..n].to_vec()))
            }
            Err(e) if is_timeout(&e) => Ok(IoData::with_status(IoStatus::StillRunning)),
            Err(e) if ctx.shutdown().is_shutdown_requested() => {
                // The cancel hook broke the read; the runner drains next
                debug!(error = %e, "Read interrupted by shutdown");
                Ok(IoData::with_status(IoStatus::StillRunning))
            }
            Err(e) => Err(StageError::Transport(e.to_string())),
        }
    }

    fn close(&mut self, ctx: &mut PipelineContext) -> StageResult<()> {
        if let Some(hook) = self.cancel_hook.take() {
            ctx.shutdown().remove_cancel_hook(hook);
        }
        if self.state == StageState::Closed {
            return Ok(());
        }
        self.state = StageState::Closed;
        self.buffer = Vec::new();
        self.transport.close().map_err(|e| {
            warn!(error = %e, "Transport close failed");
            StageError::Transport(e.to_string())
        })
    }

    fn state(&self) -> StageState {
        self.state
    }
}
