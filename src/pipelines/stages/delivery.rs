// SPDX-License-Identifier: GPL-3.0-only

//! Delivery sink stage
//!
//! The consumer lives behind a mutex shared with any number of
//! [`DeliveryHandle`]s. The sink holds the lock only while the consumer's
//! `update` runs, so a reader on another thread sees either the previous
//! frame or the new one, never a mix.

use crate::backends::consumer::FrameConsumer;
use crate::errors::{StageError, StageResult};
use crate::pipelines::context::PipelineContext;
use crate::pipelines::stage::{IoData, IoStatus, Stage, StageKind, StageState};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

fn lock<C>(consumer: &Mutex<C>) -> StageResult<MutexGuard<'_, C>> {
    consumer
        .lock()
        .map_err(|_| StageError::Consumer("delivery lock poisoned".into()))
}

/// Terminal stage handing finished frames to a consumer
pub struct DeliverySink<C: FrameConsumer> {
    consumer: Arc<Mutex<C>>,
    state: StageState,
    consumer_closed: bool,
    delivered: u64,
}

impl<C: FrameConsumer> DeliverySink<C> {
    /// Create the sink and a handle for reading the consumer elsewhere
    pub fn new(consumer: C) -> (Self, DeliveryHandle<C>) {
        let consumer = Arc::new(Mutex::new(consumer));
        let handle = DeliveryHandle {
            consumer: Arc::clone(&consumer),
        };
        let sink = Self {
            consumer,
            state: StageState::Constructed,
            consumer_closed: false,
            delivered: 0,
        };
        (sink, handle)
    }

    /// Frames handed to the consumer
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl<C: FrameConsumer> Stage for DeliverySink<C> {
    fn kind(&self) -> StageKind {
        StageKind::DeliverySink
    }

    fn open(&mut self, _ctx: &mut PipelineContext) -> StageResult<()> {
        if let Err(e) = lock(&self.consumer)?.init() {
            self.state = StageState::Failed;
            return Err(e);
        }
        self.state = StageState::Open;
        debug!("Delivery sink opened");
        Ok(())
    }

    fn process(&mut self, ctx: &mut PipelineContext, input: IoData) -> StageResult<IoData> {
        if input.status != IoStatus::Processing {
            return Ok(input);
        }
        let Some(picture) = input.picture_ref() else {
            return Ok(input);
        };
        if self.state != StageState::Open {
            return Err(StageError::InvalidState("delivery sink is not open".into()));
        }

        let frame = ctx.frames().get(picture);
        lock(&self.consumer)?.update(frame)?;
        self.delivered += 1;
        Ok(input)
    }

    fn close(&mut self, _ctx: &mut PipelineContext) -> StageResult<()> {
        let notify = self.state == StageState::Open && !self.consumer_closed;
        self.state = StageState::Closed;
        if !notify {
            return Ok(());
        }
        self.consumer_closed = true;
        let result = lock(&self.consumer)?.close();
        if let Err(e) = &result {
            warn!(error = %e, "Consumer close failed");
        }
        debug!(frames = self.delivered, "Delivery sink closed");
        result
    }

    fn state(&self) -> StageState {
        self.state
    }
}

/// Shared read access to the sink's consumer
pub struct DeliveryHandle<C> {
    consumer: Arc<Mutex<C>>,
}

impl<C> DeliveryHandle<C> {
    /// Run `f` with the consumer locked
    ///
    /// The sink cannot deliver while `f` runs; keep it short.
    pub fn with<R>(&self, f: impl FnOnce(&C) -> R) -> StageResult<R> {
        let consumer = lock(&self.consumer)?;
        Ok(f(&consumer))
    }

    /// Run `f` with mutable access to the locked consumer
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut C) -> R) -> StageResult<R> {
        let mut consumer = lock(&self.consumer)?;
        Ok(f(&mut consumer))
    }
}

impl<C> Clone for DeliveryHandle<C> {
    fn clone(&self) -> Self {
        Self {
            consumer: Arc::clone(&self.consumer),
        }
    }
}
