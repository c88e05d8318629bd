// SPDX-License-Identifier: MPL-2.0

//! Shared helpers for integration tests
//!
//! Provides a scripted transport, an event log, a stage wrapper that records
//! every lifecycle call, and a consumer that records delivered frames.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use video_stage::backends::consumer::FrameConsumer;
use video_stage::backends::transport::{Transport, TransportKind};
use video_stage::errors::{StageError, StageResult};
use video_stage::media::decoders::encode_frame;
use video_stage::media::picture::{Framerate, Geometry, PictureDescriptor, PixelFormat};
use video_stage::pipelines::stages::{
    ColorspaceFilter, DecodeFilter, DeliveryHandle, DeliverySink, TransportSource,
};
use video_stage::pipelines::{
    FrameStore, IoData, PipelineContext, PipelineDefinition, ShutdownCoordinator, Stage, StageKind,
    StageState,
};
use video_stage::media::decoders::RawFrameDecoder;

/// Small picture size used across tests
pub const TEST_GEOMETRY: Geometry = Geometry::new(16, 8);

pub fn framerate() -> Framerate {
    Framerate::from_int(30)
}

/// Lifecycle event recorded by [`Traced`] and [`RecordingConsumer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open(String),
    Process(String),
    Close(String),
    /// A frame reached the consumer; carries its first byte
    Update(u8),
    ConsumerInit,
    ConsumerClose,
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    /// Stage names of every event of one variant, in order
    pub fn opens(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Open(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn closes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Close(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Update(value) => Some(value),
                _ => None,
            })
            .collect()
    }
}

/// One step of a [`ScriptedTransport`]
#[derive(Debug, Clone)]
pub enum Step {
    Data(Vec<u8>),
    Timeout,
    Fail,
}

/// Transport replaying a fixed script; end of stream once the script runs out
pub struct ScriptedTransport {
    steps: VecDeque<Step>,
    /// Keep returning timeouts instead of end of stream when exhausted
    idle_forever: bool,
    connected: bool,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            idle_forever: false,
            connected: false,
        }
    }

    pub fn idle_forever(steps: Vec<Step>) -> Self {
        Self {
            idle_forever: true,
            ..Self::new(steps)
        }
    }
}

impl Transport for ScriptedTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    fn describe(&self) -> String {
        "scripted".into()
    }

    fn connect(&mut self) -> io::Result<()> {
        self.connected = true;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        assert!(self.connected, "read before connect");
        match self.steps.pop_front() {
            Some(Step::Data(bytes)) => {
                assert!(bytes.len() <= buf.len(), "scripted chunk larger than buffer");
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(Step::Timeout) => Err(io::Error::from(io::ErrorKind::WouldBlock)),
            Some(Step::Fail) => Err(io::Error::from(io::ErrorKind::ConnectionReset)),
            None if self.idle_forever => {
                std::thread::sleep(std::time::Duration::from_millis(1));
                Err(io::Error::from(io::ErrorKind::WouldBlock))
            }
            None => Ok(0),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        self.connected = false;
        Ok(())
    }
}

/// Encoded raw frame of the given geometry with every byte set to `value`
pub fn encoded_frame(geometry: Geometry, value: u8) -> Vec<u8> {
    let mut picture = PictureDescriptor::allocate(PixelFormat::I420, geometry, framerate()).unwrap();
    // Neutral chroma keeps the RGB output equal to the luma value
    picture.plane_mut(0).data_mut().fill(value);
    picture.plane_mut(1).data_mut().fill(128);
    picture.plane_mut(2).data_mut().fill(128);
    encode_frame(&picture).unwrap()
}

/// Script delivering one frame per read with luma 10, 20, 30, ...
pub fn frame_script(count: usize) -> Vec<Step> {
    (1..=count)
        .map(|i| Step::Data(encoded_frame(TEST_GEOMETRY, (i * 10) as u8)))
        .collect()
}

/// Stage wrapper recording lifecycle calls
pub struct Traced<S> {
    name: String,
    inner: S,
    log: EventLog,
}

impl<S: Stage> Traced<S> {
    pub fn new(name: &str, inner: S, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            inner,
            log: log.clone(),
        }
    }
}

impl<S: Stage> Stage for Traced<S> {
    fn kind(&self) -> StageKind {
        self.inner.kind()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, ctx: &mut PipelineContext) -> StageResult<()> {
        self.log.push(Event::Open(self.name.clone()));
        self.inner.open(ctx)
    }

    fn process(&mut self, ctx: &mut PipelineContext, input: IoData) -> StageResult<IoData> {
        self.log.push(Event::Process(self.name.clone()));
        self.inner.process(ctx, input)
    }

    fn close(&mut self, ctx: &mut PipelineContext) -> StageResult<()> {
        self.log.push(Event::Close(self.name.clone()));
        self.inner.close(ctx)
    }

    fn state(&self) -> StageState {
        self.inner.state()
    }

    fn geometry(&self) -> Option<Geometry> {
        self.inner.geometry()
    }

    fn output_format(&self) -> Option<PixelFormat> {
        self.inner.output_format()
    }
}

/// Consumer recording the first byte of every delivered frame
pub struct RecordingConsumer {
    log: EventLog,
    delivered: u64,
    /// Request shutdown once this many frames were delivered
    shutdown_after: Option<(u64, ShutdownCoordinator)>,
}

impl RecordingConsumer {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            delivered: 0,
            shutdown_after: None,
        }
    }

    pub fn with_shutdown_after(mut self, frames: u64, shutdown: ShutdownCoordinator) -> Self {
        self.shutdown_after = Some((frames, shutdown));
        self
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl FrameConsumer for RecordingConsumer {
    fn init(&mut self) -> StageResult<()> {
        self.log.push(Event::ConsumerInit);
        Ok(())
    }

    fn update(&mut self, frame: &PictureDescriptor) -> StageResult<()> {
        let first = *frame
            .plane(0)
            .data()
            .first()
            .ok_or_else(|| StageError::Consumer("empty frame".into()))?;
        self.log.push(Event::Update(first));
        self.delivered += 1;
        if let Some((after, shutdown)) = &self.shutdown_after
            && self.delivered == *after
        {
            shutdown.request_shutdown();
        }
        Ok(())
    }

    fn close(&mut self) -> StageResult<()> {
        self.log.push(Event::ConsumerClose);
        Ok(())
    }
}

/// Source, decode, colorspace and sink, each wrapped in a [`Traced`]
pub fn traced_pipeline(
    transport: ScriptedTransport,
    consumer: RecordingConsumer,
    log: &EventLog,
) -> (PipelineDefinition, DeliveryHandle<RecordingConsumer>) {
    let (sink, handle) = DeliverySink::new(consumer);
    let definition = PipelineDefinition::builder(TEST_GEOMETRY, framerate())
        .stage(Traced::new(
            "source",
            TransportSource::new(Box::new(transport), 4096),
            log,
        ))
        .stage(Traced::new(
            "decode",
            DecodeFilter::new(RawFrameDecoder::new(), TEST_GEOMETRY),
            log,
        ))
        .stage(Traced::new(
            "colorspace",
            ColorspaceFilter::new(PixelFormat::RGB24),
            log,
        ))
        .stage(Traced::new("sink", sink, log))
        .build()
        .unwrap();
    (definition, handle)
}

/// Stand-alone context for driving stages by hand
pub fn test_context(output: PixelFormat) -> PipelineContext {
    let frames = FrameStore::allocate(TEST_GEOMETRY, framerate(), output).unwrap();
    PipelineContext::new(frames, ShutdownCoordinator::new())
}

/// Counts resources held by [`TestStage`]s across a test
#[derive(Debug, Clone, Default)]
pub struct ResourceCounter(Arc<AtomicI64>);

impl ResourceCounter {
    pub fn live(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Minimal stage with injectable failures
pub struct TestStage {
    name: String,
    kind: StageKind,
    log: EventLog,
    resources: ResourceCounter,
    holds_resource: bool,
    fail_open: bool,
    fail_close: bool,
    /// Report end of stream on this process call (1-based)
    end_at: Option<u64>,
    calls: u64,
    state: StageState,
}

impl TestStage {
    pub fn new(name: &str, kind: StageKind, log: &EventLog, resources: &ResourceCounter) -> Self {
        Self {
            name: name.to_string(),
            kind,
            log: log.clone(),
            resources: resources.clone(),
            holds_resource: false,
            fail_open: false,
            fail_close: false,
            end_at: None,
            calls: 0,
            state: StageState::Constructed,
        }
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn ending_at(mut self, call: u64) -> Self {
        self.end_at = Some(call);
        self
    }
}

impl Stage for TestStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, _ctx: &mut PipelineContext) -> StageResult<()> {
        self.log.push(Event::Open(self.name.clone()));
        if self.fail_open {
            self.state = StageState::Failed;
            return Err(StageError::Transport("injected open failure".into()));
        }
        self.resources.0.fetch_add(1, Ordering::SeqCst);
        self.holds_resource = true;
        self.state = StageState::Open;
        Ok(())
    }

    fn process(&mut self, _ctx: &mut PipelineContext, input: IoData) -> StageResult<IoData> {
        self.log.push(Event::Process(self.name.clone()));
        self.calls += 1;
        if self.end_at == Some(self.calls) {
            return Ok(IoData::with_status(video_stage::pipelines::IoStatus::EndOfStream));
        }
        Ok(input)
    }

    fn close(&mut self, _ctx: &mut PipelineContext) -> StageResult<()> {
        self.log.push(Event::Close(self.name.clone()));
        if self.holds_resource {
            self.resources.0.fetch_sub(1, Ordering::SeqCst);
            self.holds_resource = false;
        }
        self.state = StageState::Closed;
        if self.fail_close {
            return Err(StageError::Transport("injected close failure".into()));
        }
        Ok(())
    }

    fn state(&self) -> StageState {
        self.state
    }
}

/// Four [`TestStage`]s in pipeline order named s0..s3
pub fn test_stages(log: &EventLog, resources: &ResourceCounter) -> Vec<TestStage> {
    [
        StageKind::InputSource,
        StageKind::DecodeFilter,
        StageKind::ColorspaceFilter,
        StageKind::DeliverySink,
    ]
    .into_iter()
    .enumerate()
    .map(|(i, kind)| TestStage::new(&format!("s{}", i), kind, log, resources))
    .collect()
}

pub fn definition_from(stages: Vec<TestStage>) -> PipelineDefinition {
    stages
        .into_iter()
        .fold(
            PipelineDefinition::builder(TEST_GEOMETRY, framerate()),
            |builder, stage| builder.stage(stage),
        )
        .build()
        .unwrap()
}
