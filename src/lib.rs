// SPDX-License-Identifier: MPL-2.0

//! video-stage - a staged video pipeline engine
//!
//! Pulls raw frames from a network or file transport, decodes them into a
//! fixed-size I420 picture, optionally records them, converts them to a
//! packed RGB format and hands each finished frame to a consumer. A single
//! runner thread drives the whole chain until end of stream, an error or a
//! shutdown request.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`pipelines`]: stage contract, runner, shutdown coordination and the
//!   concrete stages
//! - [`backends`]: transports feeding the source and consumers fed by the sink
//! - [`media`]: picture model, frame decoder and colorspace conversion
//! - [`config`]: pipeline configuration
//! - [`errors`]: stage, pipeline and configuration errors
//!
//! # Example
//!
//! ```no_run
//! use video_stage::backends::consumer::FrameStatsConsumer;
//! use video_stage::backends::transport;
//! use video_stage::config::PipelineConfig;
//! use video_stage::pipelines::stages::standard_pipeline;
//! use video_stage::pipelines::{PipelineRunner, ShutdownCoordinator};
//!
//! let config = PipelineConfig::default();
//! let transport = transport::from_settings(&config.transport);
//! let (definition, _stats) =
//!     standard_pipeline(&config, transport, FrameStatsConsumer::new()).unwrap();
//! let report = PipelineRunner::new(definition, ShutdownCoordinator::new()).run();
//! println!("{} frames", report.frames_delivered);
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod pipelines;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use constants::VideoModePreset;
pub use errors::{PipelineError, StageError};
pub use media::picture::{Geometry, PictureDescriptor, PixelFormat};
pub use pipelines::{PipelineDefinition, PipelineRunner, RunReport, ShutdownCoordinator};
