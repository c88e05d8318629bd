// SPDX-License-Identifier: MPL-2.0

//! Staged video pipeline
//!
//! A pipeline is a fixed chain of stages driven by a single runner thread:
//!
//! ```text
//! ┌───────────┐   ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌──────────┐
//! │ Transport │──▶│  Decode  │──▶│ Recorder │──▶│ Colorspace │──▶│ Delivery │──▶ consumer
//! │  source   │   │  (I420)  │   │(optional)│   │   (RGB)    │   │   sink   │
//! └───────────┘   └──────────┘   └──────────┘   └────────────┘   └──────────┘
//! ```
//!
//! # Modules
//!
//! - [`stage`]: the stage contract and the parcel passed between stages
//! - [`context`]: pictures and shutdown state handed to every stage call
//! - [`definition`]: validated stage order
//! - [`runner`]: lifecycle state machine and run loop
//! - [`shutdown`]: process-wide shutdown flag and completion signal
//! - [`stages`]: concrete stages

pub mod context;
pub mod definition;
pub mod runner;
pub mod shutdown;
pub mod stage;
pub mod stages;

pub use context::{FrameStore, PictureRef, PipelineContext};
pub use definition::{PipelineBuilder, PipelineDefinition};
pub use runner::{PipelineRunner, RunReport, RunnerHandle, RunnerState, StopReason};
pub use shutdown::ShutdownCoordinator;
pub use stage::{IoBuffer, IoData, IoStatus, Stage, StageKind, StageState};
