// SPDX-License-Identifier: MPL-2.0

//! Collaborators at the edges of the pipeline
//!
//! ```text
//! ┌───────────┐      ┌─────────────────────┐      ┌───────────┐
//! │ Transport │ ───▶ │      Pipeline       │ ───▶ │ Consumer  │
//! │ UDP / TCP │      │ source ... delivery │      │           │
//! │  replay   │      └─────────────────────┘      └───────────┘
//! └───────────┘
//! ```
//!
//! # Modules
//!
//! - [`transport`]: byte transports read by the input source
//! - [`consumer`]: frame consumers fed by the delivery sink

pub mod consumer;
pub mod transport;
