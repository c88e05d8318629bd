// SPDX-License-Identifier: MPL-2.0

//! Media data model and processing primitives
//!
//! # Pictures
//!
//! [`picture::PictureDescriptor`] holds one video frame as planar or packed
//! pixel data with fixed geometry. The pipeline allocates its pictures once
//! and every stage writes into them in place.
//!
//! # Decoding
//!
//! The [`decoders`] module defines the decoder contract used by the decode
//! filter and a decoder for the raw planar frame format.
//!
//! # Color Space Conversion
//!
//! [`yuv_convert`] converts I420 pictures to packed RGB formats on the CPU.

pub mod decoders;
pub mod picture;
pub mod yuv_convert;

// Re-export commonly used types
pub use decoders::{FrameDecoder, RawFrameDecoder};
pub use picture::{Framerate, Geometry, PictureDescriptor, PixelFormat, Plane};
