// SPDX-License-Identifier: GPL-3.0-only

//! Concrete pipeline stages
//!
//! ```text
//! TransportSource -> DecodeFilter -> [RecorderTap] -> ColorspaceFilter -> DeliverySink
//! ```

mod colorspace;
mod decode;
mod delivery;
mod recorder;
mod source;

pub use colorspace::ColorspaceFilter;
pub use decode::DecodeFilter;
pub use delivery::{DeliveryHandle, DeliverySink};
pub use recorder::{RecorderTap, RecordingTarget};
pub use source::TransportSource;

use super::definition::PipelineDefinition;
use crate::backends::consumer::FrameConsumer;
use crate::backends::transport::Transport;
use crate::config::PipelineConfig;
use crate::errors::PipelineResult;
use crate::media::decoders::RawFrameDecoder;

/// Build the standard pipeline for a configuration
///
/// The transport is passed in so callers can replay a file instead of
/// connecting to the configured endpoint. Returns the definition and a
/// handle to the consumer.
pub fn standard_pipeline<C: FrameConsumer + 'static>(
    config: &PipelineConfig,
    transport: Box<dyn Transport>,
    consumer: C,
) -> PipelineResult<(PipelineDefinition, DeliveryHandle<C>)> {
    let geometry = config.video.geometry();
    let (sink, handle) = DeliverySink::new(consumer);

    let mut builder = PipelineDefinition::builder(geometry, config.video.framerate())
        .stage(TransportSource::new(transport, config.transport.buffer_size))
        .stage(DecodeFilter::new(RawFrameDecoder::new(), geometry));
    if let Some(recording) = &config.recording {
        builder = builder.stage(RecorderTap::new(RecordingTarget::Directory(
            recording.directory.clone(),
        )));
    }
    let definition = builder
        .stage(ColorspaceFilter::new(config.output_format))
        .stage(sink)
        .build()?;

    Ok((definition, handle))
}
