// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline definition and its builder
//!
//! A definition is the ordered list of stages plus the video mode the
//! pictures are allocated for. It is validated once when built and cannot
//! be changed afterwards.

use super::stage::{Stage, StageKind};
use crate::errors::{PipelineError, PipelineResult};
use crate::media::picture::{Framerate, Geometry, PixelFormat};
use tracing::debug;

/// Validated, immutable stage sequence
pub struct PipelineDefinition {
    stages: Vec<Box<dyn Stage>>,
    geometry: Geometry,
    framerate: Framerate,
    output_format: PixelFormat,
}

impl PipelineDefinition {
    /// Start building a definition for the given video mode
    pub fn builder(geometry: Geometry, framerate: Framerate) -> PipelineBuilder {
        PipelineBuilder::new(geometry, framerate)
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn framerate(&self) -> Framerate {
        self.framerate
    }

    /// Pixel format of the converted picture
    pub fn output_format(&self) -> PixelFormat {
        self.output_format
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in pipeline order
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }

    /// Stage kinds in pipeline order
    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind()).collect()
    }

    pub(crate) fn into_stages(self) -> Vec<Box<dyn Stage>> {
        self.stages
    }
}

impl std::fmt::Debug for PipelineDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineDefinition")
            .field("stages", &self.stage_names())
            .field("geometry", &self.geometry)
            .field("framerate", &self.framerate)
            .field("output_format", &self.output_format)
            .finish()
    }
}

/// Append-only builder for [`PipelineDefinition`]
pub struct PipelineBuilder {
    stages: Vec<Box<dyn Stage>>,
    geometry: Geometry,
    framerate: Framerate,
}

impl PipelineBuilder {
    pub fn new(geometry: Geometry, framerate: Framerate) -> Self {
        Self {
            stages: Vec::new(),
            geometry,
            framerate,
        }
    }

    /// Append a stage
    pub fn stage<S: Stage + 'static>(self, stage: S) -> Self {
        self.boxed_stage(Box::new(stage))
    }

    /// Append an already boxed stage
    pub fn boxed_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Validate the topology and produce the definition
    ///
    /// The stage order must be: one input source, one decode filter, any
    /// number of recording taps, one colorspace filter, one delivery sink.
    /// Every stage that declares a geometry must agree with the pipeline's.
    pub fn build(self) -> PipelineResult<PipelineDefinition> {
        let geometry = self.geometry;
        if geometry.width == 0 || geometry.height == 0 {
            return Err(PipelineError::InvalidDefinition(format!(
                "picture geometry {} is empty",
                geometry
            )));
        }
        if geometry.width % 2 != 0 || geometry.height % 2 != 0 {
            return Err(PipelineError::InvalidDefinition(format!(
                "picture geometry {} is not even",
                geometry
            )));
        }

        let kinds: Vec<StageKind> = self.stages.iter().map(|s| s.kind()).collect();
        validate_order(&kinds)?;

        for stage in &self.stages {
            if let Some(stage_geometry) = stage.geometry()
                && stage_geometry != geometry
            {
                return Err(PipelineError::InvalidDefinition(format!(
                    "stage '{}' expects {} but the pipeline allocates {}",
                    stage.name(),
                    stage_geometry,
                    geometry
                )));
            }
        }

        let output_format = self
            .stages
            .iter()
            .find(|s| s.kind() == StageKind::ColorspaceFilter)
            .and_then(|s| s.output_format())
            .unwrap_or(PixelFormat::RGB24);
        if output_format.is_planar_yuv() {
            return Err(PipelineError::InvalidDefinition(format!(
                "colorspace output {} is not a packed format",
                output_format
            )));
        }

        debug!(
            stages = ?kinds,
            geometry = %geometry,
            output = %output_format,
            "Pipeline definition built"
        );

        Ok(PipelineDefinition {
            stages: self.stages,
            geometry,
            framerate: self.framerate,
            output_format,
        })
    }
}

fn validate_order(kinds: &[StageKind]) -> PipelineResult<()> {
    let invalid = |reason: &str| {
        Err(PipelineError::InvalidDefinition(format!(
            "{} (stages: {})",
            reason,
            kinds
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        )))
    };

    let [first, second, middle @ .., convert, last] = kinds else {
        return invalid("a pipeline needs at least source, decoder, colorspace and sink");
    };
    if *first != StageKind::InputSource {
        return invalid("the first stage must be the input source");
    }
    if *second != StageKind::DecodeFilter {
        return invalid("the decode filter must follow the input source");
    }
    if middle.iter().any(|k| *k != StageKind::RecordingTap) {
        return invalid("only recording taps may sit between decoder and colorspace filter");
    }
    if *convert != StageKind::ColorspaceFilter {
        return invalid("the colorspace filter must precede the delivery sink");
    }
    if *last != StageKind::DeliverySink {
        return invalid("the last stage must be the delivery sink");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageResult;
    use crate::pipelines::context::PipelineContext;
    use crate::pipelines::stage::{IoData, StageState};

    struct Dummy {
        kind: StageKind,
        geometry: Option<Geometry>,
        format: Option<PixelFormat>,
    }

    fn dummy(kind: StageKind) -> Dummy {
        Dummy {
            kind,
            geometry: None,
            format: None,
        }
    }

    impl Stage for Dummy {
        fn kind(&self) -> StageKind {
            self.kind
        }
        fn open(&mut self, _: &mut PipelineContext) -> StageResult<()> {
            Ok(())
        }
        fn process(&mut self, _: &mut PipelineContext, input: IoData) -> StageResult<IoData> {
            Ok(input)
        }
        fn close(&mut self, _: &mut PipelineContext) -> StageResult<()> {
            Ok(())
        }
        fn state(&self) -> StageState {
            StageState::Constructed
        }
        fn geometry(&self) -> Option<Geometry> {
            self.geometry
        }
        fn output_format(&self) -> Option<PixelFormat> {
            self.format
        }
    }

    fn qvga() -> PipelineBuilder {
        PipelineBuilder::new(Geometry::new(320, 240), Framerate::from_int(30))
    }

    #[test]
    fn test_standard_order_builds() {
        let def = qvga()
            .stage(dummy(StageKind::InputSource))
            .stage(dummy(StageKind::DecodeFilter))
            .stage(dummy(StageKind::RecordingTap))
            .stage(Dummy {
                format: Some(PixelFormat::BGRA),
                ..dummy(StageKind::ColorspaceFilter)
            })
            .stage(dummy(StageKind::DeliverySink))
            .build()
            .unwrap();
        assert_eq!(def.len(), 5);
        assert_eq!(def.output_format(), PixelFormat::BGRA);
    }

    #[test]
    fn test_recorder_before_decoder_rejected() {
        let result = qvga()
            .stage(dummy(StageKind::InputSource))
            .stage(dummy(StageKind::RecordingTap))
            .stage(dummy(StageKind::DecodeFilter))
            .stage(dummy(StageKind::ColorspaceFilter))
            .stage(dummy(StageKind::DeliverySink))
            .build();
        assert!(matches!(result, Err(PipelineError::InvalidDefinition(_))));
    }

    #[test]
    fn test_missing_sink_rejected() {
        let result = qvga()
            .stage(dummy(StageKind::InputSource))
            .stage(dummy(StageKind::DecodeFilter))
            .stage(dummy(StageKind::ColorspaceFilter))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_geometry_disagreement_rejected() {
        let result = qvga()
            .stage(dummy(StageKind::InputSource))
            .stage(Dummy {
                geometry: Some(Geometry::new(640, 480)),
                ..dummy(StageKind::DecodeFilter)
            })
            .stage(dummy(StageKind::ColorspaceFilter))
            .stage(dummy(StageKind::DeliverySink))
            .build();
        assert!(matches!(result, Err(PipelineError::InvalidDefinition(_))));
    }
}
