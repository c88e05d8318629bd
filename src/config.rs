// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline configuration
//!
//! Configuration is a JSON document; every field is optional and falls back
//! to the QVGA/UDP defaults in [`crate::constants`].

use crate::backends::transport::TransportKind;
use crate::constants::{DEFAULT_FRAMERATE, QVGA_HEIGHT, QVGA_WIDTH, network, recording, timing};
use crate::errors::{ConfigError, ConfigResult};
use crate::media::picture::{Framerate, Geometry, PixelFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Video mode the pipeline allocates its pictures for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// Picture width
    pub width: u32,
    /// Picture height
    pub height: u32,
    /// Frames per second
    pub framerate: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: QVGA_WIDTH,
            height: QVGA_HEIGHT,
            framerate: DEFAULT_FRAMERATE,
        }
    }
}

impl VideoSettings {
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.width, self.height)
    }

    pub fn framerate(&self) -> Framerate {
        Framerate::from_int(self.framerate)
    }
}

/// Transport settings for the input source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Endpoint address ("host:port")
    pub endpoint: String,
    /// Datagram or stream transport
    pub kind: TransportKind,
    /// Receive buffer size in bytes
    pub buffer_size: usize,
    /// Read timeout in milliseconds (0 blocks without timeout)
    pub read_timeout_ms: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            endpoint: network::default_endpoint(),
            kind: TransportKind::Datagram,
            buffer_size: network::RECEIVE_BUFFER_SIZE,
            read_timeout_ms: timing::READ_TIMEOUT_MS,
        }
    }
}

impl TransportSettings {
    /// Read timeout, or None to block
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }
}

/// Recording tap settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingSettings {
    /// Directory receiving timestamped recordings
    pub directory: PathBuf,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            directory: default_recording_dir(),
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Picture geometry and frame rate
    pub video: VideoSettings,
    /// Input source transport
    pub transport: TransportSettings,
    /// Pixel format delivered to the consumer
    pub output_format: PixelFormat,
    /// Recording tap, disabled when absent
    pub recording: Option<RecordingSettings>,
    /// Stop after this many delivered frames
    pub max_frames: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            video: VideoSettings::default(),
            transport: TransportSettings::default(),
            output_format: PixelFormat::RGB24,
            recording: None,
            max_frames: None,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded pipeline configuration");
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check values the pipeline cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        let video = &self.video;
        if video.width == 0 || video.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "video size {}x{} is empty",
                video.width, video.height
            )));
        }
        if video.width % 2 != 0 || video.height % 2 != 0 {
            return Err(ConfigError::Invalid(format!(
                "video size {}x{} must be even for 4:2:0 pictures",
                video.width, video.height
            )));
        }
        if video.width > u16::MAX as u32 || video.height > u16::MAX as u32 {
            return Err(ConfigError::Invalid(format!(
                "video size {}x{} is too large",
                video.width, video.height
            )));
        }
        if video.framerate == 0 {
            return Err(ConfigError::Invalid("framerate must be positive".into()));
        }

        let transport = &self.transport;
        if transport.buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "receive buffer size must be positive".into(),
            ));
        }
        let port = transport
            .endpoint
            .rsplit_once(':')
            .and_then(|(host, port)| (!host.is_empty()).then_some(port))
            .and_then(|port| port.parse::<u16>().ok());
        if port.is_none() {
            return Err(ConfigError::Invalid(format!(
                "endpoint '{}' is not host:port",
                transport.endpoint
            )));
        }

        if self.output_format.is_planar_yuv() {
            return Err(ConfigError::Invalid(format!(
                "output format {} is not a packed RGB format",
                self.output_format
            )));
        }

        Ok(())
    }
}

/// Default directory for recordings (~/Videos/video-stage)
pub fn default_recording_dir() -> PathBuf {
    dirs::video_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(recording::DEFAULT_SUBDIR)
}
