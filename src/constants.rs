// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use crate::media::picture::Geometry;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// QVGA width, the drone camera's default streaming mode
pub const QVGA_WIDTH: u32 = 320;

/// QVGA height
pub const QVGA_HEIGHT: u32 = 240;

/// Default stream frame rate
pub const DEFAULT_FRAMERATE: u32 = 30;

/// Video stream presets
///
/// Fixed picture sizes the video endpoint can be configured to send. The
/// pipeline allocates its pictures for exactly one of these at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoModePreset {
    /// QCIF: 176x144
    Qcif,
    /// QVGA: 320x240 (default)
    #[default]
    Qvga,
    /// VGA: 640x480
    Vga,
}

impl VideoModePreset {
    /// Get all preset variants, smallest first
    pub const ALL: [VideoModePreset; 3] = [
        VideoModePreset::Qcif,
        VideoModePreset::Qvga,
        VideoModePreset::Vga,
    ];

    /// Get display name for the preset
    pub fn display_name(&self) -> &'static str {
        match self {
            VideoModePreset::Qcif => "QCIF",
            VideoModePreset::Qvga => "QVGA",
            VideoModePreset::Vga => "VGA",
        }
    }

    /// Picture geometry for this preset
    pub fn geometry(&self) -> Geometry {
        match self {
            VideoModePreset::Qcif => Geometry::new(176, 144),
            VideoModePreset::Qvga => Geometry::new(QVGA_WIDTH, QVGA_HEIGHT),
            VideoModePreset::Vga => Geometry::new(640, 480),
        }
    }
}

/// Network defaults for the video endpoint
pub mod network {
    /// Address of the drone on its own access point
    pub const DEFAULT_HOST: &str = "192.168.1.1";

    /// UDP/TCP port the video stream is served on
    pub const VIDEO_PORT: u16 = 5555;

    /// Receive buffer size in bytes
    pub const RECEIVE_BUFFER_SIZE: usize = 100_000;

    /// Datagram sent after connecting so the endpoint starts streaming
    pub const UDP_KICKOFF: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

    /// Default endpoint string
    pub fn default_endpoint() -> String {
        format!("{}:{}", DEFAULT_HOST, VIDEO_PORT)
    }
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Default transport read timeout; bounds how long a shutdown request
    /// can wait behind a silent transport
    pub const READ_TIMEOUT_MS: u64 = 1_000;

    /// Longest a datagram read waits before re-checking for cancellation
    pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// How long the binary waits for the runner to close after Ctrl+C
    pub const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);
}

/// Recording output
pub mod recording {
    /// File extension for recorded raw frame streams
    pub const FILE_EXTENSION: &str = "vsf";

    /// Subdirectory created under the user's video directory
    pub const DEFAULT_SUBDIR: &str = "video-stage";
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
