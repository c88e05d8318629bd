// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - `run`: build the standard pipeline and drive it until it closes
//! - `config`: print or save the default configuration

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use video_stage::backends::consumer::FrameStatsConsumer;
use video_stage::backends::transport::{self, ReplayTransport, Transport, TransportKind};
use video_stage::config::{PipelineConfig, RecordingSettings};
use video_stage::constants::app_info;
use video_stage::constants::timing::SHUTDOWN_WAIT;
use video_stage::pipelines::stages::standard_pipeline;
use video_stage::pipelines::{PipelineRunner, ShutdownCoordinator};

/// Options of the `run` command
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub tcp: bool,
    pub replay: Option<PathBuf>,
    pub record: Option<PathBuf>,
    pub frames: Option<u64>,
}

impl RunOptions {
    /// Load the configuration file (or defaults) and apply command-line overrides
    fn resolve_config(&self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(endpoint) = &self.endpoint {
            config.transport.endpoint = endpoint.clone();
        }
        if self.tcp {
            config.transport.kind = TransportKind::Stream;
        }
        if let Some(directory) = &self.record {
            config.recording = Some(RecordingSettings {
                directory: directory.clone(),
            });
        }
        if self.frames.is_some() {
            config.max_frames = self.frames;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Run the pipeline until it closes
pub fn run_pipeline(options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = options.resolve_config()?;
    println!("video-stage {}", app_info::version());

    let transport: Box<dyn Transport> = match &options.replay {
        Some(path) => Box::new(ReplayTransport::from_path(path.clone())),
        None => transport::from_settings(&config.transport),
    };
    println!("Source: {}", transport.describe());
    println!(
        "Video: {} @ {} fps -> {}",
        config.video.geometry(),
        config.video.framerate,
        config.output_format
    );
    if let Some(recording) = &config.recording {
        println!("Recording into: {}", recording.directory.display());
    }

    let (definition, delivery) = standard_pipeline(&config, transport, FrameStatsConsumer::new())?;

    let shutdown = ShutdownCoordinator::global().clone();
    shutdown.install_ctrlc_handler()?;

    let mut runner = PipelineRunner::new(definition, shutdown.clone())
        .with_max_frames(config.max_frames)
        .spawn("video-stage-pipeline")?;

    println!();
    println!("Running... (press Ctrl+C to stop)");

    while runner.is_running() {
        if shutdown.is_shutdown_requested() {
            println!();
            println!("Stopping...");
            if !shutdown.wait_closed(Some(SHUTDOWN_WAIT)) {
                warn!("Pipeline did not close within {:?}", SHUTDOWN_WAIT);
                runner.detach();
                return Err(format!("pipeline did not close within {:?}", SHUTDOWN_WAIT).into());
            }
            break;
        }

        let (frames, fps) = delivery.with(|stats| (stats.frames(), stats.fps()))?;
        print!("\rFrames: {} ({:.1} fps)", frames, fps);
        std::io::Write::flush(&mut std::io::stdout())?;

        std::thread::sleep(Duration::from_millis(200));
    }
    println!();

    let report = runner.join().ok_or("pipeline thread panicked")?;
    println!(
        "Pipeline closed: {} after {} iterations, {} frames delivered",
        report.stop_reason, report.iterations, report.frames_delivered
    );
    for error in &report.close_errors {
        println!("  close error: {}", error);
    }

    match report.error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

/// Print the default configuration, or save it to a file
pub fn print_config(output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::default();
    match output {
        Some(path) => {
            config.save(&path)?;
            println!("Configuration written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}
