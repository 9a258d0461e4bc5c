//! Head tracking demo on a synthetic depth camera.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use head_tracking::acquisition::Acquisition;
use head_tracking::config::Config;
use head_tracking::face_locator::{FaceClassifier, HaarCascadeClassifier, NormedCorrelationMatcher};
use head_tracking::frame::Orientation;
use head_tracking::pipeline::HeadTracker;
use head_tracking::synthetic::{BrightBlobClassifier, SceneConfig, SyntheticFrameSource};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Detector {
    /// Haar cascade face classifier
    Haar,
    /// Bright region detector for synthetic scenes
    Blob,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Haar cascade file, overrides the configuration
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// Face detector to run while cold
    #[arg(long, value_enum, default_value = "blob")]
    detector: Detector,

    /// Number of frames to process
    #[arg(short, long, default_value = "300")]
    frames: usize,

    /// Sensor orientation code (direction bits | origin corner)
    #[arg(short, long, default_value = "0")]
    orientation: u32,

    /// Horizontal head sway of the synthetic scene, in pixels
    #[arg(long, default_value = "12.0")]
    sway: f64,

    /// Delay between synthetic frames in milliseconds
    #[arg(long, default_value = "0")]
    frame_interval: u64,

    /// Print estimates in raw measurement units
    #[arg(long)]
    raw_units: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Write the default configuration to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if let Some(path) = &args.write_config {
        Config::default()
            .to_file(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    info!("Depth Head Tracking");

    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };
    if let Some(cascade) = args.cascade {
        config.classifier.cascade_path = cascade;
    }
    config.output.raw_units |= args.raw_units;
    config.validate()?;

    let orientation = Orientation::from_code(args.orientation);
    debug!("Sensor orientation {:?}", orientation);

    let classifier: Box<dyn FaceClassifier> = match args.detector {
        Detector::Haar => Box::new(HaarCascadeClassifier::new(
            &config.classifier.cascade_path,
            config.classifier.scale_factor,
            config.classifier.min_neighbors,
        )?),
        Detector::Blob => Box::new(BrightBlobClassifier),
    };
    let mut tracker = HeadTracker::new(&config, classifier, Box::new(NormedCorrelationMatcher))?;

    let scene = SceneConfig {
        sway: args.sway,
        ..SceneConfig::default()
    };
    let mut source = SyntheticFrameSource::new(scene, orientation);
    if args.frame_interval > 0 {
        source = source.with_frame_interval(Duration::from_millis(args.frame_interval));
    }
    let acquisition = Acquisition::start(source, config.acquisition.max_frames_in_flight)?;

    let scale = tracker.measurement_scale();
    let mut processed = 0;
    while processed < args.frames {
        let Some(frame) = acquisition.recv_timeout(Duration::from_secs(1)) else {
            if acquisition.is_running() {
                continue;
            }
            warn!("Acquisition ended after {} frames", processed);
            break;
        };

        match tracker.process(&frame.buffers) {
            Ok(report) => {
                let estimate = if config.output.raw_units {
                    report.estimate.to_raw_units(scale)
                } else {
                    report.estimate
                };
                info!(
                    "Frame {}: {:?} head at ({:.3}, {:.3}, {:.3})",
                    report.sequence,
                    tracker.tracking_mode(),
                    estimate.x,
                    estimate.y,
                    estimate.z
                );
            }
            Err(e) => warn!("Skipping frame: {}", e),
        }
        frame.release();
        processed += 1;
    }

    acquisition.stop()?;

    if processed < args.frames {
        bail!("Processed {} of {} frames", processed, args.frames);
    }
    info!("Processed {} frames", processed);

    Ok(())
}
