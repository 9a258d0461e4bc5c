//! Real-time head tracking on time-of-flight depth camera frames.
//!
//! Every frame carries an amplitude image, a per-pixel 3D coordinate and
//! per-pixel validity flags. The tracking pipeline:
//! 1. Normalizes the frame to a canonical orientation and builds a
//!    log-compressed grayscale image from the amplitudes
//! 2. Locates the face, with a Haar cascade when cold and by template
//!    correlation once a face has been seen
//! 3. Measures the head position as the amplitude-weighted centroid of the
//!    3D points around the face center
//! 4. Smooths the measurement with a constant-velocity Kalman filter and
//!    publishes the result
//!
//! # Examples
//!
//! ## Tracking a synthetic scene
//!
//! ```no_run
//! use head_tracking::config::Config;
//! use head_tracking::face_locator::NormedCorrelationMatcher;
//! use head_tracking::frame::Orientation;
//! use head_tracking::pipeline::HeadTracker;
//! use head_tracking::synthetic::{BrightBlobClassifier, SceneConfig, SyntheticFrameSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let mut tracker = HeadTracker::new(
//!     &config,
//!     Box::new(BrightBlobClassifier),
//!     Box::new(NormedCorrelationMatcher),
//! )?;
//!
//! let source = SyntheticFrameSource::new(SceneConfig::default(), Orientation::CANONICAL);
//! for index in 0..10 {
//!     let report = tracker.process(&source.render(index))?;
//!     let raw = report.estimate.to_raw_units(tracker.measurement_scale());
//!     println!("Head at ({:.3}, {:.3}, {:.3})", raw.x, raw.y, raw.z);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Reading estimates from another thread
//!
//! ```no_run
//! use head_tracking::config::Config;
//! use head_tracking::pipeline::HeadTracker;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = HeadTracker::from_config(&Config::default())?;
//! let reader = tracker.reader();
//!
//! std::thread::spawn(move || {
//!     if let Some(snapshot) = reader.latest() {
//!         println!("Frame {}: {:?}", snapshot.sequence, snapshot.estimate);
//!     }
//! });
//! # Ok(())
//! # }
//! ```

/// Raw frame buffers, sensor orientation and pixel flags
pub mod frame;

/// Orientation normalization and grayscale conversion
pub mod normalizer;

/// Cold/warm face localisation
pub mod face_locator;

/// Amplitude-weighted centroid of 3D points around the face
pub mod estimator;

/// Kalman smoothing of head positions
pub mod filters;

/// Publication of estimates to other threads
pub mod publish;

/// Background frame acquisition
pub mod acquisition;

/// Synthetic depth scenes
pub mod synthetic;

/// The per-frame tracking pipeline
pub mod pipeline;

/// Utility functions for image processing and numeric conversions
pub mod utils;

/// Error types and result handling
pub mod error;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
