//! Configuration management for the head tracker

use crate::constants::{
    CLASSIFIER_MIN_NEIGHBORS, CLASSIFIER_SCALE_FACTOR, DEFAULT_CASCADE_PATH, INITIAL_ERROR_COVARIANCE,
    INITIAL_HEAD_POSITION, MATCH_THRESHOLD, MAX_FRAMES_IN_FLIGHT, MEASUREMENT_NOISE, MEASUREMENT_SCALE,
    PROCESS_NOISE, WINDOW_RADIUS,
};
use crate::filters::KalmanParams;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Face classifier configuration
    pub classifier: ClassifierConfig,

    /// Template tracking configuration
    pub tracking: TrackingConfig,

    /// Centroid window configuration
    pub estimator: EstimatorConfig,

    /// Kalman filter configuration
    pub filter: FilterConfig,

    /// Frame acquisition configuration
    pub acquisition: AcquisitionConfig,

    /// Published output configuration
    pub output: OutputConfig,
}

/// Haar cascade parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Path to the cascade XML file
    pub cascade_path: PathBuf,

    /// Scale step between pyramid levels (> 1.0)
    pub scale_factor: f64,

    /// Neighbouring detections required per candidate
    pub min_neighbors: i32,
}

/// Correlation tracking parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Score a tracked template must exceed (0.0-1.0, exclusive)
    pub match_threshold: f64,
}

/// Centroid window parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Half-size of the square window around the face center
    pub window_radius: usize,
}

/// Kalman filter tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Process noise covariance diagonal
    pub process_noise: f64,

    /// Measurement noise covariance diagonal
    pub measurement_noise: f64,

    /// Error covariance diagonal after reset
    pub error_covariance: f64,

    /// Factor applied to measurements before filtering
    pub measurement_scale: f64,
}

/// Acquisition parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Frames captured but not yet released before capture pauses
    pub max_frames_in_flight: usize,
}

/// Output parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Head position (raw units) published before the first measurement
    pub initial_head_position: [f64; 3],

    /// Report estimates in raw measurement units instead of filter units
    pub raw_units: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            cascade_path: PathBuf::from(DEFAULT_CASCADE_PATH),
            scale_factor: CLASSIFIER_SCALE_FACTOR,
            min_neighbors: CLASSIFIER_MIN_NEIGHBORS,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            match_threshold: MATCH_THRESHOLD,
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            window_radius: WINDOW_RADIUS,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_noise: PROCESS_NOISE,
            measurement_noise: MEASUREMENT_NOISE,
            error_covariance: INITIAL_ERROR_COVARIANCE,
            measurement_scale: MEASUREMENT_SCALE,
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_frames_in_flight: MAX_FRAMES_IN_FLIGHT,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            initial_head_position: INITIAL_HEAD_POSITION,
            raw_units: false,
        }
    }
}

impl FilterConfig {
    /// Kalman tuning described by this section
    #[must_use]
    pub fn kalman_params(&self) -> KalmanParams {
        KalmanParams {
            process_noise: self.process_noise,
            measurement_noise: self.measurement_noise,
            initial_error_covariance: self.error_covariance,
            measurement_scale: self.measurement_scale,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// The cascade file is not checked here; a missing classifier is
    /// reported when the tracker is built.
    pub fn validate(&self) -> Result<()> {
        if self.classifier.scale_factor <= 1.0 {
            return Err(Error::ConfigError(
                "Classifier scale factor must be greater than 1.0".to_string(),
            ));
        }
        if self.classifier.min_neighbors < 0 {
            return Err(Error::ConfigError(
                "Classifier min neighbors must not be negative".to_string(),
            ));
        }

        if !(self.tracking.match_threshold > 0.0 && self.tracking.match_threshold < 1.0) {
            return Err(Error::ConfigError(
                "Match threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        let filter = &self.filter;
        for (name, value) in [
            ("Process noise", filter.process_noise),
            ("Measurement noise", filter.measurement_noise),
            ("Error covariance", filter.error_covariance),
            ("Measurement scale", filter.measurement_scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::ConfigError(format!("{name} must be a positive number")));
            }
        }

        if self.acquisition.max_frames_in_flight == 0 {
            return Err(Error::ConfigError(
                "At least one frame must be allowed in flight".to_string(),
            ));
        }

        if self.output.initial_head_position.iter().any(|v| !v.is_finite()) {
            return Err(Error::ConfigError(
                "Initial head position must be finite".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Head Tracking Configuration

# Haar cascade face classifier
classifier:
  cascade_path: "haarcascade_frontalface_alt.xml"
  scale_factor: 1.2
  min_neighbors: 2

# Template tracking between classifier detections
tracking:
  match_threshold: 0.85

# Centroid window around the face center
estimator:
  window_radius: 5

# Constant-velocity Kalman filter
filter:
  process_noise: 0.001
  measurement_noise: 200.0
  error_covariance: 1.0
  measurement_scale: 1000.0

# Frame acquisition
acquisition:
  max_frames_in_flight: 3

# Published estimate
output:
  initial_head_position: [0.0, 0.0, 2.0]
  raw_units: false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let parsed: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = serde_yaml::from_str("estimator:\n  window_radius: 7\n").unwrap();
        assert_eq!(parsed.estimator.window_radius, 7);
        assert_eq!(parsed.tracking.match_threshold, MATCH_THRESHOLD);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.tracking.match_threshold = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.classifier.scale_factor = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.filter.measurement_noise = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.acquisition.max_frames_in_flight = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_kalman_params_from_config() {
        let params = FilterConfig::default().kalman_params();
        assert_eq!(params, KalmanParams::default());
    }
}
