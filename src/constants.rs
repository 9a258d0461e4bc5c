//! Constants used throughout the tracker

/// Scale step between classifier pyramid levels
pub const CLASSIFIER_SCALE_FACTOR: f64 = 1.2;

/// Neighbouring detections required to keep a classifier candidate
pub const CLASSIFIER_MIN_NEIGHBORS: i32 = 2;

/// Default Haar cascade shipped with `OpenCV`
pub const DEFAULT_CASCADE_PATH: &str = "haarcascade_frontalface_alt.xml";

/// Correlation score a tracked template must exceed (exclusive)
pub const MATCH_THRESHOLD: f64 = 0.85;

/// Half-size of the centroid window around the face center
pub const WINDOW_RADIUS: usize = 5;

/// Factor applied to raw measurements before filtering
pub const MEASUREMENT_SCALE: f64 = 1000.0;

/// Diagonal of the process noise covariance
pub const PROCESS_NOISE: f64 = 1e-3;

/// Diagonal of the measurement noise covariance
pub const MEASUREMENT_NOISE: f64 = 2e2;

/// Diagonal of the error covariance after a reset
pub const INITIAL_ERROR_COVARIANCE: f64 = 1.0;

/// Frames the acquisition thread may hand out before waiting for releases
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

/// Head position (raw units) assumed before the first measurement
pub const INITIAL_HEAD_POSITION: [f64; 3] = [0.0, 0.0, 2.0];

/// Gain applied to the linear part of the grayscale mapping
pub const GRAY_LINEAR_GAIN: f64 = 128.0;

/// Gain applied to the logarithmic part of the grayscale mapping
pub const GRAY_LOG_GAIN: f64 = 128.0;
