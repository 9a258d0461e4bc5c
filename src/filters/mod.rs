//! Temporal smoothing of per-frame head position measurements.

/// Constant-velocity Kalman filter over 3D positions
pub mod kalman;

pub use kalman::{FilterState, HeadPositionEstimate, KalmanParams, KalmanSmoother};
