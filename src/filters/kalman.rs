use crate::constants::{INITIAL_ERROR_COVARIANCE, MEASUREMENT_NOISE, MEASUREMENT_SCALE, PROCESS_NOISE};
use crate::estimator::Measurement;
use log::{debug, warn};
use nalgebra::{Matrix3, Matrix3x6, Matrix6, Vector3, Vector6};

/// Smoothed head position in filter units (raw units × measurement scale)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPositionEstimate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl HeadPositionEstimate {
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert back to the units of the raw measurement
    #[must_use]
    pub fn to_raw_units(self, scale: f64) -> Self {
        Self::new(self.x / scale, self.y / scale, self.z / scale)
    }

    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl From<Vector3<f64>> for HeadPositionEstimate {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Tuning of the constant-velocity model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanParams {
    /// Diagonal of the process noise covariance
    pub process_noise: f64,
    /// Diagonal of the measurement noise covariance
    pub measurement_noise: f64,
    /// Diagonal of the error covariance after a reset
    pub initial_error_covariance: f64,
    /// Factor applied to raw measurements before filtering
    pub measurement_scale: f64,
}

impl Default for KalmanParams {
    fn default() -> Self {
        Self {
            process_noise: PROCESS_NOISE,
            measurement_noise: MEASUREMENT_NOISE,
            initial_error_covariance: INITIAL_ERROR_COVARIANCE,
            measurement_scale: MEASUREMENT_SCALE,
        }
    }
}

/// Recursive estimate of position and velocity
#[derive(Debug, Clone)]
pub struct FilterState {
    // State: [x, y, z, vx, vy, vz]
    state: Vector6<f64>,
    // Error covariance
    covariance: Matrix6<f64>,
    // Measurement matrix (position block only)
    measurement: Matrix3x6<f64>,
    // Process noise
    process_noise: Matrix6<f64>,
    // Measurement noise
    measurement_noise: Matrix3<f64>,
    initialized: bool,
    seeded: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterState {
    /// An uninitialized state; it is reset on first use
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Vector6::zeros(),
            covariance: Matrix6::zeros(),
            measurement: Matrix3x6::zeros(),
            process_noise: Matrix6::zeros(),
            measurement_noise: Matrix3::zeros(),
            initialized: false,
            seeded: false,
        }
    }

    /// Whether a reset has happened since construction
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether a measurement has been fused since the last reset
    #[must_use]
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    #[must_use]
    pub fn position(&self) -> Vector3<f64> {
        self.state.fixed_rows::<3>(0).into_owned()
    }

    #[must_use]
    pub fn velocity(&self) -> Vector3<f64> {
        self.state.fixed_rows::<3>(3).into_owned()
    }

    #[must_use]
    pub fn covariance(&self) -> &Matrix6<f64> {
        &self.covariance
    }
}

/// Constant-velocity Kalman filter over 3D head positions
///
/// Position advances by velocity every frame; only position is observed.
/// The noise tuning trusts the model far more than single measurements.
#[derive(Debug, Clone)]
pub struct KalmanSmoother {
    params: KalmanParams,
    // State transition matrix
    transition: Matrix6<f64>,
}

impl Default for KalmanSmoother {
    fn default() -> Self {
        Self::new(KalmanParams::default())
    }
}

impl KalmanSmoother {
    #[must_use]
    pub fn new(params: KalmanParams) -> Self {
        #[rustfmt::skip]
        let transition = Matrix6::new(
            1.0, 0.0, 0.0, 1.0, 0.0, 0.0, // x + dx
            0.0, 1.0, 0.0, 0.0, 1.0, 0.0, // y + dy
            0.0, 0.0, 1.0, 0.0, 0.0, 1.0, // z + dz
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        );
        Self { params, transition }
    }

    #[must_use]
    pub fn params(&self) -> &KalmanParams {
        &self.params
    }

    /// Restore measurement model, noise and error covariances to their
    /// defaults and zero the state
    pub fn reset(&self, state: &mut FilterState) {
        state.state = Vector6::zeros();
        state.covariance = Matrix6::identity() * self.params.initial_error_covariance;
        state.measurement = Matrix3x6::identity();
        state.process_noise = Matrix6::identity() * self.params.process_noise;
        state.measurement_noise = Matrix3::identity() * self.params.measurement_noise;
        state.initialized = true;
        state.seeded = false;
    }

    /// Advance the state one frame; returns the prior position
    pub fn predict(&self, state: &mut FilterState) -> HeadPositionEstimate {
        self.ensure_initialized(state);

        state.state = self.transition * state.state;
        state.covariance = self.transition * state.covariance * self.transition.transpose() + state.process_noise;

        state.position().into()
    }

    /// Fuse a raw measurement into the predicted state; returns the posterior position
    pub fn correct(&self, state: &mut FilterState, measurement: Vector3<f64>) -> HeadPositionEstimate {
        self.ensure_initialized(state);
        let measurement = measurement * self.params.measurement_scale;

        // Innovation
        let innovation = measurement - state.measurement * state.state;

        // Innovation covariance
        let innovation_cov =
            state.measurement * state.covariance * state.measurement.transpose() + state.measurement_noise;

        let Some(innovation_inv) = innovation_cov.try_inverse() else {
            warn!("Singular innovation covariance, skipping correction");
            return state.position().into();
        };

        // Kalman gain
        let gain = state.covariance * state.measurement.transpose() * innovation_inv;

        state.state += gain * innovation;
        state.covariance = (Matrix6::identity() - gain * state.measurement) * state.covariance;
        state.seeded = true;

        state.position().into()
    }

    /// Run one frame of the filter
    ///
    /// The first measurement after a reset seeds the position with zero
    /// velocity. Without a measurement the filter only predicts; before any
    /// measurement has been seen there is nothing to predict from and `None`
    /// is returned.
    pub fn step(&self, state: &mut FilterState, measurement: Measurement) -> Option<HeadPositionEstimate> {
        match measurement {
            Some(m) => {
                if !state.seeded {
                    self.seed(state, m);
                }
                self.predict(state);
                Some(self.correct(state, m))
            }
            None if state.seeded => Some(self.predict(state)),
            None => None,
        }
    }

    fn seed(&self, state: &mut FilterState, measurement: Vector3<f64>) {
        self.ensure_initialized(state);
        let position = measurement * self.params.measurement_scale;
        state.state = Vector6::new(position.x, position.y, position.z, 0.0, 0.0, 0.0);
        debug!("Seeded filter at {:?}", position);
    }

    fn ensure_initialized(&self, state: &mut FilterState) {
        if !state.initialized {
            debug!("Filter used before reset, resetting");
            self.reset(state);
        }
    }
}
