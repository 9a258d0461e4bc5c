//! Per-frame head tracking pipeline.
//!
//! [`HeadTracker`] runs normalization, face location, centroid estimation and
//! Kalman smoothing strictly in sequence and publishes exactly one estimate
//! per processed frame.

use crate::config::Config;
use crate::estimator::{Measurement, PositionEstimator};
use crate::face_locator::{
    FaceClassifier, FaceLocator, FaceLocatorState, HaarCascadeClassifier, Location, NormedCorrelationMatcher,
    TemplateMatcher, TrackingMode,
};
use crate::filters::{FilterState, HeadPositionEstimate, KalmanSmoother};
use crate::frame::FrameBuffers;
use crate::normalizer::CoordinateNormalizer;
use crate::publish::{EstimatePublisher, EstimateReader};
use crate::Result;
use log::{debug, info, warn};
use nalgebra::Vector3;

/// Outcome of processing one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Where the face was found, if anywhere
    pub location: Location,
    /// Raw centroid measured around the face center
    pub measurement: Measurement,
    /// Estimate published for this frame, in filter units
    pub estimate: HeadPositionEstimate,
    /// Sequence number of the published snapshot
    pub sequence: u64,
}

/// Sequential depth-frame head tracker
pub struct HeadTracker {
    normalizer: CoordinateNormalizer,
    locator: FaceLocator,
    locator_state: FaceLocatorState,
    estimator: PositionEstimator,
    smoother: KalmanSmoother,
    filter_state: FilterState,
    publisher: EstimatePublisher,
    // Last raw centroid, kept across frames without a measurement
    head_position: Vector3<f64>,
    last_estimate: HeadPositionEstimate,
    // Face lost while the filter held a track; the next detection restarts it
    track_lost: bool,
}

impl HeadTracker {
    /// Build a tracker around the given face classifier and template matcher
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid
    pub fn new(
        config: &Config,
        classifier: Box<dyn FaceClassifier>,
        matcher: Box<dyn TemplateMatcher>,
    ) -> Result<Self> {
        config.validate()?;

        let params = config.filter.kalman_params();
        let smoother = KalmanSmoother::new(params);
        let mut filter_state = FilterState::new();
        smoother.reset(&mut filter_state);

        let [x, y, z] = config.output.initial_head_position;
        let head_position = Vector3::new(x, y, z);

        Ok(Self {
            normalizer: CoordinateNormalizer::new(),
            locator: FaceLocator::with_matcher(classifier, matcher, config.tracking.match_threshold),
            locator_state: FaceLocatorState::new(),
            estimator: PositionEstimator::new(config.estimator.window_radius),
            smoother,
            filter_state,
            publisher: EstimatePublisher::new(),
            head_position,
            last_estimate: (head_position * params.measurement_scale).into(),
            track_lost: false,
        })
    }

    /// Build a tracker with the configured Haar cascade and correlation tracking
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassifierUnavailable`](crate::Error::ClassifierUnavailable)
    /// if the cascade cannot be loaded, or error if the configuration is invalid
    pub fn from_config(config: &Config) -> Result<Self> {
        let classifier = HaarCascadeClassifier::new(
            &config.classifier.cascade_path,
            config.classifier.scale_factor,
            config.classifier.min_neighbors,
        )?;
        Self::new(config, Box::new(classifier), Box::new(NormedCorrelationMatcher))
    }

    /// Process one frame and publish its estimate
    ///
    /// Failures inside face location degrade to "no face" for this frame
    /// and return the locator to cold. Frames without a face coast on the
    /// filter's prediction; the detection that reacquires the face restarts
    /// the filter from its measurement.
    ///
    /// # Errors
    ///
    /// Returns error if the frame buffers are inconsistent; nothing is
    /// published and all state is retained
    pub fn process(&mut self, frame: &FrameBuffers) -> Result<FrameReport> {
        let grid = self.normalizer.normalize(frame)?;

        let mode_before = self.locator_state.mode();
        let location = match self.locator.locate(&mut self.locator_state, &grid.gray) {
            Ok(location) => location,
            Err(e) => {
                warn!("Face location failed, treating frame as empty: {}", e);
                Location::NotFound
            }
        };
        let mode_after = self.locator_state.mode();
        if mode_before != mode_after {
            debug!("Tracking mode {:?} -> {:?}", mode_before, mode_after);
        }

        match location {
            Location::NotFound if self.filter_state.is_seeded() => {
                if !self.track_lost {
                    debug!("Track lost, coasting on prediction");
                }
                self.track_lost = true;
            }
            Location::FreshDetection { .. } if self.track_lost => {
                debug!("Face reacquired, restarting filter");
                self.smoother.reset(&mut self.filter_state);
                self.track_lost = false;
            }
            _ => {}
        }

        let measurement = location.center().and_then(|center| self.estimator.estimate(grid, center));
        if let Some(position) = measurement {
            self.head_position = position;
        }

        let estimate = self
            .smoother
            .step(&mut self.filter_state, measurement)
            .unwrap_or(self.last_estimate);
        self.last_estimate = estimate;
        let snapshot = self.publisher.publish(estimate);

        Ok(FrameReport {
            location,
            measurement,
            estimate,
            sequence: snapshot.sequence,
        })
    }

    /// Drop the tracked template and restart the filter
    pub fn reset_tracking(&mut self) {
        self.locator.reset(&mut self.locator_state);
        self.smoother.reset(&mut self.filter_state);
        self.track_lost = false;
        info!("Tracking reset");
    }

    /// Reader of the estimates this tracker publishes
    #[must_use]
    pub fn reader(&self) -> EstimateReader {
        self.publisher.reader()
    }

    #[must_use]
    pub fn tracking_mode(&self) -> TrackingMode {
        self.locator_state.mode()
    }

    #[must_use]
    pub fn locator_state(&self) -> &FaceLocatorState {
        &self.locator_state
    }

    #[must_use]
    pub fn filter_state(&self) -> &FilterState {
        &self.filter_state
    }

    /// Last raw centroid (raw units)
    #[must_use]
    pub fn head_position(&self) -> Vector3<f64> {
        self.head_position
    }

    /// Last published estimate, or the initial estimate before any frame
    #[must_use]
    pub fn last_estimate(&self) -> HeadPositionEstimate {
        self.last_estimate
    }

    /// Factor between raw units and filter units
    #[must_use]
    pub fn measurement_scale(&self) -> f64 {
        self.smoother.params().measurement_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face_locator::TemplateMatch;
    use crate::frame::Orientation;
    use crate::Error;
    use opencv::core::{Mat, Point, Rect};

    fn frame_with_patch(value: [f32; 3]) -> FrameBuffers {
        let mut frame = FrameBuffers::zeros(20, 20, Orientation::CANONICAL);
        for i in 8..13 {
            for j in 8..13 {
                frame.set_pixel(i, j, 1.0, value, 0);
            }
        }
        frame
    }

    fn fixed_detection(rect: Option<Rect>) -> Box<dyn FaceClassifier> {
        Box::new(move |_: &Mat| -> Result<Option<Rect>> { Ok(rect) })
    }

    fn failing_matcher() -> Box<dyn TemplateMatcher> {
        Box::new(|_: &Mat, _: &Mat| -> Result<TemplateMatch> {
            Err(Error::InvalidInput("matcher unavailable".to_string()))
        })
    }

    #[test]
    fn test_measurement_feeds_filter() {
        let mut tracker = HeadTracker::new(
            &Config::default(),
            fixed_detection(Some(Rect::new(6, 6, 9, 9))),
            Box::new(NormedCorrelationMatcher),
        )
        .unwrap();

        let report = tracker.process(&frame_with_patch([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(report.location.center(), Some(Point::new(10, 10)));
        assert_eq!(report.measurement, Some(Vector3::new(1.0, 2.0, 3.0)));
        assert!((report.estimate.z - 3000.0).abs() < 1e-6);
        assert_eq!(tracker.reader().latest().map(|s| s.estimate), Some(report.estimate));
    }

    #[test]
    fn test_initial_estimate_republished_without_face() {
        let mut tracker = HeadTracker::new(
            &Config::default(),
            fixed_detection(None),
            Box::new(NormedCorrelationMatcher),
        )
        .unwrap();

        let report = tracker.process(&frame_with_patch([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(report.location, Location::NotFound);
        assert_eq!(report.estimate, HeadPositionEstimate::new(0.0, 0.0, 2000.0));
        assert_eq!(tracker.head_position(), Vector3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_locator_failure_degrades_to_not_found() {
        let mut tracker = HeadTracker::new(
            &Config::default(),
            fixed_detection(Some(Rect::new(6, 6, 9, 9))),
            failing_matcher(),
        )
        .unwrap();

        // Cold: detection only, matcher unused
        tracker.process(&frame_with_patch([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(tracker.tracking_mode(), TrackingMode::Warm);

        // Warm: the matcher fails
        let report = tracker.process(&frame_with_patch([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(report.location, Location::NotFound);
        assert_eq!(report.measurement, None);
        assert_eq!(tracker.tracking_mode(), TrackingMode::Cold);
        assert_eq!(report.sequence, 1);
    }

    #[test]
    fn test_invalid_frame_is_rejected_without_publishing() {
        let mut tracker = HeadTracker::new(
            &Config::default(),
            fixed_detection(None),
            Box::new(NormedCorrelationMatcher),
        )
        .unwrap();

        let mut frame = frame_with_patch([1.0, 2.0, 3.0]);
        frame.flags.pop();
        assert!(matches!(tracker.process(&frame), Err(Error::InvalidFrame(_))));
        assert_eq!(tracker.reader().latest(), None);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.tracking.match_threshold = 2.0;
        let result = HeadTracker::new(&config, fixed_detection(None), Box::new(NormedCorrelationMatcher));
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_missing_cascade_is_fatal() {
        let mut config = Config::default();
        config.classifier.cascade_path = "/nonexistent/cascade.xml".into();
        assert!(matches!(
            HeadTracker::from_config(&config),
            Err(Error::ClassifierUnavailable(_))
        ));
    }
}
