//! Helper functions and utilities for tests

#![allow(dead_code)]

use head_tracking::config::Config;
use head_tracking::face_locator::{FaceClassifier, NormedCorrelationMatcher};
use head_tracking::frame::{FrameBuffers, Orientation};
use head_tracking::pipeline::HeadTracker;
use head_tracking::Result;
use opencv::core::{Mat, Rect};
use std::cell::Cell;
use std::rc::Rc;

/// Canonical frame that is empty except for a square patch of identical points
pub fn frame_with_patch(size: usize, patch: Rect, amplitude: f32, coordinate: [f32; 3]) -> FrameBuffers {
    let mut frame = FrameBuffers::zeros(size, size, Orientation::CANONICAL);
    for y in patch.y..patch.y + patch.height {
        for x in patch.x..patch.x + patch.width {
            frame.set_pixel(y as usize, x as usize, amplitude, coordinate, 0);
        }
    }
    frame
}

/// Classifier always reporting `rect`
pub fn fixed_classifier(rect: Option<Rect>) -> Box<dyn FaceClassifier> {
    Box::new(move |_: &Mat| -> Result<Option<Rect>> { Ok(rect) })
}

/// Classifier reporting `rect` and counting its calls
pub fn counting_classifier(rect: Option<Rect>) -> (Box<dyn FaceClassifier>, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let classifier = Box::new(move |_: &Mat| -> Result<Option<Rect>> {
        counter.set(counter.get() + 1);
        Ok(rect)
    });
    (classifier, calls)
}

/// Tracker with default configuration and correlation tracking
pub fn tracker_with(classifier: Box<dyn FaceClassifier>) -> Result<HeadTracker> {
    HeadTracker::new(&Config::default(), classifier, Box::new(NormedCorrelationMatcher))
}

/// Assert `actual` is within `tolerance` of `expected`
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}
