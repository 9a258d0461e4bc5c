//! Face localisation with a cold/warm state machine.
//!
//! A frame is first searched with a Haar cascade classifier (cold). Once a
//! face is found its grayscale patch is cached and subsequent frames are
//! searched by normalized cross-correlation against that patch (warm), which
//! is far cheaper than running the classifier. When the correlation drops to
//! or below the threshold the patch is discarded and the same frame is
//! searched once more with the classifier.

use crate::constants::{CLASSIFIER_MIN_NEIGHBORS, CLASSIFIER_SCALE_FACTOR, MATCH_THRESHOLD};
use crate::utils::{clip_rect, rect_center};
use crate::{Error, Result};
use log::{debug, info, trace};
use opencv::core::{self, Mat, Point, Rect, Size, Vector};
use opencv::imgproc;
use opencv::objdetect::{self, CascadeClassifier};
use opencv::prelude::*;
use std::path::Path;

/// Something that finds face candidates in a grayscale image
pub trait FaceClassifier {
    /// Return the largest face candidate, if any
    fn detect_largest(&mut self, image: &Mat) -> Result<Option<Rect>>;
}

impl<F> FaceClassifier for F
where
    F: FnMut(&Mat) -> Result<Option<Rect>>,
{
    fn detect_largest(&mut self, image: &Mat) -> Result<Option<Rect>> {
        self(image)
    }
}

/// Best placement of a template inside an image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateMatch {
    /// Top-left corner of the best placement
    pub location: Point,
    /// Correlation score at that placement
    pub score: f64,
}

/// Something that locates a template inside an image
pub trait TemplateMatcher {
    /// Find the placement with the highest score
    fn best_match(&self, image: &Mat, template: &Mat) -> Result<TemplateMatch>;
}

impl<F> TemplateMatcher for F
where
    F: Fn(&Mat, &Mat) -> Result<TemplateMatch>,
{
    fn best_match(&self, image: &Mat, template: &Mat) -> Result<TemplateMatch> {
        self(image, template)
    }
}

/// Haar cascade face classifier
pub struct HaarCascadeClassifier {
    cascade: CascadeClassifier,
    scale_factor: f64,
    min_neighbors: i32,
}

impl HaarCascadeClassifier {
    /// Load a cascade from an `OpenCV` XML file
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassifierUnavailable`] if the file is missing or
    /// does not hold a usable cascade
    pub fn new<P: AsRef<Path>>(cascade_path: P, scale_factor: f64, min_neighbors: i32) -> Result<Self> {
        let path = cascade_path.as_ref();
        if !path.exists() {
            return Err(Error::ClassifierUnavailable(format!(
                "Cascade file not found: {}",
                path.display()
            )));
        }
        let path_str = path.to_str().ok_or_else(|| {
            Error::ClassifierUnavailable(format!("Cascade path is not valid UTF-8: {}", path.display()))
        })?;

        let cascade = CascadeClassifier::new(path_str)
            .map_err(|e| Error::ClassifierUnavailable(format!("Can't load cascade {}: {e}", path.display())))?;
        if cascade.empty()? {
            return Err(Error::ClassifierUnavailable(format!(
                "Cascade {} is empty",
                path.display()
            )));
        }

        info!("Loaded face cascade from {}", path.display());
        Ok(Self {
            cascade,
            scale_factor,
            min_neighbors,
        })
    }

    /// Load a cascade with the default detection parameters
    ///
    /// # Errors
    ///
    /// See [`HaarCascadeClassifier::new`]
    pub fn with_defaults<P: AsRef<Path>>(cascade_path: P) -> Result<Self> {
        Self::new(cascade_path, CLASSIFIER_SCALE_FACTOR, CLASSIFIER_MIN_NEIGHBORS)
    }
}

impl FaceClassifier for HaarCascadeClassifier {
    fn detect_largest(&mut self, image: &Mat) -> Result<Option<Rect>> {
        let mut faces = Vector::<Rect>::new();
        self.cascade.detect_multi_scale(
            image,
            &mut faces,
            self.scale_factor,
            self.min_neighbors,
            objdetect::CASCADE_FIND_BIGGEST_OBJECT | objdetect::CASCADE_SCALE_IMAGE,
            Size::new(0, 0),
            Size::new(0, 0),
        )?;

        Ok(faces.iter().max_by_key(|r| i64::from(r.width) * i64::from(r.height)))
    }
}

/// Normalized cross-correlation (`TM_CCOEFF_NORMED`) template matcher
#[derive(Debug, Clone, Copy, Default)]
pub struct NormedCorrelationMatcher;

impl TemplateMatcher for NormedCorrelationMatcher {
    fn best_match(&self, image: &Mat, template: &Mat) -> Result<TemplateMatch> {
        // Result has (image - template + 1) entries per axis, one per valid offset
        let mut scores = Mat::default();
        imgproc::match_template(image, template, &mut scores, imgproc::TM_CCOEFF_NORMED, &Mat::default())?;

        let mut max_val = 0.0;
        let mut max_loc = Point::default();
        core::min_max_loc(&scores, None, Some(&mut max_val), None, Some(&mut max_loc), &Mat::default())?;

        Ok(TemplateMatch {
            location: max_loc,
            score: max_val,
        })
    }
}

/// Whether a template is cached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    /// No template: the classifier must run
    Cold,
    /// Template cached: correlation tracking is tried first
    Warm,
}

/// Tracker state carried across frames
#[derive(Debug, Default)]
pub struct FaceLocatorState {
    template: Option<Mat>,
    last_bbox: Option<Rect>,
}

impl FaceLocatorState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Warm exactly when a template is cached
    #[must_use]
    pub fn mode(&self) -> TrackingMode {
        if self.template.is_some() {
            TrackingMode::Warm
        } else {
            TrackingMode::Cold
        }
    }

    #[must_use]
    pub fn template(&self) -> Option<&Mat> {
        self.template.as_ref()
    }

    /// Last bounding box reported by a detection or a tracked match
    ///
    /// This is the last known face, not necessarily the current one: it
    /// survives lost tracks and [`clear`](Self::clear).
    #[must_use]
    pub fn last_bbox(&self) -> Option<Rect> {
        self.last_bbox
    }

    /// Drop the template and return to cold; the last known box is kept
    pub fn clear(&mut self) {
        self.template = None;
    }
}

/// Outcome of one [`FaceLocator::locate`] call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Location {
    /// No face in this frame
    NotFound,
    /// Found by the classifier
    FreshDetection { bbox: Rect, center: Point },
    /// Found by correlation against the cached template
    Tracked { bbox: Rect, center: Point },
}

impl Location {
    #[must_use]
    pub fn center(&self) -> Option<Point> {
        match *self {
            Self::NotFound => None,
            Self::FreshDetection { center, .. } | Self::Tracked { center, .. } => Some(center),
        }
    }

    #[must_use]
    pub fn bbox(&self) -> Option<Rect> {
        match *self {
            Self::NotFound => None,
            Self::FreshDetection { bbox, .. } | Self::Tracked { bbox, .. } => Some(bbox),
        }
    }
}

/// Finds the face in canonical grayscale images
pub struct FaceLocator {
    classifier: Box<dyn FaceClassifier>,
    matcher: Box<dyn TemplateMatcher>,
    match_threshold: f64,
}

impl FaceLocator {
    /// Create a locator using normalized cross-correlation for tracking
    pub fn new(classifier: Box<dyn FaceClassifier>) -> Self {
        Self::with_matcher(classifier, Box::new(NormedCorrelationMatcher), MATCH_THRESHOLD)
    }

    /// Create a locator with a custom matcher and acceptance threshold
    pub fn with_matcher(
        classifier: Box<dyn FaceClassifier>,
        matcher: Box<dyn TemplateMatcher>,
        match_threshold: f64,
    ) -> Self {
        Self {
            classifier,
            matcher,
            match_threshold,
        }
    }

    /// Locate the face in `image`, updating `state`
    ///
    /// A warm miss falls back to exactly one classifier attempt on the same
    /// image.
    ///
    /// # Errors
    ///
    /// Returns error if an `OpenCV` call fails. The state is cold afterwards.
    pub fn locate(&mut self, state: &mut FaceLocatorState, image: &Mat) -> Result<Location> {
        if let Some(template) = state.template.take() {
            if let Some(location) = self.track(state, &template, image)? {
                return Ok(location);
            }
            debug!("Lost tracked face, falling back to detection");
        }
        self.detect(state, image)
    }

    /// Discard the template and return to cold
    pub fn reset(&self, state: &mut FaceLocatorState) {
        state.clear();
    }

    fn track(&self, state: &mut FaceLocatorState, template: &Mat, image: &Mat) -> Result<Option<Location>> {
        if template.cols() > image.cols() || template.rows() > image.rows() {
            debug!(
                "Template {}x{} no longer fits image {}x{}",
                template.cols(),
                template.rows(),
                image.cols(),
                image.rows()
            );
            return Ok(None);
        }

        let best = self.matcher.best_match(image, template)?;
        trace!("Best template score {:.3} at {:?}", best.score, best.location);
        if best.score <= self.match_threshold || best.score.is_nan() {
            return Ok(None);
        }

        let bbox = Rect::new(best.location.x, best.location.y, template.cols(), template.rows());
        state.template = Some(crop(image, bbox)?);
        state.last_bbox = Some(bbox);
        Ok(Some(Location::Tracked {
            bbox,
            center: rect_center(bbox),
        }))
    }

    fn detect(&mut self, state: &mut FaceLocatorState, image: &Mat) -> Result<Location> {
        let candidate = self.classifier.detect_largest(image)?;
        let Some(bbox) = candidate.and_then(|r| clip_rect(r, image.cols(), image.rows())) else {
            return Ok(Location::NotFound);
        };

        state.template = Some(crop(image, bbox)?);
        state.last_bbox = Some(bbox);
        debug!("Detected face at {:?}, tracking", bbox);
        Ok(Location::FreshDetection {
            bbox,
            center: rect_center(bbox),
        })
    }
}

/// Copy a region of `image` into its own buffer
fn crop(image: &Mat, rect: Rect) -> Result<Mat> {
    let roi = Mat::roi(image, rect)?;
    Ok(roi.try_clone()?)
}
