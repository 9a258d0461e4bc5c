//! Deterministic depth scene for demos, benchmarks and tests.
//!
//! Renders a rounded "head" in front of a flat wall as seen by a pinhole
//! depth camera, then writes the result in the raw layout of any sensor
//! orientation.

use crate::acquisition::FrameSource;
use crate::face_locator::FaceClassifier;
use crate::frame::{FrameBuffers, Orientation, PixelFlags, ScanDirection};
use crate::normalizer::{canonical_index, canonical_size};
use crate::Result;
use opencv::core::{self, Mat, Point, Rect, Vector};
use opencv::imgproc;
use std::f64::consts::TAU;
use std::thread;
use std::time::Duration;

// Depth by which the head's front surface bulges toward the camera
const HEAD_BULGE: f64 = 0.1;

/// Scene parameters, in canonical pixel coordinates and raw world units
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Canonical image width
    pub width: usize,
    /// Canonical image height
    pub height: usize,
    /// Focal length in pixels
    pub focal_length: f64,
    /// Head center at frame zero
    pub head_center: (f64, f64),
    pub head_radius: f64,
    pub head_depth: f64,
    pub head_amplitude: f64,
    pub wall_depth: f64,
    pub wall_amplitude: f64,
    /// Horizontal sway of the head, in pixels
    pub sway: f64,
    /// Frames per sway cycle
    pub sway_period: usize,
    /// Width of the border whose depth is marked inconsistent
    pub inconsistent_border: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 160,
            height: 120,
            focal_length: 140.0,
            head_center: (80.0, 55.0),
            head_radius: 22.0,
            head_depth: 0.9,
            head_amplitude: 1800.0,
            wall_depth: 2.5,
            wall_amplitude: 120.0,
            sway: 0.0,
            sway_period: 120,
            inconsistent_border: 1,
        }
    }
}

/// Frame source rendering [`SceneConfig`] frame after frame
#[derive(Debug, Clone)]
pub struct SyntheticFrameSource {
    scene: SceneConfig,
    orientation: Orientation,
    frame_interval: Option<Duration>,
    frame_index: usize,
}

impl SyntheticFrameSource {
    #[must_use]
    pub fn new(scene: SceneConfig, orientation: Orientation) -> Self {
        Self {
            scene,
            orientation,
            frame_interval: None,
            frame_index: 0,
        }
    }

    /// Sleep between frames to mimic a camera frame rate
    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn scene(&self) -> &SceneConfig {
        &self.scene
    }

    /// Canonical head center in frame `index`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn head_center(&self, index: usize) -> (f64, f64) {
        let (cx, cy) = self.scene.head_center;
        let period = self.scene.sway_period.max(1);
        let phase = TAU * (index % period) as f64 / period as f64;
        (cx + self.scene.sway * phase.sin(), cy)
    }

    /// Canonical bounding box of the head in frame `index`
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn head_rect(&self, index: usize) -> Rect {
        let (cx, cy) = self.head_center(index);
        let r = self.scene.head_radius;
        Rect::new(
            (cx - r).round() as i32,
            (cy - r).round() as i32,
            (2.0 * r).round() as i32,
            (2.0 * r).round() as i32,
        )
    }

    /// World position (raw units) of the head surface point facing the camera
    #[must_use]
    pub fn head_position(&self, index: usize) -> [f64; 3] {
        let (cx, cy) = self.head_center(index);
        let depth = self.scene.head_depth - HEAD_BULGE;
        let (x, y) = self.back_project(cx, cy, depth);
        [x, y, depth]
    }

    /// Render frame `index` in this source's raw orientation
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::cast_possible_truncation)]
    pub fn render(&self, index: usize) -> FrameBuffers {
        let scene = &self.scene;
        let (rows, columns) = match self.orientation.direction {
            ScanDirection::RowMajor => (scene.height, scene.width),
            ScanDirection::ColumnMajor => (scene.width, scene.height),
        };
        debug_assert_eq!(canonical_size(self.orientation, rows, columns), (scene.width, scene.height));

        let (hx, hy) = self.head_center(index);
        let mut frame = FrameBuffers::zeros(rows, columns, self.orientation);

        for i in 0..rows {
            for j in 0..columns {
                let c = canonical_index(self.orientation, rows, columns, i, j);
                let (px, py) = (c.x as f64, c.y as f64);

                let d = ((px - hx).powi(2) + (py - hy).powi(2)).sqrt() / scene.head_radius;
                let (depth, amplitude) = if d < 1.0 {
                    // Rounded front surface, brightest at the center
                    let bulge = HEAD_BULGE * (1.0 - d * d).sqrt();
                    (scene.head_depth - bulge, scene.head_amplitude * (1.0 - 0.5 * d * d))
                } else {
                    (scene.wall_depth, scene.wall_amplitude)
                };

                let (x, y) = self.back_project(px, py, depth);
                let raw = sensor_coordinate(self.orientation.direction, [x as f32, y as f32, depth as f32]);

                let border = scene.inconsistent_border;
                let on_border =
                    c.x < border || c.y < border || c.x + border >= scene.width || c.y + border >= scene.height;
                let flags = if on_border { PixelFlags::INCONSISTENT } else { 0 };

                frame.set_pixel(i, j, amplitude as f32, raw, flags);
            }
        }
        frame
    }

    #[allow(clippy::cast_precision_loss)]
    fn back_project(&self, px: f64, py: f64, depth: f64) -> (f64, f64) {
        let cx = (self.scene.width as f64 - 1.0) / 2.0;
        let cy = (self.scene.height as f64 - 1.0) / 2.0;
        (
            (px - cx) * depth / self.scene.focal_length,
            (py - cy) * depth / self.scene.focal_length,
        )
    }
}

impl FrameSource for SyntheticFrameSource {
    fn next_frame(&mut self) -> Result<FrameBuffers> {
        if let Some(interval) = self.frame_interval {
            thread::sleep(interval);
        }
        let frame = self.render(self.frame_index);
        self.frame_index += 1;
        Ok(frame)
    }
}

/// Classifier for synthetic scenes: the bounding box of the bright region
///
/// Pixels brighter than the midpoint between the darkest and brightest
/// gray level are foreground. A flat image has no face.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrightBlobClassifier;

impl FaceClassifier for BrightBlobClassifier {
    fn detect_largest(&mut self, image: &Mat) -> Result<Option<Rect>> {
        let mut min_val = 0.0;
        let mut max_val = 0.0;
        core::min_max_loc(image, Some(&mut min_val), Some(&mut max_val), None, None, &Mat::default())?;
        if max_val - min_val < 1.0 {
            return Ok(None);
        }

        let mut mask = Mat::default();
        imgproc::threshold(image, &mut mask, (min_val + max_val) / 2.0, 255.0, imgproc::THRESH_BINARY)?;

        let mut foreground = Vector::<Point>::new();
        core::find_non_zero(&mask, &mut foreground)?;
        if foreground.is_empty() {
            return Ok(None);
        }
        Ok(Some(imgproc::bounding_rect(&foreground)?))
    }
}

/// Inverse of the canonical axis rotation: the raw coordinate a sensor with
/// `direction` reports for a canonical world coordinate
#[must_use]
pub fn sensor_coordinate(direction: ScanDirection, canonical: [f32; 3]) -> [f32; 3] {
    match direction {
        ScanDirection::ColumnMajor => [-canonical[1], canonical[0], canonical[2]],
        ScanDirection::RowMajor => canonical,
    }
}
