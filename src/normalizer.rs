//! Remapping of raw sensor buffers into one canonical pixel grid.
//!
//! Depth cameras may be mounted in any of four rotations and scan either
//! row- or column-major. The normalizer removes that variation: every
//! downstream stage sees a top-left-origin, row-major grid and a world
//! frame whose x axis points along the canonical columns.

use crate::constants::{GRAY_LINEAR_GAIN, GRAY_LOG_GAIN};
use crate::frame::{FrameBuffers, Orientation, ScanDirection};
use crate::utils::image_conversion::new_gray_mat;
use crate::utils::safe_cast::f64_to_u8_clamp;
use crate::Result;
use log::debug;
use ndarray::{Array2, Array3};
use opencv::core::Mat;
use opencv::prelude::*;

/// Canonical position of a raw pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalIndex {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// Map raw (row `i`, column `j`) of a `rows` × `columns` frame to canonical (x, y)
#[must_use]
pub fn canonical_index(orientation: Orientation, rows: usize, columns: usize, i: usize, j: usize) -> CanonicalIndex {
    let (mut x, mut y, width, height) = match orientation.direction {
        ScanDirection::ColumnMajor => (i, j, rows, columns),
        ScanDirection::RowMajor => (j, i, columns, rows),
    };
    if orientation.origin.is_right() {
        x = width - 1 - x;
    }
    if orientation.origin.is_bottom() {
        y = height - 1 - y;
    }
    CanonicalIndex { x, y, width, height }
}

/// Canonical (width, height) of a raw frame
#[must_use]
pub fn canonical_size(orientation: Orientation, rows: usize, columns: usize) -> (usize, usize) {
    match orientation.direction {
        ScanDirection::ColumnMajor => (rows, columns),
        ScanDirection::RowMajor => (columns, rows),
    }
}

/// Rotate a raw coordinate into the canonical world frame
#[must_use]
pub fn canonical_coordinate(direction: ScanDirection, raw: [f32; 3]) -> [f32; 3] {
    match direction {
        ScanDirection::ColumnMajor => [raw[1], -raw[0], raw[2]],
        ScanDirection::RowMajor => raw,
    }
}

/// Log-compressed display intensity of one amplitude
///
/// Negative amplitudes count as zero. A frame whose maximum amplitude is not
/// positive maps every pixel to black.
#[must_use]
pub fn log_compressed_intensity(amplitude: f32, max_amplitude: f32) -> u8 {
    let a = f64::from(amplitude.max(0.0));
    let max = f64::from(max_amplitude.max(0.0));
    if max <= 0.0 {
        return 0;
    }
    let linear = GRAY_LINEAR_GAIN * a / max;
    let log = GRAY_LOG_GAIN * a.ln_1p() / max.ln_1p();
    f64_to_u8_clamp(linear + log)
}

/// Canonical, top-left-origin, row-major buffers of one frame
#[derive(Debug)]
pub struct CanonicalGrid {
    pub width: usize,
    pub height: usize,
    /// Amplitude per pixel, indexed `[y, x]`
    pub amplitudes: Array2<f32>,
    /// World coordinate per pixel, indexed `[y, x, axis]`
    pub coordinates: Array3<f32>,
    /// Validity flags per pixel, indexed `[y, x]`
    pub flags: Array2<u32>,
    /// 8-bit log-compressed amplitude image
    pub gray: Mat,
}

impl CanonicalGrid {
    /// Allocate a zero-filled grid
    ///
    /// # Errors
    ///
    /// Returns error if the grayscale image cannot be allocated
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Ok(Self {
            width,
            height,
            amplitudes: Array2::zeros((height, width)),
            coordinates: Array3::zeros((height, width, 3)),
            flags: Array2::zeros((height, width)),
            gray: new_gray_mat(width, height)?,
        })
    }

    /// World coordinate at canonical (x, y)
    #[must_use]
    pub fn coordinate(&self, x: usize, y: usize) -> [f32; 3] {
        [
            self.coordinates[[y, x, 0]],
            self.coordinates[[y, x, 1]],
            self.coordinates[[y, x, 2]],
        ]
    }

    /// Re-emit the grid as raw buffers with the canonical orientation
    #[must_use]
    pub fn to_frame_buffers(&self) -> FrameBuffers {
        FrameBuffers {
            rows: self.height,
            columns: self.width,
            orientation: Orientation::CANONICAL,
            amplitudes: self.amplitudes.iter().copied().collect(),
            coordinates: self.coordinates.iter().copied().collect(),
            flags: self.flags.iter().copied().collect(),
        }
    }
}

/// Remaps raw frames into a reusable [`CanonicalGrid`]
#[derive(Debug, Default)]
pub struct CoordinateNormalizer {
    grid: Option<CanonicalGrid>,
}

impl CoordinateNormalizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grid produced by the last call to [`normalize`](Self::normalize)
    #[must_use]
    pub fn grid(&self) -> Option<&CanonicalGrid> {
        self.grid.as_ref()
    }

    /// Normalize one frame
    ///
    /// Buffers are reused across frames and reallocated only when the
    /// canonical grid size changes.
    ///
    /// # Errors
    ///
    /// Returns error if the frame fails validation or the grayscale image
    /// cannot be written
    pub fn normalize(&mut self, frame: &FrameBuffers) -> Result<&CanonicalGrid> {
        frame.validate()?;

        let (width, height) = canonical_size(frame.orientation, frame.rows, frame.columns);
        let grid = match self.grid.take() {
            Some(grid) if grid.width == width && grid.height == height => grid,
            previous => {
                debug!(
                    "Allocating canonical grid {}x{} (previously {:?})",
                    width,
                    height,
                    previous.map(|g| (g.width, g.height))
                );
                CanonicalGrid::new(width, height)?
            }
        };
        let grid = self.grid.insert(grid);

        let max_amplitude = frame.amplitudes.iter().copied().fold(0.0f32, f32::max);
        let gray = grid.gray.data_bytes_mut()?;

        for i in 0..frame.rows {
            for j in 0..frame.columns {
                let idx = frame.index(i, j);
                let CanonicalIndex { x, y, .. } = canonical_index(frame.orientation, frame.rows, frame.columns, i, j);

                let amplitude = frame.amplitudes[idx];
                grid.amplitudes[[y, x]] = amplitude;
                gray[y * width + x] = log_compressed_intensity(amplitude, max_amplitude);

                let raw = [
                    frame.coordinates[idx * 3],
                    frame.coordinates[idx * 3 + 1],
                    frame.coordinates[idx * 3 + 2],
                ];
                let [cx, cy, cz] = canonical_coordinate(frame.orientation.direction, raw);
                grid.coordinates[[y, x, 0]] = cx;
                grid.coordinates[[y, x, 1]] = cy;
                grid.coordinates[[y, x, 2]] = cz;

                grid.flags[[y, x]] = frame.flags[idx];
            }
        }

        Ok(&*grid)
    }
}
