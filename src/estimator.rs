//! Amplitude-weighted 3D centroid around the detected face center.

use crate::constants::WINDOW_RADIUS;
use crate::frame::PixelFlags;
use crate::normalizer::CanonicalGrid;
use nalgebra::Vector3;
use ndarray::s;
use opencv::core::Point;

/// Raw head position measured in one frame; `None` means "no update"
pub type Measurement = Option<Vector3<f64>>;

/// Averages the 3D coordinates of a square window of pixels
#[derive(Debug, Clone, Copy)]
pub struct PositionEstimator {
    radius: usize,
}

impl Default for PositionEstimator {
    fn default() -> Self {
        Self::new(WINDOW_RADIUS)
    }
}

impl PositionEstimator {
    /// Window of `2 * radius + 1` pixels per side
    #[must_use]
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    #[must_use]
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Amplitude-weighted centroid of the window around `center`
    ///
    /// Only pixels whose INCONSISTENT flag is clear and whose depth is
    /// strictly positive contribute; a NaN depth never does. The window is
    /// clipped to the grid. Returns `None` when no pixel contributes any weight.
    #[must_use]
    pub fn estimate(&self, grid: &CanonicalGrid, center: Point) -> Measurement {
        let (x_range, y_range) = self.window(grid, center)?;

        let amplitudes = grid.amplitudes.slice(s![y_range.clone(), x_range.clone()]);
        let coordinates = grid.coordinates.slice(s![y_range.clone(), x_range.clone(), ..]);
        let flags = grid.flags.slice(s![y_range, x_range]);

        let mut sum = Vector3::zeros();
        let mut weight = 0.0;
        for ((&amplitude, &flag), coordinate) in amplitudes
            .iter()
            .zip(flags.iter())
            .zip(coordinates.rows())
        {
            let depth = coordinate[2];
            if PixelFlags(flag).is_inconsistent() || depth.is_nan() || depth <= 0.0 {
                continue;
            }
            let amplitude = f64::from(amplitude);
            sum += Vector3::new(
                f64::from(coordinate[0]),
                f64::from(coordinate[1]),
                f64::from(coordinate[2]),
            ) * amplitude;
            weight += amplitude;
        }

        if weight > 0.0 {
            Some(sum / weight)
        } else {
            None
        }
    }

    /// Column and row ranges of the clipped window, `None` if it misses the grid
    fn window(&self, grid: &CanonicalGrid, center: Point) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
        let clip = |c: i32, len: usize| {
            let radius = i64::try_from(self.radius).unwrap_or(i64::MAX);
            let len = i64::try_from(len).unwrap_or(i64::MAX);
            let lo = (i64::from(c).saturating_sub(radius)).max(0);
            let hi = (i64::from(c).saturating_add(radius)).min(len - 1);
            if lo > hi {
                return None;
            }
            Some(usize::try_from(lo).ok()?..usize::try_from(hi).ok()? + 1)
        };
        Some((clip(center.x, grid.width)?, clip(center.y, grid.height)?))
    }
}
