//! Raw per-pixel buffers as delivered by the depth camera.

use crate::{Error, Result};

/// Order in which the sensor scans its pixel grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanDirection {
    /// Rows are contiguous (horizontal scan)
    RowMajor,
    /// Columns are contiguous (vertical scan); the sensor is mounted on its side
    ColumnMajor,
}

/// Corner of the physical image that holds the first raw pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OriginCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl OriginCorner {
    /// All four corners, in sensor code order
    pub const ALL: [Self; 4] = [Self::TopLeft, Self::TopRight, Self::BottomLeft, Self::BottomRight];

    /// Whether the origin lies on the right edge
    #[must_use]
    pub fn is_right(self) -> bool {
        matches!(self, Self::TopRight | Self::BottomRight)
    }

    /// Whether the origin lies on the bottom edge
    #[must_use]
    pub fn is_bottom(self) -> bool {
        matches!(self, Self::BottomLeft | Self::BottomRight)
    }
}

/// Physical layout of a raw frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Orientation {
    pub direction: ScanDirection,
    pub origin: OriginCorner,
}

impl Orientation {
    /// Mask selecting the direction half of a packed orientation code
    pub const DIRECTION_MASK: u32 = 0xffff_0000;
    /// Direction bits of a vertically scanning sensor
    pub const DIRECTION_VERTICAL: u32 = 0x0001_0000;
    /// Mask selecting the origin corner of a packed orientation code
    pub const ORIGIN_MASK: u32 = 0x0000_0003;

    /// Top-left origin, row-major scan
    pub const CANONICAL: Self = Self {
        direction: ScanDirection::RowMajor,
        origin: OriginCorner::TopLeft,
    };

    #[must_use]
    pub fn new(direction: ScanDirection, origin: OriginCorner) -> Self {
        Self { direction, origin }
    }

    /// All eight direction/corner combinations
    #[must_use]
    pub fn all() -> Vec<Self> {
        [ScanDirection::RowMajor, ScanDirection::ColumnMajor]
            .iter()
            .flat_map(|&direction| OriginCorner::ALL.iter().map(move |&origin| Self::new(direction, origin)))
            .collect()
    }

    /// Decode the sensor's packed orientation code
    ///
    /// Only the vertical direction bits select column-major scanning; any
    /// other direction half decodes as row-major.
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        let direction = if code & Self::DIRECTION_MASK == Self::DIRECTION_VERTICAL {
            ScanDirection::ColumnMajor
        } else {
            ScanDirection::RowMajor
        };
        let origin = match code & Self::ORIGIN_MASK {
            0 => OriginCorner::TopLeft,
            1 => OriginCorner::TopRight,
            2 => OriginCorner::BottomLeft,
            _ => OriginCorner::BottomRight,
        };
        Self { direction, origin }
    }

    /// Encode into the sensor's packed orientation code
    #[must_use]
    pub fn code(self) -> u32 {
        let direction = match self.direction {
            ScanDirection::RowMajor => 0,
            ScanDirection::ColumnMajor => Self::DIRECTION_VERTICAL,
        };
        let origin = match self.origin {
            OriginCorner::TopLeft => 0,
            OriginCorner::TopRight => 1,
            OriginCorner::BottomLeft => 2,
            OriginCorner::BottomRight => 3,
        };
        direction | origin
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::CANONICAL
    }
}

/// Per-pixel validity bit field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelFlags(pub u32);

impl PixelFlags {
    pub const INVALID: u32 = 0x1;
    pub const SATURATED: u32 = 0x2;
    /// Depth is unusable for this pixel
    pub const INCONSISTENT: u32 = 0x4;
    pub const LOW_SIGNAL: u32 = 0x8;

    #[must_use]
    pub fn contains(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    #[must_use]
    pub fn is_inconsistent(self) -> bool {
        self.contains(Self::INCONSISTENT)
    }
}

/// One raw frame: amplitude, 3D coordinates and validity flags per pixel,
/// stored in the sensor's native scan order
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffers {
    pub rows: usize,
    pub columns: usize,
    pub orientation: Orientation,
    /// One amplitude per pixel
    pub amplitudes: Vec<f32>,
    /// Three coordinates (x, y, z) per pixel, interleaved
    pub coordinates: Vec<f32>,
    /// One flag word per pixel
    pub flags: Vec<u32>,
}

impl FrameBuffers {
    /// Create a zero-filled frame
    #[must_use]
    pub fn zeros(rows: usize, columns: usize, orientation: Orientation) -> Self {
        let n = rows * columns;
        Self {
            rows,
            columns,
            orientation,
            amplitudes: vec![0.0; n],
            coordinates: vec![0.0; n * 3],
            flags: vec![0; n],
        }
    }

    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.rows * self.columns
    }

    /// Raw index of the pixel at sensor row `i`, column `j`
    #[must_use]
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.columns + j
    }

    /// Write one raw pixel
    pub fn set_pixel(&mut self, i: usize, j: usize, amplitude: f32, coordinate: [f32; 3], flags: u32) {
        let idx = self.index(i, j);
        self.amplitudes[idx] = amplitude;
        self.coordinates[idx * 3..idx * 3 + 3].copy_from_slice(&coordinate);
        self.flags[idx] = flags;
    }

    /// Check dimensions against buffer lengths
    ///
    /// # Errors
    ///
    /// Returns an error for an empty grid or a buffer whose length does not
    /// match rows × columns
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.columns == 0 {
            return Err(Error::InvalidFrame(format!(
                "Empty frame: {}x{}",
                self.rows, self.columns
            )));
        }
        let n = self.pixel_count();
        if self.amplitudes.len() != n {
            return Err(Error::InvalidFrame(format!(
                "Expected {n} amplitudes, got {}",
                self.amplitudes.len()
            )));
        }
        if self.coordinates.len() != n * 3 {
            return Err(Error::InvalidFrame(format!(
                "Expected {} coordinates, got {}",
                n * 3,
                self.coordinates.len()
            )));
        }
        if self.flags.len() != n {
            return Err(Error::InvalidFrame(format!(
                "Expected {n} flags, got {}",
                self.flags.len()
            )));
        }
        Ok(())
    }
}
