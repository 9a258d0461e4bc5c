//! Orientation normalization across every sensor mounting

use head_tracking::frame::{FrameBuffers, OriginCorner, Orientation, ScanDirection};
use head_tracking::normalizer::{canonical_index, canonical_size, CoordinateNormalizer};
use head_tracking::utils::image_conversion::gray_mat_to_array2;
use head_tracking::Result;
use proptest::prelude::*;
use std::collections::HashSet;

/// Raw frame whose amplitudes and coordinates identify the raw pixel
fn labelled_frame(rows: usize, columns: usize, orientation: Orientation) -> FrameBuffers {
    let mut frame = FrameBuffers::zeros(rows, columns, orientation);
    for i in 0..rows {
        for j in 0..columns {
            let label = (i * columns + j + 1) as f32;
            frame.set_pixel(i, j, label, [label, -label, 1.0 + label], 0);
        }
    }
    frame
}

/// Raw (row, column) that must land on canonical (0, 0)
fn expected_origin(orientation: Orientation, rows: usize, columns: usize) -> (usize, usize) {
    let last_row = rows - 1;
    let last_col = columns - 1;
    match (orientation.direction, orientation.origin) {
        (ScanDirection::RowMajor, OriginCorner::TopLeft) => (0, 0),
        (ScanDirection::RowMajor, OriginCorner::TopRight) => (0, last_col),
        (ScanDirection::RowMajor, OriginCorner::BottomLeft) => (last_row, 0),
        (ScanDirection::RowMajor, OriginCorner::BottomRight) => (last_row, last_col),
        (ScanDirection::ColumnMajor, OriginCorner::TopLeft) => (0, 0),
        (ScanDirection::ColumnMajor, OriginCorner::TopRight) => (last_row, 0),
        (ScanDirection::ColumnMajor, OriginCorner::BottomLeft) => (0, last_col),
        (ScanDirection::ColumnMajor, OriginCorner::BottomRight) => (last_row, last_col),
    }
}

#[test]
fn test_origin_lands_on_physical_corner_for_every_orientation() -> Result<()> {
    let (rows, columns) = (4, 6);
    let mut normalizer = CoordinateNormalizer::new();

    for orientation in Orientation::all() {
        let frame = labelled_frame(rows, columns, orientation);
        let grid = normalizer.normalize(&frame)?;

        let (i, j) = expected_origin(orientation, rows, columns);
        let label = frame.amplitudes[frame.index(i, j)];
        assert_eq!(grid.amplitudes[[0, 0]], label, "origin of {orientation:?}");

        let expected_size = match orientation.direction {
            ScanDirection::RowMajor => (columns, rows),
            ScanDirection::ColumnMajor => (rows, columns),
        };
        assert_eq!((grid.width, grid.height), expected_size);
    }
    Ok(())
}

#[test]
fn test_column_major_rotates_axes() -> Result<()> {
    let orientation = Orientation::new(ScanDirection::ColumnMajor, OriginCorner::TopLeft);
    let mut frame = FrameBuffers::zeros(3, 2, orientation);
    frame.set_pixel(2, 1, 5.0, [1.0, 2.0, 3.0], 0);

    let mut normalizer = CoordinateNormalizer::new();
    let grid = normalizer.normalize(&frame)?;

    // Raw (row 2, column 1) is canonical (x 2, y 1)
    assert_eq!(grid.coordinate(2, 1), [2.0, -1.0, 3.0]);
    assert_eq!(grid.amplitudes[[1, 2]], 5.0);
    Ok(())
}

#[test]
fn test_renormalizing_canonical_output_is_identity() -> Result<()> {
    let mut normalizer = CoordinateNormalizer::new();
    let mut again = CoordinateNormalizer::new();

    for orientation in Orientation::all() {
        let once = normalizer.normalize(&labelled_frame(5, 3, orientation))?;
        let canonical = once.to_frame_buffers();
        let gray_once = gray_mat_to_array2(&once.gray)?;

        let twice = again.normalize(&canonical)?;
        assert_eq!(twice.to_frame_buffers(), canonical);
        assert_eq!(gray_mat_to_array2(&twice.gray)?, gray_once);
    }
    Ok(())
}

#[test]
fn test_gray_image_brightest_at_maximum_amplitude() -> Result<()> {
    let frame = labelled_frame(4, 4, Orientation::CANONICAL);
    let mut normalizer = CoordinateNormalizer::new();
    let gray = gray_mat_to_array2(&normalizer.normalize(&frame)?.gray)?;

    assert_eq!(gray[[3, 3]], 255);
    assert!(gray[[0, 0]] < gray[[0, 1]]);
    Ok(())
}

fn orientation_strategy() -> impl Strategy<Value = Orientation> {
    (0usize..8).prop_map(|k| Orientation::all()[k])
}

proptest! {
    #[test]
    fn prop_canonical_index_is_a_bijection(
        rows in 1usize..12,
        columns in 1usize..12,
        orientation in orientation_strategy(),
    ) {
        let (width, height) = canonical_size(orientation, rows, columns);
        prop_assert_eq!(width * height, rows * columns);

        let mut seen = HashSet::new();
        for i in 0..rows {
            for j in 0..columns {
                let c = canonical_index(orientation, rows, columns, i, j);
                prop_assert!(c.x < width && c.y < height);
                prop_assert!(seen.insert((c.x, c.y)));
            }
        }
    }

    #[test]
    fn prop_orientation_code_round_trips(orientation in orientation_strategy()) {
        prop_assert_eq!(Orientation::from_code(orientation.code()), orientation);
    }
}
