//! Grayscale image conversion between OpenCV `Mat` and ndarray.

use super::safe_cast::{i32_to_usize, usize_to_i32};
use crate::{Error, Result};
use ndarray::Array2;
use opencv::core::{Mat, Scalar, CV_8UC1};
use opencv::prelude::*;

/// Allocate a zero-filled single-channel 8-bit image
///
/// # Errors
///
/// Returns error if the dimensions do not fit `OpenCV`'s `i32` geometry
pub fn new_gray_mat(width: usize, height: usize) -> Result<Mat> {
    Ok(Mat::new_rows_cols_with_default(
        usize_to_i32(height)?,
        usize_to_i32(width)?,
        CV_8UC1,
        Scalar::all(0.0),
    )?)
}

/// Convert an ndarray of intensities (rows × columns) into a grayscale Mat
///
/// # Errors
///
/// * Returns error if the array is empty
/// * Returns error if Mat creation fails
pub fn array2_to_gray_mat(array: &Array2<u8>) -> Result<Mat> {
    let (height, width) = array.dim();
    if height == 0 || width == 0 {
        return Err(Error::InvalidInput(format!(
            "Invalid image dimensions: {width}x{height}"
        )));
    }

    let mut mat = new_gray_mat(width, height)?;
    let bytes = mat.data_bytes_mut()?;
    for (dst, &src) in bytes.iter_mut().zip(array.iter()) {
        *dst = src;
    }
    Ok(mat)
}

/// Convert a single-channel 8-bit Mat into an ndarray (rows × columns)
///
/// # Errors
///
/// * Returns error if the Mat is not single-channel 8-bit
/// * Returns error if pixel data cannot be accessed
pub fn gray_mat_to_array2(mat: &Mat) -> Result<Array2<u8>> {
    if mat.typ() != CV_8UC1 {
        return Err(Error::InvalidInput(format!(
            "Expected an 8-bit single-channel image, got type {}",
            mat.typ()
        )));
    }

    let height = i32_to_usize(mat.rows())?;
    let width = i32_to_usize(mat.cols())?;
    let mut array = Array2::zeros((height, width));
    for row in 0..mat.rows() {
        for col in 0..mat.cols() {
            array[[i32_to_usize(row)?, i32_to_usize(col)?]] = *mat.at_2d::<u8>(row, col)?;
        }
    }
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_conversion_preserves_layout() {
        let array = Array2::from_shape_fn((3, 4), |(r, c)| (r * 10 + c) as u8);
        let mat = array2_to_gray_mat(&array).unwrap();

        assert_eq!(mat.rows(), 3);
        assert_eq!(mat.cols(), 4);
        assert_eq!(*mat.at_2d::<u8>(2, 1).unwrap(), 21);

        let back = gray_mat_to_array2(&mat).unwrap();
        assert_eq!(back, array);
    }

    #[test]
    fn test_empty_array_rejected() {
        let array = Array2::<u8>::zeros((0, 4));
        assert!(array2_to_gray_mat(&array).is_err());
    }
}
