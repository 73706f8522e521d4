//! Conversions between `image` buffers and OpenCV matrices.

use image::GrayImage;
use opencv::core::{Mat, Scalar, CV_8UC1};
use opencv::prelude::*;

/// Copy an 8-bit grayscale image into a single-channel `Mat`.
pub(crate) fn gray_to_mat(img: &GrayImage) -> opencv::Result<Mat> {
    let (w, h) = img.dimensions();
    let mut mat = Mat::new_rows_cols_with_default(h as i32, w as i32, CV_8UC1, Scalar::all(0.0))?;
    mat.data_bytes_mut()?.copy_from_slice(img.as_raw());
    Ok(mat)
}
