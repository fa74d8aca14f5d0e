use faer::{Mat, MatRef};

use crate::error::CalibError;

/// Default maximum disparity kept by [`filter_disps`].
pub const DEFAULT_MAX_DISP: f64 = 255.0;

/// Image shape of the KITTI color and grayscale cameras.
pub const KITTI_IMAGE_SHAPE: ImageShape = ImageShape {
    height: 375,
    width: 1242,
};

/// The shape of an image in pixels.
///
/// Converts from a `(height, width)` tuple.
///
/// Example:
///
/// ```
/// use kornia_kitti::filter::ImageShape;
///
/// let shape = ImageShape::from((375, 1242));
/// assert_eq!(shape.height, 375);
/// assert_eq!(shape.width, 1242);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageShape {
    /// Height of the image in pixels
    pub height: usize,
    /// Width of the image in pixels
    pub width: usize,
}

impl std::fmt::Display for ImageShape {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ImageShape {{ height: {}, width: {} }}",
            self.height, self.width
        )
    }
}

impl From<(usize, usize)> for ImageShape {
    fn from((height, width): (usize, usize)) -> Self {
        ImageShape { height, width }
    }
}

impl ImageShape {
    #[inline]
    fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && x <= self.width as f64 - 1.0 && y >= 0.0 && y <= self.height as f64 - 1.0
    }
}

fn check_xyd(xyd: MatRef<'_, f64>) -> Result<(), CalibError> {
    if xyd.ncols() != 3 {
        return Err(CalibError::DimensionMismatch {
            points: xyd.ncols(),
            transform: 3,
        });
    }
    Ok(())
}

/// Compute which `(x, y, disparity)` rows lie inside the image and disparity range.
///
/// A row is kept when `0 <= x <= width - 1`, `0 <= y <= height - 1` and
/// `0 <= d <= max_disp`. Rows with NaN entries are rejected.
pub fn disp_mask(
    xyd: MatRef<'_, f64>,
    shape: ImageShape,
    max_disp: f64,
) -> Result<Vec<bool>, CalibError> {
    check_xyd(xyd)?;
    Ok((0..xyd.nrows())
        .map(|i| {
            let d = xyd.read(i, 2);
            shape.contains(xyd.read(i, 0), xyd.read(i, 1)) && d >= 0.0 && d <= max_disp
        })
        .collect())
}

/// Compute which `(x, y, depth)` rows lie inside the image.
pub fn depth_mask(xyd: MatRef<'_, f64>, shape: ImageShape) -> Result<Vec<bool>, CalibError> {
    check_xyd(xyd)?;
    Ok((0..xyd.nrows())
        .map(|i| shape.contains(xyd.read(i, 0), xyd.read(i, 1)))
        .collect())
}

/// Keep the rows of `points` where `mask` is set.
///
/// PRECONDITION: `mask` has one entry per row of `points`.
pub fn select_rows(points: MatRef<'_, f64>, mask: &[bool]) -> Mat<f64> {
    let rows = mask
        .iter()
        .enumerate()
        .filter_map(|(i, &keep)| keep.then_some(i))
        .collect::<Vec<_>>();
    Mat::<f64>::from_fn(rows.len(), points.ncols(), |i, j| points.read(rows[i], j))
}

/// Filter `(x, y, disparity)` rows to the image bounds and disparity range.
///
/// # Arguments
///
/// * `xyd` - The points with shape (n, 3).
/// * `shape` - The image shape, the x bound uses the width and the y bound the height.
/// * `max_disp` - The maximum disparity to keep.
///
/// # Returns
///
/// The rows inside the bounds, in their original order.
///
/// Example:
///
/// ```
/// use kornia_kitti::filter::{filter_disps, ImageShape, DEFAULT_MAX_DISP};
///
/// let xyd = faer::mat![[0.0, 0.0, 0.0], [10.0, 0.0, 10.0], [0.0, 0.0, 256.0]];
/// let kept = filter_disps(xyd.as_ref(), ImageShape::from((5, 10)), DEFAULT_MAX_DISP).unwrap();
/// assert_eq!(kept.nrows(), 1);
/// ```
pub fn filter_disps(
    xyd: MatRef<'_, f64>,
    shape: ImageShape,
    max_disp: f64,
) -> Result<Mat<f64>, CalibError> {
    filter_disps_with_mask(xyd, shape, max_disp).map(|(filtered, _)| filtered)
}

/// Same as [`filter_disps`] but also returns the boolean mask over the input rows.
pub fn filter_disps_with_mask(
    xyd: MatRef<'_, f64>,
    shape: ImageShape,
    max_disp: f64,
) -> Result<(Mat<f64>, Vec<bool>), CalibError> {
    let mask = disp_mask(xyd, shape, max_disp)?;
    Ok((select_rows(xyd, &mask), mask))
}

/// Filter `(x, y, depth)` rows to the image bounds. The depth is not bounded.
pub fn filter_depths(xyd: MatRef<'_, f64>, shape: ImageShape) -> Result<Mat<f64>, CalibError> {
    let mask = depth_mask(xyd, shape)?;
    Ok(select_rows(xyd, &mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_disps_bounds() -> Result<(), Box<dyn std::error::Error>> {
        let (h, w) = (5, 10);
        let xyd = faer::mat![
            [w as f64, 0.0, 10.0],
            [0.0, 0.0, 256.0],
            [0.0, 0.0, 0.0],
            [(w - 1) as f64, (h - 1) as f64, 255.0],
            [0.0, h as f64, 1.0],
            [-0.5, 1.0, 1.0],
            [1.0, 1.0, -1.0]
        ];

        let (kept, mask) = filter_disps_with_mask(xyd.as_ref(), (h, w).into(), DEFAULT_MAX_DISP)?;
        assert_eq!(mask, vec![false, false, true, true, false, false, false]);
        assert_eq!(kept, faer::mat![[0.0, 0.0, 0.0], [9.0, 4.0, 255.0]]);
        Ok(())
    }

    #[test]
    fn test_filter_disps_shape_order() -> Result<(), Box<dyn std::error::Error>> {
        // width is the second entry of the tuple
        let xyd = faer::mat![[20.0, 5.0, 1.0]];
        let wide = filter_disps(xyd.as_ref(), (10, 30).into(), DEFAULT_MAX_DISP)?;
        assert_eq!(wide.nrows(), 1);
        let tall = filter_disps(xyd.as_ref(), (30, 10).into(), DEFAULT_MAX_DISP)?;
        assert_eq!(tall.nrows(), 0);
        Ok(())
    }

    #[test]
    fn test_filter_disps_nan() -> Result<(), Box<dyn std::error::Error>> {
        let xyd = faer::mat![[f64::NAN, 1.0, 1.0], [1.0, 1.0, f64::INFINITY]];
        let kept = filter_disps(xyd.as_ref(), KITTI_IMAGE_SHAPE, DEFAULT_MAX_DISP)?;
        assert_eq!(kept.nrows(), 0);
        Ok(())
    }

    #[test]
    fn test_filter_depths() -> Result<(), Box<dyn std::error::Error>> {
        let xyd = faer::mat![[0.0, 0.0, 1000.0], [1.0, 1.0, -3.0], [1242.0, 0.0, 1.0]];
        let kept = filter_depths(xyd.as_ref(), KITTI_IMAGE_SHAPE)?;
        assert_eq!(kept, faer::mat![[0.0, 0.0, 1000.0], [1.0, 1.0, -3.0]]);
        Ok(())
    }

    #[test]
    fn test_filter_wrong_columns() {
        let xy = faer::mat![[0.0, 0.0]];
        assert!(matches!(
            filter_depths(xy.as_ref(), KITTI_IMAGE_SHAPE),
            Err(CalibError::DimensionMismatch { .. })
        ));
    }
}
