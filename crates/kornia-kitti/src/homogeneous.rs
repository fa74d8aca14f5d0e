use faer::prelude::SpSolver;
use faer::{Mat, MatRef};

use crate::error::CalibError;

/// Apply a right-multiplying transform to points stored as rows.
///
/// The points are promoted to homogeneous coordinates when they have one
/// column less than the transform has rows. The result is normalized by its
/// last coordinate.
///
/// # Arguments
///
/// * `points` - The points to transform with shape (n, D).
/// * `transform` - The right-multiplying transform with shape (M, N), with D == M or D == M - 1.
/// * `keep_last` - Whether to keep the last coordinate before normalization as an extra column.
///
/// # Returns
///
/// The transformed points with shape (n, N - 1), or (n, N) if `keep_last` is set.
///
/// NOTE: a zero last coordinate yields inf/NaN entries, as IEEE-754 division does.
///
/// Example:
///
/// ```
/// use kornia_kitti::homogeneous::homogeneous_transform;
///
/// let points = faer::mat![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
/// let transform = faer::Mat::<f64>::identity(4, 4);
/// let out = homogeneous_transform(points.as_ref(), transform.as_ref(), false).unwrap();
/// assert_eq!(out, points);
/// ```
pub fn homogeneous_transform(
    points: MatRef<'_, f64>,
    transform: MatRef<'_, f64>,
    keep_last: bool,
) -> Result<Mat<f64>, CalibError> {
    let (n_points, dim) = (points.nrows(), points.ncols());
    let (m, n) = (transform.nrows(), transform.ncols());

    if n == 0 {
        return Err(CalibError::DimensionMismatch {
            points: dim,
            transform: m,
        });
    }

    let points_h = if dim + 1 == m {
        Mat::<f64>::from_fn(n_points, m, |i, j| {
            if j < dim {
                points.read(i, j)
            } else {
                1.0
            }
        })
    } else if dim == m {
        points.to_owned()
    } else {
        return Err(CalibError::DimensionMismatch {
            points: dim,
            transform: m,
        });
    };

    let new_points = points_h.as_ref() * transform;

    let out_cols = if keep_last { n } else { n - 1 };
    let out = Mat::<f64>::from_fn(n_points, out_cols, |i, j| {
        let w = new_points.read(i, n - 1);
        if j < n - 1 {
            new_points.read(i, j) / w
        } else {
            w
        }
    });

    Ok(out)
}

/// Apply a left-multiplying affine transform to points stored as columns.
///
/// A row of ones is stacked beneath the points and the transform is applied
/// from the left. No normalization happens.
///
/// # Arguments
///
/// * `transform` - The left-multiplying transform with shape (R, k + 1).
/// * `points` - The points with shape (k, n), one point per column.
///
/// # Returns
///
/// The transformed points with shape (R, n).
pub fn affine_transform_columns(
    transform: MatRef<'_, f64>,
    points: MatRef<'_, f64>,
) -> Result<Mat<f64>, CalibError> {
    let (dim, n_points) = (points.nrows(), points.ncols());

    if dim + 1 != transform.ncols() {
        return Err(CalibError::DimensionMismatch {
            points: dim,
            transform: transform.ncols(),
        });
    }

    let points_h = Mat::<f64>::from_fn(dim + 1, n_points, |i, j| {
        if i < dim {
            points.read(i, j)
        } else {
            1.0
        }
    });

    Ok(transform * points_h.as_ref())
}

/// Reshape a flat row-major slice into a matrix.
///
/// # Arguments
///
/// * `key` - Name of the field, used for error reporting.
/// * `values` - The values in row-major order.
/// * `nrows` - Number of rows.
/// * `ncols` - Number of columns.
pub fn reshape(
    key: &str,
    values: &[f64],
    nrows: usize,
    ncols: usize,
) -> Result<Mat<f64>, CalibError> {
    if values.len() != nrows * ncols {
        return Err(CalibError::InvalidFieldLength {
            key: key.to_string(),
            expected: nrows * ncols,
            actual: values.len(),
        });
    }
    Ok(faer::mat::from_row_major_slice(values, nrows, ncols).to_owned())
}

/// Invert a square matrix.
///
/// # Errors
///
/// * [`CalibError::DimensionMismatch`] if the matrix is not square.
/// * [`CalibError::SingularMatrix`] if the matrix is not invertible.
pub fn invert(m: MatRef<'_, f64>) -> Result<Mat<f64>, CalibError> {
    if m.nrows() != m.ncols() {
        return Err(CalibError::DimensionMismatch {
            points: m.ncols(),
            transform: m.nrows(),
        });
    }

    let det = m.determinant();
    if det == 0.0 || !det.is_finite() {
        return Err(CalibError::SingularMatrix);
    }

    let inv = m
        .partial_piv_lu()
        .solve(Mat::<f64>::identity(m.nrows(), m.ncols()));

    let finite = (0..inv.nrows()).all(|i| (0..inv.ncols()).all(|j| inv.read(i, j).is_finite()));
    if !finite {
        return Err(CalibError::SingularMatrix);
    }

    Ok(inv)
}

/// Build a matrix with one point per row from fixed-size points.
///
/// Example:
///
/// ```
/// use kornia_kitti::homogeneous::points_from_rows;
///
/// let points = points_from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
/// assert_eq!(points.nrows(), 2);
/// assert_eq!(points.ncols(), 3);
/// ```
pub fn points_from_rows<const N: usize>(rows: &[[f64; N]]) -> Mat<f64> {
    Mat::<f64>::from_fn(rows.len(), N, |i, j| rows[i][j])
}

/// Copy the rows of a matrix into vectors.
pub fn points_to_rows(points: MatRef<'_, f64>) -> Vec<Vec<f64>> {
    (0..points.nrows())
        .map(|i| (0..points.ncols()).map(|j| points.read(i, j)).collect())
        .collect()
}
