use std::path::{Path, PathBuf};

use faer::{Mat, MatRef};

use crate::{
    calib_file::{read_calib_file, CalibData},
    error::CalibError,
    filter::{self, ImageShape, KITTI_IMAGE_SHAPE},
    homogeneous::{affine_transform_columns, homogeneous_transform, invert, reshape},
};

/// Options for building the transforms of a [`Calib`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibConfig {
    /// Use the color camera pair (P2, P3) instead of the grayscale pair (P0, P1) for disparity.
    pub color: bool,
    /// Image shape used by [`Calib::filter_disps`].
    pub image_shape: ImageShape,
}

impl Default for CalibConfig {
    fn default() -> Self {
        Self {
            color: false,
            image_shape: KITTI_IMAGE_SHAPE,
        }
    }
}

/// Convert between the coordinate frames of a sensor rig.
///
/// Loads the calibration fields once and derives the transforms between the
/// imu, velodyne, rectified camera, disparity and road frames on demand.
///
/// Each `get_*` method returns a transform in homogeneous coordinates that is
/// right-multiplying, `new_row = [point, 1] * T`, and can be applied with
/// [`homogeneous_transform`]. The exceptions are [`Calib::get_velo2cam`] and
/// [`Calib::get_cam2road`], which are 3x4 left-multiplying matrices for
/// points stored as columns, used by [`Calib::velo2cams`] and
/// [`Calib::cams2road`].
///
/// Example:
///
/// ```no_run
/// use kornia_kitti::{calib::Calib, homogeneous::points_from_rows};
///
/// let calib = Calib::from_file("calib/um_000000.txt").unwrap();
/// let velo = points_from_rows(&[[10.0, 0.5, -1.2], [20.0, -2.0, -1.0]]);
/// let xyd = calib.velo2disp(velo.as_ref()).unwrap();
/// let xyd = calib.filter_disps(xyd.as_ref(), 255.0).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Calib {
    calib_path: Option<PathBuf>,
    data: CalibData,
    config: CalibConfig,
}

/// Build a 4x4 transform whose three leftmost columns are `m^T` for a 3x4 `m`.
fn embed_transposed(m: MatRef<'_, f64>) -> Mat<f64> {
    Mat::<f64>::from_fn(4, 4, |i, j| match (i, j) {
        (_, 0..=2) => m.read(j, i),
        (3, 3) => 1.0,
        _ => 0.0,
    })
}

/// Build a 4x4 identity with `r` in its top-left 3x3 block.
fn embed_rotation(r: MatRef<'_, f64>) -> Mat<f64> {
    Mat::<f64>::from_fn(4, 4, |i, j| match (i, j) {
        (0..=2, 0..=2) => r.read(i, j),
        _ if i == j => 1.0,
        _ => 0.0,
    })
}

impl Calib {
    /// Load the calibration file at `path` with the default config.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CalibError> {
        Self::from_file_with_config(path, CalibConfig::default())
    }

    /// Load the calibration file at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the calibration file.
    /// * `config` - The camera pair and image shape to use.
    pub fn from_file_with_config(
        path: impl AsRef<Path>,
        config: CalibConfig,
    ) -> Result<Self, CalibError> {
        let path = path.as_ref();
        let data = read_calib_file(path)?;
        Ok(Self {
            calib_path: Some(path.to_path_buf()),
            data,
            config,
        })
    }

    /// Create from already parsed calibration data.
    pub fn from_data(data: CalibData, config: CalibConfig) -> Self {
        Self {
            calib_path: None,
            data,
            config,
        }
    }

    /// The file the calibration was loaded from, if any.
    pub fn calib_path(&self) -> Option<&Path> {
        self.calib_path.as_deref()
    }

    /// The raw calibration fields.
    pub fn data(&self) -> &CalibData {
        &self.data
    }

    /// The config used to build the transforms.
    pub fn config(&self) -> &CalibConfig {
        &self.config
    }

    fn field(&self, key: &str, nrows: usize, ncols: usize) -> Result<Mat<f64>, CalibError> {
        reshape(key, self.data.numeric(key)?, nrows, ncols)
    }

    /// Transform from the imu frame to the velodyne frame (4x4).
    ///
    /// Built from `R0_rect` as rotation and the 3 values of `Tr_imu_to_velo`
    /// as translation.
    pub fn get_imu2velo(&self) -> Result<Mat<f64>, CalibError> {
        let rotation = self.field("R0_rect", 3, 3)?;
        let translation = self.field("Tr_imu_to_velo", 3, 1)?;

        let mut rt_imu2velo = embed_rotation(rotation.as_ref());
        for i in 0..3 {
            rt_imu2velo.write(i, 3, translation.read(i, 0));
        }
        Ok(rt_imu2velo.transpose().to_owned())
    }

    /// Transform from the velodyne frame to the rectified camera frame (4x4).
    pub fn get_velo2rect(&self) -> Result<Mat<f64>, CalibError> {
        let rt_velo2cam = embed_transposed(self.field("Tr_velo_to_cam", 3, 4)?.as_ref());
        let r_rect00 = embed_rotation(self.field("R0_rect", 3, 3)?.as_ref());

        let rt_velo2rect = r_rect00.as_ref() * rt_velo2cam.as_ref();
        Ok(rt_velo2rect.transpose().to_owned())
    }

    /// `Tr_velo_to_cam` as a 3x4 left-multiplying matrix for points stored as columns.
    pub fn get_velo2cam(&self) -> Result<Mat<f64>, CalibError> {
        self.field("Tr_velo_to_cam", 3, 4)
    }

    /// `Tr_cam_to_road` as a 3x4 left-multiplying matrix for points stored as columns.
    pub fn get_cam2road(&self) -> Result<Mat<f64>, CalibError> {
        self.field("Tr_cam_to_road", 3, 4)
    }

    /// Transform from the velodyne frame to the road frame (4x4).
    ///
    /// NOTE: this is not the same map as [`Calib::velo2road_cols`].
    pub fn get_velo2road(&self) -> Result<Mat<f64>, CalibError> {
        let rt_velo2cam = embed_transposed(self.field("Tr_velo_to_cam", 3, 4)?.as_ref());
        let rt_cam2road = embed_transposed(self.field("Tr_cam_to_road", 3, 4)?.as_ref());

        let rt_velo2road = rt_cam2road.as_ref() * rt_velo2cam.as_ref();
        Ok(rt_velo2road.transpose().to_owned())
    }

    /// Transform from the rectified camera frame to `(x, y, disparity)` (4x4).
    ///
    /// Uses the camera pair selected by [`CalibConfig::color`].
    pub fn get_rect2disp(&self) -> Result<Mat<f64>, CalibError> {
        let (cam0, cam1) = if self.config.color { (2, 3) } else { (0, 1) };
        let p_rect0 = self.get_projection(cam0)?;
        let p_rect1 = self.get_projection(cam1)?;

        // rows: P0, P1, P0 - Q0, P2
        let t = Mat::<f64>::from_fn(4, 4, |i, j| match i {
            0 | 1 => p_rect0.read(i, j),
            2 => p_rect0.read(0, j) - p_rect1.read(0, j),
            _ => p_rect0.read(2, j),
        });
        Ok(t.transpose().to_owned())
    }

    /// Transform from the imu frame to the rectified camera frame (4x4).
    pub fn get_imu2rect(&self) -> Result<Mat<f64>, CalibError> {
        Ok(self.get_imu2velo()?.as_ref() * self.get_velo2rect()?.as_ref())
    }

    /// Transform from the imu frame to `(x, y, disparity)` (4x4).
    pub fn get_imu2disp(&self) -> Result<Mat<f64>, CalibError> {
        Ok(self.get_imu2rect()?.as_ref() * self.get_rect2disp()?.as_ref())
    }

    /// Transform from the velodyne frame to `(x, y, disparity)` (4x4).
    pub fn get_velo2disp(&self) -> Result<Mat<f64>, CalibError> {
        Ok(self.get_velo2rect()?.as_ref() * self.get_rect2disp()?.as_ref())
    }

    /// Transform from `(x, y, disparity)` to the rectified camera frame (4x4).
    pub fn get_disp2rect(&self) -> Result<Mat<f64>, CalibError> {
        log::debug!("Inverting rect2disp");
        invert(self.get_rect2disp()?.as_ref())
    }

    /// Transform from `(x, y, disparity)` to the imu frame (4x4).
    pub fn get_disp2imu(&self) -> Result<Mat<f64>, CalibError> {
        log::debug!("Inverting imu2disp");
        invert(self.get_imu2disp()?.as_ref())
    }

    /// Transform from the rectified camera frame to the imu frame (4x4).
    ///
    /// Defined as the inverse of [`Calib::get_imu2rect`].
    pub fn get_rect2imu(&self) -> Result<Mat<f64>, CalibError> {
        log::debug!("Inverting imu2rect");
        invert(self.get_imu2rect()?.as_ref())
    }

    /// The 3x4 projection matrix `P<cam_idx>` as stored in the file.
    fn get_projection(&self, cam_idx: usize) -> Result<Mat<f64>, CalibError> {
        match cam_idx {
            0 => self.field("P0", 3, 4),
            1 => self.field("P1", 3, 4),
            2 => self.field("P2", 3, 4),
            3 => self.field("P3", 3, 4),
            _ => Err(CalibError::InvalidCameraIndex(cam_idx)),
        }
    }

    /// Right-multiplying projection of camera `cam_idx` (4x3), the transpose of `P<cam_idx>`.
    ///
    /// # Errors
    ///
    /// [`CalibError::InvalidCameraIndex`] if `cam_idx` is not 0, 1, 2 or 3.
    pub fn get_proj(&self, cam_idx: usize) -> Result<Mat<f64>, CalibError> {
        Ok(self.get_projection(cam_idx)?.transpose().to_owned())
    }

    /// Transform from the velodyne frame to the image of camera `cam_idx` (4x3).
    pub fn get_velo2depth(&self, cam_idx: usize) -> Result<Mat<f64>, CalibError> {
        Ok(self.get_velo2rect()?.as_ref() * self.get_proj(cam_idx)?.as_ref())
    }

    /// Map rectified camera points (n, 3) to `(x, y, disparity)` (n, 3).
    pub fn rect2disp(&self, points: MatRef<'_, f64>) -> Result<Mat<f64>, CalibError> {
        homogeneous_transform(points, self.get_rect2disp()?.as_ref(), false)
    }

    /// Map `(x, y, disparity)` rows (n, 3) to rectified camera points (n, 3).
    pub fn disp2rect(&self, xyd: MatRef<'_, f64>) -> Result<Mat<f64>, CalibError> {
        homogeneous_transform(xyd, self.get_disp2rect()?.as_ref(), false)
    }

    /// Map velodyne points (n, 3) to rectified camera points (n, 3).
    pub fn velo2rect(&self, points: MatRef<'_, f64>) -> Result<Mat<f64>, CalibError> {
        homogeneous_transform(points, self.get_velo2rect()?.as_ref(), false)
    }

    /// Map velodyne points (n, 3) to `(x, y, disparity)` (n, 3).
    pub fn velo2disp(&self, points: MatRef<'_, f64>) -> Result<Mat<f64>, CalibError> {
        homogeneous_transform(points, self.get_velo2disp()?.as_ref(), false)
    }

    /// Map imu points (n, 3) to rectified camera points (n, 3).
    pub fn imu2rect(&self, points: MatRef<'_, f64>) -> Result<Mat<f64>, CalibError> {
        homogeneous_transform(points, self.get_imu2rect()?.as_ref(), false)
    }

    /// Map rectified camera points (n, 3) to imu points (n, 3).
    pub fn rect2imu(&self, points: MatRef<'_, f64>) -> Result<Mat<f64>, CalibError> {
        homogeneous_transform(points, self.get_rect2imu()?.as_ref(), false)
    }

    /// Map velodyne points (n, 3) to `(u, v, depth)` in the image of camera `cam_idx` (n, 3).
    ///
    /// The last column is the projective depth before normalization.
    pub fn velo2depth(
        &self,
        points: MatRef<'_, f64>,
        cam_idx: usize,
    ) -> Result<Mat<f64>, CalibError> {
        homogeneous_transform(points, self.get_velo2depth(cam_idx)?.as_ref(), true)
    }

    /// Map velodyne points (n, 3) to `(u, v)` pixels of camera `cam_idx` (n, 2).
    pub fn velo2img(
        &self,
        points: MatRef<'_, f64>,
        cam_idx: usize,
    ) -> Result<Mat<f64>, CalibError> {
        homogeneous_transform(points, self.get_velo2depth(cam_idx)?.as_ref(), false)
    }

    /// Map velodyne points stored as rows (n, 3) to camera points stored as columns (3, n).
    pub fn velo2cams(&self, points: MatRef<'_, f64>) -> Result<Mat<f64>, CalibError> {
        affine_transform_columns(self.get_velo2cam()?.as_ref(), points.transpose())
    }

    /// Map camera points stored as columns (3, n) to road points stored as columns (3, n).
    pub fn cams2road(&self, points: MatRef<'_, f64>) -> Result<Mat<f64>, CalibError> {
        affine_transform_columns(self.get_cam2road()?.as_ref(), points)
    }

    /// Map velodyne points stored as rows (n, 3) to road points stored as columns (3, n).
    ///
    /// Composes [`Calib::velo2cams`] and [`Calib::cams2road`].
    pub fn velo2road_cols(&self, points: MatRef<'_, f64>) -> Result<Mat<f64>, CalibError> {
        self.cams2road(self.velo2cams(points)?.as_ref())
    }

    /// Filter `(x, y, disparity)` rows to the configured image shape and `[0, max_disp]`.
    pub fn filter_disps(
        &self,
        xyd: MatRef<'_, f64>,
        max_disp: f64,
    ) -> Result<Mat<f64>, CalibError> {
        filter::filter_disps(xyd, self.config.image_shape, max_disp)
    }

    /// Same as [`Calib::filter_disps`] but also returns the boolean mask.
    pub fn filter_disps_with_mask(
        &self,
        xyd: MatRef<'_, f64>,
        max_disp: f64,
    ) -> Result<(Mat<f64>, Vec<bool>), CalibError> {
        filter::filter_disps_with_mask(xyd, self.config.image_shape, max_disp)
    }

    /// Filter `(x, y, depth)` rows to the bounds of `image_shape`.
    pub fn filter_depths(
        &self,
        xyd: MatRef<'_, f64>,
        image_shape: ImageShape,
    ) -> Result<Mat<f64>, CalibError> {
        filter::filter_depths(xyd, image_shape)
    }
}
