#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Coordinate frame transforms derived from a calibration file.
pub mod calib;

/// Calibration file reader.
pub mod calib_file;

/// Error types.
pub mod error;

/// Image bound and disparity filters for projected points.
pub mod filter;

/// Homogeneous coordinate transforms for point sets.
pub mod homogeneous;

pub use calib::{Calib, CalibConfig};
pub use calib_file::{read_calib_file, CalibData, CalibValue};
pub use error::CalibError;
pub use filter::{filter_depths, filter_disps, ImageShape};
pub use homogeneous::homogeneous_transform;
