/// Error types for the calibration module.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CalibError {
    /// Error reading the calibration file
    #[error("error reading calibration file")]
    Io(#[from] std::io::Error),

    /// A non-empty line without a `key: value` separator
    #[error("Parse error at line {line}: missing ':' separator in {content:?}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// The offending line.
        content: String,
    },

    /// A transform needs a field that is not in the calibration data
    #[error("Missing calibration field: {0}")]
    MissingField(String),

    /// A transform needs a numeric field but the stored value is text
    #[error("Calibration field {0} is not numeric")]
    TypeMismatch(String),

    /// A numeric field cannot be reshaped to the expected matrix
    #[error("Calibration field {key} has {actual} values, expected {expected}")]
    InvalidFieldLength {
        /// Field name.
        key: String,
        /// Number of values required.
        expected: usize,
        /// Number of values found.
        actual: usize,
    },

    /// Point dimension does not match the transform input dimension
    #[error("Number of dimensions of points ({points}) does not match input dimensions of transform ({transform})")]
    DimensionMismatch {
        /// Dimension of the points.
        points: usize,
        /// Input dimension of the transform.
        transform: usize,
    },

    /// The transform cannot be inverted
    #[error("Singular matrix cannot be inverted")]
    SingularMatrix,

    /// Camera index outside of 0..=3
    #[error("Invalid camera index {0}, expected 0, 1, 2 or 3")]
    InvalidCameraIndex(usize),
}
