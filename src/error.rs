// Error types for emulator construction, evaluation and persistence

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = EmulatorError> = std::result::Result<T, E>;

/// Everything that can go wrong while fitting, evaluating, or persisting an emulator.
///
/// Fit-time errors are fatal: no partially built emulator is ever returned.
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("Data matrix is empty ({features} features x {samples} samples).")]
    EmptyData { features: usize, samples: usize },

    #[error("Data matrix contains non-finite (NaN or infinity) values.")]
    NonFiniteData,

    /// A feature row is constant across all samples and cannot be scaled to unit variance.
    #[error("Feature {feature} has zero variance (std dev {std_dev:e}) and cannot be standardized.")]
    ZeroVariance { feature: usize, std_dev: f64 },

    #[error("Coordinate set has {coords} entries but the data matrix has {samples} samples.")]
    SampleCountMismatch { coords: usize, samples: usize },

    #[error("Requested {requested} principal components but the decomposition only has rank {available}.")]
    TooManyComponents { requested: usize, available: usize },

    #[error("At least one principal component must be retained.")]
    NoComponents,

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid interpolator configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid standardization parameters: {0}")]
    InvalidStandardization(String),

    #[error("Invalid radii: {0}")]
    InvalidRadii(String),

    #[error("Failed to fit the weight interpolator for component {component}: {source}")]
    ComponentFit {
        component: usize,
        #[source]
        source: Box<EmulatorError>,
    },

    #[error("Decomposition failed: {0}")]
    Decomposition(String),

    #[error("Linear algebra failure: {0}")]
    Linalg(#[from] ndarray_linalg::error::LinalgError),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize emulator: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Failed to deserialize emulator: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("Unsupported emulator format version {found} (this build reads version {expected}).")]
    UnsupportedFormatVersion { found: u32, expected: u32 },

    #[error("Loaded emulator is inconsistent: {0}")]
    CorruptModel(String),
}
