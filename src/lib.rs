// PCA emulation of vector-valued functions

#![doc = include_str!("../README.md")]

pub mod bank;
pub mod coords;
pub mod decomposition;
pub mod emulator;
pub mod error;
pub mod gaussian_process;
pub mod interpolate;
pub mod linalg_backends;
pub mod persistence;
pub mod rbf;
pub mod resample;
pub mod standardize;

pub use bank::WeightInterpolatorBank;
pub use coords::{atleast_2d, atleast_kd, cartesian_prod, grid_indices};
pub use decomposition::{Decomposer, PrincipalComponents, SvdDecomposer};
pub use emulator::{PcaEmulator, DEFAULT_NUM_COMPONENTS};
pub use error::{EmulatorError, Result};
pub use gaussian_process::{CovarianceKernel, GaussianProcessConfig, GaussianProcessInterpolator};
pub use interpolate::{AnyInterpolator, Interpolator, InterpolatorConfig};
pub use persistence::{
    load_pca_emulator, read_pca_emulator, save_pca_emulator, write_pca_emulator, FORMAT_VERSION, MAGIC,
};
pub use rbf::{RbfConfig, RbfInterpolator, RbfKernel};
pub use resample::CubicSpline;
pub use standardize::{standardize, unstandardize, StandardizationParams};

#[cfg(test)]
mod emulator_tests;
