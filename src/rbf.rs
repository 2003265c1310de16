// Radial basis function interpolation

use log::trace;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_linalg::Solve;
use serde::{Deserialize, Serialize};

use crate::error::{EmulatorError, Result};
use crate::interpolate::{pairwise_distances, validate_query, validate_training_set, Interpolator};

/// Radial kernel `φ(r)` with shape parameter `ε`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RbfKernel {
    /// sqrt((r/ε)² + 1)
    #[default]
    Multiquadric,
    /// 1 / sqrt((r/ε)² + 1)
    InverseMultiquadric,
    /// exp(-(r/ε)²)
    Gaussian,
    /// r
    Linear,
    /// r³
    Cubic,
    /// r⁵
    Quintic,
    /// r² ln(r)
    ThinPlate,
}

impl RbfKernel {
    pub fn evaluate(self, r: f64, epsilon: f64) -> f64 {
        match self {
            RbfKernel::Multiquadric => ((r / epsilon).powi(2) + 1.0).sqrt(),
            RbfKernel::InverseMultiquadric => 1.0 / ((r / epsilon).powi(2) + 1.0).sqrt(),
            RbfKernel::Gaussian => (-(r / epsilon).powi(2)).exp(),
            RbfKernel::Linear => r,
            RbfKernel::Cubic => r.powi(3),
            RbfKernel::Quintic => r.powi(5),
            RbfKernel::ThinPlate => {
                if r == 0.0 {
                    0.0
                } else {
                    r * r * r.ln()
                }
            }
        }
    }
}

/// Options for [`RbfInterpolator`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RbfConfig {
    pub kernel: RbfKernel,
    /// Shape parameter. `None` picks `(Π edges / n)^(1/d)`: the geometric mean
    /// of the bounding-box edges, shrunk by the point count `n`.
    pub epsilon: Option<f64>,
    /// Subtracted from the diagonal of the interpolation matrix; 0 interpolates exactly.
    pub smoothing: f64,
}

impl Default for RbfConfig {
    fn default() -> Self {
        RbfConfig {
            kernel: RbfKernel::Multiquadric,
            epsilon: None,
            smoothing: 0.0,
        }
    }
}

/// Fitted RBF interpolant `f(x) = Σᵢ cᵢ φ(‖x - xᵢ‖)`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RbfInterpolator {
    /// Shape: (n_points, n_dims)
    centers: Array2<f64>,
    /// Shape: (n_points)
    coefficients: Array1<f64>,
    kernel: RbfKernel,
    epsilon: f64,
}

impl RbfInterpolator {
    pub fn kernel(&self) -> RbfKernel {
        self.kernel
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

/// Geometric-mean edge of the bounding box per point: `(Π edges / n)^(1/d)`,
/// over the non-degenerate edges only.
fn default_epsilon(coords: ArrayView2<'_, f64>) -> f64 {
    let edges: Vec<f64> = coords
        .axis_iter(Axis(1))
        .map(|column| {
            let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = column.iter().copied().fold(f64::INFINITY, f64::min);
            max - min
        })
        .filter(|&edge| edge > 0.0)
        .collect();
    if edges.is_empty() {
        return 1.0;
    }
    let product: f64 = edges.iter().product();
    (product / coords.nrows() as f64).powf(1.0 / edges.len() as f64)
}

impl Interpolator for RbfInterpolator {
    type Config = RbfConfig;

    fn fit(coords: ArrayView2<'_, f64>, values: ArrayView1<'_, f64>, config: &RbfConfig) -> Result<Self> {
        validate_training_set(coords, values)?;
        let epsilon = config.epsilon.unwrap_or_else(|| default_epsilon(coords));
        let kernel = config.kernel;

        let mut system = pairwise_distances(coords, coords).mapv_into(|r| kernel.evaluate(r, epsilon));
        if config.smoothing != 0.0 {
            system.diag_mut().mapv_inplace(|v| v - config.smoothing);
        }
        let coefficients = system.solve_into(values.to_owned())?;
        trace!(
            "Fitted {:?} RBF on {} points in {} dims (epsilon {:.4e}).",
            kernel,
            coords.nrows(),
            coords.ncols(),
            epsilon
        );

        Ok(RbfInterpolator {
            centers: coords.to_owned(),
            coefficients,
            kernel,
            epsilon,
        })
    }

    fn predict(&self, coords: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        validate_query(coords, self.centers.ncols())?;
        let kernel = self.kernel;
        let epsilon = self.epsilon;
        let basis = pairwise_distances(coords, self.centers.view()).mapv_into(|r| kernel.evaluate(r, epsilon));
        Ok(basis.dot(&self.coefficients))
    }

    fn check_fitted(&self, n_dims: usize) -> Result<()> {
        let (n_points, dims) = self.centers.dim();
        if n_points == 0 || dims != n_dims {
            return Err(EmulatorError::CorruptModel(format!(
                "RBF centers have shape {:?}, expected {}-dimensional points",
                self.centers.dim(),
                n_dims
            )));
        }
        if self.coefficients.len() != n_points {
            return Err(EmulatorError::CorruptModel(format!(
                "RBF has {} centers but {} coefficients",
                n_points,
                self.coefficients.len()
            )));
        }
        if !self.epsilon.is_finite() {
            return Err(EmulatorError::CorruptModel(format!(
                "RBF shape parameter is {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}
