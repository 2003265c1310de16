// Gaussian-process regression with fixed hyperparameters

use log::trace;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_linalg::{Cholesky, Diag, SolveTriangular, UPLO};
use serde::{Deserialize, Serialize};

use crate::error::{EmulatorError, Result};
use crate::interpolate::{pairwise_distances, validate_query, validate_training_set, Interpolator};

/// Stationary correlation function of the distance between two coordinates.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum CovarianceKernel {
    /// exp(-r² / 2l²)
    SquaredExponential { length_scale: f64 },
    /// exp(-r / l)
    AbsoluteExponential { length_scale: f64 },
    /// Matérn with ν = 3/2.
    Matern32 { length_scale: f64 },
    /// Matérn with ν = 5/2.
    Matern52 { length_scale: f64 },
}

impl Default for CovarianceKernel {
    fn default() -> Self {
        CovarianceKernel::SquaredExponential { length_scale: 1.0 }
    }
}

impl CovarianceKernel {
    pub fn length_scale(&self) -> f64 {
        match *self {
            CovarianceKernel::SquaredExponential { length_scale }
            | CovarianceKernel::AbsoluteExponential { length_scale }
            | CovarianceKernel::Matern32 { length_scale }
            | CovarianceKernel::Matern52 { length_scale } => length_scale,
        }
    }

    /// Correlation at distance `r`; equals 1 at `r = 0`.
    pub fn correlation(&self, r: f64) -> f64 {
        let d = r / self.length_scale();
        match self {
            CovarianceKernel::SquaredExponential { .. } => (-0.5 * d * d).exp(),
            CovarianceKernel::AbsoluteExponential { .. } => (-d).exp(),
            CovarianceKernel::Matern32 { .. } => {
                let a = 3f64.sqrt() * d;
                (1.0 + a) * (-a).exp()
            }
            CovarianceKernel::Matern52 { .. } => {
                let a = 5f64.sqrt() * d;
                (1.0 + a + a * a / 3.0) * (-a).exp()
            }
        }
    }
}

/// Options for [`GaussianProcessInterpolator`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GaussianProcessConfig {
    pub kernel: CovarianceKernel,
    /// Prior variance of the latent function.
    pub signal_variance: f64,
    /// Added to the diagonal of the training covariance.
    pub noise_level: f64,
    /// Fit to targets shifted and scaled to zero mean and unit variance.
    pub normalize_targets: bool,
}

impl Default for GaussianProcessConfig {
    fn default() -> Self {
        GaussianProcessConfig {
            kernel: CovarianceKernel::default(),
            signal_variance: 1.0,
            noise_level: 1e-10,
            normalize_targets: false,
        }
    }
}

impl GaussianProcessConfig {
    fn validate(&self) -> Result<()> {
        let l = self.kernel.length_scale();
        if !(l.is_finite() && l > 0.0) {
            return Err(EmulatorError::InvalidConfig(format!(
                "kernel length scale must be positive and finite, got {}",
                l
            )));
        }
        if !(self.signal_variance.is_finite() && self.signal_variance > 0.0) {
            return Err(EmulatorError::InvalidConfig(format!(
                "signal variance must be positive and finite, got {}",
                self.signal_variance
            )));
        }
        if !(self.noise_level.is_finite() && self.noise_level >= 0.0) {
            return Err(EmulatorError::InvalidConfig(format!(
                "noise level must be non-negative and finite, got {}",
                self.noise_level
            )));
        }
        Ok(())
    }
}

/// Posterior mean of a zero-mean Gaussian process conditioned on the training set.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GaussianProcessInterpolator {
    /// Shape: (n_points, n_dims)
    train_coords: Array2<f64>,
    kernel: CovarianceKernel,
    signal_variance: f64,
    /// Lower Cholesky factor of the training covariance, shape (n_points, n_points).
    cholesky_lower: Array2<f64>,
    /// `K⁻¹ y`, shape (n_points).
    alpha: Array1<f64>,
    target_mean: f64,
    target_scale: f64,
}

impl GaussianProcessInterpolator {
    pub fn kernel(&self) -> CovarianceKernel {
        self.kernel
    }

    fn cross_covariance(&self, coords: ArrayView2<'_, f64>) -> Array2<f64> {
        let kernel = self.kernel;
        let variance = self.signal_variance;
        pairwise_distances(coords, self.train_coords.view()).mapv_into(|r| variance * kernel.correlation(r))
    }

    /// Posterior mean and standard deviation at each query coordinate.
    ///
    /// The standard deviation describes the latent function and excludes the
    /// observation noise.
    pub fn predict_with_std(&self, coords: ArrayView2<'_, f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        validate_query(coords, self.train_coords.ncols())?;
        let k_star = self.cross_covariance(coords);
        let mean = k_star.dot(&self.alpha).mapv_into(|m| m * self.target_scale + self.target_mean);

        let v = self
            .cholesky_lower
            .solve_triangular(UPLO::Lower, Diag::NonUnit, &k_star.t().to_owned())?;
        let explained = v.mapv(|x| x * x).sum_axis(Axis(0));
        let std = explained.mapv_into(|e| (self.signal_variance - e).max(0.0).sqrt() * self.target_scale);
        Ok((mean, std))
    }
}

impl Interpolator for GaussianProcessInterpolator {
    type Config = GaussianProcessConfig;

    fn fit(
        coords: ArrayView2<'_, f64>,
        values: ArrayView1<'_, f64>,
        config: &GaussianProcessConfig,
    ) -> Result<Self> {
        validate_training_set(coords, values)?;
        config.validate()?;

        let (target_mean, target_scale) = if config.normalize_targets {
            let mean = values.mean().unwrap_or(0.0);
            let std = values.std(0.0);
            (mean, if std > 0.0 { std } else { 1.0 })
        } else {
            (0.0, 1.0)
        };
        let targets = values.mapv(|y| (y - target_mean) / target_scale);

        let kernel = config.kernel;
        let variance = config.signal_variance;
        let mut covariance = pairwise_distances(coords, coords).mapv_into(|r| variance * kernel.correlation(r));
        covariance.diag_mut().mapv_inplace(|v| v + config.noise_level);

        let cholesky_lower = covariance.cholesky(UPLO::Lower)?;
        let z = cholesky_lower.solve_triangular(UPLO::Lower, Diag::NonUnit, &targets.insert_axis(Axis(1)))?;
        let alpha = cholesky_lower
            .t()
            .solve_triangular(UPLO::Upper, Diag::NonUnit, &z)?
            .index_axis_move(Axis(1), 0);
        trace!(
            "Fitted Gaussian process ({:?}) on {} points in {} dims.",
            kernel,
            coords.nrows(),
            coords.ncols()
        );

        Ok(GaussianProcessInterpolator {
            train_coords: coords.to_owned(),
            kernel,
            signal_variance: variance,
            cholesky_lower,
            alpha,
            target_mean,
            target_scale,
        })
    }

    fn predict(&self, coords: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        validate_query(coords, self.train_coords.ncols())?;
        let k_star = self.cross_covariance(coords);
        Ok(k_star
            .dot(&self.alpha)
            .mapv_into(|m| m * self.target_scale + self.target_mean))
    }

    fn check_fitted(&self, n_dims: usize) -> Result<()> {
        let (n_points, dims) = self.train_coords.dim();
        if n_points == 0 || dims != n_dims {
            return Err(EmulatorError::CorruptModel(format!(
                "Gaussian-process training coordinates have shape {:?}, expected {}-dimensional points",
                self.train_coords.dim(),
                n_dims
            )));
        }
        if self.cholesky_lower.dim() != (n_points, n_points) || self.alpha.len() != n_points {
            return Err(EmulatorError::CorruptModel(format!(
                "Gaussian process on {} points stores a {:?} Cholesky factor and {} weights",
                n_points,
                self.cholesky_lower.dim(),
                self.alpha.len()
            )));
        }
        let l = self.kernel.length_scale();
        if !(l.is_finite() && l > 0.0)
            || !(self.signal_variance.is_finite() && self.signal_variance > 0.0)
            || !(self.target_scale.is_finite() && self.target_scale > 0.0)
            || !self.target_mean.is_finite()
        {
            return Err(EmulatorError::CorruptModel(
                "Gaussian-process hyperparameters or target scaling are out of range".to_string(),
            ));
        }
        Ok(())
    }
}
