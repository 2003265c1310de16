// Per-feature standardization of data matrices

use log::debug;
use ndarray::{Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix1, Ix2, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{EmulatorError, Result};

/// Relative threshold below which a feature's standard deviation is treated as zero.
pub const ZERO_VARIANCE_TOLERANCE: f64 = 1e-12;

/// Per-feature mean and standard deviation of a data matrix.
///
/// Data matrices are laid out `(n_features, n_samples)`: statistics are taken
/// along the sample axis (axis 1), one value per feature row. The standard
/// deviation is the population one (divides by `n_samples`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StandardizationParams {
    /// Shape: (n_features)
    mean: Array1<f64>,
    /// Shape: (n_features). Strictly positive and finite.
    std_dev: Array1<f64>,
}

impl StandardizationParams {
    /// Computes the statistics of `data`.
    ///
    /// # Errors
    /// `EmptyData` for a matrix without features or samples, `NonFiniteData` if
    /// any entry is NaN or infinite, and `ZeroVariance` for the first constant feature.
    pub fn from_data(data: ArrayView2<'_, f64>) -> Result<Self> {
        let (n_features, n_samples) = data.dim();
        if n_features == 0 || n_samples == 0 {
            return Err(EmulatorError::EmptyData {
                features: n_features,
                samples: n_samples,
            });
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(EmulatorError::NonFiniteData);
        }

        let mean = data
            .mean_axis(Axis(1))
            .ok_or(EmulatorError::EmptyData { features: n_features, samples: n_samples })?;
        let std_dev = data.std_axis(Axis(1), 0.0);

        if let Some((feature, &s)) = std_dev
            .iter()
            .enumerate()
            .find(|(i, &s)| s <= ZERO_VARIANCE_TOLERANCE * mean[*i].abs().max(1.0))
        {
            return Err(EmulatorError::ZeroVariance { feature, std_dev: s });
        }

        debug!(
            "Computed standardization parameters for {} features over {} samples.",
            n_features, n_samples
        );
        Ok(Self { mean, std_dev })
    }

    /// Reassembles parameters from stored vectors.
    ///
    /// # Errors
    /// `ShapeMismatch` if the two vectors differ in length, `InvalidStandardization`
    /// if a mean is not finite or a standard deviation is not strictly positive and finite.
    pub fn with_values(mean: Array1<f64>, std_dev: Array1<f64>) -> Result<Self> {
        if mean.len() != std_dev.len() {
            return Err(EmulatorError::ShapeMismatch(format!(
                "mean has {} entries but std_dev has {}",
                mean.len(),
                std_dev.len()
            )));
        }
        if let Some(feature) = mean.iter().position(|m| !m.is_finite()) {
            return Err(EmulatorError::InvalidStandardization(format!(
                "mean of feature {} is {}",
                feature, mean[feature]
            )));
        }
        if let Some(feature) = std_dev.iter().position(|s| !s.is_finite() || *s <= 0.0) {
            return Err(EmulatorError::InvalidStandardization(format!(
                "standard deviation of feature {} is {}, expected a positive finite value",
                feature, std_dev[feature]
            )));
        }
        Ok(Self { mean, std_dev })
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn std_dev(&self) -> &Array1<f64> {
        &self.std_dev
    }

    pub fn num_features(&self) -> usize {
        self.mean.len()
    }

    /// Maps `data` into zero-mean, unit-variance units using these parameters.
    pub fn standardize(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_rows(data.nrows())?;
        let mut out = data.to_owned();
        Zip::from(out.rows_mut())
            .and(&self.mean)
            .and(&self.std_dev)
            .for_each(|mut row, &m, &s| row.mapv_inplace(|x| (x - m) / s));
        Ok(out)
    }

    /// Maps standardized data back into physical units.
    pub fn unstandardize(&self, standard_data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        unstandardize(&standard_data, &self.mean, &self.std_dev)
    }

    fn check_rows(&self, n_rows: usize) -> Result<()> {
        if n_rows != self.mean.len() {
            return Err(EmulatorError::ShapeMismatch(format!(
                "data has {} feature rows but the standardization parameters cover {}",
                n_rows,
                self.mean.len()
            )));
        }
        Ok(())
    }
}

/// Standardizes each feature row of `data` to zero mean and unit standard deviation.
pub fn standardize<S: Data<Elem = f64>>(data: &ArrayBase<S, Ix2>) -> Result<Array2<f64>> {
    StandardizationParams::from_data(data.view())?.standardize(data.view())
}

/// Exact inverse of [`standardize`]: `mean + standard_data * std_dev`, broadcast
/// along the feature axis.
pub fn unstandardize<S1, S2, S3>(
    standard_data: &ArrayBase<S1, Ix2>,
    mean: &ArrayBase<S2, Ix1>,
    std_dev: &ArrayBase<S3, Ix1>,
) -> Result<Array2<f64>>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    S3: Data<Elem = f64>,
{
    let n_rows = standard_data.nrows();
    if mean.len() != n_rows || std_dev.len() != n_rows {
        return Err(EmulatorError::ShapeMismatch(format!(
            "standardized data has {} feature rows but mean has {} and std_dev has {} entries",
            n_rows,
            mean.len(),
            std_dev.len()
        )));
    }
    let mut out = standard_data.to_owned();
    Zip::from(out.rows_mut())
        .and(mean)
        .and(std_dev)
        .for_each(|mut row, &m, &s| row.mapv_inplace(|z| m + z * s));
    Ok(out)
}

/// Per-feature means of a `(n_features, n_samples)` matrix.
#[cfg(test)]
pub(crate) fn feature_means(data: ArrayView2<'_, f64>) -> Option<Array1<f64>> {
    data.mean_axis(Axis(1))
}

/// Per-feature population standard deviations of a `(n_features, n_samples)` matrix.
#[cfg(test)]
pub(crate) fn feature_std_devs(data: ArrayView2<'_, f64>) -> Array1<f64> {
    data.std_axis(Axis(1), 0.0)
}
