// Interpolator strategy contract and runtime-selectable strategies

use std::fmt::Debug;

use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Data, Dimension};
use serde::{Deserialize, Serialize};

use crate::coords::atleast_2d;
use crate::error::{EmulatorError, Result};
use crate::gaussian_process::{GaussianProcessConfig, GaussianProcessInterpolator};
use crate::rbf::{RbfConfig, RbfInterpolator};

/// A scalar-valued interpolation strategy over `(samples, dims)` coordinates.
///
/// `fit` trains on one target value per coordinate row; `predict` returns one
/// value per row of a new coordinate batch. A fitted instance is immutable.
pub trait Interpolator: Sized {
    /// Strategy-specific options, passed by value at construction time.
    type Config: Clone + Debug + Default;

    fn fit(coords: ArrayView2<'_, f64>, values: ArrayView1<'_, f64>, config: &Self::Config) -> Result<Self>;

    fn predict(&self, coords: ArrayView2<'_, f64>) -> Result<Array1<f64>>;

    /// Checks that the fitted state is internally consistent and was trained on
    /// `n_dims`-dimensional coordinates. Run on every deserialized emulator.
    ///
    /// # Errors
    /// `CorruptModel` describing the first inconsistency. The default accepts any state.
    fn check_fitted(&self, _n_dims: usize) -> Result<()> {
        Ok(())
    }

    /// Like [`Interpolator::fit`], but accepts bare 1-D coordinate sequences.
    fn fit_any<S1, D1, S2>(
        coords: &ArrayBase<S1, D1>,
        values: &ArrayBase<S2, ndarray::Ix1>,
        config: &Self::Config,
    ) -> Result<Self>
    where
        S1: Data<Elem = f64>,
        D1: Dimension,
        S2: Data<Elem = f64>,
    {
        let coords = atleast_2d(coords)?;
        Self::fit(coords.view(), values.view(), config)
    }

    /// Like [`Interpolator::predict`], but accepts bare 1-D coordinate sequences.
    fn predict_any<S, D>(&self, coords: &ArrayBase<S, D>) -> Result<Array1<f64>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let coords = atleast_2d(coords)?;
        self.predict(coords.view())
    }
}

/// Checks the shared preconditions of every strategy's `fit`.
pub(crate) fn validate_training_set(coords: ArrayView2<'_, f64>, values: ArrayView1<'_, f64>) -> Result<()> {
    if coords.nrows() != values.len() {
        return Err(EmulatorError::SampleCountMismatch {
            coords: coords.nrows(),
            samples: values.len(),
        });
    }
    if coords.nrows() == 0 || coords.ncols() == 0 {
        return Err(EmulatorError::InvalidCoordinates(format!(
            "training coordinates must be non-empty, got shape {:?}",
            coords.dim()
        )));
    }
    if coords.iter().chain(values.iter()).any(|v| !v.is_finite()) {
        return Err(EmulatorError::NonFiniteData);
    }
    Ok(())
}

/// Checks that query coordinates share the training dimensionality.
pub(crate) fn validate_query(coords: ArrayView2<'_, f64>, expected_dims: usize) -> Result<()> {
    if coords.ncols() != expected_dims {
        return Err(EmulatorError::InvalidCoordinates(format!(
            "query coordinates have {} dimensions but the interpolator was trained on {}",
            coords.ncols(),
            expected_dims
        )));
    }
    Ok(())
}

/// Euclidean distances between every row of `a` and every row of `b`, shape (a_rows, b_rows).
pub(crate) fn pairwise_distances(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> Array2<f64> {
    Array2::from_shape_fn((a.nrows(), b.nrows()), |(i, j)| {
        a.row(i)
            .iter()
            .zip(b.row(j).iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    })
}

/// Configuration for [`AnyInterpolator`]; the variant selects the strategy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum InterpolatorConfig {
    GaussianProcess(GaussianProcessConfig),
    Rbf(RbfConfig),
}

impl Default for InterpolatorConfig {
    fn default() -> Self {
        InterpolatorConfig::Rbf(RbfConfig::default())
    }
}

/// A fitted interpolator whose strategy was chosen at runtime.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum AnyInterpolator {
    GaussianProcess(GaussianProcessInterpolator),
    Rbf(RbfInterpolator),
}

impl Interpolator for AnyInterpolator {
    type Config = InterpolatorConfig;

    fn fit(coords: ArrayView2<'_, f64>, values: ArrayView1<'_, f64>, config: &Self::Config) -> Result<Self> {
        Ok(match config {
            InterpolatorConfig::GaussianProcess(cfg) => {
                AnyInterpolator::GaussianProcess(GaussianProcessInterpolator::fit(coords, values, cfg)?)
            }
            InterpolatorConfig::Rbf(cfg) => AnyInterpolator::Rbf(RbfInterpolator::fit(coords, values, cfg)?),
        })
    }

    fn predict(&self, coords: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        match self {
            AnyInterpolator::GaussianProcess(gp) => gp.predict(coords),
            AnyInterpolator::Rbf(rbf) => rbf.predict(coords),
        }
    }

    fn check_fitted(&self, n_dims: usize) -> Result<()> {
        match self {
            AnyInterpolator::GaussianProcess(gp) => gp.check_fitted(n_dims),
            AnyInterpolator::Rbf(rbf) => rbf.check_fitted(n_dims),
        }
    }
}
