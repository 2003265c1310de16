// PCA emulator: standardize, decompose, interpolate weights, reconstruct

use std::time::Instant;

use log::{debug, info};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Dimension, Ix2};
use serde::{Deserialize, Serialize};

use crate::bank::WeightInterpolatorBank;
use crate::coords::atleast_2d;
use crate::decomposition::{Decomposer, PrincipalComponents, SvdDecomposer};
use crate::error::{EmulatorError, Result};
use crate::interpolate::Interpolator;
use crate::resample::resample_rows;
use crate::standardize::StandardizationParams;

/// Number of principal components retained when the caller has no preference.
pub const DEFAULT_NUM_COMPONENTS: usize = 10;

/// Surrogate for a vector-valued function of a low-dimensional parameter.
///
/// The emulator holds the standardization of its training data matrix
/// `(n_features, n_samples)`, a truncated principal-component basis, and one
/// fitted interpolator `I` per retained component that predicts that
/// component's weight from the parameter coordinates. Evaluating it at `Q`
/// coordinates yields an `(n_features, Q)` matrix in physical units.
///
/// An emulator is immutable once built.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(bound(
    serialize = "I: Serialize, I::Config: Serialize",
    deserialize = "I: Deserialize<'de>, I::Config: Deserialize<'de>"
))]
pub struct PcaEmulator<I: Interpolator> {
    standardization: StandardizationParams,
    /// Shape: (n_samples, n_dims). Row `j` is the coordinate of sample column `j`.
    coords: Array2<f64>,
    /// Shape: (n_features, n_components)
    basis_vectors: Array2<f64>,
    /// Shape: (n_components, n_samples)
    weights: Array2<f64>,
    /// Shape: (n_components)
    explained_variance: Array1<f64>,
    interpolator_config: I::Config,
    weight_interpolators: WeightInterpolatorBank<I>,
}

impl<I: Interpolator> PcaEmulator<I> {
    /// Builds an emulator from a precomputed standardization and decomposition,
    /// fitting the weight interpolators eagerly.
    ///
    /// `coords` may be a bare 1-D sequence (one scalar parameter per sample) or
    /// a `(n_samples, n_dims)` matrix.
    ///
    /// # Errors
    /// `SampleCountMismatch` if `coords` and the weights disagree on the sample
    /// count, `ShapeMismatch` if the basis and the standardization disagree on
    /// the feature count, or the first interpolator fit failure.
    pub fn from_components<S, D>(
        standardization: StandardizationParams,
        coords: &ArrayBase<S, D>,
        components: PrincipalComponents,
        config: I::Config,
    ) -> Result<Self>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let coords = atleast_2d(coords)?;
        if coords.nrows() != components.num_samples() {
            return Err(EmulatorError::SampleCountMismatch {
                coords: coords.nrows(),
                samples: components.num_samples(),
            });
        }
        if components.num_features() != standardization.num_features() {
            return Err(EmulatorError::ShapeMismatch(format!(
                "basis vectors cover {} features but the standardization covers {}",
                components.num_features(),
                standardization.num_features()
            )));
        }

        let start = Instant::now();
        let weight_interpolators = WeightInterpolatorBank::fit(coords.view(), components.weights().view(), &config)?;
        debug!(
            "Fitted {} weight interpolators over {} samples in {:?}",
            weight_interpolators.len(),
            coords.nrows(),
            start.elapsed()
        );

        let (basis_vectors, weights, explained_variance) = components.into_parts();
        Ok(Self {
            standardization,
            coords,
            basis_vectors,
            weights,
            explained_variance,
            interpolator_config: config,
            weight_interpolators,
        })
    }

    /// Fits an emulator on raw training data with the default SVD decomposition.
    ///
    /// `data` has shape `(n_features, n_samples)` and column `j` is the output at
    /// coordinate `j` of `coords`. Only the leading `num_components` components
    /// are kept.
    ///
    /// # Errors
    /// Any standardization error (`ZeroVariance`, `NonFiniteData`, `EmptyData`),
    /// `SampleCountMismatch`, `NoComponents` or `TooManyComponents` for an
    /// invalid `num_components`, and `ComponentFit` if an interpolator fails.
    pub fn create_from_data<S1, D1, S2>(
        coords: &ArrayBase<S1, D1>,
        data: &ArrayBase<S2, Ix2>,
        config: I::Config,
        num_components: usize,
    ) -> Result<Self>
    where
        S1: Data<Elem = f64>,
        D1: Dimension,
        S2: Data<Elem = f64>,
    {
        Self::create_from_data_with(coords, data, config, num_components, &SvdDecomposer::new())
    }

    /// Like [`PcaEmulator::create_from_data`], with a caller-supplied decomposition.
    pub fn create_from_data_with<S1, D1, S2, Dec>(
        coords: &ArrayBase<S1, D1>,
        data: &ArrayBase<S2, Ix2>,
        config: I::Config,
        num_components: usize,
        decomposer: &Dec,
    ) -> Result<Self>
    where
        S1: Data<Elem = f64>,
        D1: Dimension,
        S2: Data<Elem = f64>,
        Dec: Decomposer + ?Sized,
    {
        let start = Instant::now();
        let (n_features, n_samples) = data.dim();
        info!(
            "Building PCA emulator from {} features x {} samples, keeping {} components",
            n_features, n_samples, num_components
        );

        let coords = atleast_2d(coords)?;
        if coords.nrows() != n_samples {
            return Err(EmulatorError::SampleCountMismatch {
                coords: coords.nrows(),
                samples: n_samples,
            });
        }

        let standardization = StandardizationParams::from_data(data.view())?;
        let standard_data = standardization.standardize(data.view())?;
        let components = decomposer.decompose(standard_data.view())?.truncate(num_components)?;
        debug!(
            "Retained components explain {:.4} of the variance.",
            components.explained_variance().sum()
        );

        let emulator = Self::from_components(standardization, &coords, components, config)?;
        info!("PCA emulator built in {:?}", start.elapsed());
        Ok(emulator)
    }

    /// Reconstructed output at `coords` in standardized units, shape (n_features, Q).
    pub fn reconstruct_standard_data<S, D>(&self, coords: &ArrayBase<S, D>) -> Result<Array2<f64>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let coords = atleast_2d(coords)?;
        let predicted_weights = self.weight_interpolators.predict(coords.view())?;
        Ok(self.basis_vectors.dot(&predicted_weights))
    }

    /// Reconstructed output at `coords` in physical units, shape (n_features, Q).
    pub fn reconstruct_data<S, D>(&self, coords: &ArrayBase<S, D>) -> Result<Array2<f64>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let standard_data = self.reconstruct_standard_data(coords)?;
        self.standardization.unstandardize(standard_data.view())
    }

    /// Evaluates the emulator; same as [`PcaEmulator::reconstruct_data`].
    pub fn emulate<S, D>(&self, coords: &ArrayBase<S, D>) -> Result<Array2<f64>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        self.reconstruct_data(coords)
    }

    /// Reconstructs the output at `coords` and resamples its feature axis, taken
    /// as samples at `old_radii`, onto `new_radii` with a cubic spline.
    ///
    /// Returns shape `(new_radii.len(), Q)`. Radii outside the range of
    /// `old_radii` are extrapolated.
    ///
    /// # Errors
    /// `InvalidRadii` if `old_radii` is not a strictly monotonic sequence of at
    /// least four finite values with one entry per feature.
    pub fn with_new_radii<S, D>(
        &self,
        old_radii: ArrayView1<'_, f64>,
        new_radii: ArrayView1<'_, f64>,
        coords: &ArrayBase<S, D>,
    ) -> Result<Array2<f64>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        if old_radii.len() != self.num_features() {
            return Err(EmulatorError::InvalidRadii(format!(
                "{} radii given for an emulator with {} features",
                old_radii.len(),
                self.num_features()
            )));
        }
        let data = self.reconstruct_data(coords)?;
        resample_rows(old_radii, new_radii, data.view())
    }

    pub fn mean(&self) -> &Array1<f64> {
        self.standardization.mean()
    }

    pub fn std_dev(&self) -> &Array1<f64> {
        self.standardization.std_dev()
    }

    pub fn standardization(&self) -> &StandardizationParams {
        &self.standardization
    }

    pub fn coords(&self) -> &Array2<f64> {
        &self.coords
    }

    pub fn basis_vectors(&self) -> &Array2<f64> {
        &self.basis_vectors
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn explained_variance(&self) -> &Array1<f64> {
        &self.explained_variance
    }

    pub fn interpolator_config(&self) -> &I::Config {
        &self.interpolator_config
    }

    pub fn weight_interpolators(&self) -> &WeightInterpolatorBank<I> {
        &self.weight_interpolators
    }

    pub fn num_components(&self) -> usize {
        self.basis_vectors.ncols()
    }

    pub fn num_features(&self) -> usize {
        self.basis_vectors.nrows()
    }

    pub fn num_samples(&self) -> usize {
        self.weights.ncols()
    }

    /// Checks that every stored part agrees on the feature, sample and component
    /// counts, and that each weight interpolator is internally consistent.
    ///
    /// # Errors
    /// `CorruptModel` naming the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        let n_features = self.num_features();
        let n_components = self.num_components();
        let n_samples = self.num_samples();

        if n_features == 0 || n_components == 0 || n_samples == 0 {
            return Err(EmulatorError::CorruptModel(format!(
                "empty emulator: {} features, {} components, {} samples",
                n_features, n_components, n_samples
            )));
        }
        if self.standardization.num_features() != n_features
            || self.standardization.std_dev().len() != n_features
        {
            return Err(EmulatorError::CorruptModel(format!(
                "standardization covers {} features but the basis has {}",
                self.standardization.num_features(),
                n_features
            )));
        }
        if self.standardization.std_dev().iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(EmulatorError::CorruptModel(
                "standard deviations must be positive and finite".to_string(),
            ));
        }
        if self.weights.nrows() != n_components || self.explained_variance.len() != n_components {
            return Err(EmulatorError::CorruptModel(format!(
                "basis has {} components, weights {} and explained variance {}",
                n_components,
                self.weights.nrows(),
                self.explained_variance.len()
            )));
        }
        if self.coords.nrows() != n_samples {
            return Err(EmulatorError::CorruptModel(format!(
                "{} coordinates stored for {} samples",
                self.coords.nrows(),
                n_samples
            )));
        }
        if self.weight_interpolators.len() != n_components {
            return Err(EmulatorError::CorruptModel(format!(
                "{} weight interpolators stored for {} components",
                self.weight_interpolators.len(),
                n_components
            )));
        }
        self.weight_interpolators.check_fitted(self.coords.ncols())?;
        Ok(())
    }
}
