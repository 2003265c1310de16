// Principal-component decomposition of standardized data matrices

use log::debug;
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{EmulatorError, Result};
use crate::linalg_backends::{check_descending, BackendSVD, LinAlgBackendProvider};
use crate::standardize::standardize;

/// Basis vectors, per-sample weights and explained variance of a data matrix.
///
/// For a `(n_features, n_samples)` matrix `X` with `r` components,
/// `basis_vectors · weights ≈ X`, exactly when `r` is the full rank.
/// Components are ordered by descending explained variance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PrincipalComponents {
    /// Shape: (n_features, r). Orthonormal columns.
    basis_vectors: Array2<f64>,
    /// Shape: (r, n_samples).
    weights: Array2<f64>,
    /// Shape: (r). Fraction of total variance captured by each component.
    explained_variance: Array1<f64>,
}

impl PrincipalComponents {
    /// Assembles a decomposition from precomputed parts.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the component counts of the three parts disagree.
    pub fn new(
        basis_vectors: Array2<f64>,
        weights: Array2<f64>,
        explained_variance: Array1<f64>,
    ) -> Result<Self> {
        let r = basis_vectors.ncols();
        if weights.nrows() != r || explained_variance.len() != r {
            return Err(EmulatorError::ShapeMismatch(format!(
                "basis_vectors have {} components, weights {} and explained_variance {}",
                r,
                weights.nrows(),
                explained_variance.len()
            )));
        }
        Ok(Self {
            basis_vectors,
            weights,
            explained_variance,
        })
    }

    /// Standardizes `data` and decomposes it with the default [`SvdDecomposer`].
    pub fn create(data: ArrayView2<'_, f64>) -> Result<Self> {
        SvdDecomposer::new().decompose(standardize(&data)?.view())
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

    pub fn num_components(&self) -> usize {
        self.basis_vectors.ncols()
    }

    pub fn num_features(&self) -> usize {
        self.basis_vectors.nrows()
    }

    pub fn num_samples(&self) -> usize {
        self.weights.ncols()
    }

    /// Keeps the first `num_components` components.
    ///
    /// # Errors
    /// `NoComponents` for zero, `TooManyComponents` if more are requested than the
    /// decomposition holds.
    pub fn truncate(self, num_components: usize) -> Result<Self> {
        let available = self.num_components();
        if num_components == 0 {
            return Err(EmulatorError::NoComponents);
        }
        if num_components > available {
            return Err(EmulatorError::TooManyComponents {
                requested: num_components,
                available,
            });
        }
        debug!("Truncating decomposition from {} to {} components.", available, num_components);
        Ok(Self {
            basis_vectors: self.basis_vectors.slice(s![.., ..num_components]).to_owned(),
            weights: self.weights.slice(s![..num_components, ..]).to_owned(),
            explained_variance: self.explained_variance.slice(s![..num_components]).to_owned(),
        })
    }

    /// Splits into `(basis_vectors, weights, explained_variance)`.
    pub fn into_parts(self) -> (Array2<f64>, Array2<f64>, Array1<f64>) {
        (self.basis_vectors, self.weights, self.explained_variance)
    }

    /// `basis_vectors · weights`, shape (n_features, n_samples).
    pub fn reconstruct(&self) -> Array2<f64> {
        self.basis_vectors.dot(&self.weights)
    }
}

/// Produces a [`PrincipalComponents`] from a standardized `(n_features, n_samples)` matrix.
///
/// Implementations must return components ordered by descending explained
/// variance and treat the input as read-only.
pub trait Decomposer {
    fn decompose(&self, standard_data: ArrayView2<'_, f64>) -> Result<PrincipalComponents>;
}

/// Decomposition via the thin SVD `X = U Σ Vᵀ`.
///
/// Basis vectors are the left singular vectors, weights are `Σ Vᵀ`, and the
/// explained variance of component `i` is `σᵢ² / Σⱼ σⱼ²`. The natural rank is
/// `min(n_features, n_samples)`.
#[derive(Debug, Default, Copy, Clone)]
pub struct SvdDecomposer<B = LinAlgBackendProvider> {
    backend: B,
}

impl SvdDecomposer<LinAlgBackendProvider> {
    /// Decomposer using the backend selected by the crate's feature flags.
    pub fn new() -> Self {
        Self {
            backend: LinAlgBackendProvider::new(),
        }
    }
}

impl<B: BackendSVD> SvdDecomposer<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }
}

impl<B: BackendSVD> Decomposer for SvdDecomposer<B> {
    fn decompose(&self, standard_data: ArrayView2<'_, f64>) -> Result<PrincipalComponents> {
        let (n_features, n_samples) = standard_data.dim();
        if n_features == 0 || n_samples == 0 {
            return Err(EmulatorError::EmptyData {
                features: n_features,
                samples: n_samples,
            });
        }
        let rank = n_features.min(n_samples);

        let svd = self
            .backend
            .svd_into(standard_data.to_owned(), true, true)?;
        let u = svd
            .u
            .ok_or_else(|| EmulatorError::Decomposition("SVD U not computed".to_string()))?;
        let vt = svd
            .vt
            .ok_or_else(|| EmulatorError::Decomposition("SVD V^T not computed".to_string()))?;
        let singular_values = svd.s;
        if singular_values.len() < rank || u.ncols() < rank || vt.nrows() < rank {
            return Err(EmulatorError::Decomposition(format!(
                "SVD returned {} singular values, U with {} columns and V^T with {} rows; expected at least {}",
                singular_values.len(),
                u.ncols(),
                vt.nrows(),
                rank
            )));
        }
        let singular_values = singular_values.slice(s![..rank]).to_owned();
        check_descending(&singular_values)?;

        let basis_vectors = u.slice(s![.., ..rank]).to_owned();
        let mut weights = vt.slice(s![..rank, ..]).to_owned();
        for (mut row, &sigma) in weights.axis_iter_mut(Axis(0)).zip(singular_values.iter()) {
            row *= sigma;
        }

        let variances = singular_values.mapv(|sigma| sigma * sigma);
        let total_variance = variances.sum();
        let explained_variance = if total_variance > 0.0 {
            variances / total_variance
        } else {
            Array1::zeros(rank)
        };

        debug!(
            "Decomposed {}x{} standardized matrix into {} components (leading explained variance {:.4}).",
            n_features,
            n_samples,
            rank,
            explained_variance[0]
        );
        PrincipalComponents::new(basis_vectors, weights, explained_variance)
    }
}
