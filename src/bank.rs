// One fitted interpolator per principal-component weight

use log::trace;
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{EmulatorError, Result};
use crate::interpolate::Interpolator;

/// Ordered collection of interpolators; entry `k` predicts the weight of component `k`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WeightInterpolatorBank<I> {
    interpolators: Vec<I>,
}

impl<I: Interpolator> WeightInterpolatorBank<I> {
    /// Fits one interpolator per row of `weights`.
    ///
    /// `coords` has shape (n_samples, n_dims) and `weights` (n_components, n_samples).
    ///
    /// # Errors
    /// `SampleCountMismatch` if the shapes disagree; otherwise the first failing
    /// component's error wrapped in `ComponentFit`.
    pub fn fit(coords: ArrayView2<'_, f64>, weights: ArrayView2<'_, f64>, config: &I::Config) -> Result<Self> {
        if coords.nrows() != weights.ncols() {
            return Err(EmulatorError::SampleCountMismatch {
                coords: coords.nrows(),
                samples: weights.ncols(),
            });
        }
        let interpolators = weights
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(component, row)| {
                trace!("Fitting weight interpolator for component {}.", component);
                I::fit(coords, row, config).map_err(|source| EmulatorError::ComponentFit {
                    component,
                    source: Box::new(source),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { interpolators })
    }

    /// Predicted weights at `coords`, shape (n_components, n_queries).
    ///
    /// # Errors
    /// The first interpolator error, or `ShapeMismatch` if an interpolator
    /// returns a number of values other than one per query.
    pub fn predict(&self, coords: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((self.interpolators.len(), coords.nrows()));
        for (component, (interpolator, mut row)) in
            self.interpolators.iter().zip(out.axis_iter_mut(Axis(0))).enumerate()
        {
            let predicted = interpolator.predict(coords)?;
            if predicted.len() != coords.nrows() {
                return Err(EmulatorError::ShapeMismatch(format!(
                    "weight interpolator {} returned {} values for {} queries",
                    component,
                    predicted.len(),
                    coords.nrows()
                )));
            }
            row.assign(&predicted);
        }
        Ok(out)
    }

    /// Runs [`Interpolator::check_fitted`] on every entry.
    ///
    /// # Errors
    /// `CorruptModel` naming the first inconsistent component.
    pub fn check_fitted(&self, n_dims: usize) -> Result<()> {
        for (component, interpolator) in self.interpolators.iter().enumerate() {
            interpolator.check_fitted(n_dims).map_err(|err| match err {
                EmulatorError::CorruptModel(msg) => {
                    EmulatorError::CorruptModel(format!("weight interpolator {}: {}", component, msg))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

impl<I> WeightInterpolatorBank<I> {
    pub fn from_interpolators(interpolators: Vec<I>) -> Self {
        Self { interpolators }
    }

    pub fn len(&self) -> usize {
        self.interpolators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interpolators.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, I> {
        self.interpolators.iter()
    }

    pub fn get(&self, component: usize) -> Option<&I> {
        self.interpolators.get(component)
    }
}
