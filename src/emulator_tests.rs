use crate::decomposition::{Decomposer, PrincipalComponents, SvdDecomposer};
use crate::emulator::{PcaEmulator, DEFAULT_NUM_COMPONENTS};
use crate::error::EmulatorError;
use crate::gaussian_process::{CovarianceKernel, GaussianProcessConfig, GaussianProcessInterpolator};
use crate::interpolate::{AnyInterpolator, InterpolatorConfig};
use crate::rbf::{RbfConfig, RbfInterpolator};
use crate::standardize::StandardizationParams;

use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2, ArrayView2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::error::Error;

/// `2 * N(0, 1) + 1` entries, shape (n_features, n_samples).
fn noisy_data(n_features: usize, n_samples: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let normal = Normal::new(1.0, 2.0).unwrap();
    Array2::from_shape_fn((n_features, n_samples), |_| normal.sample(&mut rng))
}

#[cfg(test)]
mod construction_tests {
    use super::*;

    #[test]
    fn test_emulates_a_pca_to_reproduce_data() -> Result<(), Box<dyn Error>> {
        println!("--- Test: Emulator from precomputed components ---");
        let coords = Array1::linspace(0.0, 1.0, 5);
        let data = noisy_data(10, 5, 100);
        let standardization = StandardizationParams::from_data(data.view())?;
        let pcs = PrincipalComponents::create(data.view())?;

        let emulator =
            PcaEmulator::<RbfInterpolator>::from_components(standardization, &coords, pcs, RbfConfig::default())?;
        let new_coords = Array1::linspace(0.1, 0.9, 20);
        assert_eq!(emulator.emulate(&new_coords)?.dim(), (10, 20));
        Ok(())
    }

    #[test]
    fn test_can_be_created_from_data_directly() -> Result<(), Box<dyn Error>> {
        println!("--- Test: Emulator from raw data ---");
        let coords = Array1::linspace(0.0, 1.0, 5);
        let data = noisy_data(10, 5, 101);
        let emulator = PcaEmulator::<RbfInterpolator>::create_from_data(&coords, &data, RbfConfig::default(), 5)?;

        assert_eq!(emulator.num_components(), 5);
        assert_eq!(emulator.num_features(), 10);
        assert_eq!(emulator.num_samples(), 5);
        assert_eq!(emulator.coords().dim(), (5, 1));
        assert_eq!(emulator.weight_interpolators().len(), 5);
        assert_eq!(emulator.emulate(&Array1::linspace(0.1, 0.9, 20))?.dim(), (10, 20));
        emulator.validate()?;
        Ok(())
    }

    #[test]
    fn test_full_rank_emulator_reproduces_training_data() -> Result<(), Box<dyn Error>> {
        let coords = Array1::linspace(0.0, 1.0, 6);
        let data = noisy_data(12, 6, 102);
        let emulator = PcaEmulator::<RbfInterpolator>::create_from_data(&coords, &data, RbfConfig::default(), 6)?;

        let reconstructed = emulator.reconstruct_data(&coords)?;
        for (a, b) in reconstructed.iter().zip(data.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-8);
        }

        let standard = emulator.reconstruct_standard_data(&coords)?;
        let expected = emulator.standardization().standardize(data.view())?;
        for (a, b) in standard.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-8);
        }
        Ok(())
    }

    #[test]
    fn test_vector_valued_coordinates() -> Result<(), Box<dyn Error>> {
        let mut rng = ChaCha8Rng::seed_from_u64(103);
        let coords = Array2::random_using((8, 3), Uniform::new(0.0, 1.0), &mut rng);
        let data = noisy_data(15, 8, 104);
        let emulator = PcaEmulator::<RbfInterpolator>::create_from_data(&coords, &data, RbfConfig::default(), 4)?;

        let queries = Array2::random_using((7, 3), Uniform::new(0.1, 0.9), &mut rng);
        assert_eq!(emulator.emulate(&queries)?.dim(), (15, 7));
        Ok(())
    }

    #[test]
    fn test_explained_variance_is_truncated_and_sorted() -> Result<(), Box<dyn Error>> {
        let coords = Array1::linspace(0.0, 1.0, 9);
        let data = noisy_data(20, 9, 105);
        let emulator = PcaEmulator::<RbfInterpolator>::create_from_data(&coords, &data, RbfConfig::default(), 3)?;
        let ev = emulator.explained_variance();
        assert_eq!(ev.len(), 3);
        assert!(ev[0] >= ev[1] && ev[1] >= ev[2]);
        assert!(ev.sum() < 1.0);
        assert_eq!(emulator.basis_vectors().dim(), (20, 3));
        assert_eq!(emulator.weights().dim(), (3, 9));
        Ok(())
    }

    #[test]
    fn test_runtime_selected_strategy_is_stored_with_its_config() -> Result<(), Box<dyn Error>> {
        let coords = Array1::linspace(0.0, 1.0, 6);
        let data = noisy_data(10, 6, 106);
        let config = InterpolatorConfig::GaussianProcess(GaussianProcessConfig {
            kernel: CovarianceKernel::Matern52 { length_scale: 0.3 },
            ..GaussianProcessConfig::default()
        });
        let emulator = PcaEmulator::<AnyInterpolator>::create_from_data(&coords, &data, config.clone(), 4)?;
        assert_eq!(emulator.interpolator_config(), &config);
        assert!(emulator
            .weight_interpolators()
            .iter()
            .all(|i| matches!(i, AnyInterpolator::GaussianProcess(_))));
        Ok(())
    }

    #[test]
    fn test_custom_decomposer_is_used() -> Result<(), Box<dyn Error>> {
        struct LeadingOnly;

        impl Decomposer for LeadingOnly {
            fn decompose(&self, standard_data: ArrayView2<'_, f64>) -> crate::Result<PrincipalComponents> {
                SvdDecomposer::new().decompose(standard_data)?.truncate(1)
            }
        }

        let coords = Array1::linspace(0.0, 1.0, 6);
        let data = noisy_data(10, 6, 107);
        let emulator = PcaEmulator::<RbfInterpolator>::create_from_data_with(
            &coords,
            &data,
            RbfConfig::default(),
            1,
            &LeadingOnly,
        )?;
        assert_eq!(emulator.num_components(), 1);

        let too_many = PcaEmulator::<RbfInterpolator>::create_from_data_with(
            &coords,
            &data,
            RbfConfig::default(),
            2,
            &LeadingOnly,
        );
        assert!(matches!(
            too_many,
            Err(EmulatorError::TooManyComponents { requested: 2, available: 1 })
        ));
        Ok(())
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[test]
    fn test_default_component_count_exceeds_small_rank() {
        let coords = Array1::linspace(0.0, 1.0, 5);
        let data = noisy_data(10, 5, 200);
        let result = PcaEmulator::<RbfInterpolator>::create_from_data(
            &coords,
            &data,
            RbfConfig::default(),
            DEFAULT_NUM_COMPONENTS,
        );
        assert!(matches!(
            result,
            Err(EmulatorError::TooManyComponents { requested: 10, available: 5 })
        ));
    }

    #[test]
    fn test_zero_components_are_rejected() {
        let coords = Array1::linspace(0.0, 1.0, 5);
        let data = noisy_data(10, 5, 201);
        assert!(matches!(
            PcaEmulator::<RbfInterpolator>::create_from_data(&coords, &data, RbfConfig::default(), 0),
            Err(EmulatorError::NoComponents)
        ));
    }

    #[test]
    fn test_coordinate_count_must_match_samples() {
        let coords = Array1::linspace(0.0, 1.0, 4);
        let data = noisy_data(10, 5, 202);
        assert!(matches!(
            PcaEmulator::<RbfInterpolator>::create_from_data(&coords, &data, RbfConfig::default(), 2),
            Err(EmulatorError::SampleCountMismatch { coords: 4, samples: 5 })
        ));
    }

    #[test]
    fn test_constant_feature_is_rejected() {
        let coords = Array1::linspace(0.0, 1.0, 5);
        let mut data = noisy_data(6, 5, 203);
        data.row_mut(3).fill(2.5);
        match PcaEmulator::<RbfInterpolator>::create_from_data(&coords, &data, RbfConfig::default(), 2) {
            Err(EmulatorError::ZeroVariance { feature, .. }) => assert_eq!(feature, 3),
            other => panic!("expected ZeroVariance, got {:?}", other.map(|e| e.num_components())),
        }
    }

    #[test]
    fn test_interpolator_failure_names_the_component() {
        let coords = Array1::linspace(0.0, 1.0, 5);
        let data = noisy_data(10, 5, 204);
        let config = GaussianProcessConfig {
            signal_variance: -1.0,
            ..GaussianProcessConfig::default()
        };
        match PcaEmulator::<GaussianProcessInterpolator>::create_from_data(&coords, &data, config, 3) {
            Err(EmulatorError::ComponentFit { component, source }) => {
                assert_eq!(component, 0);
                assert!(matches!(*source, EmulatorError::InvalidConfig(_)));
            }
            other => panic!("expected ComponentFit, got {:?}", other.map(|e| e.num_components())),
        }
    }

    #[test]
    fn test_query_dimension_must_match_training() -> Result<(), Box<dyn Error>> {
        let coords = Array1::linspace(0.0, 1.0, 5);
        let data = noisy_data(10, 5, 205);
        let emulator = PcaEmulator::<RbfInterpolator>::create_from_data(&coords, &data, RbfConfig::default(), 2)?;
        let queries = Array2::<f64>::zeros((3, 2));
        assert!(matches!(
            emulator.emulate(&queries),
            Err(EmulatorError::InvalidCoordinates(_))
        ));
        Ok(())
    }
}

#[cfg(test)]
mod radial_interpolation_tests {
    use super::*;

    /// Features sampled at `radial_grid`: `a * r + b` with `(a, b)` the sample coordinate.
    fn radial_data(radial_grid: &Array1<f64>, coords: &Array2<f64>) -> Array2<f64> {
        Array2::from_shape_fn((radial_grid.len(), coords.nrows()), |(i, j)| {
            coords[[j, 0]] * radial_grid[i] + coords[[j, 1]]
        })
    }

    #[test]
    fn test_can_interpolate_over_radii() -> Result<(), Box<dyn Error>> {
        println!("--- Test: Radial resampling ---");
        let mut rng = ChaCha8Rng::seed_from_u64(300);
        let radial_grid = Array1::geomspace(1e-1, 1e1, 30).ok_or("geomspace failed")?;
        let coords = Array2::random_using((10, 2), Uniform::new(0.0, 1.0), &mut rng);
        let data = radial_data(&radial_grid, &coords);

        let emulator = PcaEmulator::<RbfInterpolator>::create_from_data(
            &coords,
            &data,
            RbfConfig::default(),
            DEFAULT_NUM_COMPONENTS,
        )?;
        let new_coords = Array2::random_using((5, 2), Uniform::new(0.0, 1.0), &mut rng).mapv(|x| 0.8 * x - 0.1);
        let new_radii = Array1::linspace(0.5, 8.0, 20);

        let resampled = emulator.with_new_radii(radial_grid.view(), new_radii.view(), &new_coords)?;
        assert_eq!(resampled.dim(), (20, 5));
        assert!(resampled.iter().all(|v| v.is_finite()));
        Ok(())
    }

    #[test]
    fn test_resampling_at_training_radii_matches_reconstruction() -> Result<(), Box<dyn Error>> {
        let mut rng = ChaCha8Rng::seed_from_u64(301);
        let radial_grid = Array1::geomspace(1e-1, 1e1, 12).ok_or("geomspace failed")?;
        let coords = Array2::random_using((8, 2), Uniform::new(0.0, 1.0), &mut rng);
        let data = radial_data(&radial_grid, &coords);
        let emulator = PcaEmulator::<RbfInterpolator>::create_from_data(&coords, &data, RbfConfig::default(), 4)?;

        let queries = Array2::random_using((3, 2), Uniform::new(0.2, 0.8), &mut rng);
        let resampled = emulator.with_new_radii(radial_grid.view(), radial_grid.view(), &queries)?;
        let reconstructed = emulator.reconstruct_data(&queries)?;
        for (a, b) in resampled.iter().zip(reconstructed.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_radii_must_cover_every_feature() -> Result<(), Box<dyn Error>> {
        let coords = Array1::linspace(0.0, 1.0, 5);
        let data = noisy_data(10, 5, 302);
        let emulator = PcaEmulator::<RbfInterpolator>::create_from_data(&coords, &data, RbfConfig::default(), 2)?;
        let old_radii = Array1::linspace(1.0, 2.0, 9);
        let new_radii = Array1::linspace(1.2, 1.8, 4);
        assert!(matches!(
            emulator.with_new_radii(old_radii.view(), new_radii.view(), &coords),
            Err(EmulatorError::InvalidRadii(_))
        ));
        Ok(())
    }
}

#[cfg(test)]
mod constant_data_tests {
    use super::*;

    /// Ones plus `1e-4` Gaussian noise, shape (30, 10).
    fn nearly_constant_data(seed: u64) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        Array2::from_shape_fn((30, 10), |_| 1.0 + 1e-4 * normal.sample(&mut rng))
    }

    fn assert_all_near_one(values: &Array2<f64>) {
        for v in values.iter() {
            assert_abs_diff_eq!(*v, 1.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_rbf_emulator_reproduces_a_constant() -> Result<(), Box<dyn Error>> {
        let coords = Array1::linspace(0.0, 1.0, 10);
        let data = nearly_constant_data(400);
        let emulator = PcaEmulator::<RbfInterpolator>::create_from_data(
            &coords,
            &data,
            RbfConfig::default(),
            DEFAULT_NUM_COMPONENTS,
        )?;
        assert_all_near_one(&emulator.emulate(&Array1::linspace(0.2, 0.8, 12))?);
        Ok(())
    }

    #[test]
    fn test_gaussian_process_emulator_reproduces_a_constant() -> Result<(), Box<dyn Error>> {
        let coords = Array1::linspace(0.0, 1.0, 10);
        let data = nearly_constant_data(401);
        let config = GaussianProcessConfig {
            kernel: CovarianceKernel::SquaredExponential { length_scale: 0.2 },
            ..GaussianProcessConfig::default()
        };
        let emulator = PcaEmulator::<GaussianProcessInterpolator>::create_from_data(
            &coords,
            &data,
            config,
            DEFAULT_NUM_COMPONENTS,
        )?;
        assert_all_near_one(&emulator.emulate(&Array1::linspace(0.2, 0.8, 12))?);
        Ok(())
    }
}
