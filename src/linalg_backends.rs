// src/linalg_backends.rs

use ndarray::{Array1, Array2};

use crate::error::{EmulatorError, Result};

/// Output of a Singular Value Decomposition.
///
/// `u` and `vt` may be full or thin depending on the backend; callers slice
/// them down to the first `s.len()` singular vectors.
#[derive(Debug)]
pub struct SVDOutput {
    pub u: Option<Array2<f64>>,
    /// Singular values, sorted in descending order.
    pub s: Array1<f64>,
    pub vt: Option<Array2<f64>>,
}

/// Trait for Singular Value Decomposition.
pub trait BackendSVD {
    fn svd_into(&self, matrix: Array2<f64>, compute_u: bool, compute_v: bool) -> Result<SVDOutput>;
}

// --- NdarrayLinAlgBackend Implementation ---
use ndarray_linalg::{JobSvd, SVDDCInto};

#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

impl BackendSVD for NdarrayLinAlgBackend {
    /// Thin divide-and-conquer SVD: `u` is (n_rows, k) and `vt` is (k, n_cols)
    /// with `k = min(n_rows, n_cols)`.
    fn svd_into(&self, matrix: Array2<f64>, compute_u: bool, compute_v: bool) -> Result<SVDOutput> {
        let job = if compute_u || compute_v { JobSvd::Some } else { JobSvd::None };
        let (u, s, vt) = matrix.svddc_into(job)?;
        Ok(SVDOutput {
            u: u.filter(|_| compute_u),
            s,
            vt: vt.filter(|_| compute_v),
        })
    }
}

// --- FaerLinAlgBackend Implementation ---
#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{BackendSVD, SVDOutput};
    use crate::error::{EmulatorError, Result};
    use faer::linalg::solvers::Svd as FaerSolverSvd;
    use faer::MatRef;
    use ndarray::{Array1, Array2, ShapeBuilder};

    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerLinAlgBackend;

    fn faer_mat_to_ndarray(faer_mat: MatRef<'_, f64>) -> Result<Array2<f64>> {
        let nrows = faer_mat.nrows();
        let ncols = faer_mat.ncols();
        if nrows == 0 || ncols == 0 {
            return Ok(Array2::zeros((nrows, ncols).f()));
        }
        let mut data_vec = Vec::with_capacity(nrows * ncols);
        for j in 0..ncols {
            for i in 0..nrows {
                // i < nrows and j < ncols by construction of the loops
                data_vec.push(unsafe { *faer_mat.get_unchecked(i, j) });
            }
        }
        Ok(Array2::from_shape_vec((nrows, ncols).f(), data_vec)?)
    }

    fn faer_col_to_ndarray_vec(faer_col: faer::ColRef<'_, f64>) -> Array1<f64> {
        let nrows = faer_col.nrows();
        let mut data_vec = Vec::with_capacity(nrows);
        for i in 0..nrows {
            data_vec.push(unsafe { *faer_col.get_unchecked(i) });
        }
        Array1::from_vec(data_vec)
    }

    impl BackendSVD for FaerLinAlgBackend {
        fn svd_into(&self, matrix: Array2<f64>, compute_u: bool, compute_v: bool) -> Result<SVDOutput> {
            let (nrows, ncols) = matrix.dim();
            if matrix.is_empty() {
                let k_dim = nrows.min(ncols);
                return Ok(SVDOutput {
                    u: if compute_u { Some(Array2::zeros((nrows, k_dim))) } else { None },
                    s: Array1::zeros(k_dim),
                    vt: if compute_v { Some(Array2::zeros((k_dim, ncols))) } else { None },
                });
            }
            // faer views need contiguous storage in a single memory order.
            let matrix = matrix.as_standard_layout().into_owned();
            let slice = matrix.as_slice_memory_order().ok_or_else(|| {
                EmulatorError::Decomposition(format!(
                    "Failed to get slice from row-major ndarray matrix ({}x{})",
                    nrows, ncols
                ))
            })?;
            let faer_mat_ref = MatRef::from_row_major_slice(slice, nrows, ncols);

            let svd_solver_instance = FaerSolverSvd::new_thin(faer_mat_ref).map_err(|e| {
                EmulatorError::Decomposition(format!("Faer SVD computation failed: {:?}", e))
            })?;

            let s_ndarray = faer_col_to_ndarray_vec(svd_solver_instance.S().diagonal().as_ref());

            let u_ndarray = if compute_u {
                Some(faer_mat_to_ndarray(svd_solver_instance.U().as_ref())?)
            } else {
                None
            };

            let vt_ndarray = if compute_v {
                let v_ndarray = faer_mat_to_ndarray(svd_solver_instance.V().as_ref())?;
                Some(v_ndarray.t().into_owned())
            } else {
                None
            };

            Ok(SVDOutput { u: u_ndarray, s: s_ndarray, vt: vt_ndarray })
        }
    }
}

/// Dispatches to the linear algebra backend selected by compile-time feature flags.
#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider;

impl LinAlgBackendProvider {
    pub fn new() -> Self {
        Self
    }
}

impl BackendSVD for LinAlgBackendProvider {
    fn svd_into(&self, matrix: Array2<f64>, compute_u: bool, compute_v: bool) -> Result<SVDOutput> {
        #[cfg(feature = "backend_faer")]
        {
            faer_specific_code::FaerLinAlgBackend.svd_into(matrix, compute_u, compute_v)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.svd_into(matrix, compute_u, compute_v)
        }
    }
}

/// Checks that a backend returned singular values in descending order.
pub(crate) fn check_descending(s: &Array1<f64>) -> Result<()> {
    if s.iter().zip(s.iter().skip(1)).any(|(a, b)| b > a) {
        return Err(EmulatorError::Decomposition(
            "singular values are not sorted in descending order".to_string(),
        ));
    }
    Ok(())
}
