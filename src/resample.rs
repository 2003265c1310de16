// Cubic-spline resampling along the feature (radial) axis

use log::{debug, warn};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_linalg::{FactorizeTridiagonalInto, MatrixLayout, SolveTridiagonal, Tridiagonal};

use crate::error::{EmulatorError, Result};

/// Fewest knots a not-a-knot cubic spline can be built on.
pub const MIN_SPLINE_KNOTS: usize = 4;

/// Not-a-knot cubic splines through several series sharing the same knots.
///
/// Column `q` of `values` is one series sampled at `knots`. The third
/// derivative is continuous across the second and penultimate knots.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    /// Shape: (n_knots). Strictly increasing.
    knots: Array1<f64>,
    /// Shape: (n_knots, n_series)
    values: Array2<f64>,
    /// Second derivative of every series at every knot, shape (n_knots, n_series).
    second_derivatives: Array2<f64>,
}

impl CubicSpline {
    /// Fits one spline per column of `values`.
    ///
    /// Knots must be finite and strictly monotonic; decreasing knots are
    /// reversed together with the rows of `values`.
    ///
    /// # Errors
    /// `InvalidRadii` for fewer than four knots, non-finite or non-monotonic
    /// knots, or a row count that differs from the knot count.
    pub fn fit(knots: ArrayView1<'_, f64>, values: ArrayView2<'_, f64>) -> Result<Self> {
        let n = knots.len();
        if n < MIN_SPLINE_KNOTS {
            return Err(EmulatorError::InvalidRadii(format!(
                "a cubic spline needs at least {} radii, got {}",
                MIN_SPLINE_KNOTS, n
            )));
        }
        if values.nrows() != n {
            return Err(EmulatorError::InvalidRadii(format!(
                "{} radii given for data with {} features",
                n,
                values.nrows()
            )));
        }
        if knots.iter().any(|k| !k.is_finite()) {
            return Err(EmulatorError::InvalidRadii("radii must be finite".to_string()));
        }

        let increasing = knots.windows(2).into_iter().all(|w| w[1] > w[0]);
        let decreasing = knots.windows(2).into_iter().all(|w| w[1] < w[0]);
        let (knots, values) = if increasing {
            (knots.to_owned(), values.to_owned())
        } else if decreasing {
            (
                knots.slice(s![..;-1]).to_owned(),
                values.slice(s![..;-1, ..]).to_owned(),
            )
        } else {
            return Err(EmulatorError::InvalidRadii(
                "radii must be strictly increasing or strictly decreasing".to_string(),
            ));
        };

        let h: Array1<f64> = knots.windows(2).into_iter().map(|w| w[1] - w[0]).collect();
        let mut rhs = Array2::<f64>::zeros((n, values.ncols()));
        for i in 1..n - 1 {
            let (lower, upper) = (values.row(i - 1), values.row(i + 1));
            for (q, out) in rhs.row_mut(i).iter_mut().enumerate() {
                *out = 6.0 * ((upper[q] - values[[i, q]]) / h[i] - (values[[i, q]] - lower[q]) / h[i - 1]);
            }
        }

        // Interior rows are the usual continuity conditions. The two
        // not-a-knot rows also touch M[2] and M[n-3]; eliminating those with
        // the neighbouring interior row keeps the system tridiagonal.
        let mut dl = Vec::with_capacity(n - 1);
        let mut d = Vec::with_capacity(n);
        let mut du = Vec::with_capacity(n - 1);
        let (h0, h1) = (h[0], h[1]);
        d.push(h0 - h1);
        du.push(2.0 * h0 + h1);
        for i in 1..n - 1 {
            dl.push(h[i - 1]);
            d.push(2.0 * (h[i - 1] + h[i]));
            du.push(h[i]);
        }
        let (ha, hb) = (h[n - 3], h[n - 2]);
        dl.push(ha + 2.0 * hb);
        d.push(hb - ha);

        let first = &rhs.row(1) * (h0 / (h0 + h1));
        rhs.row_mut(0).assign(&first);
        let last = &rhs.row(n - 2) * (hb / (ha + hb));
        rhs.row_mut(n - 1).assign(&last);

        let system = Tridiagonal {
            l: MatrixLayout::F { col: n as i32, lda: n as i32 },
            dl,
            d,
            du,
        };
        let second_derivatives = system.factorize_tridiagonal_into()?.solve_tridiagonal_into(rhs)?;

        Ok(Self {
            knots,
            values,
            second_derivatives,
        })
    }

    pub fn num_series(&self) -> usize {
        self.values.ncols()
    }

    /// Evaluates every series at `points`, shape (n_points, n_series).
    ///
    /// Points outside the knot range are extrapolated with the boundary
    /// polynomial pieces.
    pub fn evaluate(&self, points: ArrayView1<'_, f64>) -> Result<Array2<f64>> {
        if points.iter().any(|p| !p.is_finite()) {
            return Err(EmulatorError::InvalidRadii("new radii must be finite".to_string()));
        }
        let n = self.knots.len();
        let (lo, hi) = (self.knots[0], self.knots[n - 1]);
        let outside = points.iter().filter(|&&p| p < lo || p > hi).count();
        if outside > 0 {
            warn!(
                "{} of {} resampling radii fall outside the training range [{}, {}] and will be extrapolated.",
                outside,
                points.len(),
                lo,
                hi
            );
        }

        let knots = self
            .knots
            .as_slice()
            .ok_or_else(|| EmulatorError::ShapeMismatch("spline knots are not contiguous".to_string()))?;
        let mut out = Array2::<f64>::zeros((points.len(), self.num_series()));
        for (&t, mut row) in points.iter().zip(out.axis_iter_mut(Axis(0))) {
            let i = knots.partition_point(|&k| k <= t).saturating_sub(1).min(n - 2);
            let (x0, x1) = (knots[i], knots[i + 1]);
            let h = x1 - x0;
            let (a, b) = (x1 - t, t - x0);
            for q in 0..row.len() {
                let (m0, m1) = (self.second_derivatives[[i, q]], self.second_derivatives[[i + 1, q]]);
                let (y0, y1) = (self.values[[i, q]], self.values[[i + 1, q]]);
                row[q] = m0 * a.powi(3) / (6.0 * h)
                    + m1 * b.powi(3) / (6.0 * h)
                    + (y0 / h - m0 * h / 6.0) * a
                    + (y1 / h - m1 * h / 6.0) * b;
            }
        }
        Ok(out)
    }
}

/// Remaps `data` (n_radii, n_series), sampled along its rows at `old_radii`,
/// onto `new_radii`. Returns shape (new_radii.len(), n_series).
pub fn resample_rows(
    old_radii: ArrayView1<'_, f64>,
    new_radii: ArrayView1<'_, f64>,
    data: ArrayView2<'_, f64>,
) -> Result<Array2<f64>> {
    let spline = CubicSpline::fit(old_radii, data)?;
    debug!(
        "Resampling {} series from {} to {} radii.",
        spline.num_series(),
        old_radii.len(),
        new_radii.len()
    );
    spline.evaluate(new_radii)
}
