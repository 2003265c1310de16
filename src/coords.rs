// Coordinate helpers: dimension padding and cartesian products

use ndarray::{Array2, ArrayBase, ArrayD, ArrayView1, Data, Dimension, Ix2, IxDyn, Order};

use crate::error::{EmulatorError, Result};

/// Pads `array` with unit-length axes until it has at least `k` dimensions.
///
/// With `append_dims` the new axes go after the existing ones, so a length-`n`
/// vector becomes `(n, 1, ...)`. Otherwise they are prepended, giving `(1, ..., n)`.
/// Arrays that already have `k` or more dimensions are returned unchanged.
pub fn atleast_kd<A, S, D>(array: &ArrayBase<S, D>, k: usize, append_dims: bool) -> Result<ArrayD<A>>
where
    A: Clone,
    S: Data<Elem = A>,
    D: Dimension,
{
    let ndim = array.ndim();
    if ndim >= k {
        return Ok(array.to_owned().into_dyn());
    }

    let padding = std::iter::repeat(1).take(k - ndim);
    let new_shape: Vec<usize> = if append_dims {
        array.shape().iter().copied().chain(padding).collect()
    } else {
        padding.chain(array.shape().iter().copied()).collect()
    };

    Ok(array
        .to_shape((IxDyn(&new_shape), Order::RowMajor))?
        .into_owned())
}

/// Promotes a coordinate batch to a `(samples, dims)` matrix.
///
/// Scalars and bare 1-D sequences are treated as one-dimensional coordinates.
pub fn atleast_2d<S, D>(coords: &ArrayBase<S, D>) -> Result<Array2<f64>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if coords.ndim() > 2 {
        return Err(EmulatorError::InvalidCoordinates(format!(
            "expected at most 2 dimensions (samples x dims), got shape {:?}",
            coords.shape()
        )));
    }
    Ok(atleast_kd(coords, 2, true)?.into_dimensionality::<Ix2>()?)
}

/// Cartesian product of per-axis value sequences.
///
/// Row `r` of the result holds one value from each axis; the last axis varies
/// fastest. Row `r` is therefore the coordinate of element `r` of a row-major
/// flattened array whose axes are sampled at `axes`.
pub fn cartesian_prod<A: Clone>(axes: &[ArrayView1<'_, A>]) -> Array2<A> {
    let lengths: Vec<usize> = axes.iter().map(|axis| axis.len()).collect();
    // strides[i] = product of the lengths of every axis after i
    let mut strides = vec![1usize; lengths.len()];
    for i in (0..lengths.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * lengths[i + 1];
    }
    let total: usize = lengths.iter().product();

    Array2::from_shape_fn((total, axes.len()), |(row, col)| {
        let index = (row / strides[col]) % lengths[col];
        axes[col][index].clone()
    })
}

/// Index tuples of every element of an array with the given shape, in row-major order.
pub fn grid_indices(shape: &[usize]) -> Array2<usize> {
    let ranges: Vec<ndarray::Array1<usize>> = shape
        .iter()
        .map(|&len| (0..len).collect())
        .collect();
    let views: Vec<ArrayView1<usize>> = ranges.iter().map(|r| r.view()).collect();
    cartesian_prod(&views)
}
