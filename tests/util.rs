#![allow(dead_code)]

use ndarray::{Array, ArrayD, IxDyn};
use volmap::{Affine, InMemSource, MappedArray};

/// An array filled with `0, 1, 2, ...` in row-major order.
pub fn arange(shape: &[usize]) -> ArrayD<f64> {
    let n: usize = shape.iter().product();
    Array::from_shape_vec(IxDyn(shape), (0..n).map(|v| v as f64).collect()).unwrap()
}

/// A view over an in-memory arange volume with no geometry.
pub fn volume(shape: &[usize]) -> MappedArray<InMemSource> {
    MappedArray::new(InMemSource::new(arange(shape)))
}

/// A diagonal affine with the given voxel sizes and translation.
pub fn diagonal_affine(scales: &[f64], translation: &[f64]) -> Affine {
    assert_eq!(scales.len(), translation.len());
    let n = scales.len();
    let mut affine = Affine::zeros(n + 1, n + 1);
    for (i, &s) in scales.iter().enumerate() {
        affine[(i, i)] = s;
        affine[(i, n)] = translation[i];
    }
    affine[(n, n)] = 1.0;
    affine
}
