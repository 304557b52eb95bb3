//! Voxel-to-world affine bookkeeping.
//!
//! An affine maps voxel indices of the *spatial* axes of a volume to
//! world coordinates, in homogeneous form. The world side keeps its full
//! dimensionality for the lifetime of a view: slicing a plane out of a
//! volume still places that plane in the original world space, so
//! restricting an affine removes voxel *columns* but never world rows.
//!
//! Matrices are dynamically sized because slicing can drop spatial axes
//! at runtime.

use crate::index::CanonIdx;
use nalgebra::{DMatrix, DVector};

/// A homogeneous voxel-to-world transform.
///
/// For `k` surviving spatial axes and an `m`-dimensional world, the
/// matrix is `(m+1) x (k+1)`: `k` voxel direction columns followed by the
/// translation column, with a last row of zeros and a trailing one.
pub type Affine = DMatrix<f64>;

/// Number of voxel (spatial) axes addressed by this affine.
pub fn spatial_dim(affine: &Affine) -> usize {
    affine.ncols() - 1
}

/// Restrict an affine to a sub-view of its spatial axes.
///
/// `index` must hold one element per spatial axis, in axis order, each a
/// slice or a dropped (integer) element. A slice `start + i*step` shifts
/// the translation by `start` along the axis direction and scales the
/// column by `step`; a negative step thereby flips the column and
/// re-bases the translation at the first index taken. A dropped axis
/// shifts the translation to the fixed position and removes the column.
pub fn affine_restrict(affine: &Affine, index: &[CanonIdx]) -> Affine {
    debug_assert_eq!(index.len(), spatial_dim(affine));
    let nrows = affine.nrows();
    let mut translation: DVector<f64> = affine.column(affine.ncols() - 1).into_owned();
    let mut columns: Vec<DVector<f64>> = Vec::with_capacity(index.len());
    for (axis, elem) in index.iter().enumerate() {
        let col: DVector<f64> = affine.column(axis).into_owned();
        match elem {
            CanonIdx::Slice(s) => {
                translation += &col * s.start as f64;
                columns.push(col * s.step as f64);
            }
            CanonIdx::At(i) => {
                translation += &col * *i as f64;
            }
            CanonIdx::NewAxis(_) => unreachable!("new axes are never spatial"),
        }
    }
    // re-assemble; the homogeneous row is preserved by construction
    let mut out = Affine::zeros(nrows, columns.len() + 1);
    for (j, col) in columns.iter().enumerate() {
        out.set_column(j, col);
    }
    // the translation picked up homogeneous contributions from dropped
    // columns' zero entries only, so its last element is still 1
    out.set_column(columns.len(), &translation);
    out
}

/// Reorder the voxel columns of an affine.
///
/// `perm[j]` names the old column that becomes the new column `j`; the
/// translation column stays in place.
pub fn affine_permute(affine: &Affine, perm: &[usize]) -> Affine {
    debug_assert_eq!(perm.len(), spatial_dim(affine));
    let mut out = affine.clone();
    for (j, &p) in perm.iter().enumerate() {
        out.set_column(j, &affine.column(p));
    }
    out
}

/// The physical extent of one voxel along each spatial axis.
pub fn voxel_size(affine: &Affine) -> DVector<f64> {
    let k = spatial_dim(affine);
    DVector::from_iterator(k, (0..k).map(|j| affine.column(j).rows(0, affine.nrows() - 1).norm()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{expand_index, IdxElem};
    use approx::assert_relative_eq;

    fn scaled_affine() -> Affine {
        // diag(1, 2, 3) with translation (10, 20, 30)
        Affine::from_row_slice(
            4,
            4,
            &[
                1.0, 0.0, 0.0, 10.0, //
                0.0, 2.0, 0.0, 20.0, //
                0.0, 0.0, 3.0, 30.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        )
    }

    #[test]
    fn restrict_slice_and_drop() {
        let (index, _) = expand_index(
            &[IdxElem::stepped(Some(2), Some(8), 2), IdxElem::full(), 5.into()],
            &[10, 20, 30],
        )
        .unwrap();
        let out = affine_restrict(&scaled_affine(), &index);
        assert_eq!(out.nrows(), 4);
        assert_eq!(out.ncols(), 3);
        // column 0 scaled by step 2, column 1 untouched, column 2 dropped
        assert_relative_eq!(out[(0, 0)], 2.0);
        assert_relative_eq!(out[(1, 1)], 2.0);
        // translation advanced by 2 along axis 0 and 5 along axis 2
        assert_relative_eq!(out[(0, 2)], 10.0 + 2.0);
        assert_relative_eq!(out[(1, 2)], 20.0);
        assert_relative_eq!(out[(2, 2)], 30.0 + 5.0 * 3.0);
        assert_relative_eq!(out[(3, 2)], 1.0);
    }

    #[test]
    fn restrict_reversal_flips_column() {
        let (index, _) = expand_index(&[IdxElem::reversed()], &[10]).unwrap();
        let affine = Affine::from_row_slice(2, 2, &[2.0, 1.0, 0.0, 1.0]);
        let out = affine_restrict(&affine, &index[..1]);
        // first index taken is 9; the column is negated
        assert_relative_eq!(out[(0, 0)], -2.0);
        assert_relative_eq!(out[(0, 1)], 1.0 + 9.0 * 2.0);
    }

    #[test]
    fn permute_reorders_columns() {
        let out = affine_permute(&scaled_affine(), &[2, 0, 1]);
        assert_relative_eq!(out[(2, 0)], 3.0);
        assert_relative_eq!(out[(0, 1)], 1.0);
        assert_relative_eq!(out[(1, 2)], 2.0);
        assert_relative_eq!(out[(0, 3)], 10.0);
    }

    #[test]
    fn voxel_size_is_column_norm() {
        let vs = voxel_size(&scaled_affine());
        assert_relative_eq!(vs[0], 1.0);
        assert_relative_eq!(vs[1], 2.0);
        assert_relative_eq!(vs[2], 3.0);
    }
}
