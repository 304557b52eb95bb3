//! Index-vector builders shared by the derived view operations.
//!
//! `squeeze`, `unsqueeze`, `unbind`, `chunk` and `split` are all plain
//! slicing in disguise; the functions here build the index tuples they
//! forward to `slice`.

use crate::error::{Result, VolMapError};
use crate::index::IdxElem;

pub(crate) fn check_axis(axis: usize, dim: usize) -> Result<()> {
    if axis >= dim {
        return Err(VolMapError::AxisOutOfBounds(axis, dim));
    }
    Ok(())
}

pub(crate) fn swapped_axes(dim: usize, a: usize, b: usize) -> Result<Vec<usize>> {
    check_axis(a, dim)?;
    check_axis(b, dim)?;
    let mut axes: Vec<usize> = (0..dim).collect();
    axes.swap(a, b);
    Ok(axes)
}

pub(crate) fn squeeze_index(shape: &[usize], axes: Option<&[usize]>) -> Result<Vec<IdxElem>> {
    let axes: Vec<usize> = match axes {
        Some(axes) => {
            for &a in axes {
                check_axis(a, shape.len())?;
                if shape[a] != 1 {
                    return Err(VolMapError::CannotSqueeze(a, shape[a]));
                }
            }
            axes.to_vec()
        }
        None => (0..shape.len()).filter(|&a| shape[a] == 1).collect(),
    };
    Ok((0..shape.len())
        .map(|a| {
            if axes.contains(&a) {
                IdxElem::at(0)
            } else {
                IdxElem::full()
            }
        })
        .collect())
}

pub(crate) fn unsqueeze_index(dim: usize, axis: usize) -> Result<Vec<IdxElem>> {
    if axis > dim {
        return Err(VolMapError::AxisOutOfBounds(axis, dim + 1));
    }
    let mut index = vec![IdxElem::full(); dim];
    index.insert(axis, IdxElem::NewAxis);
    Ok(index)
}

pub(crate) fn unbind_index(dim: usize, axis: usize, i: usize, keepdim: bool) -> Vec<IdxElem> {
    let mut index = vec![IdxElem::full(); dim];
    index[axis] = IdxElem::at(i as isize);
    if keepdim {
        index.insert(axis + 1, IdxElem::NewAxis);
    }
    index
}

pub(crate) fn axis_range_index(dim: usize, axis: usize, start: usize, end: usize) -> Vec<IdxElem> {
    let mut index = vec![IdxElem::full(); dim];
    index[axis] = IdxElem::range(start as isize, end as isize);
    index
}

pub(crate) fn chunk_sizes(extent: usize, chunks: usize) -> Result<Vec<usize>> {
    if chunks == 0 {
        return Err(VolMapError::BadSplitSizes(0, extent));
    }
    // torch semantics: every chunk but the last has the ceiling size
    let size = (extent + chunks - 1) / chunks;
    let mut sizes = Vec::new();
    let mut left = extent;
    while left > 0 {
        let take = size.min(left);
        sizes.push(take);
        left -= take;
    }
    if sizes.is_empty() {
        sizes.push(0);
    }
    Ok(sizes)
}

pub(crate) fn split_bounds(extent: usize, sizes: &[usize]) -> Result<Vec<(usize, usize)>> {
    let total: usize = sizes.iter().sum();
    if total != extent {
        return Err(VolMapError::BadSplitSizes(total, extent));
    }
    let mut bounds = Vec::with_capacity(sizes.len());
    let mut start = 0;
    for &size in sizes {
        bounds.push((start, start + size));
        start += size;
    }
    Ok(bounds)
}
