//! Virtual concatenation of volumes.
//!
//! A [`CatArray`] presents an ordered sequence of volumes as one logical
//! array joined along a single axis, without copying any data. Slicing
//! routes the index to the members that overlap the selection; reading
//! materializes the members and concatenates the buffers; writing splits
//! the incoming buffer by member extents.
//!
//! [`CatArray`]: ./struct.CatArray.html

use super::{ArraySource, DataElement, Metadata, ReadOptions, Volume};
use crate::error::{Result, VolMapError};
use crate::index::{expand_index, invert_permutation, validate_permutation, CanonIdx, CanonSlice, IdxElem};
use crate::typedef::Casting;
use ndarray::{concatenate, ArrayD, ArrayViewD, Axis, Slice};

/// A virtual concatenation of volumes along one axis.
///
/// Construction checks that every member's shape agrees with the first
/// member's on every axis but the concatenation axis. Like a plain view,
/// a `CatArray` is immutable: slicing and permuting return new values.
#[derive(Debug)]
pub struct CatArray<S> {
    arrays: Vec<Volume<S>>,
    cat_axis: usize,
    // cache over (arrays, cat_axis), rebuilt on every construction
    shape: Vec<usize>,
}

impl<S> Clone for CatArray<S> {
    fn clone(&self) -> Self {
        CatArray {
            arrays: self.arrays.clone(),
            cat_axis: self.cat_axis,
            shape: self.shape.clone(),
        }
    }
}

/// `ceil(a / b)` for positive `b`.
fn div_ceil(a: isize, b: isize) -> isize {
    if a > 0 {
        (a + b - 1) / b
    } else {
        -(-a / b)
    }
}

impl<S: ArraySource> CatArray<S> {
    /// Concatenate `arrays` along `axis`.
    pub fn new(arrays: Vec<Volume<S>>, axis: usize) -> Result<Self> {
        let first = arrays.first().ok_or(VolMapError::EmptyCat)?;
        let dim = first.dim();
        if axis >= dim {
            return Err(VolMapError::AxisOutOfBounds(axis, dim));
        }
        let mut shape = first.shape().to_vec();
        let mut extent = 0;
        for (i, member) in arrays.iter().enumerate() {
            let got = member.shape();
            let agrees = got.len() == dim
                && got
                    .iter()
                    .zip(shape.iter())
                    .enumerate()
                    .all(|(a, (g, s))| a == axis || g == s);
            if !agrees {
                return Err(VolMapError::CatShapeMismatch(
                    i,
                    shape.clone(),
                    got.to_vec(),
                ));
            }
            extent += got[axis];
        }
        shape[axis] = extent;
        Ok(CatArray {
            arrays,
            cat_axis: axis,
            shape,
        })
    }

    /// The shape of the concatenation.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The number of dimensions.
    pub fn dim(&self) -> usize {
        self.shape.len()
    }

    /// The axis along which the members are joined.
    pub fn cat_axis(&self) -> usize {
        self.cat_axis
    }

    /// The member volumes, in order.
    pub fn arrays(&self) -> &[Volume<S>] {
        &self.arrays
    }

    /// Extract a sub-volume.
    ///
    /// If the index drops the concatenation axis, the result is the one
    /// member containing the selected position (sliced accordingly) and
    /// is no longer a concatenation.
    pub fn slice(&self, index: &[IdxElem]) -> Result<Volume<S>> {
        let (expanded, _) = expand_index(index, &self.shape)?;
        self.slice_canon(&expanded)
    }

    pub(crate) fn slice_canon(&self, expanded: &[CanonIdx]) -> Result<Volume<S>> {
        // find the element addressing the concatenation axis, and where
        // that axis lands in the output
        let mut found = None;
        let mut consumed = 0;
        let mut out_axis = 0;
        for (slot, e) in expanded.iter().enumerate() {
            match e {
                CanonIdx::NewAxis(_) => out_axis += 1,
                _ => {
                    if consumed == self.cat_axis {
                        found = Some((slot, *e, out_axis));
                        break;
                    }
                    consumed += 1;
                    if e.is_slice() {
                        out_axis += 1;
                    }
                }
            }
        }
        let (slot, entry, new_cat_axis) =
            found.expect("an expanded index covers every current axis");

        match entry {
            CanonIdx::At(position) => self.slice_dropped_cat(expanded, slot, position),
            CanonIdx::Slice(s) => self.slice_along_cat(expanded, slot, s, new_cat_axis),
            CanonIdx::NewAxis(_) => unreachable!("new axes consume no current axis"),
        }
    }

    /// The concatenation axis is fixed at `position`: the result is a
    /// slice of the single member containing that position.
    fn slice_dropped_cat(
        &self,
        expanded: &[CanonIdx],
        slot: usize,
        position: usize,
    ) -> Result<Volume<S>> {
        let mut offset = 0;
        for member in &self.arrays {
            let extent = member.shape()[self.cat_axis];
            if position < offset + extent {
                let mut index = expanded.to_vec();
                index[slot] = CanonIdx::At(position - offset);
                return member.slice_canon(&index);
            }
            offset += extent;
        }
        unreachable!("expanded integer index is within the concatenated extent")
    }

    /// The concatenation axis is sliced: keep the members overlapping the
    /// selection, each restricted to its own window.
    fn slice_along_cat(
        &self,
        expanded: &[CanonIdx],
        slot: usize,
        mut cat_slice: CanonSlice,
        new_cat_axis: usize,
    ) -> Result<Volume<S>> {
        if cat_slice.len == 0 {
            // empty selection: collapse onto the first member
            let mut index = expanded.to_vec();
            index[slot] = CanonIdx::Slice(CanonSlice {
                start: 0,
                step: 1,
                len: 0,
            });
            return self.arrays[0].slice_canon(&index);
        }

        let mut arrays: Vec<Volume<S>>;
        if cat_slice.step < 0 {
            // reverse the whole axis (member order and member contents),
            // then treat the selection as a forward slice of the result
            arrays = Vec::with_capacity(self.arrays.len());
            for member in self.arrays.iter().rev() {
                let extent = member.shape()[self.cat_axis];
                let mut index: Vec<CanonIdx> = member
                    .shape()
                    .iter()
                    .map(|&n| CanonIdx::Slice(CanonSlice::full(n)))
                    .collect();
                index[self.cat_axis] = CanonIdx::Slice(CanonSlice {
                    start: extent.saturating_sub(1),
                    step: -1,
                    len: extent,
                });
                arrays.push(member.slice_canon(&index)?);
            }
            let total = self.shape[self.cat_axis];
            cat_slice = CanonSlice {
                start: total - 1 - cat_slice.start,
                step: -cat_slice.step,
                len: cat_slice.len,
            };
        } else {
            arrays = self.arrays.clone();
        }

        // walk the members, intersecting the selected arithmetic
        // progression with each member's window
        let start = cat_slice.start as isize;
        let step = cat_slice.step;
        let len = cat_slice.len as isize;
        let mut kept: Vec<Volume<S>> = Vec::new();
        let mut offset: isize = 0;
        for member in &arrays {
            let extent = member.shape()[self.cat_axis] as isize;
            let first = div_ceil(offset - start, step).max(0);
            let last = div_ceil(offset + extent - start, step).min(len);
            if last > first {
                let local_start = (start + first * step - offset) as usize;
                let mut index = expanded.to_vec();
                index[slot] = CanonIdx::Slice(CanonSlice {
                    start: local_start,
                    step,
                    len: (last - first) as usize,
                });
                kept.push(member.slice_canon(&index)?);
            }
            offset += extent;
        }

        if kept.len() == 1 {
            let mut kept = kept;
            Ok(kept.remove(0))
        } else {
            Ok(Volume::Cat(CatArray::new(kept, new_cat_axis)?))
        }
    }

    /// Permute the dimensions of every member, remapping the
    /// concatenation axis accordingly.
    pub fn permute(&self, axes: &[usize]) -> Result<Self> {
        validate_permutation(axes, self.dim())?;
        let arrays = self
            .arrays
            .iter()
            .map(|member| member.permute(axes))
            .collect::<Result<Vec<_>>>()?;
        let cat_axis = invert_permutation(axes)[self.cat_axis];
        CatArray::new(arrays, cat_axis)
    }

    /// Swap two dimensions.
    pub fn transpose(&self, a: usize, b: usize) -> Result<Self> {
        self.permute(&super::util::swapped_axes(self.dim(), a, b)?)
    }

    /// Materialize the whole concatenation.
    ///
    /// Every member is read in full and the buffers are joined; no
    /// attempt is made to preallocate a single output buffer.
    pub fn read<T: DataElement>(&self, options: &ReadOptions) -> Result<ArrayD<T>> {
        let parts = self
            .arrays
            .iter()
            .map(|member| member.read::<T>(options))
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<ArrayViewD<'_, T>> = parts.iter().map(|p| p.view()).collect();
        Ok(concatenate(Axis(self.cat_axis), &views)
            .expect("member shapes agree off the concatenation axis"))
    }

    /// Materialize the whole concatenation with each member's own
    /// intensity scaling applied.
    pub fn read_scaled<T: DataElement>(&self, options: &ReadOptions) -> Result<ArrayD<T>> {
        let parts = self
            .arrays
            .iter()
            .map(|member| member.read_scaled::<T>(options))
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<ArrayViewD<'_, T>> = parts.iter().map(|p| p.view()).collect();
        Ok(concatenate(Axis(self.cat_axis), &views)
            .expect("member shapes agree off the concatenation axis"))
    }

    /// Write a buffer of the concatenation's shape, routing each span
    /// along the concatenation axis to its member.
    pub fn write<T: DataElement>(&self, data: ArrayViewD<'_, T>, casting: Casting) -> Result<()> {
        self.write_with(data, |member, part| member.write(part, casting))
    }

    /// Write physical values, removing each member's own scaling.
    pub fn write_scaled<T: DataElement>(&self, data: ArrayViewD<'_, T>) -> Result<()> {
        self.write_with(data, |member, part| member.write_scaled(part))
    }

    fn write_with<T, F>(&self, data: ArrayViewD<'_, T>, mut put: F) -> Result<()>
    where
        T: DataElement,
        F: FnMut(&Volume<S>, ArrayViewD<'_, T>) -> Result<()>,
    {
        if data.shape() != &self.shape[..] {
            return Err(VolMapError::ShapeMismatch(
                self.shape.clone(),
                data.shape().to_vec(),
            ));
        }
        let mut offset = 0;
        for member in &self.arrays {
            let extent = member.shape()[self.cat_axis];
            let part = data.slice_axis(
                Axis(self.cat_axis),
                Slice::new(offset as isize, Some((offset + extent) as isize), 1),
            );
            put(member, part)?;
            offset += extent;
        }
        Ok(())
    }

    /// Metadata of every underlying volume, in member order.
    pub fn metadata(&self, keys: Option<&[&str]>) -> Result<Vec<Metadata>> {
        let mut out = Vec::with_capacity(self.arrays.len());
        for member in &self.arrays {
            out.extend(member.metadata(keys)?);
        }
        Ok(out)
    }

    /// Always fails: a concatenation has no single volume to write
    /// metadata to.
    pub fn set_metadata(&self, _meta: &Metadata) -> Result<()> {
        Err(VolMapError::Unsupported(
            "writing metadata through a concatenated array",
        ))
    }
}

/// Concatenate volumes along an existing axis.
///
/// The members' shapes must agree on every other axis.
pub fn cat<S: ArraySource>(arrays: Vec<Volume<S>>, axis: usize) -> Result<CatArray<S>> {
    CatArray::new(arrays, axis)
}

/// Stack volumes along a new axis of extent 1 inserted at `axis` in
/// every member.
pub fn stack<S: ArraySource>(arrays: Vec<Volume<S>>, axis: usize) -> Result<CatArray<S>> {
    let arrays = arrays
        .iter()
        .map(|member| member.unsqueeze(axis))
        .collect::<Result<Vec<_>>>()?;
    CatArray::new(arrays, axis)
}
