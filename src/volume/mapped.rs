//! The logical view type.
//!
//! A [`MappedArray`] is an immutable window onto a backing store: it
//! holds the store's original shape and geometry plus the accumulated
//! slicer and permutation, and recomputes its derived shape, spatial
//! mask and affine whenever those change. Every indexing operation
//! returns a new view; nothing is ever mutated in place, so views may be
//! freely shared across threads and chained without limit.
//!
//! [`MappedArray`]: ./struct.MappedArray.html

use super::util;
use super::{ArraySource, DataElement, Metadata, ReadOptions, Region};
use crate::affine::{affine_permute, affine_restrict, spatial_dim, voxel_size, Affine};
use crate::error::{Result, VolMapError};
use crate::index::{
    compose_index, expand_index, index_shape, validate_permutation, CanonIdx, CanonSlice, IdxElem,
};
use crate::typedef::{Casting, DataType};
use ndarray::{ArrayD, ArrayViewD};
use std::sync::Arc;

/// A lazily-evaluated logical view onto a backing array.
///
/// Slicing and permuting a `MappedArray` only update index and affine
/// bookkeeping; data moves when [`read`] or [`write`] is called, and then
/// only the data the view selects.
///
/// [`read`]: #method.read
/// [`write`]: #method.write
#[derive(Debug)]
pub struct MappedArray<S> {
    source: Arc<S>,
    original_shape: Vec<usize>,
    original_affine: Option<Affine>,
    original_spatial: Vec<bool>,
    /// One element per slot; slots holding a slice or integer consume an
    /// original axis, new-axis slots do not.
    slicer: Vec<CanonIdx>,
    /// Original axis consumed by each consuming slot, in slot order.
    permutation: Vec<usize>,
    // caches derived from the fields above, never set independently
    shape: Vec<usize>,
    spatial: Vec<bool>,
    affine: Option<Affine>,
    dtype: DataType,
    slope: f64,
    inter: f64,
}

impl<S> Clone for MappedArray<S> {
    fn clone(&self) -> Self {
        MappedArray {
            source: Arc::clone(&self.source),
            original_shape: self.original_shape.clone(),
            original_affine: self.original_affine.clone(),
            original_spatial: self.original_spatial.clone(),
            slicer: self.slicer.clone(),
            permutation: self.permutation.clone(),
            shape: self.shape.clone(),
            spatial: self.spatial.clone(),
            affine: self.affine.clone(),
            dtype: self.dtype,
            slope: self.slope,
            inter: self.inter,
        }
    }
}

impl<S: ArraySource> MappedArray<S> {
    /// Map a backing store as an identity view.
    pub fn new(source: S) -> Self {
        Self::from_arc(Arc::new(source))
    }

    /// Map a shared backing store as an identity view.
    pub fn from_arc(source: Arc<S>) -> Self {
        let original_shape = source.shape().to_vec();
        let original_affine = source.affine().cloned();
        let original_spatial = source.spatial_mask().to_vec();
        let slicer = original_shape
            .iter()
            .map(|&n| CanonIdx::Slice(CanonSlice::full(n)))
            .collect();
        let permutation = (0..original_shape.len()).collect();
        let dtype = source.data_type();
        let slope = source.slope();
        let inter = source.inter();
        MappedArray {
            shape: original_shape.clone(),
            spatial: original_spatial.clone(),
            affine: original_affine.clone(),
            source,
            original_shape,
            original_affine,
            original_spatial,
            slicer,
            permutation,
            dtype,
            slope,
            inter,
        }
    }

    /// The current shape of the view.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The current number of dimensions.
    pub fn dim(&self) -> usize {
        self.shape.len()
    }

    /// The shape of the original, unsliced volume.
    pub fn original_shape(&self) -> &[usize] {
        &self.original_shape
    }

    /// Which current axes are spatial (governed by the affine).
    pub fn spatial_mask(&self) -> &[bool] {
        &self.spatial
    }

    /// The voxel-to-world transform of this view, if any spatial axis
    /// survives.
    pub fn affine(&self) -> Option<&Affine> {
        self.affine.as_ref()
    }

    /// The physical voxel size along the surviving spatial axes.
    pub fn voxel_size(&self) -> Option<nalgebra::DVector<f64>> {
        self.affine.as_ref().map(voxel_size)
    }

    /// The on-disk scalar type.
    pub fn data_type(&self) -> DataType {
        self.dtype
    }

    /// Intensity slope of the stored values.
    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// Intensity intercept of the stored values.
    pub fn inter(&self) -> f64 {
        self.inter
    }

    /// The accumulated index against the original axes.
    pub fn slicer(&self) -> &[CanonIdx] {
        &self.slicer
    }

    /// The accumulated slot-to-original-axis mapping.
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// The backing store handle.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Extract a sub-view.
    ///
    /// The index is expressed against the *current* shape; it is expanded
    /// (§[`expand_index`]) and composed with the accumulated slicer, so
    /// the new view still addresses the original axes directly.
    ///
    /// [`expand_index`]: ../../index/fn.expand_index.html
    pub fn slice(&self, index: &[IdxElem]) -> Result<Self> {
        let (expanded, new_shape) = expand_index(index, &self.shape)?;
        self.slice_expanded(&expanded, new_shape)
    }

    /// Slice with an index already expanded against the current shape.
    pub(crate) fn slice_canon(&self, expanded: &[CanonIdx]) -> Result<Self> {
        let new_shape = index_shape(expanded);
        self.slice_expanded(expanded, new_shape)
    }

    fn slice_expanded(&self, expanded: &[CanonIdx], new_shape: Vec<usize>) -> Result<Self> {
        let slicer = compose_index(&self.slicer, expanded)?;

        // project the spatial mask through the new index
        let mut spatial = Vec::with_capacity(new_shape.len());
        let mut axis = 0;
        for e in expanded {
            match e {
                CanonIdx::NewAxis(_) => spatial.push(false),
                CanonIdx::At(_) => axis += 1,
                CanonIdx::Slice(_) => {
                    spatial.push(self.spatial[axis]);
                    axis += 1;
                }
            }
        }

        // restrict the affine by the spatial part of the new index
        let affine = match &self.affine {
            Some(current) => {
                let spatial_index: Vec<CanonIdx> = expanded
                    .iter()
                    .filter(|e| !e.is_new())
                    .zip(&self.spatial)
                    .filter(|(_, &spatial)| spatial)
                    .map(|(e, _)| *e)
                    .collect();
                let restricted = affine_restrict(current, &spatial_index);
                if spatial_dim(&restricted) == 0 {
                    None
                } else {
                    Some(restricted)
                }
            }
            None => None,
        };

        debug_assert_eq!(new_shape.len(), spatial.len());
        debug_assert_eq!(
            slicer.iter().filter(|e| !e.is_dropped()).count(),
            new_shape.len()
        );
        Ok(MappedArray {
            source: Arc::clone(&self.source),
            original_shape: self.original_shape.clone(),
            original_affine: self.original_affine.clone(),
            original_spatial: self.original_spatial.clone(),
            slicer,
            permutation: self.permutation.clone(),
            shape: new_shape,
            spatial,
            affine,
            dtype: self.dtype,
            slope: self.slope,
            inter: self.inter,
        })
    }

    /// Permute the dimensions of the view.
    ///
    /// `axes` must be a permutation of `0..self.dim()`. Dropped axes keep
    /// their slot position in the slicer; only the slots backing current
    /// axes are reordered.
    pub fn permute(&self, axes: &[usize]) -> Result<Self> {
        validate_permutation(axes, self.dim())?;

        let shape: Vec<usize> = axes.iter().map(|&d| self.shape[d]).collect();
        let spatial: Vec<bool> = axes.iter().map(|&d| self.spatial[d]).collect();

        // pair every slot with the original axis it consumes
        let mut tagged: Vec<(CanonIdx, Option<usize>)> = Vec::with_capacity(self.slicer.len());
        let mut consumed = 0;
        for e in &self.slicer {
            if e.is_new() {
                tagged.push((*e, None));
            } else {
                tagged.push((*e, Some(self.permutation[consumed])));
                consumed += 1;
            }
        }
        // slots backing a current axis, in current-axis order
        let current_slots: Vec<usize> = tagged
            .iter()
            .enumerate()
            .filter(|(_, (e, _))| !e.is_dropped())
            .map(|(slot, _)| slot)
            .collect();

        let mut out: Vec<(CanonIdx, Option<usize>)> = Vec::with_capacity(tagged.len());
        let mut moved = axes.iter();
        for t in &tagged {
            if t.0.is_dropped() {
                out.push(*t);
            } else {
                match moved.next() {
                    Some(&d) => out.push(tagged[current_slots[d]]),
                    None => unreachable!("one current axis per non-dropped slot"),
                }
            }
        }
        let slicer: Vec<CanonIdx> = out.iter().map(|t| t.0).collect();
        let permutation: Vec<usize> = out.iter().filter_map(|t| t.1).collect();

        // the affine sees only the permutation of the current spatial axes
        let affine = self.affine.as_ref().map(|current| {
            let rank = |d: usize| (0..d).filter(|&p| self.spatial[p]).count();
            let column_perm: Vec<usize> = axes
                .iter()
                .filter(|&&d| self.spatial[d])
                .map(|&d| rank(d))
                .collect();
            affine_permute(current, &column_perm)
        });

        Ok(MappedArray {
            source: Arc::clone(&self.source),
            original_shape: self.original_shape.clone(),
            original_affine: self.original_affine.clone(),
            original_spatial: self.original_spatial.clone(),
            slicer,
            permutation,
            shape,
            spatial,
            affine,
            dtype: self.dtype,
            slope: self.slope,
            inter: self.inter,
        })
    }

    /// Swap two dimensions.
    pub fn transpose(&self, a: usize, b: usize) -> Result<Self> {
        self.permute(&util::swapped_axes(self.dim(), a, b)?)
    }

    /// Remove axes of extent 1 (all of them, or the named ones).
    ///
    /// Naming an axis of extent other than 1 is an error.
    pub fn squeeze(&self, axes: Option<&[usize]>) -> Result<Self> {
        self.slice(&util::squeeze_index(&self.shape, axes)?)
    }

    /// Insert an axis of extent 1 at `axis` (up to and including
    /// `self.dim()`).
    pub fn unsqueeze(&self, axis: usize) -> Result<Self> {
        self.slice(&util::unsqueeze_index(self.dim(), axis)?)
    }

    /// Extract every sub-view along `axis`, dropping that axis unless
    /// `keepdim` is set.
    pub fn unbind(&self, axis: usize, keepdim: bool) -> Result<Vec<Self>> {
        util::check_axis(axis, self.dim())?;
        (0..self.shape[axis])
            .map(|i| self.slice(&util::unbind_index(self.dim(), axis, i, keepdim)))
            .collect()
    }

    /// Split into `chunks` sub-views of near-equal extent along `axis`.
    pub fn chunk(&self, chunks: usize, axis: usize) -> Result<Vec<Self>> {
        util::check_axis(axis, self.dim())?;
        self.split(&util::chunk_sizes(self.shape[axis], chunks)?, axis)
    }

    /// Split into sub-views of the given extents along `axis`.
    ///
    /// The extents must sum to the size of the axis.
    pub fn split(&self, sizes: &[usize], axis: usize) -> Result<Vec<Self>> {
        util::check_axis(axis, self.dim())?;
        util::split_bounds(self.shape[axis], sizes)?
            .into_iter()
            .map(|(a, b)| self.slice(&util::axis_range_index(self.dim(), axis, a, b)))
            .collect()
    }

    /// The region of the backing store this view selects.
    pub fn region(&self) -> Region<'_> {
        Region {
            slicer: &self.slicer,
            permutation: &self.permutation,
        }
    }

    /// Materialize the view into a buffer of shape `self.shape()`.
    ///
    /// Values are stored values; no intensity scaling is applied.
    pub fn read<T: DataElement>(&self, options: &ReadOptions) -> Result<ArrayD<T>> {
        let data = self.source.read_region::<T>(&self.region(), options)?;
        debug_assert_eq!(data.shape(), &self.shape[..]);
        Ok(data)
    }

    /// Materialize the view with `value * slope + inter` applied.
    ///
    /// The requested element type must be floating point.
    pub fn read_scaled<T: DataElement>(&self, options: &ReadOptions) -> Result<ArrayD<T>> {
        if !T::DATA_TYPE.is_float() {
            return Err(VolMapError::NotFloatingPoint(T::DATA_TYPE));
        }
        let mut data = self.read::<T>(options)?;
        if self.slope != 1.0 || self.inter != 0.0 {
            let (slope, inter) = (self.slope, self.inter);
            data.mapv_inplace(|v| v.scale(slope, inter));
        }
        Ok(data)
    }

    /// Write a buffer of shape `self.shape()` to the backing store.
    pub fn write<T: DataElement>(&self, data: ArrayViewD<'_, T>, casting: Casting) -> Result<()> {
        if data.shape() != &self.shape[..] {
            return Err(VolMapError::ShapeMismatch(
                self.shape.clone(),
                data.shape().to_vec(),
            ));
        }
        self.source.write_region(&self.region(), data, casting)
    }

    /// Write physical values, removing the intensity scaling first.
    ///
    /// The buffer must be floating point and have shape `self.shape()`.
    pub fn write_scaled<T: DataElement>(&self, data: ArrayViewD<'_, T>) -> Result<()> {
        if !T::DATA_TYPE.is_float() {
            return Err(VolMapError::NotFloatingPoint(T::DATA_TYPE));
        }
        if data.shape() != &self.shape[..] {
            return Err(VolMapError::ShapeMismatch(
                self.shape.clone(),
                data.shape().to_vec(),
            ));
        }
        if self.slope != 1.0 || self.inter != 0.0 {
            let (slope, inter) = (self.slope, self.inter);
            let unscaled = data.mapv(|v| v.unscale(slope, inter));
            self.source
                .write_region(&self.region(), unscaled.view(), Casting::Unsafe)
        } else {
            self.source
                .write_region(&self.region(), data, Casting::Unsafe)
        }
    }

    /// Metadata of the full original volume.
    pub fn metadata(&self, keys: Option<&[&str]>) -> Result<Metadata> {
        self.source.metadata(keys)
    }

    /// Write metadata of the full original volume.
    pub fn set_metadata(&self, meta: &Metadata) -> Result<()> {
        self.source.set_metadata(meta)
    }
}
