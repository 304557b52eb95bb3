//! Logical views over volumetric array data.
//!
//! This module defines the backing-store interface ([`ArraySource`]),
//! the logical view type ([`MappedArray`]), its virtual concatenation
//! ([`CatArray`]), and the [`Volume`] enum that lets a concatenation
//! degenerate to a plain view under slicing.
//!
//! [`ArraySource`]: ./trait.ArraySource.html
//! [`MappedArray`]: ./mapped/struct.MappedArray.html
//! [`CatArray`]: ./cat/struct.CatArray.html
//! [`Volume`]: ./enum.Volume.html

pub mod cat;
pub mod element;
pub mod inmem;
pub mod mapped;
mod util;

pub use self::cat::{cat, stack, CatArray};
pub use self::element::DataElement;
pub use self::inmem::InMemSource;
pub use self::mapped::MappedArray;

use crate::affine::Affine;
use crate::error::Result;
use crate::index::{index_shape, CanonIdx, IdxElem};
use crate::typedef::{Casting, DataType};
use nalgebra::DVector;
use ndarray::{ArrayD, ArrayViewD};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A metadata value attached to a volume.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    /// Free-form text.
    Str(String),
    /// An integer value.
    Int(i64),
    /// A floating point value.
    Float(f64),
    /// A sequence of floating point values.
    Floats(Vec<f64>),
}

/// Metadata of a volume, keyed by name.
///
/// Metadata always refers to the full original volume, never to a view.
pub type Metadata = BTreeMap<String, MetaValue>;

/// Options controlling how data is materialized on read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadOptions {
    /// Casting policy between the on-disk type and the requested type.
    pub casting: Casting,
    /// When reading integer storage into floating point, sample noise in
    /// the quantization uncertainty interval of each value.
    pub add_noise: bool,
    /// Percentile cutoff `(lower, upper)` in `[0, 1]`; values outside the
    /// corresponding quantiles are clamped.
    pub cutoff: Option<(f64, f64)>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            casting: Casting::default(),
            add_noise: false,
            cutoff: None,
        }
    }
}

impl ReadOptions {
    /// Options with the defaults: unsafe casting, no noise, no cutoff.
    pub fn new() -> Self {
        ReadOptions::default()
    }

    /// Set the casting policy.
    pub fn casting(mut self, casting: Casting) -> Self {
        self.casting = casting;
        self
    }

    /// Enable uncertainty-interval dithering.
    pub fn add_noise(mut self, add_noise: bool) -> Self {
        self.add_noise = add_noise;
        self
    }

    /// Clamp values to the given percentile range.
    pub fn cutoff(mut self, lower: f64, upper: f64) -> Self {
        self.cutoff = Some((lower, upper));
        self
    }

    /// Clamp values above the given upper percentile only.
    pub fn cutoff_upper(self, upper: f64) -> Self {
        self.cutoff(0.0, upper)
    }
}

/// A selection of a backing store, addressed in the *original* (unsliced)
/// coordinate system: the accumulated index per slicer slot, plus the
/// mapping from axis-consuming slots to original axes.
#[derive(Debug, Clone, Copy)]
pub struct Region<'a> {
    /// Canonical index elements, one per slicer slot.
    pub slicer: &'a [CanonIdx],
    /// Original axis consumed by each non-new-axis slot, in slot order.
    pub permutation: &'a [usize],
}

impl Region<'_> {
    /// The shape of the buffer this region selects.
    pub fn shape(&self) -> Vec<usize> {
        index_shape(self.slicer)
    }
}

/// Interface to a concrete array backing store.
///
/// Implementations perform the actual data access for one storage format
/// (or for an in-memory proxy, see [`InMemSource`]). All coordinates they
/// receive are expressed against the original on-disk layout; the view
/// layer never asks for anything outside it.
///
/// Concurrency is the implementation's contract: `read_region` may be
/// called from several threads holding views of the same store, and
/// overlapping `write_region` calls are undefined unless the store
/// serializes them.
///
/// [`InMemSource`]: ./inmem/struct.InMemSource.html
pub trait ArraySource: Debug {
    /// The native (on-disk) shape.
    fn shape(&self) -> &[usize];

    /// The native voxel-to-world transform, if the store has one.
    fn affine(&self) -> Option<&Affine> {
        None
    }

    /// Which native axes are spatial (governed by the affine).
    fn spatial_mask(&self) -> &[bool];

    /// The native scalar type.
    fn data_type(&self) -> DataType;

    /// Intensity slope: `stored * slope + inter = physical`.
    fn slope(&self) -> f64 {
        1.0
    }

    /// Intensity intercept.
    fn inter(&self) -> f64 {
        0.0
    }

    /// Read the selected region into a buffer of the region's shape.
    fn read_region<T: DataElement>(
        &self,
        region: &Region<'_>,
        options: &ReadOptions,
    ) -> Result<ArrayD<T>>;

    /// Write a buffer of the region's shape into the selected region.
    fn write_region<T: DataElement>(
        &self,
        region: &Region<'_>,
        data: ArrayViewD<'_, T>,
        casting: Casting,
    ) -> Result<()>;

    /// Read metadata of the full original volume.
    ///
    /// When `keys` is given, only those entries are returned.
    fn metadata(&self, keys: Option<&[&str]>) -> Result<Metadata>;

    /// Write metadata of the full original volume.
    ///
    /// Entries absent from `meta` are kept untouched.
    fn set_metadata(&self, meta: &Metadata) -> Result<()>;
}

/// Either a plain logical view or a virtual concatenation.
///
/// This is the seam through which slicing a [`CatArray`] can collapse to
/// a single [`MappedArray`] when the concatenated axis is reduced to one
/// segment.
///
/// [`CatArray`]: ./cat/struct.CatArray.html
/// [`MappedArray`]: ./mapped/struct.MappedArray.html
#[derive(Debug)]
pub enum Volume<S> {
    /// A single logical view.
    Map(MappedArray<S>),
    /// A virtual concatenation of volumes.
    Cat(CatArray<S>),
}

impl<S> Clone for Volume<S> {
    fn clone(&self) -> Self {
        match self {
            Volume::Map(m) => Volume::Map(m.clone()),
            Volume::Cat(c) => Volume::Cat(c.clone()),
        }
    }
}

impl<S> From<MappedArray<S>> for Volume<S> {
    fn from(map: MappedArray<S>) -> Self {
        Volume::Map(map)
    }
}

impl<S> From<CatArray<S>> for Volume<S> {
    fn from(cat: CatArray<S>) -> Self {
        Volume::Cat(cat)
    }
}

impl<S: ArraySource> Volume<S> {
    /// The current shape of the volume.
    pub fn shape(&self) -> &[usize] {
        match self {
            Volume::Map(m) => m.shape(),
            Volume::Cat(c) => c.shape(),
        }
    }

    /// The current number of dimensions.
    pub fn dim(&self) -> usize {
        self.shape().len()
    }

    /// The voxel-to-world transform of a plain view.
    ///
    /// A concatenation has one affine per member; query the members.
    pub fn affine(&self) -> Option<&Affine> {
        match self {
            Volume::Map(m) => m.affine(),
            Volume::Cat(_) => None,
        }
    }

    /// The physical voxel size of a plain view.
    pub fn voxel_size(&self) -> Option<DVector<f64>> {
        match self {
            Volume::Map(m) => m.voxel_size(),
            Volume::Cat(_) => None,
        }
    }

    /// Extract a sub-volume.
    pub fn slice(&self, index: &[IdxElem]) -> Result<Volume<S>> {
        match self {
            Volume::Map(m) => Ok(Volume::Map(m.slice(index)?)),
            Volume::Cat(c) => c.slice(index),
        }
    }

    /// Slice with an index that is already expanded against `self.shape()`.
    pub(crate) fn slice_canon(&self, index: &[CanonIdx]) -> Result<Volume<S>> {
        match self {
            Volume::Map(m) => Ok(Volume::Map(m.slice_canon(index)?)),
            Volume::Cat(c) => c.slice_canon(index),
        }
    }

    /// Permute the dimensions.
    pub fn permute(&self, axes: &[usize]) -> Result<Volume<S>> {
        match self {
            Volume::Map(m) => Ok(Volume::Map(m.permute(axes)?)),
            Volume::Cat(c) => Ok(Volume::Cat(c.permute(axes)?)),
        }
    }

    /// Swap two dimensions.
    pub fn transpose(&self, a: usize, b: usize) -> Result<Volume<S>> {
        self.permute(&util::swapped_axes(self.dim(), a, b)?)
    }

    /// Remove axes of extent 1 (all of them, or the named ones).
    pub fn squeeze(&self, axes: Option<&[usize]>) -> Result<Volume<S>> {
        self.slice(&util::squeeze_index(self.shape(), axes)?)
    }

    /// Insert an axis of extent 1 at `axis`.
    pub fn unsqueeze(&self, axis: usize) -> Result<Volume<S>> {
        self.slice(&util::unsqueeze_index(self.dim(), axis)?)
    }

    /// Extract every sub-volume along `axis`.
    pub fn unbind(&self, axis: usize, keepdim: bool) -> Result<Vec<Volume<S>>> {
        util::check_axis(axis, self.dim())?;
        (0..self.shape()[axis])
            .map(|i| self.slice(&util::unbind_index(self.dim(), axis, i, keepdim)))
            .collect()
    }

    /// Split into `chunks` sub-volumes of near-equal extent along `axis`.
    pub fn chunk(&self, chunks: usize, axis: usize) -> Result<Vec<Volume<S>>> {
        util::check_axis(axis, self.dim())?;
        self.split(&util::chunk_sizes(self.shape()[axis], chunks)?, axis)
    }

    /// Split into sub-volumes of the given extents along `axis`.
    pub fn split(&self, sizes: &[usize], axis: usize) -> Result<Vec<Volume<S>>> {
        util::check_axis(axis, self.dim())?;
        util::split_bounds(self.shape()[axis], sizes)?
            .into_iter()
            .map(|(a, b)| self.slice(&util::axis_range_index(self.dim(), axis, a, b)))
            .collect()
    }

    /// Materialize the volume.
    pub fn read<T: DataElement>(&self, options: &ReadOptions) -> Result<ArrayD<T>> {
        match self {
            Volume::Map(m) => m.read(options),
            Volume::Cat(c) => c.read(options),
        }
    }

    /// Materialize the volume with intensity scaling applied.
    pub fn read_scaled<T: DataElement>(&self, options: &ReadOptions) -> Result<ArrayD<T>> {
        match self {
            Volume::Map(m) => m.read_scaled(options),
            Volume::Cat(c) => c.read_scaled(options),
        }
    }

    /// Write a buffer of the volume's shape to the backing store(s).
    pub fn write<T: DataElement>(&self, data: ArrayViewD<'_, T>, casting: Casting) -> Result<()> {
        match self {
            Volume::Map(m) => m.write(data, casting),
            Volume::Cat(c) => c.write(data, casting),
        }
    }

    /// Write a buffer with the inverse intensity scaling applied first.
    pub fn write_scaled<T: DataElement>(&self, data: ArrayViewD<'_, T>) -> Result<()> {
        match self {
            Volume::Map(m) => m.write_scaled(data),
            Volume::Cat(c) => c.write_scaled(data),
        }
    }

    /// Metadata of the underlying volume(s), one entry per backing store.
    pub fn metadata(&self, keys: Option<&[&str]>) -> Result<Vec<Metadata>> {
        match self {
            Volume::Map(m) => Ok(vec![m.metadata(keys)?]),
            Volume::Cat(c) => c.metadata(keys),
        }
    }

    /// Write metadata. Fails on concatenations, which have no single
    /// owner to write to.
    pub fn set_metadata(&self, meta: &Metadata) -> Result<()> {
        match self {
            Volume::Map(m) => m.set_metadata(meta),
            Volume::Cat(c) => c.set_metadata(meta),
        }
    }
}
