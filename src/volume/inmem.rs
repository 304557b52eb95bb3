//! In-memory backing store.
//!
//! [`InMemSource`] keeps a volume as an `f64` array in memory while
//! declaring an on-disk scalar type and intensity scaling, which makes it
//! both the in-memory proxy for arrays that never touch a file and the
//! reference implementation of [`ArraySource`] used throughout the test
//! suite.
//!
//! Reads under a shared lock may run concurrently; writes take the
//! exclusive lock, which is this store's synchronization contract.
//!
//! [`InMemSource`]: ./struct.InMemSource.html
//! [`ArraySource`]: ../trait.ArraySource.html

use super::{ArraySource, DataElement, Metadata, ReadOptions, Region};
use crate::affine::{spatial_dim, Affine};
use crate::error::{Result, VolMapError};
use crate::index::{invert_permutation, CanonIdx, CanonSlice};
use crate::typedef::{Casting, DataType};
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, SliceInfoElem};
use rand::Rng;
use std::sync::RwLock;

/// A volume held in memory, with declared on-disk type and scaling.
#[derive(Debug)]
pub struct InMemSource {
    data: RwLock<ArrayD<f64>>,
    shape: Vec<usize>,
    dtype: DataType,
    slope: f64,
    inter: f64,
    affine: Option<Affine>,
    spatial: Vec<bool>,
    metadata: RwLock<Metadata>,
}

impl InMemSource {
    /// Wrap an array with no geometric meaning.
    pub fn new(data: ArrayD<f64>) -> Self {
        let shape = data.shape().to_vec();
        let spatial = vec![false; shape.len()];
        InMemSource {
            data: RwLock::new(data),
            shape,
            dtype: DataType::Float64,
            slope: 1.0,
            inter: 0.0,
            affine: None,
            spatial,
            metadata: RwLock::new(Metadata::new()),
        }
    }

    /// Wrap an array whose first `k` axes are spatial, where `k` is the
    /// number of voxel columns of `affine`.
    pub fn with_affine(data: ArrayD<f64>, affine: Affine) -> Result<Self> {
        let k = spatial_dim(&affine);
        if k > data.ndim() {
            return Err(VolMapError::ShapeMismatch(
                vec![k],
                data.shape().to_vec(),
            ));
        }
        let mut out = Self::new(data);
        for m in out.spatial.iter_mut().take(k) {
            *m = true;
        }
        out.affine = Some(affine);
        Ok(out)
    }

    /// Override which axes are spatial.
    ///
    /// The mask must cover every axis, and the number of spatial axes
    /// must match the affine when one is present.
    pub fn with_spatial(mut self, mask: Vec<bool>) -> Result<Self> {
        let spatial_axes = mask.iter().filter(|&&m| m).count();
        if mask.len() != self.shape.len() {
            return Err(VolMapError::ShapeMismatch(
                self.shape.clone(),
                vec![mask.len()],
            ));
        }
        if let Some(affine) = &self.affine {
            if spatial_axes != spatial_dim(affine) {
                return Err(VolMapError::ShapeMismatch(
                    vec![spatial_dim(affine)],
                    vec![spatial_axes],
                ));
            }
        }
        self.spatial = mask;
        Ok(self)
    }

    /// Declare the on-disk scalar type and intensity scaling.
    pub fn with_scaling(mut self, dtype: DataType, slope: f64, inter: f64) -> Self {
        self.dtype = dtype;
        self.slope = slope;
        self.inter = inter;
        self
    }

    /// Attach initial metadata.
    pub fn with_metadata(self, metadata: Metadata) -> Self {
        *self.metadata.write().unwrap_or_else(|e| e.into_inner()) = metadata;
        self
    }

    /// A copy of the stored values, in the original layout.
    pub fn raw_data(&self) -> ArrayD<f64> {
        self.data.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn check_casting(&self, from: DataType, to: DataType, casting: Casting) -> Result<()> {
        if matches!(casting, Casting::Rescale | Casting::RescaleZero) {
            return Err(VolMapError::Unsupported(
                "rescale casting in the in-memory store",
            ));
        }
        if !casting.allows(from, to) {
            return Err(VolMapError::BadCast(from, to, casting));
        }
        Ok(())
    }
}

/// Translate a canonical slice into an `ndarray` slice spec.
fn to_slice_info(s: &CanonSlice) -> SliceInfoElem {
    if s.len == 0 {
        return SliceInfoElem::Slice {
            start: 0,
            end: Some(0),
            step: 1,
        };
    }
    if s.step > 0 {
        SliceInfoElem::Slice {
            start: s.start as isize,
            end: Some(s.start as isize + (s.len as isize - 1) * s.step + 1),
            step: s.step,
        }
    } else {
        // ndarray walks a negative-step range from its back
        SliceInfoElem::Slice {
            start: s.nth(s.len - 1) as isize,
            end: Some(s.start as isize + 1),
            step: s.step,
        }
    }
}

/// Per-original-axis slice specs plus the slot order of the kept axes.
fn region_layout(region: &Region<'_>, ndim: usize) -> (Vec<SliceInfoElem>, Vec<usize>) {
    let mut info: Vec<SliceInfoElem> = vec![
        SliceInfoElem::Slice {
            start: 0,
            end: None,
            step: 1,
        };
        ndim
    ];
    let mut kept = Vec::new();
    let mut consumed = 0;
    for e in region.slicer {
        match e {
            CanonIdx::NewAxis(_) => {}
            CanonIdx::At(i) => {
                info[region.permutation[consumed]] = SliceInfoElem::Index(*i as isize);
                consumed += 1;
            }
            CanonIdx::Slice(s) => {
                info[region.permutation[consumed]] = to_slice_info(s);
                kept.push(region.permutation[consumed]);
                consumed += 1;
            }
        }
    }
    (info, kept)
}

/// Axis permutation taking ascending-original order to slot order.
fn slot_order(kept: &[usize]) -> Vec<usize> {
    kept.iter()
        .map(|&axis| kept.iter().filter(|&&other| other < axis).count())
        .collect()
}

impl ArraySource for InMemSource {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn affine(&self) -> Option<&Affine> {
        self.affine.as_ref()
    }

    fn spatial_mask(&self) -> &[bool] {
        &self.spatial
    }

    fn data_type(&self) -> DataType {
        self.dtype
    }

    fn slope(&self) -> f64 {
        self.slope
    }

    fn inter(&self) -> f64 {
        self.inter
    }

    fn read_region<T: DataElement>(
        &self,
        region: &Region<'_>,
        options: &ReadOptions,
    ) -> Result<ArrayD<T>> {
        self.check_casting(self.dtype, T::DATA_TYPE, options.casting)?;
        let target = region.shape();
        if target.iter().product::<usize>() == 0 {
            return Ok(ArrayD::from_elem(IxDyn(&target), T::from_f64(0.0)));
        }

        let (info, kept) = region_layout(region, self.shape.len());
        let mut values = {
            let data = self.data.read().unwrap_or_else(|e| e.into_inner());
            data.slice(&info[..])
                .permuted_axes(slot_order(&kept))
                .to_owned()
        };
        // re-insert the axes that have no original counterpart
        let mut position = 0;
        for e in region.slicer {
            match e {
                CanonIdx::Slice(_) => position += 1,
                CanonIdx::At(_) => {}
                CanonIdx::NewAxis(_) => {
                    values = values.insert_axis(Axis(position));
                    position += 1;
                }
            }
        }
        if values.shape() != &target[..] {
            // a broadcast axis of extent > 1 stretches its size-1 slot
            values = values
                .broadcast(IxDyn(&target))
                .ok_or_else(|| {
                    VolMapError::ShapeMismatch(target.clone(), values.shape().to_vec())
                })?
                .to_owned();
        }

        if options.add_noise && self.dtype.is_integer() && T::DATA_TYPE.is_float() {
            let mut rng = rand::thread_rng();
            values.mapv_inplace(|v| v + rng.gen::<f64>());
        }
        if let Some((lower, upper)) = options.cutoff {
            clamp_to_percentiles(&mut values, lower, upper);
        }
        Ok(values.mapv(T::from_f64))
    }

    fn write_region<T: DataElement>(
        &self,
        region: &Region<'_>,
        data: ArrayViewD<'_, T>,
        casting: Casting,
    ) -> Result<()> {
        self.check_casting(T::DATA_TYPE, self.dtype, casting)?;
        let target = region.shape();
        if data.shape() != &target[..] {
            return Err(VolMapError::ShapeMismatch(target, data.shape().to_vec()));
        }
        if target.iter().product::<usize>() == 0 {
            return Ok(());
        }

        // strip the axes that have no original counterpart
        let mut view = data;
        let mut position = 0;
        for e in region.slicer {
            match e {
                CanonIdx::Slice(_) => position += 1,
                CanonIdx::At(_) => {}
                CanonIdx::NewAxis(n) => {
                    if *n != 1 {
                        return Err(VolMapError::Unsupported(
                            "writing through a broadcast axis",
                        ));
                    }
                    view = view.index_axis_move(Axis(position), 0);
                }
            }
        }
        let (info, kept) = region_layout(region, self.shape.len());
        let values = view
            .permuted_axes(invert_permutation(&slot_order(&kept)))
            .mapv(|v| v.to_f64());

        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.slice_mut(&info[..]).assign(&values);
        Ok(())
    }

    fn metadata(&self, keys: Option<&[&str]>) -> Result<Metadata> {
        let metadata = self.metadata.read().unwrap_or_else(|e| e.into_inner());
        Ok(match keys {
            None => metadata.clone(),
            Some(keys) => metadata
                .iter()
                .filter(|(k, _)| keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        })
    }

    fn set_metadata(&self, meta: &Metadata) -> Result<()> {
        let mut metadata = self.metadata.write().unwrap_or_else(|e| e.into_inner());
        for (k, v) in meta {
            let _ = metadata.insert(k.clone(), v.clone());
        }
        Ok(())
    }
}

/// Clamp values into the `[lower, upper]` percentile range.
fn clamp_to_percentiles(values: &mut ArrayD<f64>, lower: f64, upper: f64) {
    let mut sorted: Vec<f64> = values.iter().cloned().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pick = |q: f64| {
        let q = q.max(0.0).min(1.0);
        let i = ((sorted.len() - 1) as f64 * q).round() as usize;
        sorted[i]
    };
    let (low, high) = (pick(lower), pick(upper));
    values.mapv_inplace(|v| v.max(low).min(high));
}
