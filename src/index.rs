//! Symbolic index algebra.
//!
//! This module turns user-facing indices (slices, integers, ellipses and
//! new-axis markers) into a canonical, fully-expanded form, and composes
//! two successive index tuples into a single equivalent one, all without
//! touching any data. Chains of slicing operations on a mapped array
//! reduce to repeated [`compose_index`] calls, so a view is always
//! described by one index tuple against the original on-disk axes.
//!
//! Canonical slices are arithmetic progressions (`start + i*step`), which
//! makes composition plain integer arithmetic even for reversed slices.
//!
//! [`compose_index`]: ./fn.compose_index.html

use crate::error::{Result, VolMapError};

/// A user-facing index element for one axis.
///
/// Advanced (list or boolean mask) indexing is not representable here;
/// only rectangular selections can be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdxElem {
    /// A slice with optional bounds and a non-zero step.
    ///
    /// Negative bounds count from the end of the axis, as in NumPy.
    /// With a negative step, an absent `end` means "up to and including
    /// the first element".
    Range {
        /// First index taken, or the default for the step's direction.
        start: Option<isize>,
        /// Exclusive bound, or the default for the step's direction.
        end: Option<isize>,
        /// Distance between successive indices; must not be zero.
        step: isize,
    },
    /// A bare integer index; drops the axis.
    At(isize),
    /// Inserts a new axis of extent 1.
    NewAxis,
    /// Expands to as many full slices as needed to cover the remaining axes.
    Ellipsis,
}

impl IdxElem {
    /// The full slice over one axis.
    pub fn full() -> Self {
        IdxElem::Range {
            start: None,
            end: None,
            step: 1,
        }
    }

    /// A contiguous `start..end` slice.
    pub fn range(start: isize, end: isize) -> Self {
        IdxElem::Range {
            start: Some(start),
            end: Some(end),
            step: 1,
        }
    }

    /// A slice with an explicit step.
    pub fn stepped(start: Option<isize>, end: Option<isize>, step: isize) -> Self {
        IdxElem::Range { start, end, step }
    }

    /// The whole axis in reverse order.
    pub fn reversed() -> Self {
        IdxElem::Range {
            start: None,
            end: None,
            step: -1,
        }
    }

    /// A bare integer index.
    pub fn at(index: isize) -> Self {
        IdxElem::At(index)
    }
}

impl From<isize> for IdxElem {
    fn from(index: isize) -> Self {
        IdxElem::At(index)
    }
}

impl From<i32> for IdxElem {
    fn from(index: i32) -> Self {
        IdxElem::At(index as isize)
    }
}

impl From<std::ops::Range<isize>> for IdxElem {
    fn from(r: std::ops::Range<isize>) -> Self {
        IdxElem::range(r.start, r.end)
    }
}

impl From<std::ops::RangeFrom<isize>> for IdxElem {
    fn from(r: std::ops::RangeFrom<isize>) -> Self {
        IdxElem::stepped(Some(r.start), None, 1)
    }
}

impl From<std::ops::RangeTo<isize>> for IdxElem {
    fn from(r: std::ops::RangeTo<isize>) -> Self {
        IdxElem::stepped(None, Some(r.end), 1)
    }
}

impl From<std::ops::RangeFull> for IdxElem {
    fn from(_: std::ops::RangeFull) -> Self {
        IdxElem::full()
    }
}

/// A canonical slice over one axis: the indices `start + i*step` for
/// `i in 0..len`, all resolved and in bounds. A negative `step` encodes a
/// reversed traversal, `start` then being the largest index taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonSlice {
    /// First index taken (meaningless when `len == 0`).
    pub start: usize,
    /// Signed distance between successive indices.
    pub step: isize,
    /// Number of indices taken.
    pub len: usize,
}

impl CanonSlice {
    /// The full slice over an axis of extent `len`.
    pub fn full(len: usize) -> Self {
        CanonSlice {
            start: 0,
            step: 1,
            len,
        }
    }

    /// The absolute index of the `i`-th element of this slice.
    pub fn nth(&self, i: usize) -> usize {
        (self.start as isize + i as isize * self.step) as usize
    }

    /// The slice equivalent to applying `inner` to the axis selected by
    /// `self`.
    pub fn compose(&self, inner: &CanonSlice) -> CanonSlice {
        let start = if inner.len == 0 {
            self.start
        } else {
            self.nth(inner.start)
        };
        CanonSlice {
            start,
            step: self.step * inner.step,
            len: inner.len,
        }
    }
}

/// A canonical index element, fully resolved against a known shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonIdx {
    /// A kept axis, possibly resized or reversed.
    Slice(CanonSlice),
    /// A dropped axis, fixed at the given absolute position.
    At(usize),
    /// An inserted axis of the given extent (1 unless broadcast).
    NewAxis(usize),
}

impl CanonIdx {
    /// Whether this element drops its axis (a bare integer index).
    pub fn is_dropped(&self) -> bool {
        matches!(self, CanonIdx::At(_))
    }

    /// Whether this element inserts an axis with no original counterpart.
    pub fn is_new(&self) -> bool {
        matches!(self, CanonIdx::NewAxis(_))
    }

    /// Whether this element keeps (a slice of) its original axis.
    pub fn is_slice(&self) -> bool {
        matches!(self, CanonIdx::Slice(_))
    }

    /// Whether this element is an inserted axis of extent other than 1.
    pub fn is_broadcast(&self) -> bool {
        matches!(self, CanonIdx::NewAxis(n) if *n != 1)
    }

    /// The extent this element contributes to the result shape, if any.
    pub fn out_len(&self) -> Option<usize> {
        match self {
            CanonIdx::Slice(s) => Some(s.len),
            CanonIdx::NewAxis(n) => Some(*n),
            CanonIdx::At(_) => None,
        }
    }
}

/// The shape produced by a canonical index tuple.
pub(crate) fn index_shape(index: &[CanonIdx]) -> Vec<usize> {
    index.iter().filter_map(CanonIdx::out_len).collect()
}

fn resolve_at(index: isize, axis: usize, len: usize) -> Result<usize> {
    let n = len as isize;
    if index < -n || index >= n {
        return Err(VolMapError::IndexOutOfBounds(index, axis, len));
    }
    Ok(if index < 0 { index + n } else { index } as usize)
}

fn resolve_range(
    start: Option<isize>,
    end: Option<isize>,
    step: isize,
    len: usize,
) -> Result<CanonSlice> {
    if step == 0 {
        return Err(VolMapError::ZeroStep);
    }
    let n = len as isize;
    if step > 0 {
        let mut s = start.unwrap_or(0);
        if s < 0 {
            s += n;
        }
        s = s.max(0).min(n);
        let mut e = end.unwrap_or(n);
        if e < 0 {
            e += n;
        }
        e = e.max(0).min(n);
        let count = if e > s { (e - s + step - 1) / step } else { 0 };
        Ok(CanonSlice {
            start: if count > 0 { s as usize } else { 0 },
            step,
            len: count as usize,
        })
    } else {
        let mut s = start.unwrap_or(n - 1);
        if s < 0 {
            s += n;
        }
        s = s.max(-1).min(n - 1);
        // an absent end means "past the first element"
        let mut e = match end {
            Some(e) if e < 0 => e + n,
            Some(e) => e,
            None => -1,
        };
        e = e.max(-1).min(n - 1);
        let count = if s > e { (s - e - step - 1) / -step } else { 0 };
        Ok(CanonSlice {
            start: if count > 0 { s as usize } else { 0 },
            step,
            len: count as usize,
        })
    }
}

/// Expand a user-supplied index tuple against a shape.
///
/// Replaces an ellipsis with the right number of full slices, pads
/// trailing implicit full slices, resolves negative integers and slice
/// bounds, and classifies every element. Returns the canonical index and
/// the shape of the selection it produces.
///
/// # Errors
///
/// - [`MultipleEllipses`] if more than one ellipsis is given;
/// - [`TooManyIndices`] if the number of axis-consuming indices exceeds
///   the dimensionality of `shape`;
/// - [`IndexOutOfBounds`] if an integer index is outside `[-len, len)`;
/// - [`ZeroStep`] if a slice has a step of zero.
///
/// [`MultipleEllipses`]: ../error/enum.VolMapError.html#variant.MultipleEllipses
/// [`TooManyIndices`]: ../error/enum.VolMapError.html#variant.TooManyIndices
/// [`IndexOutOfBounds`]: ../error/enum.VolMapError.html#variant.IndexOutOfBounds
/// [`ZeroStep`]: ../error/enum.VolMapError.html#variant.ZeroStep
pub fn expand_index(index: &[IdxElem], shape: &[usize]) -> Result<(Vec<CanonIdx>, Vec<usize>)> {
    let n_ellipses = index
        .iter()
        .filter(|e| matches!(e, IdxElem::Ellipsis))
        .count();
    if n_ellipses > 1 {
        return Err(VolMapError::MultipleEllipses);
    }
    let n_consumed = index
        .iter()
        .filter(|e| matches!(e, IdxElem::Range { .. } | IdxElem::At(_)))
        .count();
    if n_consumed > shape.len() {
        return Err(VolMapError::TooManyIndices(n_consumed, shape.len()));
    }
    let implicit = shape.len() - n_consumed;

    let mut out = Vec::with_capacity(shape.len() + index.len());
    let mut axis = 0;
    for elem in index {
        match *elem {
            IdxElem::Ellipsis => {
                for _ in 0..implicit {
                    out.push(CanonIdx::Slice(CanonSlice::full(shape[axis])));
                    axis += 1;
                }
            }
            IdxElem::Range { start, end, step } => {
                out.push(CanonIdx::Slice(resolve_range(
                    start,
                    end,
                    step,
                    shape[axis],
                )?));
                axis += 1;
            }
            IdxElem::At(i) => {
                out.push(CanonIdx::At(resolve_at(i, axis, shape[axis])?));
                axis += 1;
            }
            IdxElem::NewAxis => out.push(CanonIdx::NewAxis(1)),
        }
    }
    // trailing axes not mentioned by the index are taken whole
    while axis < shape.len() {
        out.push(CanonIdx::Slice(CanonSlice::full(shape[axis])));
        axis += 1;
    }

    let new_shape = index_shape(&out);
    Ok((out, new_shape))
}

/// Compose two canonical index tuples into one.
///
/// `outer` is expressed against some original axes; `inner` is expressed
/// against the shape that `outer` produces. The result, expressed against
/// the original axes, selects exactly what applying `outer` then `inner`
/// would. Dropped axes of `outer` are invisible to `inner` and carried
/// through unchanged; axes inserted by `outer` and then dropped by
/// `inner` vanish altogether.
pub fn compose_index(outer: &[CanonIdx], inner: &[CanonIdx]) -> Result<Vec<CanonIdx>> {
    let outer_axes = outer.iter().filter(|e| !e.is_dropped()).count();
    let inner_axes = inner.iter().filter(|e| !e.is_new()).count();
    if inner_axes != outer_axes {
        return Err(VolMapError::TooManyIndices(inner_axes, outer_axes));
    }

    let mut out = Vec::with_capacity(outer.len() + inner.len());
    let mut inner = inner.iter().peekable();
    for o in outer {
        if o.is_dropped() {
            out.push(*o);
            continue;
        }
        // axes inserted by `inner` land before the next surviving axis
        while matches!(inner.peek(), Some(CanonIdx::NewAxis(_))) {
            if let Some(&CanonIdx::NewAxis(n)) = inner.next() {
                out.push(CanonIdx::NewAxis(n));
            }
        }
        let i = match inner.next() {
            Some(i) => i,
            None => break,
        };
        match (o, i) {
            (CanonIdx::Slice(s), CanonIdx::At(j)) => out.push(CanonIdx::At(s.nth(*j))),
            (CanonIdx::Slice(s), CanonIdx::Slice(t)) => out.push(CanonIdx::Slice(s.compose(t))),
            (CanonIdx::NewAxis(_), CanonIdx::At(_)) => (),
            (CanonIdx::NewAxis(_), CanonIdx::Slice(t)) => out.push(CanonIdx::NewAxis(t.len)),
            _ => unreachable!("inner new axes are consumed above"),
        }
    }
    for i in inner {
        if let CanonIdx::NewAxis(n) = i {
            out.push(CanonIdx::NewAxis(*n));
        }
    }
    Ok(out)
}

/// Invert a permutation of `0..n`.
///
/// The caller must pass a valid permutation.
pub fn invert_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        inverse[p] = i;
    }
    inverse
}

/// Check that `axes` is a permutation of `0..dim`.
pub(crate) fn validate_permutation(axes: &[usize], dim: usize) -> Result<()> {
    if axes.len() != dim {
        return Err(VolMapError::InvalidPermutation(axes.to_vec(), dim));
    }
    let mut seen = vec![false; dim];
    for &a in axes {
        if a >= dim || seen[a] {
            return Err(VolMapError::InvalidPermutation(axes.to_vec(), dim));
        }
        seen[a] = true;
    }
    Ok(())
}
