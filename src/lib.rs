//! Lazy logical views over large on-disk multi-dimensional arrays.
//!
//! A [`MappedArray`] wraps a backing store ([`ArraySource`]) and records an
//! accumulated index and axis permutation instead of touching any data.
//! Slicing, permuting and squeezing compose symbolically; only [`read`] and
//! [`write`] reach the store, and they address exactly the selected region
//! in the store's original coordinates. Views of volumes with a
//! voxel-to-world affine keep that transform consistent with every
//! restriction of their spatial axes.
//!
//! Several views can be glued along one axis with [`cat`], producing a
//! [`CatArray`] that routes indexing, reads and writes to its members.
//!
//! [`MappedArray`]: volume/struct.MappedArray.html
//! [`ArraySource`]: volume/trait.ArraySource.html
//! [`CatArray`]: volume/struct.CatArray.html
//! [`cat`]: volume/fn.cat.html
//! [`read`]: volume/enum.Volume.html#method.read
//! [`write`]: volume/enum.Volume.html#method.write
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

#[macro_use]
extern crate quick_error;

pub mod affine;
pub mod error;
pub mod index;
pub mod typedef;
pub mod volume;

pub use affine::Affine;
pub use error::{Result, VolMapError};
pub use index::IdxElem;
pub use typedef::{Casting, DataType};
pub use volume::{
    cat, stack, ArraySource, CatArray, DataElement, InMemSource, MappedArray, MetaValue, Metadata,
    ReadOptions, Region, Volume,
};
