//! Crate-wide error types and a `Result` alias.
use crate::typedef::{Casting, DataType};
use std::io::Error as IoError;

quick_error! {
    /// Error type for all operations in this crate.
    #[derive(Debug)]
    pub enum VolMapError {
        /// An index tuple contained more than one ellipsis.
        MultipleEllipses {
            display("index may contain at most one ellipsis")
        }
        /// More indices were given than the array has dimensions.
        TooManyIndices(given: usize, dim: usize) {
            display("too many indices: got {} for a {}-dimensional array", given, dim)
        }
        /// An integer index fell outside `[-len, len)` for its axis.
        IndexOutOfBounds(index: isize, axis: usize, len: usize) {
            display("index {} is out of bounds for axis {} with size {}", index, axis, len)
        }
        /// A slice was given a step of zero.
        ZeroStep {
            display("slice step cannot be zero")
        }
        /// An axis argument exceeded the dimensionality of the view.
        AxisOutOfBounds(axis: usize, dim: usize) {
            display("axis {} is out of bounds for a {}-dimensional array", axis, dim)
        }
        /// A sequence of axes was not a permutation of `0..dim`.
        InvalidPermutation(axes: Vec<usize>, dim: usize) {
            display("{:?} is not a valid permutation of {} dimensions", axes, dim)
        }
        /// Attempted to squeeze an axis whose extent is not 1.
        CannotSqueeze(axis: usize, len: usize) {
            display("cannot squeeze axis {} with size {}", axis, len)
        }
        /// Split sizes do not sum to the extent of the split axis.
        BadSplitSizes(total: usize, len: usize) {
            display("split sizes sum to {} but the axis has size {}", total, len)
        }
        /// A buffer's shape disagrees with the view's shape.
        ShapeMismatch(expected: Vec<usize>, got: Vec<usize>) {
            display("expected shape {:?} but got {:?}", expected, got)
        }
        /// A concatenation member's shape disagrees with the first member's
        /// off the concatenation axis.
        CatShapeMismatch(member: usize, expected: Vec<usize>, got: Vec<usize>) {
            display(
                "concatenated array #{} has shape {:?}, incompatible with {:?} \
                 outside the concatenation axis",
                member, got, expected
            )
        }
        /// Attempted to concatenate an empty sequence of arrays.
        EmptyCat {
            display("cannot concatenate an empty sequence of arrays")
        }
        /// A scaled read or write was requested with a non-floating-point type.
        NotFloatingPoint(t: DataType) {
            display("expected a floating point data type but got {:?}", t)
        }
        /// A conversion was rejected by the requested casting policy.
        BadCast(from: DataType, to: DataType, casting: Casting) {
            display("cannot cast {:?} to {:?} under the {:?} policy", from, to, casting)
        }
        /// The operation is not available for this kind of array.
        Unsupported(what: &'static str) {
            display("unsupported operation: {}", what)
        }
        /// I/O error from a backing store.
        Io(err: IoError) {
            from()
            source(err)
            display("I/O error: {}", err)
        }
    }
}

/// Alias for a `Result` with the crate's error type.
pub type Result<T> = ::std::result::Result<T, VolMapError>;
