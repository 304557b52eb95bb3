//! Data type and casting policy definitions shared across the crate.
//!
//! These types describe the *on-disk* storage of a mapped array and the
//! policy under which values may be converted when reading or writing.
//! Actual byte-level decoding belongs to the backing-store implementations.

/// On-disk scalar type of a mapped array.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum DataType {
    /// unsigned 8-bit integer
    Uint8,
    /// signed 8-bit integer
    Int8,
    /// unsigned 16-bit integer
    Uint16,
    /// signed 16-bit integer
    Int16,
    /// unsigned 32-bit integer
    Uint32,
    /// signed 32-bit integer
    Int32,
    /// unsigned 64-bit integer
    Uint64,
    /// signed 64-bit integer
    Int64,
    /// 32-bit IEEE float
    Float32,
    /// 64-bit IEEE float
    Float64,
}

impl DataType {
    /// Size of one element of this data type, in bytes.
    pub fn size_of(self) -> usize {
        use DataType::*;
        match self {
            Int8 | Uint8 => 1,
            Int16 | Uint16 => 2,
            Int32 | Uint32 | Float32 => 4,
            Int64 | Uint64 | Float64 => 8,
        }
    }

    /// Whether this is a floating point type.
    pub fn is_float(self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Whether this is an integer type.
    pub fn is_integer(self) -> bool {
        !self.is_float()
    }

    /// Whether this is a signed type.
    pub fn is_signed(self) -> bool {
        use DataType::*;
        matches!(self, Int8 | Int16 | Int32 | Int64 | Float32 | Float64)
    }

    /// Whether every value of `self` is exactly representable in `other`.
    pub fn fits_in(self, other: DataType) -> bool {
        use DataType::*;
        if self == other {
            return true;
        }
        match self {
            Uint8 => matches!(
                other,
                Uint16 | Uint32 | Uint64 | Int16 | Int32 | Int64 | Float32 | Float64
            ),
            Int8 => matches!(other, Int16 | Int32 | Int64 | Float32 | Float64),
            Uint16 => matches!(other, Uint32 | Uint64 | Int32 | Int64 | Float32 | Float64),
            Int16 => matches!(other, Int32 | Int64 | Float32 | Float64),
            Uint32 => matches!(other, Uint64 | Int64 | Float64),
            Int32 => matches!(other, Int64 | Float64),
            Uint64 | Int64 => false,
            Float32 => matches!(other, Float64),
            Float64 => false,
        }
    }
}

/// Policy controlling what kind of data conversion may occur on read/write.
///
/// The `Rescale` variants express a dynamic-range remapping which is the
/// business of the format codec, not of the view layer; backing stores
/// that do not implement them must reject them.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Casting {
    /// The data types should not be cast at all.
    No,
    /// Only byte-order changes are allowed.
    Equiv,
    /// Only casts which preserve all values are allowed.
    Safe,
    /// Safe casts, plus casts within a kind (e.g. `f64` to `f32`).
    SameKind,
    /// Any data conversion may be done.
    Unsafe,
    /// Rescale the data to the dynamic range of the output type.
    Rescale,
    /// Like `Rescale`, but guaranteeing that zero maps to zero.
    RescaleZero,
}

impl Default for Casting {
    fn default() -> Self {
        Casting::Unsafe
    }
}

impl Casting {
    /// Whether a conversion from `from` to `to` is permitted by this policy.
    ///
    /// `Rescale` policies answer `true` here; whether the rescaling itself
    /// is available is decided by the backing store.
    pub fn allows(self, from: DataType, to: DataType) -> bool {
        match self {
            Casting::No | Casting::Equiv => from == to,
            Casting::Safe => from.fits_in(to),
            Casting::SameKind => {
                from.fits_in(to)
                    || from.is_float() == to.is_float()
                    || (from.is_integer() && to.is_float())
            }
            Casting::Unsafe | Casting::Rescale | Casting::RescaleZero => true,
        }
    }
}
