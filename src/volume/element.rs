//! Scalar element API.
//!
//! [`DataElement`] ties a Rust scalar type to its on-disk [`DataType`]
//! and provides the conversions the view layer needs: moving values
//! through `f64` (the working precision of the in-memory proxy and of
//! intensity scaling) and applying or removing the slope/intercept
//! transform.
//!
//! [`DataElement`]: ./trait.DataElement.html
//! [`DataType`]: ../../typedef/enum.DataType.html

use crate::typedef::DataType;
use num_traits::AsPrimitive;
use std::fmt::Debug;

/// Trait for scalar types that can live in a mapped array.
pub trait DataElement: 'static + Copy + PartialEq + Debug + Send + Sync {
    /// The on-disk data type corresponding to this scalar type.
    const DATA_TYPE: DataType;

    /// Convert from working precision.
    fn from_f64(value: f64) -> Self;

    /// Convert to working precision.
    fn to_f64(self) -> f64;

    /// Apply the intensity transform `value * slope + inter`.
    ///
    /// The arithmetic is carried out in `f64` regardless of `Self`, since
    /// the stored type may not have enough precision for the scaled
    /// value.
    fn scale(self, slope: f64, inter: f64) -> Self {
        Self::from_f64(self.to_f64() * slope + inter)
    }

    /// Invert the intensity transform: `(value - inter) / slope`.
    fn unscale(self, slope: f64, inter: f64) -> Self {
        Self::from_f64((self.to_f64() - inter) / slope)
    }
}

macro_rules! impl_data_element {
    ($t:ty, $dt:expr) => {
        impl DataElement for $t {
            const DATA_TYPE: DataType = $dt;

            fn from_f64(value: f64) -> Self {
                value.as_()
            }

            fn to_f64(self) -> f64 {
                self.as_()
            }
        }
    };
}

impl_data_element!(u8, DataType::Uint8);
impl_data_element!(i8, DataType::Int8);
impl_data_element!(u16, DataType::Uint16);
impl_data_element!(i16, DataType::Int16);
impl_data_element!(u32, DataType::Uint32);
impl_data_element!(i32, DataType::Int32);
impl_data_element!(u64, DataType::Uint64);
impl_data_element!(i64, DataType::Int64);
impl_data_element!(f32, DataType::Float32);
impl_data_element!(f64, DataType::Float64);
