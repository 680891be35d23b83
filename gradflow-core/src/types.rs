use num_traits::{Num, NumCast};
use std::fmt::Debug;
use std::ops::Neg;

/// Defines the possible data types for Variable elements.
///
/// The tag travels with every [`ErasedNode`](crate::node::ErasedNode) so that a
/// type-erased tensor can be checked before it is downcast back to its element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating-point type.
    F32,
    /// 64-bit floating-point type.
    F64,
    /// 32-bit integer type.
    I32,
    /// 64-bit integer type.
    I64,
}

/// Scalar types that can be stored in a Variable.
///
/// `Num` supplies the additive and multiplicative identities (zero-filled gradient
/// buffers, scalar seeds) and `Neg` the `-1` used to express subtraction as a
/// scaled addition.
pub trait Element:
    Num + NumCast + Neg<Output = Self> + Copy + Debug + Default + PartialOrd + Send + Sync + 'static
{
    /// The runtime tag of this element type.
    const DTYPE: DType;

    /// Sum used when gradients are accumulated. Integer gradients wrap on overflow.
    fn accumulate(self, other: Self) -> Self;
}

macro_rules! impl_float_element {
    ($t:ty, $tag:expr) => {
        impl Element for $t {
            const DTYPE: DType = $tag;

            fn accumulate(self, other: Self) -> Self {
                self + other
            }
        }
    };
}

macro_rules! impl_int_element {
    ($t:ty, $tag:expr) => {
        impl Element for $t {
            const DTYPE: DType = $tag;

            fn accumulate(self, other: Self) -> Self {
                self.wrapping_add(other)
            }
        }
    };
}

impl_float_element!(f32, DType::F32);
impl_float_element!(f64, DType::F64);
impl_int_element!(i32, DType::I32);
impl_int_element!(i64, DType::I64);

impl DType {
    /// Size in bytes of one element of this type.
    pub fn size_of(&self) -> usize {
        match self {
            DType::F32 => std::mem::size_of::<f32>(),
            DType::F64 => std::mem::size_of::<f64>(),
            DType::I32 => std::mem::size_of::<i32>(),
            DType::I64 => std::mem::size_of::<i64>(),
        }
    }

    /// Returns true for the floating-point tags.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }
}
