//! Element types that can be stored in a [`Variable`](crate::Variable) and the elementwise
//! kernels the operator protocol is built from.
//!
//! Every element type implements [`Element`]. Numeric types additionally implement [`Numeric`],
//! floating point types implement [`Real`], and integer and boolean types implement [`Bitwise`].
//! Which operators are available on a `Variable<T>` is determined by which of these traits `T`
//! implements.

use std::fmt::{self, Debug, Display};

use ndarray::{Array, ArrayD, Axis, Dimension};

use crate::errors::Result;
use crate::helpers;

/// Runtime tag for the element type of an array. Names follow numpy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl DType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Size in bytes of a single element
    pub fn itemsize(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type that can be stored as an element of a `Variable`.
pub trait Element:
    Copy + Debug + Display + Default + PartialEq + PartialOrd + Send + Sync + 'static
{
    const DTYPE: DType;

    /// Truth value of a single element. Anything other than zero (or `false`) is true.
    fn is_nonzero(self) -> bool {
        self != Self::default()
    }

    /// Erase the element type of an array.
    fn into_any(values: ArrayD<Self>) -> AnyArray;
}

/// Elementwise kernels for numeric types.
///
/// Integer kernels wrap on overflow. Integer division or modulo by zero and negative integer
/// powers are errors. `div` follows Rust's `/`, truncating integers toward zero, while `floor_div`
/// and `modulo` round toward negative infinity so the result of `modulo` takes the sign of the
/// divisor.
pub trait Numeric: Element {
    fn neg(self) -> Self;

    fn pos(self) -> Self {
        self
    }

    fn abs(self) -> Self;

    fn add(self, rhs: Self) -> Result<Self>;

    fn sub(self, rhs: Self) -> Result<Self>;

    fn mul(self, rhs: Self) -> Result<Self>;

    fn div(self, rhs: Self) -> Result<Self>;

    fn floor_div(self, rhs: Self) -> Result<Self>;

    fn modulo(self, rhs: Self) -> Result<Self>;

    fn pow(self, rhs: Self) -> Result<Self>;
}

/// Kernels that only make sense for floating point types.
pub trait Real: Numeric {
    fn true_div(self, rhs: Self) -> Result<Self>;
}

/// Logical kernels for integer and boolean types.
pub trait Bitwise: Element {
    fn and(self, rhs: Self) -> Result<Self>;

    fn or(self, rhs: Self) -> Result<Self>;

    fn xor(self, rhs: Self) -> Result<Self>;

    fn invert(self) -> Self;
}

/// An n-dimensional array whose element type is only known at runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyArray {
    Bool(ArrayD<bool>),
    Int8(ArrayD<i8>),
    Int16(ArrayD<i16>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    UInt8(ArrayD<u8>),
    UInt16(ArrayD<u16>),
    UInt32(ArrayD<u32>),
    UInt64(ArrayD<u64>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
}

/// Evaluate an expression against whichever array is wrapped by an `AnyArray`.
macro_rules! with_any {
    ($any:expr, $array:ident => $body:expr) => {
        match $any {
            AnyArray::Bool($array) => $body,
            AnyArray::Int8($array) => $body,
            AnyArray::Int16($array) => $body,
            AnyArray::Int32($array) => $body,
            AnyArray::Int64($array) => $body,
            AnyArray::UInt8($array) => $body,
            AnyArray::UInt16($array) => $body,
            AnyArray::UInt32($array) => $body,
            AnyArray::UInt64($array) => $body,
            AnyArray::Float32($array) => $body,
            AnyArray::Float64($array) => $body,
        }
    };
}

impl AnyArray {
    pub fn dtype(&self) -> DType {
        match self {
            Self::Bool(_) => DType::Bool,
            Self::Int8(_) => DType::Int8,
            Self::Int16(_) => DType::Int16,
            Self::Int32(_) => DType::Int32,
            Self::Int64(_) => DType::Int64,
            Self::UInt8(_) => DType::UInt8,
            Self::UInt16(_) => DType::UInt16,
            Self::UInt32(_) => DType::UInt32,
            Self::UInt64(_) => DType::UInt64,
            Self::Float32(_) => DType::Float32,
            Self::Float64(_) => DType::Float64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_any!(self, array => array.shape())
    }

    pub fn ndim(&self) -> usize {
        with_any!(self, array => array.ndim())
    }

    /// Promote a 0-dimensional array to a 1-element vector. Anything else is returned as is.
    pub fn at_least_1d(self) -> Self {
        if self.ndim() > 0 {
            return self;
        }

        with_any!(self, array => AnyArray::from(array.insert_axis(Axis(0))))
    }
}

impl<T, D> From<Array<T, D>> for AnyArray
where
    T: Element,
    D: Dimension,
{
    fn from(array: Array<T, D>) -> Self {
        T::into_any(array.into_dyn())
    }
}

macro_rules! element {
    ($($type:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $type {
                const DTYPE: DType = DType::$variant;

                fn into_any(values: ArrayD<Self>) -> AnyArray {
                    AnyArray::$variant(values)
                }
            }
        )*
    };
}

element!(
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);

macro_rules! integer_kernels {
    () => {
        fn add(self, rhs: Self) -> Result<Self> {
            Ok(self.wrapping_add(rhs))
        }

        fn sub(self, rhs: Self) -> Result<Self> {
            Ok(self.wrapping_sub(rhs))
        }

        fn mul(self, rhs: Self) -> Result<Self> {
            Ok(self.wrapping_mul(rhs))
        }

        fn div(self, rhs: Self) -> Result<Self> {
            helpers::div_int(self, rhs)
        }

        fn floor_div(self, rhs: Self) -> Result<Self> {
            helpers::floor_div_int(self, rhs)
        }

        fn modulo(self, rhs: Self) -> Result<Self> {
            helpers::modulo_int(self, rhs)
        }

        fn pow(self, rhs: Self) -> Result<Self> {
            helpers::pow_int(self, rhs)
        }
    };
}

macro_rules! bitwise {
    ($($type:ty),*) => {
        $(
            impl Bitwise for $type {
                fn and(self, rhs: Self) -> Result<Self> {
                    Ok(self & rhs)
                }

                fn or(self, rhs: Self) -> Result<Self> {
                    Ok(self | rhs)
                }

                fn xor(self, rhs: Self) -> Result<Self> {
                    Ok(self ^ rhs)
                }

                fn invert(self) -> Self {
                    !self
                }
            }
        )*
    };
}

macro_rules! signed {
    ($($type:ty),*) => {
        $(
            impl Numeric for $type {
                fn neg(self) -> Self {
                    self.wrapping_neg()
                }

                fn abs(self) -> Self {
                    self.wrapping_abs()
                }

                integer_kernels!();
            }
        )*
    };
}

macro_rules! unsigned {
    ($($type:ty),*) => {
        $(
            impl Numeric for $type {
                fn neg(self) -> Self {
                    self.wrapping_neg()
                }

                fn abs(self) -> Self {
                    self
                }

                integer_kernels!();
            }
        )*
    };
}

macro_rules! float {
    ($($type:ty),*) => {
        $(
            impl Numeric for $type {
                fn neg(self) -> Self {
                    -self
                }

                fn abs(self) -> Self {
                    <$type>::abs(self)
                }

                fn add(self, rhs: Self) -> Result<Self> {
                    Ok(self + rhs)
                }

                fn sub(self, rhs: Self) -> Result<Self> {
                    Ok(self - rhs)
                }

                fn mul(self, rhs: Self) -> Result<Self> {
                    Ok(self * rhs)
                }

                fn div(self, rhs: Self) -> Result<Self> {
                    Ok(self / rhs)
                }

                fn floor_div(self, rhs: Self) -> Result<Self> {
                    Ok(helpers::floor_div_float(self, rhs))
                }

                fn modulo(self, rhs: Self) -> Result<Self> {
                    Ok(helpers::modulo_float(self, rhs))
                }

                fn pow(self, rhs: Self) -> Result<Self> {
                    Ok(self.powf(rhs))
                }
            }

            impl Real for $type {
                fn true_div(self, rhs: Self) -> Result<Self> {
                    Ok(self / rhs)
                }
            }
        )*
    };
}

signed!(i8, i16, i32, i64);
unsigned!(u8, u16, u32, u64);
float!(f32, f64);
bitwise!(bool, i8, i16, i32, i64, u8, u16, u32, u64);
