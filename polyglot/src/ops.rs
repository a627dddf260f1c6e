//! The operator protocol for `Variable`.
//!
//! Every operator is generated from the table at the bottom of this module, which lists the
//! unary, comparison and arithmetic operators along with the element trait that provides their
//! kernel. Each arithmetic operator ``op`` gets three methods: ``op`` computes ``self op other``,
//! ``rop`` computes ``other op self`` and ``iop`` computes ``self op other`` and writes the result
//! back into ``self``. All binary forms line up their operands by dimension name first. See
//! [`broadcast_var_data`].
//!
//! The arithmetic and logical operators of `std::ops` are implemented for `&Variable<T>` in terms
//! of the generated methods. Since an operation can fail, their output is a `Result`:
//!
//! ```
//! use ndarray::arr1;
//! use polyglot::{Attributes, Variable};
//!
//! let a = Variable::new(["x"], arr1(&[1.0, 2.0]), Attributes::new()).unwrap();
//! let b = (&a + 1.0).unwrap();
//! let c = (2.0_f64 * &b).unwrap();
//! assert_eq!(c.data().unwrap(), arr1(&[4.0, 6.0]).into_dyn());
//! ```

use std::iter;
use std::ops;

use num_traits::AsPrimitive;
use paste::paste;

use crate::{
    alignment::{broadcast_var_data, zip_with, Operand},
    attributes::safe_merge,
    dtype::{Bitwise, Element, Numeric, Real},
    errors::{Error, Result},
    variable::Variable,
};

/// Describes one of the generated operator methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperatorKind {
    /// Name of the method on `Variable`
    pub name: &'static str,

    /// Number of operands, including ``self``
    pub arity: usize,

    /// Whether the operands are swapped before the kernel is applied
    pub reflected: bool,

    /// Whether the result is written back into ``self``
    pub in_place: bool,
}

impl OperatorKind {
    const fn unary(name: &'static str) -> Self {
        Self {
            name,
            arity: 1,
            reflected: false,
            in_place: false,
        }
    }

    const fn binary(name: &'static str) -> Self {
        Self {
            name,
            arity: 2,
            reflected: false,
            in_place: false,
        }
    }

    const fn reflected(name: &'static str) -> Self {
        Self {
            name,
            arity: 2,
            reflected: true,
            in_place: false,
        }
    }

    const fn in_place(name: &'static str) -> Self {
        Self {
            name,
            arity: 2,
            reflected: false,
            in_place: true,
        }
    }
}

impl<T> Variable<T>
where
    T: Element,
{
    /// Apply ``f`` to every element of a copy of this variable.
    fn unary_op<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(T) -> T,
    {
        let values = self.with_data(|values| values.mapv(&f))?;
        let mut result = self.copy();
        result.set_data(values)?;

        Ok(result)
    }

    /// Combine this variable with another operand elementwise, producing a new variable.
    ///
    /// If ``reflexive`` is set, ``f`` is called with the operands swapped. Attributes of every
    /// labeled operand are merged, dropping any that conflict.
    ///
    fn binary_op<U, F>(&self, other: Operand<'_, T>, reflexive: bool, f: F) -> Result<Variable<U>>
    where
        U: Element,
        F: Fn(T, T) -> Result<U>,
    {
        let attributes = safe_merge(iter::once(self.attributes()).chain(other.attributes()));
        let (values, other_values, dimensions) = broadcast_var_data(self, other)?;
        let result = if reflexive {
            zip_with(&other_values, &values, f)?
        } else {
            zip_with(&values, &other_values, f)?
        };

        Variable::new(dimensions, result, attributes)
    }

    /// Combine this variable with another operand elementwise, writing the result into this
    /// variable's buffer.
    ///
    /// The operation may not change this variable's dimensions or shape.
    ///
    fn inplace_binary_op<F>(&mut self, other: Operand<'_, T>, f: F) -> Result<&mut Self>
    where
        F: Fn(T, T) -> Result<T>,
    {
        let (values, other_values, dimensions) = broadcast_var_data(self, other)?;
        if dimensions != self.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions().to_vec(),
                found: dimensions,
            });
        }
        let result = zip_with(&values, &other_values, f)?;
        self.write_data(&result)?;

        Ok(self)
    }
}

impl<T> Variable<T>
where
    T: Numeric + AsPrimitive<f64>,
{
    /// A float64 copy of this variable, with the same dimensions and attributes.
    pub fn to_float64(&self) -> Result<Variable<f64>> {
        let values = self.with_data(|values| values.mapv(|value| value.as_()))?;

        Variable::new(self.dimensions().to_vec(), values, self.attributes().clone())
    }

    /// Divide, promoting both operands to float64 first.
    ///
    /// This is the true division of integer variables: ``[1, 3] / 2`` is ``[0.5, 1.5]``. Float
    /// variables can use `true_div` directly.
    ///
    pub fn float_div<'a, R>(&self, other: R) -> Result<Variable<f64>>
    where
        R: Into<Operand<'a, T>>,
        T: 'a,
    {
        let numerator = self.to_float64()?;
        match other.into() {
            Operand::Labeled(variable) => numerator.true_div(&variable.to_float64()?),
            Operand::Raw(values) => numerator.true_div(values.mapv(|value| value.as_())),
        }
    }
}

macro_rules! operators {
    (
        unary { $($unary:ident: $unary_kernel:ident),* $(,)? }
        compare { $($compare:ident: $op:tt),* $(,)? }
        arithmetic { $($binary:ident: $binary_kernel:ident),* $(,)? }
    ) => {
        paste! {
            $(
                impl<T> Variable<T>
                where
                    T: $unary_kernel,
                {
                    #[doc = "Elementwise `" $unary "` of the variable's values."]
                    #[allow(clippy::should_implement_trait)]
                    pub fn $unary(&self) -> Result<Self> {
                        self.unary_op(<T as $unary_kernel>::$unary)
                    }
                }
            )*

            #[allow(clippy::should_implement_trait)]
            impl<T> Variable<T>
            where
                T: Element,
            {
                $(
                    #[doc = "Elementwise `" $compare "` comparison of `self` with `other`."]
                    pub fn $compare<'a, R>(&self, other: R) -> Result<Variable<bool>>
                    where
                        R: Into<Operand<'a, T>>,
                    {
                        self.binary_op(other.into(), false, |a, b| Ok(a $op b))
                    }
                )*
            }

            $(
                #[allow(clippy::should_implement_trait)]
                impl<T> Variable<T>
                where
                    T: $binary_kernel,
                {
                    #[doc = "Elementwise `" $binary "` of `self` and `other`."]
                    pub fn $binary<'a, R>(&self, other: R) -> Result<Self>
                    where
                        R: Into<Operand<'a, T>>,
                    {
                        self.binary_op(other.into(), false, <T as $binary_kernel>::$binary)
                    }

                    #[doc = "Elementwise `" $binary "` of `other` and `self`."]
                    pub fn [<r $binary>]<'a, R>(&self, other: R) -> Result<Self>
                    where
                        R: Into<Operand<'a, T>>,
                    {
                        self.binary_op(other.into(), true, <T as $binary_kernel>::$binary)
                    }

                    #[doc = "Elementwise `" $binary "` of `self` and `other`, in place."]
                    pub fn [<i $binary>]<'a, R>(&mut self, other: R) -> Result<&mut Self>
                    where
                        R: Into<Operand<'a, T>>,
                    {
                        self.inplace_binary_op(other.into(), <T as $binary_kernel>::$binary)
                    }
                }
            )*

            /// Every operator method generated for `Variable`.
            pub const OPERATORS: &[OperatorKind] = &[
                $(OperatorKind::unary(stringify!($unary)),)*
                $(OperatorKind::binary(stringify!($compare)),)*
                $(
                    OperatorKind::binary(stringify!($binary)),
                    OperatorKind::reflected(stringify!([<r $binary>])),
                    OperatorKind::in_place(stringify!([<i $binary>])),
                )*
            ];
        }
    };
}

operators! {
    unary {
        neg: Numeric,
        pos: Numeric,
        abs: Numeric,
        invert: Bitwise,
    }
    compare {
        lt: <,
        le: <=,
        eq: ==,
        ne: !=,
        ge: >=,
        gt: >,
    }
    arithmetic {
        add: Numeric,
        sub: Numeric,
        mul: Numeric,
        div: Numeric,
        true_div: Real,
        floor_div: Numeric,
        modulo: Numeric,
        pow: Numeric,
        and: Bitwise,
        xor: Bitwise,
        or: Bitwise,
    }
}

macro_rules! std_binary {
    ($($trait:ident::$method:ident => $op:ident: $kernel:ident),* $(,)?) => {
        $(
            impl<'a, 'b, T, R> ops::$trait<R> for &'b Variable<T>
            where
                T: $kernel,
                R: Into<Operand<'a, T>>,
            {
                type Output = Result<Variable<T>>;

                fn $method(self, rhs: R) -> Self::Output {
                    Variable::$op(self, rhs)
                }
            }
        )*
    };
}

std_binary! {
    Add::add => add: Numeric,
    Sub::sub => sub: Numeric,
    Mul::mul => mul: Numeric,
    Div::div => div: Numeric,
    Rem::rem => modulo: Numeric,
    BitAnd::bitand => and: Bitwise,
    BitOr::bitor => or: Bitwise,
    BitXor::bitxor => xor: Bitwise,
}

impl<'b, T> ops::Neg for &'b Variable<T>
where
    T: Numeric,
{
    type Output = Result<Variable<T>>;

    fn neg(self) -> Self::Output {
        Variable::neg(self)
    }
}

impl<'b, T> ops::Not for &'b Variable<T>
where
    T: Bitwise,
{
    type Output = Result<Variable<T>>;

    fn not(self) -> Self::Output {
        Variable::invert(self)
    }
}

/// Operators with a scalar on the left, such as ``2.0 - &variable``.
macro_rules! reflected_scalar {
    ($trait:ident::$method:ident => $op:ident: $($type:ty),*) => {
        $(
            impl<'b> ops::$trait<&'b Variable<$type>> for $type {
                type Output = Result<Variable<$type>>;

                fn $method(self, rhs: &'b Variable<$type>) -> Self::Output {
                    rhs.$op(self)
                }
            }
        )*
    };
}

reflected_scalar!(Add::add => radd: i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
reflected_scalar!(Sub::sub => rsub: i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
reflected_scalar!(Mul::mul => rmul: i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
reflected_scalar!(Div::div => rdiv: i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
reflected_scalar!(Rem::rem => rmodulo: i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
reflected_scalar!(BitAnd::bitand => rand: bool, i8, i16, i32, i64, u8, u16, u32, u64);
reflected_scalar!(BitOr::bitor => ror: bool, i8, i16, i32, i64, u8, u16, u32, u64);
reflected_scalar!(BitXor::bitxor => rxor: bool, i8, i16, i32, i64, u8, u16, u32, u64);
