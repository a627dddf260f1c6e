//! Aligning the data of two operands by dimension name so they can be combined elementwise.

use std::mem;

use ndarray::{arr0, Array, ArrayD, Axis, Dimension, IxDyn, Zip};

use crate::{
    attributes::Attributes,
    dtype::Element,
    errors::{Error, Result},
    variable::Variable,
};

/// The second operand of a binary operation.
///
/// A labeled operand is aligned with the first operand by dimension name. A raw array or scalar
/// has no names and is broadcast against the first operand's data by shape alone.
///
#[derive(Clone, Debug)]
pub enum Operand<'a, T>
where
    T: Element,
{
    Labeled(&'a Variable<T>),
    Raw(ArrayD<T>),
}

impl<'a, T> Operand<'a, T>
where
    T: Element,
{
    /// Attributes of a labeled operand
    pub fn attributes(&self) -> Option<&'a Attributes> {
        match self {
            Self::Labeled(variable) => Some(variable.attributes()),
            Self::Raw(_) => None,
        }
    }
}

impl<'a, T> From<&'a Variable<T>> for Operand<'a, T>
where
    T: Element,
{
    fn from(variable: &'a Variable<T>) -> Self {
        Self::Labeled(variable)
    }
}

impl<'a, T, D> From<Array<T, D>> for Operand<'a, T>
where
    T: Element,
    D: Dimension,
{
    fn from(array: Array<T, D>) -> Self {
        Self::Raw(array.into_dyn())
    }
}

macro_rules! scalar_operand {
    ($($type:ty),*) => {
        $(
            impl<'a> From<$type> for Operand<'a, $type> {
                fn from(value: $type) -> Self {
                    Self::Raw(arr0(value).into_dyn())
                }
            }
        )*
    };
}

scalar_operand!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

fn append_axes<T>(mut array: ArrayD<T>, count: usize) -> ArrayD<T> {
    for _ in 0..count {
        let axis = Axis(array.ndim());
        array = array.insert_axis(axis);
    }

    array
}

/// Align the data of two operands so they can be broadcast against each other.
///
/// Returns the data of both operands and the dimensions of the result. For a labeled secondary
/// operand the result's dimensions are the primary's followed by any of the secondary's that the
/// primary lacks, and both arrays are given size one axes for the dimensions they lack and
/// reordered so that their axes line up with the result's dimensions. A raw secondary operand is
/// returned untouched and the result has the primary's dimensions.
///
/// Names are looked up by first match, so when a name repeats only its first occurrence decides
/// where an axis goes. Operands whose dimension lists are identical line up as they are, repeated
/// names included. Any other alignment that would send two axes to the same place fails with
/// [`Error::DimensionMismatch`].
///
pub fn broadcast_var_data<T>(
    primary: &Variable<T>,
    secondary: Operand<T>,
) -> Result<(ArrayD<T>, ArrayD<T>, Vec<String>)>
where
    T: Element,
{
    let primary_data = primary.data()?;
    let secondary = match secondary {
        Operand::Raw(array) => {
            return Ok((primary_data, array, primary.dimensions().to_vec()));
        }
        Operand::Labeled(secondary) => secondary,
    };

    let secondary_only: Vec<String> = secondary
        .dimensions()
        .iter()
        .filter(|name| !primary.dimensions().contains(name))
        .cloned()
        .collect();
    let mut dimensions = primary.dimensions().to_vec();
    dimensions.extend(secondary_only.iter().cloned());
    let primary_data = append_axes(primary_data, secondary_only.len());

    // Dimensions the secondary lacks get size one axes at its end, then its axes are permuted
    // into the result's order.
    let primary_only: Vec<String> = dimensions
        .iter()
        .filter(|name| !secondary.dimensions().contains(name))
        .cloned()
        .collect();
    let mut secondary_dimensions = secondary.dimensions().to_vec();
    secondary_dimensions.extend(primary_only.iter().cloned());
    let secondary_data = append_axes(secondary.data()?, primary_only.len());

    let secondary_data = if secondary_dimensions == dimensions {
        secondary_data
    } else {
        let permutation: Vec<usize> = dimensions
            .iter()
            .filter_map(|name| secondary_dimensions.iter().position(|other| other == name))
            .collect();
        let mut seen = vec![false; secondary_data.ndim()];
        let is_permutation = permutation.len() == seen.len()
            && permutation
                .iter()
                .all(|&axis| !mem::replace(&mut seen[axis], true));
        if !is_permutation {
            return Err(Error::DimensionMismatch {
                expected: dimensions,
                found: secondary_dimensions,
            });
        }

        secondary_data.permuted_axes(IxDyn(&permutation))
    };

    log::trace!(
        "aligned {:?} with {:?} as {dimensions:?}: shapes {:?} and {:?}",
        primary.dimensions(),
        secondary.dimensions(),
        primary_data.shape(),
        secondary_data.shape()
    );

    Ok((primary_data, secondary_data, dimensions))
}

/// Compute the shape two arrays broadcast to, following numpy: shapes are aligned at their last
/// axes, and each pair of lengths must either be equal or contain a one.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let length = |shape: &[usize], i: usize| {
        let offset = ndim - shape.len();
        if i < offset {
            1
        } else {
            shape[i - offset]
        }
    };

    (0..ndim)
        .map(|i| match (length(a, i), length(b, i)) {
            (x, y) if x == y => Ok(x),
            (1, y) => Ok(y),
            (x, 1) => Ok(x),
            _ => Err(Error::Broadcast(a.to_vec(), b.to_vec())),
        })
        .collect()
}

/// Broadcast two arrays against each other and combine them elementwise.
///
/// If ``f`` fails for any pair of elements, the first error is returned.
///
pub(crate) fn zip_with<A, B, U, F>(a: &ArrayD<A>, b: &ArrayD<B>, mut f: F) -> Result<ArrayD<U>>
where
    A: Copy,
    B: Copy,
    U: Default,
    F: FnMut(A, B) -> Result<U>,
{
    let shape = broadcast_shapes(a.shape(), b.shape())?;
    let broadcast_error = || Error::Broadcast(a.shape().to_vec(), b.shape().to_vec());
    let a_view = a.broadcast(shape.clone()).ok_or_else(broadcast_error)?;
    let b_view = b.broadcast(shape).ok_or_else(broadcast_error)?;

    let mut error = None;
    let result = Zip::from(a_view)
        .and(b_view)
        .map_collect(|&x, &y| match f(x, y) {
            Ok(value) => value,
            Err(err) => {
                if error.is_none() {
                    error = Some(err);
                }
                U::default()
            }
        });

    match error {
        Some(err) => Err(err),
        None => Ok(result),
    }
}
