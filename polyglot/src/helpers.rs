//! Generic numeric helpers shared by the per-type element kernels in `dtype`.
//!
//! Integer arithmetic follows numpy: results wrap on overflow rather than panicking, but division
//! by zero is reported as an error since there is no sensible value to return.

use num_traits::{CheckedRem, Float, PrimInt, WrappingMul};

use crate::errors::{Error, Result};

fn zero_division() -> Error {
    Error::Arithmetic("integer division or modulo by zero".to_string())
}

/// Integer division truncating toward zero, like Rust's `/`.
pub(crate) fn div_int<I>(a: I, b: I) -> Result<I>
where
    I: PrimInt,
{
    if b.is_zero() {
        return Err(zero_division());
    }

    // Only MIN / -1 overflows, which wraps back around to MIN
    Ok(a.checked_div(&b).unwrap_or(a))
}

/// Integer division rounding toward negative infinity.
pub(crate) fn floor_div_int<I>(a: I, b: I) -> Result<I>
where
    I: PrimInt + CheckedRem,
{
    let quotient = div_int(a, b)?;
    let remainder = a.checked_rem(&b).unwrap_or_else(I::zero);
    if !remainder.is_zero() && ((remainder < I::zero()) != (b < I::zero())) {
        Ok(quotient - I::one())
    } else {
        Ok(quotient)
    }
}

/// Integer remainder taking the sign of the divisor.
pub(crate) fn modulo_int<I>(a: I, b: I) -> Result<I>
where
    I: PrimInt + CheckedRem,
{
    if b.is_zero() {
        return Err(zero_division());
    }

    let remainder = a.checked_rem(&b).unwrap_or_else(I::zero);
    if !remainder.is_zero() && ((remainder < I::zero()) != (b < I::zero())) {
        Ok(remainder + b)
    } else {
        Ok(remainder)
    }
}

/// Integer exponentiation by squaring, wrapping on overflow.
pub(crate) fn pow_int<I>(base: I, exponent: I) -> Result<I>
where
    I: PrimInt + WrappingMul,
{
    let mut exponent = match exponent.to_u64() {
        Some(exponent) => exponent,
        None => {
            return Err(Error::Arithmetic(
                "integers to negative integer powers are not allowed".to_string(),
            ));
        }
    };

    let mut base = base;
    let mut result = I::one();
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result.wrapping_mul(&base);
        }
        exponent >>= 1;
        if exponent > 0 {
            base = base.wrapping_mul(&base);
        }
    }

    Ok(result)
}

pub(crate) fn floor_div_float<F: Float>(a: F, b: F) -> F {
    (a / b).floor()
}

/// Floating point remainder taking the sign of the divisor.
pub(crate) fn modulo_float<F: Float>(a: F, b: F) -> F {
    let remainder = a % b;
    if remainder != F::zero() && ((remainder < F::zero()) != (b < F::zero())) {
        remainder + b
    } else {
        remainder
    }
}
