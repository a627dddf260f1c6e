//! netCDF conventions: which names are valid, which element types can be stored in attributes,
//! and how to coerce the ones that almost can.

use std::fmt::Display;

use crate::{
    dtype::{AnyArray, DType},
    errors::{Error, Result},
};

pub const NC_BYTE: i32 = 1;
pub const NC_CHAR: i32 = 2;
pub const NC_SHORT: i32 = 3;
pub const NC_INT: i32 = 4;
pub const NC_FLOAT: i32 = 5;
pub const NC_DOUBLE: i32 = 6;

/// Element types which can be written as netCDF-3 attributes, with their on disk type codes.
pub const TYPEMAP: [(&str, i32); 6] = [
    ("int8", NC_BYTE),
    ("uint8", NC_CHAR),
    ("int16", NC_SHORT),
    ("int32", NC_INT),
    ("float32", NC_FLOAT),
    ("float64", NC_DOUBLE),
];

const RESERVED_NAMES: [&str; 13] = [
    "byte", "char", "short", "ushort", "int", "uint", "int64", "uint64", "float", "real",
    "double", "bool", "string",
];

const SPECIAL_CHARS: &str = "_.@+- !\"#$%&\\()*,:;<=>?[]^`{|}~";

/// Look up the netCDF type code for an element type.
pub fn nc_type(dtype: DType) -> Option<i32> {
    TYPEMAP
        .iter()
        .find(|(name, _)| *name == dtype.name())
        .map(|(_, code)| *code)
}

fn is_alnum_mutf8(c: char) -> bool {
    c.is_alphanumeric() || c.len_utf8() > 1
}

/// Test whether a string is a valid netCDF dimension, variable or attribute name.
///
/// The first character must be alphanumeric, a multi-byte UTF-8 character, or '_' (reserved for
/// special names such as "_FillValue"). Subsequent characters may also include printing special
/// characters, except for '/' which is not allowed in names. Names with trailing spaces and the
/// names of netCDF types are not permitted.
///
pub fn is_valid_name(name: &str) -> bool {
    let first = match name.chars().next() {
        Some(c) => c,
        None => return false,
    };

    !RESERVED_NAMES.contains(&name)
        && !name.contains('/')
        && !name.ends_with(' ')
        && (is_alnum_mutf8(first) || first == '_')
        && name
            .chars()
            .all(|c| is_alnum_mutf8(c) || SPECIAL_CHARS.contains(c))
}

/// Coerce an array to a type that netCDF-3 can store.
///
/// netCDF-3 can't handle 64 bit integers, but they are the default integer type in a lot of
/// places, so int64 arrays are narrowed to int32 if that can be done without changing any values.
/// Booleans are stored as int8. Everything else is returned unchanged, whether or not it is
/// supported, so the caller still has to check the result against `TYPEMAP`.
///
pub fn coerce_type(array: AnyArray) -> Result<AnyArray> {
    match array {
        AnyArray::Bool(array) => Ok(AnyArray::Int8(array.mapv(i8::from))),
        AnyArray::Int64(array) => {
            if array
                .iter()
                .any(|&n| n < i32::MIN as i64 || n > i32::MAX as i64)
            {
                return Err(Error::InvalidAttributeValue(
                    "array contains integer values that are not representable as 32-bit signed \
                     integers"
                        .to_string(),
                ));
            }
            Ok(AnyArray::Int32(array.mapv(|n| n as i32)))
        }
        array => Ok(array),
    }
}

/// Format a value so that it is exactly `numchars` characters long, padding with trailing spaces
/// or truncating with an ellipsis as necessary.
pub fn pretty_print<D: Display + ?Sized>(value: &D, numchars: usize) -> String {
    let s = value.to_string();
    let s = s.trim_end_matches('\n');
    let len = s.chars().count();
    if len > numchars {
        let keep = numchars.saturating_sub(3);
        let truncated: String = s.chars().take(keep).collect();
        format!("{truncated}...")
    } else {
        format!("{s}{}", " ".repeat(numchars - len))
    }
}
