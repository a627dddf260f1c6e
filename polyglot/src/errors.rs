use std::io;
use std::result;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Number of dimensions doesn't agree with the rank of the data, or replacement data doesn't
    /// have the shape of the data it replaces.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("not a valid attribute name: {0:?}")]
    InvalidName(String),

    #[error("not a valid value for a netCDF attribute: {0}")]
    InvalidAttributeValue(String),

    /// Operands can't be aligned by dimension name, or an in-place operation would have changed
    /// the dimensions of its left operand.
    #[error("dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("the truth value of a variable with {size} elements is ambiguous")]
    AmbiguousTruthValue { size: usize },

    #[error("index error: {0}")]
    Index(String),

    #[error("operands could not be broadcast together with shapes {0:?} {1:?}")]
    Broadcast(Vec<usize>, Vec<usize>),

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// A backing store failed to produce data.
    #[error("backing store error: {0}")]
    Backend(String),

    #[error(transparent)]
    IO(#[from] io::Error),
}

pub type Result<T> = result::Result<T, Error>;
