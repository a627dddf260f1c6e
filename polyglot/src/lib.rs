//! Labeled, N-dimensional arrays with netCDF attributes.

mod alignment;
mod attributes;
mod backing;
pub mod conventions;
mod dtype;
mod errors;
mod helpers;
pub mod indexing;
mod ops;
mod variable;

#[cfg(test)]
mod testing;

pub use alignment::broadcast_shapes;
pub use alignment::broadcast_var_data;
pub use alignment::Operand;
pub use attributes::safe_merge;
pub use attributes::AttributeInput;
pub use attributes::AttributeValue;
pub use attributes::Attributes;
pub use backing::BackingStore;
pub use dtype::{AnyArray, Bitwise, DType, Element, Numeric, Real};
pub use errors::{Error, Result};
pub use indexing::{expanded_indexer, Indexer, Selection, Selector, Slice};
pub use ops::OperatorKind;
pub use ops::OPERATORS;
pub use variable::Iter;
pub use variable::Variable;
pub use variable::VariableData;
