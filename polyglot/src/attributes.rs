use std::fmt::{self, Display};
use std::mem;

use indexmap::{IndexMap, IndexSet};
use ndarray::{arr0, Array, Array1, Dimension, Ix1};

use crate::{
    conventions::{coerce_type, is_valid_name, nc_type},
    dtype::{AnyArray, Element},
    errors::{Error, Result},
};

/// A validated attribute value.
///
/// Numeric values are always vectors, even when set from a scalar, and are restricted to the
/// element types netCDF-3 can store.
#[derive(Clone, Debug)]
pub enum AttributeValue {
    Text(String),
    Int8(Array1<i8>),
    UInt8(Array1<u8>),
    Int16(Array1<i16>),
    Int32(Array1<i32>),
    Float32(Array1<f32>),
    Float64(Array1<f64>),
}

macro_rules! vector_bytes {
    ($values:expr) => {
        $values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    };
}

impl AttributeValue {
    /// Number of elements, or number of characters for text.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.chars().count(),
            Self::Int8(values) => values.len(),
            Self::UInt8(values) => values.len(),
            Self::Int16(values) => values.len(),
            Self::Int32(values) => values.len(),
            Self::Float32(values) => values.len(),
            Self::Float64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Raw, native-endian bytes of the value.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.as_bytes().to_vec(),
            Self::Int8(values) => vector_bytes!(values),
            Self::UInt8(values) => values.to_vec(),
            Self::Int16(values) => vector_bytes!(values),
            Self::Int32(values) => vector_bytes!(values),
            Self::Float32(values) => vector_bytes!(values),
            Self::Float64(values) => vector_bytes!(values),
        }
    }

    fn from_array(array: AnyArray) -> Result<Self> {
        let array = coerce_type(array.at_least_1d())?;
        if array.ndim() > 1 {
            return Err(Error::InvalidAttributeValue(format!(
                "netCDF attributes must be scalars or vectors, got {} dimensions",
                array.ndim()
            )));
        }
        if nc_type(array.dtype()).is_none() {
            return Err(Error::InvalidAttributeValue(format!(
                "{} is not a netCDF-3 type",
                array.dtype()
            )));
        }

        let value = match array {
            AnyArray::Int8(values) => Self::Int8(vector(values)?),
            AnyArray::UInt8(values) => Self::UInt8(vector(values)?),
            AnyArray::Int16(values) => Self::Int16(vector(values)?),
            AnyArray::Int32(values) => Self::Int32(vector(values)?),
            AnyArray::Float32(values) => Self::Float32(vector(values)?),
            AnyArray::Float64(values) => Self::Float64(vector(values)?),
            array => {
                return Err(Error::InvalidAttributeValue(format!(
                    "{} is not a netCDF-3 type",
                    array.dtype()
                )))
            }
        };

        Ok(value)
    }
}

fn vector<T>(values: ndarray::ArrayD<T>) -> Result<Array1<T>> {
    values
        .into_dimensionality::<Ix1>()
        .map_err(|err| Error::InvalidAttributeValue(err.to_string()))
}

/// Values compare equal when they are the same kind of value with the same raw bytes, so `NaN`
/// equals itself and `0.0` does not equal `-0.0`.
impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (a, b) => mem::discriminant(a) == mem::discriminant(b) && a.bytes() == b.bytes(),
        }
    }
}

fn write_values<T: Display>(f: &mut fmt::Formatter<'_>, values: &Array1<T>) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{value}")?;
    }

    Ok(())
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Int8(values) => write_values(f, values),
            Self::UInt8(values) => write_values(f, values),
            Self::Int16(values) => write_values(f, values),
            Self::Int32(values) => write_values(f, values),
            Self::Float32(values) => write_values(f, values),
            Self::Float64(values) => write_values(f, values),
        }
    }
}

/// Anything that can be offered as an attribute value, before validation.
#[derive(Clone, Debug)]
pub enum AttributeInput {
    Text(String),
    Array(AnyArray),
    Value(AttributeValue),
}

impl From<&str> for AttributeInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for AttributeInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<AttributeValue> for AttributeInput {
    fn from(value: AttributeValue) -> Self {
        Self::Value(value)
    }
}

impl From<&AttributeValue> for AttributeInput {
    fn from(value: &AttributeValue) -> Self {
        Self::Value(value.clone())
    }
}

impl<T: Element> From<Vec<T>> for AttributeInput {
    fn from(values: Vec<T>) -> Self {
        Self::Array(AnyArray::from(Array1::from(values)))
    }
}

impl<T: Element> From<&[T]> for AttributeInput {
    fn from(values: &[T]) -> Self {
        Self::Array(AnyArray::from(Array1::from(values.to_vec())))
    }
}

impl<T: Element, D: Dimension> From<Array<T, D>> for AttributeInput {
    fn from(values: Array<T, D>) -> Self {
        Self::Array(AnyArray::from(values))
    }
}

macro_rules! scalar_input {
    ($($type:ty),*) => {
        $(
            impl From<$type> for AttributeInput {
                fn from(value: $type) -> Self {
                    Self::Array(AnyArray::from(arr0(value)))
                }
            }
        )*
    };
}

scalar_input!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// An ordered collection of attributes whose names and values are valid for netCDF.
///
/// Insertion order is preserved and overwriting an attribute keeps its original position.
#[derive(Clone, Debug, Default)]
pub struct Attributes {
    entries: IndexMap<String, AttributeValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from name/value pairs, validating each one.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeInput>,
    {
        let mut attributes = Self::new();
        for (name, value) in pairs {
            attributes.set(name, value)?;
        }

        Ok(attributes)
    }

    /// Set an attribute, validating its name and coercing its value to a netCDF type.
    pub fn set<K, V>(&mut self, name: K, value: V) -> Result<()>
    where
        K: Into<String>,
        V: Into<AttributeInput>,
    {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(Error::InvalidName(name));
        }

        let value = match value.into() {
            AttributeInput::Text(text) => AttributeValue::Text(text),
            AttributeInput::Value(value) => value,
            AttributeInput::Array(array) => AttributeValue::from_array(array)?,
        };

        self.entries.insert(name, value);

        Ok(())
    }

    /// Set several attributes at once. Either all of them are set or, if any is invalid, none
    /// are and the collection is left exactly as it was.
    pub fn update<I, K, V>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeInput>,
    {
        let snapshot = self.entries.clone();
        for (name, value) in pairs {
            if let Err(err) = self.set(name, value) {
                self.entries = snapshot;
                return Err(err);
            }
        }

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.entries.shift_remove(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Two collections are equal when they have the same names with equal values, in any order.
impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, value)| other.get(name) == Some(value))
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a str, &'a AttributeValue);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Combine several collections of attributes.
///
/// Names are kept in the order they are first seen. A name whose values disagree between
/// collections is dropped from the result, and stays dropped even if a later collection agrees
/// with one of the earlier values.
pub fn safe_merge<'a, I>(stores: I) -> Attributes
where
    I: IntoIterator<Item = &'a Attributes>,
{
    let mut merged = Attributes::new();
    let mut dropped: IndexSet<&'a str> = IndexSet::new();

    for store in stores {
        for (name, value) in store {
            if dropped.contains(&name) {
                continue;
            }
            let conflict = merged.get(name).map(|existing| existing != value);
            match conflict {
                Some(true) => {
                    log::debug!("dropping conflicting attribute {name:?} while merging");
                    merged.remove(name);
                    dropped.insert(name);
                }
                Some(false) => {}
                None => {
                    merged.entries.insert(name.to_string(), value.clone());
                }
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};
    use paste::paste;

    macro_rules! accepted_type_tests {
        ($type:ident, $variant:ident, $value:expr) => {
            paste! {
                #[test]
                fn [<test_set_scalar_ $type>]() {
                    let mut attrs = Attributes::new();
                    attrs.set("value", $value as $type).unwrap();
                    assert_eq!(
                        attrs.get("value"),
                        Some(&AttributeValue::$variant(arr1(&[$value as $type])))
                    );
                }

                #[test]
                fn [<test_set_vector_ $type>]() {
                    let mut attrs = Attributes::new();
                    attrs.set("value", vec![$value as $type, 0 as $type]).unwrap();
                    assert_eq!(attrs.get("value").unwrap().len(), 2);
                }
            }
        };
    }

    accepted_type_tests!(i8, Int8, 3);
    accepted_type_tests!(u8, UInt8, 3);
    accepted_type_tests!(i16, Int16, -3);
    accepted_type_tests!(i32, Int32, 70000);
    accepted_type_tests!(f32, Float32, 1.5);
    accepted_type_tests!(f64, Float64, -2.25);

    #[test]
    fn test_set_text() {
        let mut attrs = Attributes::new();
        attrs.set("units", "meters").unwrap();
        attrs.set("long_name", String::from("height above ground")).unwrap();
        assert_eq!(attrs.get("units").unwrap().as_text(), Some("meters"));
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_set_coerces() {
        let mut attrs = Attributes::new();
        attrs.set("flag", true).unwrap();
        assert_eq!(attrs.get("flag"), Some(&AttributeValue::Int8(arr1(&[1]))));

        attrs.set("count", vec![1_i64, -2, 3]).unwrap();
        assert_eq!(attrs.get("count"), Some(&AttributeValue::Int32(arr1(&[1, -2, 3]))));
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut attrs = Attributes::new();
        assert!(matches!(
            attrs.set("big", 1_i64 << 40),
            Err(Error::InvalidAttributeValue(_))
        ));
        assert!(matches!(
            attrs.set("unsigned", 1_u16),
            Err(Error::InvalidAttributeValue(_))
        ));
        assert!(matches!(
            attrs.set("wide", 1_u64),
            Err(Error::InvalidAttributeValue(_))
        ));
        assert!(matches!(
            attrs.set("matrix", arr2(&[[1.0, 2.0], [3.0, 4.0]])),
            Err(Error::InvalidAttributeValue(_))
        ));
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_set_rejects_bad_names() {
        let mut attrs = Attributes::new();
        assert!(matches!(attrs.set("a/b", 1), Err(Error::InvalidName(_))));
        assert!(matches!(attrs.set("", 1), Err(Error::InvalidName(_))));
        assert!(matches!(attrs.set("double", 1), Err(Error::InvalidName(_))));
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut attrs = Attributes::from_pairs([("a", 1), ("b", 2), ("c", 3)]).unwrap();
        attrs.set("b", "two").unwrap();
        assert_eq!(attrs.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(attrs.get("b").unwrap().as_text(), Some("two"));
    }

    #[test]
    fn test_remove() {
        let mut attrs = Attributes::from_pairs([("a", 1.0), ("b", 2.0), ("c", 3.0)]).unwrap();
        assert!(attrs.remove("a").is_some());
        assert!(attrs.remove("a").is_none());
        assert!(!attrs.contains_key("a"));
        assert!(attrs.contains_key("b"));

        // Removing keeps the order of what is left
        attrs.set("d", 4.0).unwrap();
        attrs.remove("c");
        assert_eq!(attrs.keys().collect::<Vec<_>>(), vec!["b", "d"]);
    }

    #[test]
    fn test_update_is_atomic() {
        let mut attrs = Attributes::from_pairs([("units", "m")]).unwrap();
        let before = attrs.clone();

        let result = attrs.update(vec![
            ("units", AttributeInput::from("km")),
            ("scale", AttributeInput::from(2.0)),
            ("bad/name", AttributeInput::from(1)),
        ]);

        assert!(matches!(result, Err(Error::InvalidName(_))));
        assert_eq!(attrs, before);
        assert_eq!(attrs.get("units").unwrap().as_text(), Some("m"));
        assert!(!attrs.contains_key("scale"));

        let mut attrs = Attributes::from_pairs([("a", 1), ("b", 2)]).unwrap();
        let result = attrs.update(vec![
            ("c", AttributeInput::from(3)),
            ("a", AttributeInput::from(vec![1_u16])),
        ]);
        assert!(matches!(result, Err(Error::InvalidAttributeValue(_))));
        assert_eq!(attrs.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_update() {
        let mut attrs = Attributes::new();
        attrs
            .update(vec![
                ("units", AttributeInput::from("m")),
                ("valid_range", AttributeInput::from(vec![0.0_f32, 10.0])),
            ])
            .unwrap();
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_equality_compares_bytes() {
        let a = Attributes::from_pairs([("x", f64::NAN)]).unwrap();
        let b = Attributes::from_pairs([("x", f64::NAN)]).unwrap();
        assert_eq!(a, b);

        let a = Attributes::from_pairs([("x", 0.0)]).unwrap();
        let b = Attributes::from_pairs([("x", -0.0)]).unwrap();
        assert_ne!(a, b);

        // Same bytes, different types
        let a = Attributes::from_pairs([("x", 1_i8)]).unwrap();
        let b = Attributes::from_pairs([("x", 1_u8)]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = Attributes::from_pairs([("x", 1), ("y", 2)]).unwrap();
        let b = Attributes::from_pairs([("y", 2), ("x", 1)]).unwrap();
        assert_eq!(a, b);

        let c = Attributes::from_pairs([("x", 1)]).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_safe_merge() {
        let a = Attributes::from_pairs([
            ("units", AttributeInput::from("m")),
            ("scale", AttributeInput::from(1.0)),
        ])
        .unwrap();
        let b = Attributes::from_pairs([
            ("units", AttributeInput::from("km")),
            ("scale", AttributeInput::from(1.0)),
            ("source", AttributeInput::from("model")),
        ])
        .unwrap();
        let c = Attributes::from_pairs([("units", "m")]).unwrap();

        let merged = safe_merge([&a, &b, &c]);
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["scale", "source"]);
    }

    #[test]
    fn test_safe_merge_empty() {
        let merged = safe_merge(std::iter::empty());
        assert!(merged.is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(AttributeValue::Text("m".to_string()).to_string(), "\"m\"");
        assert_eq!(AttributeValue::Int16(arr1(&[1, 2, 3])).to_string(), "1, 2, 3");
    }
}
