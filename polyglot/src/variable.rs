use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use ndarray::{Array, Array1, ArrayBase, ArrayD, ArrayViewD, Axis, Data, Dimension, Zip};
use parking_lot::Mutex;

use crate::{
    attributes::Attributes,
    backing::{BackingStore, Buffer, Slot},
    conventions::pretty_print,
    dtype::{DType, Element},
    errors::{Error, Result},
    indexing::{self, expanded_indexer, Indexer, Selection, Slice},
};

/// Data a `Variable` can be constructed from.
pub enum VariableData<T>
where
    T: Element,
{
    /// An in-memory array
    Array(ArrayD<T>),

    /// A lazy store that is only read when the values are needed
    Backing(Arc<dyn BackingStore<T>>),

    /// A flat sequence of values with no shape, which becomes a vector
    Sequence(Vec<T>),
}

impl<T, D> From<Array<T, D>> for VariableData<T>
where
    T: Element,
    D: Dimension,
{
    fn from(array: Array<T, D>) -> Self {
        Self::Array(array.into_dyn())
    }
}

impl<T> From<Vec<T>> for VariableData<T>
where
    T: Element,
{
    fn from(values: Vec<T>) -> Self {
        Self::Sequence(values)
    }
}

impl<T, S> From<Arc<S>> for VariableData<T>
where
    T: Element,
    S: BackingStore<T> + 'static,
{
    fn from(store: Arc<S>) -> Self {
        Self::Backing(store)
    }
}

/// A labeled, N-dimensional array with attributes, modeled on a netCDF variable.
///
/// A variable pairs an array of values with a name for each of its dimensions and a set of
/// netCDF attributes. Dimension names drive broadcasting in binary operations: axes with the same
/// name are lined up, whatever their position.
///
/// Indexing a variable with ``item`` produces a view that shares the original variable's buffer,
/// so values written through the view with ``item_set`` or an in-place operator are visible
/// through the original, and vice versa. ``set_data`` replaces the buffer instead, detaching the
/// variable from any views.
///
/// A variable can be backed by a lazy [`BackingStore`], in which case nothing is read until its
/// values are needed. The store is read at most once per variable.
///
pub struct Variable<T>
where
    T: Element,
{
    dimensions: Vec<String>,

    /// Shape of the visible data, which never changes
    shape: Vec<usize>,

    slot: Mutex<Slot<T>>,

    attributes: Attributes,
}

impl<T> Variable<T>
where
    T: Element,
{
    /// Create a new variable.
    ///
    /// There must be exactly one dimension name for each dimension of ``data``.
    ///
    pub fn new<I, S, V>(dimensions: I, data: V, attributes: Attributes) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        V: Into<VariableData<T>>,
    {
        let dimensions: Vec<String> = dimensions.into_iter().map(Into::into).collect();
        let slot = match data.into() {
            VariableData::Array(array) => Slot::from_array(array),
            VariableData::Backing(store) => Slot::from_store(store),
            VariableData::Sequence(values) => {
                log::warn!(
                    "converting data to an ndarray because it lacks shape information; pass an \
                     ndarray or a backing store to avoid copying"
                );
                Slot::from_array(Array1::from(values).into_dyn())
            }
        };

        let shape = slot.shape();
        if dimensions.len() != shape.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} dimension names {dimensions:?} for data with shape {shape:?}",
                dimensions.len()
            )));
        }

        Ok(Self::from_parts(dimensions, slot, attributes))
    }

    fn from_parts(dimensions: Vec<String>, slot: Slot<T>, attributes: Attributes) -> Self {
        Self {
            dimensions,
            shape: slot.shape(),
            slot: Mutex::new(slot),
            attributes,
        }
    }

    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Length of the first dimension, or 0 for a 0-dimensional variable.
    pub fn len(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Whether the values have been loaded into memory.
    pub fn is_materialized(&self) -> bool {
        self.slot.lock().is_materialized()
    }

    /// Materialize, if necessary, and return the buffer along with the visible region of it.
    ///
    /// The slot stays locked while a backing store is read, so concurrent callers wait for a
    /// single read rather than each performing their own.
    ///
    fn materialize(&self) -> Result<(Buffer<T>, Selection)> {
        self.slot.lock().materialize()
    }

    /// A copy of the variable's values, read from its backing store if necessary.
    pub fn data(&self) -> Result<ArrayD<T>> {
        let (buffer, selection) = self.materialize()?;
        let array = buffer.read();
        if selection.is_full(array.shape()) {
            return Ok(array.clone());
        }

        indexing::select(array.view(), &selection)
    }

    /// Call ``f`` with a view of the variable's values, read from its backing store if
    /// necessary, without copying them.
    pub fn with_data<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(ArrayViewD<T>) -> R,
    {
        let (buffer, selection) = self.materialize()?;
        let array = buffer.read();

        Ok(f(indexing::select_view(array.view(), &selection)))
    }

    /// Replace the variable's values. The new values must have the same shape as the old ones.
    ///
    /// The variable gets a new buffer, so views previously taken from it no longer share its
    /// values.
    ///
    pub fn set_data<D>(&mut self, data: Array<T, D>) -> Result<()>
    where
        D: Dimension,
    {
        if data.shape() != self.shape.as_slice() {
            return Err(Error::ShapeMismatch(format!(
                "replacement data has shape {:?} but the variable has shape {:?}",
                data.shape(),
                self.shape
            )));
        }

        *self.slot.get_mut() = Slot::from_array(data.into_dyn());

        Ok(())
    }

    /// Index the variable, returning a view that shares its buffer.
    ///
    /// ``key`` may have fewer entries than the variable has dimensions, in which case it is
    /// padded with full slices, and may contain an ellipsis. Dimensions indexed with an integer
    /// are dropped from the result. Attributes are copied.
    ///
    pub fn item(&self, key: &[Indexer]) -> Result<Self> {
        let key = expanded_indexer(key, self.ndim())?;
        let dimensions = self
            .dimensions
            .iter()
            .zip(&key)
            .filter(|(_, indexer)| !matches!(indexer, Indexer::Index(_)))
            .map(|(name, _)| name.clone())
            .collect();
        let slot = self.slot.lock().view(&key)?;

        Ok(Self::from_parts(dimensions, slot, self.attributes.clone()))
    }

    /// Write values into the region of the variable selected by ``key``.
    ///
    /// ``value`` is broadcast to the shape of the region. The write goes to the shared buffer, so
    /// it is visible through every view of the region.
    ///
    pub fn item_set<S, D>(&mut self, key: &[Indexer], value: &ArrayBase<S, D>) -> Result<()>
    where
        S: Data<Elem = T>,
        D: Dimension,
    {
        let key = expanded_indexer(key, self.ndim())?;
        let (buffer, selection) = self.materialize()?;
        let region = selection.compose(&key)?;
        let shape = region.shape();
        let value = value
            .broadcast(shape.clone())
            .ok_or_else(|| Error::Broadcast(value.shape().to_vec(), shape))?;

        let mut array = buffer.write();
        indexing::select_mut(array.view_mut(), &region).assign(&value);

        Ok(())
    }

    /// Overwrite the whole of the variable's visible region with ``values``, which must have the
    /// variable's shape.
    pub(crate) fn write_data(&mut self, values: &ArrayD<T>) -> Result<()> {
        if values.shape() != self.shape.as_slice() {
            return Err(Error::ShapeMismatch(format!(
                "result has shape {:?} but the variable has shape {:?}",
                values.shape(),
                self.shape
            )));
        }

        let (buffer, selection) = self.materialize()?;
        let mut array = buffer.write();
        indexing::select_mut(array.view_mut(), &selection).assign(values);

        Ok(())
    }

    /// Position ``n`` of the first dimension. ``n`` must be in bounds.
    fn row(&self, n: usize) -> Self {
        let slot = self.slot.lock().select_first(n);

        Self::from_parts(self.dimensions[1..].to_vec(), slot, self.attributes.clone())
    }

    /// Iterate over the first dimension, yielding a view for each position.
    ///
    /// A 0-dimensional variable yields nothing.
    ///
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            variable: self,
            next: 0,
        }
    }

    /// Slice several dimensions at once, by name.
    ///
    /// Every dimension with a name in ``slices`` is sliced, so a repeated dimension name slices
    /// each axis with that name. Names that aren't dimensions of this variable are ignored.
    ///
    pub fn views<I, K>(&self, slices: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Slice)>,
        K: AsRef<str>,
    {
        let mut key = vec![Indexer::full(); self.ndim()];
        for (name, slice) in slices {
            for (indexer, dimension) in key.iter_mut().zip(&self.dimensions) {
                if dimension == name.as_ref() {
                    *indexer = Indexer::Slice(slice);
                }
            }
        }

        self.item(&key)
    }

    /// Slice a single dimension, by name.
    pub fn view<K, S>(&self, slice: S, dimension: K) -> Result<Self>
    where
        K: AsRef<str>,
        S: Into<Slice>,
    {
        self.views([(dimension, slice.into())])
    }

    /// Select positions along a dimension, copying the selected values into a new variable.
    ///
    /// ``indices`` must be one dimensional. Negative indices count from the end. If the
    /// dimension name is repeated, the first dimension with that name is used.
    ///
    pub fn take<S, D>(&self, indices: &ArrayBase<S, D>, dimension: &str) -> Result<Self>
    where
        S: Data<Elem = isize>,
        D: Dimension,
    {
        if indices.ndim() != 1 {
            return Err(Error::InvalidArgument(format!(
                "indices must be one dimensional, got {} dimensions",
                indices.ndim()
            )));
        }
        let axis = self
            .dimensions
            .iter()
            .position(|name| name == dimension)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "{dimension:?} is not one of the dimensions {:?}",
                    self.dimensions
                ))
            })?;

        let len = self.shape[axis];
        let indices = indices
            .iter()
            .map(|&index| indexing::resolve_index(index, len))
            .collect::<Result<Vec<_>>>()?;
        let data = self.with_data(|values| values.select(Axis(axis), &indices))?;

        Variable::new(self.dimensions.clone(), data, self.attributes.clone())
    }

    /// A new variable that shares this one's buffer, with a copy of its attributes. Same as
    /// ``clone``.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// A new variable with its own copy of this one's values and attributes.
    pub fn deep_copy(&self) -> Result<Self> {
        Variable::new(self.dimensions.clone(), self.data()?, self.attributes.clone())
    }

    /// Truth value of a variable with a single element. Any other size is an error.
    pub fn to_bool(&self) -> Result<bool> {
        let size = self.size();
        if size != 1 {
            return Err(Error::AmbiguousTruthValue { size });
        }

        self.with_data(|values| values.iter().any(|value| value.is_nonzero()))
    }

    /// Whether two variables have the same dimensions, attributes and values. ``NaN`` is
    /// considered equal to itself.
    pub fn identical(&self, other: &Self) -> Result<bool> {
        if self.dimensions != other.dimensions
            || self.shape != other.shape
            || self.attributes != other.attributes
        {
            return Ok(false);
        }

        let a = self.data()?;
        let b = other.data()?;
        let is_nan = |value: &T| value.partial_cmp(value).is_none();

        Ok(Zip::from(&a)
            .and(&b)
            .all(|x, y| x == y || (is_nan(x) && is_nan(y))))
    }

    /// Whether two variables share a materialized buffer.
    #[cfg(test)]
    pub(crate) fn shares_buffer(&self, other: &Self) -> bool {
        self.slot.lock().shares_buffer(&other.slot.lock())
    }
}

impl<T> Clone for Variable<T>
where
    T: Element,
{
    fn clone(&self) -> Self {
        Self {
            dimensions: self.dimensions.clone(),
            shape: self.shape.clone(),
            slot: Mutex::new(self.slot.lock().clone()),
            attributes: self.attributes.clone(),
        }
    }
}

impl<T> Debug for Variable<T>
where
    T: Element,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("dimensions", &self.dimensions)
            .field("shape", &self.shape)
            .field("dtype", &T::DTYPE)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// An ncdump-like summary of the variable.
impl<T> Display for Variable<T>
where
    T: Element,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dimensions:")?;
        for (name, len) in self.dimensions.iter().zip(&self.shape) {
            writeln!(f, "\t{} : {}", pretty_print(name, 30), pretty_print(len, 10))?;
        }
        writeln!(f, "\ndtype : {}", pretty_print(&T::DTYPE, 8))?;
        write!(f, "\nattributes:")?;
        for (name, value) in &self.attributes {
            write!(f, "\n\t{}:{}", pretty_print(name, 30), pretty_print(value, 30))?;
        }

        Ok(())
    }
}

/// Iterator over the first dimension of a variable. See [`Variable::iter`].
#[derive(Clone)]
pub struct Iter<'a, T>
where
    T: Element,
{
    variable: &'a Variable<T>,
    next: usize,
}

impl<'a, T> Iterator for Iter<'a, T>
where
    T: Element,
{
    type Item = Variable<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.variable.len() {
            return None;
        }

        let row = self.variable.row(self.next);
        self.next += 1;

        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.variable.len() - self.next.min(self.variable.len());

        (remaining, Some(remaining))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> where T: Element {}

impl<'a, T> IntoIterator for &'a Variable<T>
where
    T: Element,
{
    type Item = Variable<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
