use std::sync::Arc;

use ndarray::ArrayD;
use parking_lot::RwLock;

use crate::{
    dtype::{DType, Element},
    errors::{Error, Result},
    indexing::{self, Indexer, Selection, Selector},
};

/// A lazy source of data for a `Variable`, such as a variable in a file that hasn't been read
/// yet.
///
/// A store only has to report its shape and be able to read a region of itself. Nothing is read
/// until a variable backed by the store needs its values, at which point only the region the
/// variable can see is read, exactly once.
///
pub trait BackingStore<T>: Send + Sync
where
    T: Element,
{
    /// Shape of the full data set
    fn shape(&self) -> Vec<usize>;

    /// Read a region of the data. There is one selector for each axis of the data set.
    fn read(&self, selection: &[Selector]) -> Result<ArrayD<T>>;

    fn dtype(&self) -> DType {
        T::DTYPE
    }

    fn size(&self) -> usize {
        self.shape().iter().product()
    }

    fn ndim(&self) -> usize {
        self.shape().len()
    }
}

/// An in-memory array can serve as its own backing store.
impl<T> BackingStore<T> for ArrayD<T>
where
    T: Element,
{
    fn shape(&self) -> Vec<usize> {
        ArrayD::shape(self).to_vec()
    }

    fn read(&self, selection: &[Selector]) -> Result<ArrayD<T>> {
        indexing::select(self.view(), selection)
    }
}

/// A concrete in-memory buffer, shared between a variable and its views.
pub(crate) type Buffer<T> = Arc<RwLock<ArrayD<T>>>;

/// Where a variable's values live.
pub(crate) enum Storage<T>
where
    T: Element,
{
    /// Not read yet
    Unmaterialized(Arc<dyn BackingStore<T>>),

    /// Loaded into memory
    Materialized(Buffer<T>),
}

impl<T> Clone for Storage<T>
where
    T: Element,
{
    fn clone(&self) -> Self {
        match self {
            Self::Unmaterialized(store) => Self::Unmaterialized(Arc::clone(store)),
            Self::Materialized(buffer) => Self::Materialized(Arc::clone(buffer)),
        }
    }
}

/// A variable's storage along with the region of it that the variable can see.
///
/// A slot moves from ``Unmaterialized`` to ``Materialized`` the first time its values are needed
/// and never moves back. Materializing reads only the visible region, after which the slot sees
/// the whole of its new buffer. Views taken of a lazy variable before it is materialized share
/// the store, not the buffer, and are materialized independently.
///
#[derive(Clone)]
pub(crate) struct Slot<T>
where
    T: Element,
{
    storage: Storage<T>,
    selection: Selection,
}

impl<T> Slot<T>
where
    T: Element,
{
    pub(crate) fn from_array(array: ArrayD<T>) -> Self {
        let selection = Selection::full(array.shape());

        Self {
            storage: Storage::Materialized(Arc::new(RwLock::new(array))),
            selection,
        }
    }

    pub(crate) fn from_store(store: Arc<dyn BackingStore<T>>) -> Self {
        let selection = Selection::full(&store.shape());

        Self {
            storage: Storage::Unmaterialized(store),
            selection,
        }
    }

    /// Shape of the visible data
    pub(crate) fn shape(&self) -> Vec<usize> {
        self.selection.shape()
    }

    pub(crate) fn is_materialized(&self) -> bool {
        matches!(self.storage, Storage::Materialized(_))
    }

    /// Load the visible region into memory, if that hasn't happened yet, and return the buffer
    /// along with the region of it that is visible.
    pub(crate) fn materialize(&mut self) -> Result<(Buffer<T>, Selection)> {
        let store = match &self.storage {
            Storage::Materialized(buffer) => {
                return Ok((Arc::clone(buffer), self.selection.clone()));
            }
            Storage::Unmaterialized(store) => Arc::clone(store),
        };

        log::debug!(
            "materializing {} region {:?} of backing store with shape {:?}",
            store.dtype(),
            self.selection.shape(),
            store.shape()
        );
        let array = store.read(&self.selection)?;
        let expected = self.selection.shape();
        if array.shape() != expected.as_slice() {
            return Err(Error::Backend(format!(
                "backing store returned an array with shape {:?} when {expected:?} was requested",
                array.shape()
            )));
        }

        let selection = Selection::full(array.shape());
        let buffer = Arc::new(RwLock::new(array));
        self.storage = Storage::Materialized(Arc::clone(&buffer));
        self.selection = selection.clone();

        Ok((buffer, selection))
    }

    /// A slot looking at a sub-region of this one's storage. ``key`` must have one entry per
    /// visible dimension.
    pub(crate) fn view(&self, key: &[Indexer]) -> Result<Self> {
        Ok(Self {
            storage: self.storage.clone(),
            selection: self.selection.compose(key)?,
        })
    }

    /// A slot looking at position ``n`` of the first visible dimension, which must be in bounds.
    pub(crate) fn select_first(&self, n: usize) -> Self {
        Self {
            storage: self.storage.clone(),
            selection: self.selection.select_first(n),
        }
    }

    /// Whether two slots share a materialized buffer.
    #[cfg(test)]
    pub(crate) fn shares_buffer(&self, other: &Self) -> bool {
        match (&self.storage, &other.storage) {
            (Storage::Materialized(a), Storage::Materialized(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
