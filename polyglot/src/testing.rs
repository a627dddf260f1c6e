use std::{
    cell::RefCell,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Once,
    },
};

use log::{Level, LevelFilter, Metadata, Record};
use ndarray::{Array, ArrayD, Dimension};
use parking_lot::Mutex;

use crate::{
    attributes::Attributes,
    backing::BackingStore,
    dtype::Element,
    errors::Result,
    indexing::{self, Selector},
    variable::Variable,
};

/// Dimension names as owned strings
pub(crate) fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// A variable with no attributes
pub(crate) fn labeled<T, D>(dimensions: &[&str], data: Array<T, D>) -> Variable<T>
where
    T: Element,
    D: Dimension,
{
    Variable::new(dimensions.iter().copied(), data, Attributes::new()).unwrap()
}

/// An in-memory backing store that counts how many times it is read.
pub(crate) struct CountingStore<T>
where
    T: Element,
{
    data: ArrayD<T>,
    reads: AtomicUsize,
    last_read: Mutex<Option<Vec<usize>>>,
}

impl<T> CountingStore<T>
where
    T: Element,
{
    pub(crate) fn new(data: ArrayD<T>) -> Self {
        Self {
            data,
            reads: AtomicUsize::new(0),
            last_read: Mutex::new(None),
        }
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Shape of the region returned by the most recent read
    pub(crate) fn last_read_shape(&self) -> Option<Vec<usize>> {
        self.last_read.lock().clone()
    }
}

impl<T> BackingStore<T> for CountingStore<T>
where
    T: Element,
{
    fn shape(&self) -> Vec<usize> {
        self.data.shape().to_vec()
    }

    fn read(&self, selection: &[Selector]) -> Result<ArrayD<T>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let region = indexing::select(self.data.view(), selection)?;
        *self.last_read.lock() = Some(region.shape().to_vec());

        Ok(region)
    }
}

thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// A logger that records messages in a buffer local to the thread that logged them, so tests
/// running in parallel don't see each other's messages.
struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let message = record.args().to_string();
        CAPTURED.with(|captured| captured.borrow_mut().push((record.level(), message)));
    }

    fn flush(&self) {}
}

static INSTALL: Once = Once::new();

/// Run ``f``, returning its result along with every message logged on this thread while it ran.
pub(crate) fn capture_logs<F, R>(f: F) -> (R, Vec<(Level, String)>)
where
    F: FnOnce() -> R,
{
    INSTALL.call_once(|| {
        if log::set_boxed_logger(Box::new(CaptureLogger)).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });

    CAPTURED.with(|captured| captured.borrow_mut().clear());
    let result = f();
    let records = CAPTURED.with(|captured| captured.take());

    (result, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_capture_logs() {
        let (answer, records) = capture_logs(|| {
            log::info!("hello");
            log::debug!("world");
            42
        });
        assert_eq!(answer, 42);
        assert_eq!(
            records,
            vec![
                (Level::Info, "hello".to_string()),
                (Level::Debug, "world".to_string())
            ]
        );

        let (_, records) = capture_logs(|| ());
        assert!(records.is_empty());
    }

    #[test]
    fn test_counting_store() {
        let store = CountingStore::new(arr1(&[1, 2, 3]).into_dyn());
        assert_eq!(store.reads(), 0);
        assert_eq!(store.last_read_shape(), None);

        let region = store.read(&[Selector::Index(1)]).unwrap();
        assert_eq!(region.ndim(), 0);
        assert_eq!(store.reads(), 1);
        assert_eq!(store.last_read_shape(), Some(vec![]));
    }
}
