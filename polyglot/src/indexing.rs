//! Index expressions and the resolved selections they produce.
//!
//! A user facing index expression is a list of [`Indexer`]s, which may be shorter than the number
//! of dimensions and may contain an ellipsis. It is first expanded to exactly one entry per
//! dimension by [`expanded_indexer`] and then resolved against a [`Selection`], which records, for
//! every axis of the underlying buffer, either a single fixed position or an evenly stepped range
//! of positions. Selections compose, so a view of a view still addresses the original buffer.

use std::ops::{Deref, Range, RangeFrom, RangeFull, RangeInclusive, RangeTo, RangeToInclusive};

use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, SliceInfoElem};

pub use ndarray::Slice;

use crate::errors::{Error, Result};

/// One entry of an index expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Indexer {
    /// Select a single position, dropping the dimension. Negative values count from the end.
    Index(isize),

    /// Select a range of positions, keeping the dimension. Follows ndarray's slicing rules.
    Slice(Slice),

    /// Stands in for as many full slices as are needed to index every dimension.
    Ellipsis,
}

impl Indexer {
    /// A slice covering a whole dimension.
    pub fn full() -> Self {
        Self::Slice(Slice::from(..))
    }
}

impl From<Slice> for Indexer {
    fn from(slice: Slice) -> Self {
        Self::Slice(slice)
    }
}

macro_rules! index_from {
    ($($type:ty),*) => {
        $(
            impl From<$type> for Indexer {
                fn from(index: $type) -> Self {
                    Self::Index(index as isize)
                }
            }

            impl From<Range<$type>> for Indexer {
                fn from(range: Range<$type>) -> Self {
                    Self::Slice(Slice::from(range))
                }
            }

            impl From<RangeFrom<$type>> for Indexer {
                fn from(range: RangeFrom<$type>) -> Self {
                    Self::Slice(Slice::from(range))
                }
            }

            impl From<RangeTo<$type>> for Indexer {
                fn from(range: RangeTo<$type>) -> Self {
                    Self::Slice(Slice::from(range))
                }
            }

            impl From<RangeInclusive<$type>> for Indexer {
                fn from(range: RangeInclusive<$type>) -> Self {
                    Self::Slice(Slice::from(range))
                }
            }

            impl From<RangeToInclusive<$type>> for Indexer {
                fn from(range: RangeToInclusive<$type>) -> Self {
                    Self::Slice(Slice::from(range))
                }
            }
        )*
    };
}

index_from!(i32, isize, usize);

impl From<RangeFull> for Indexer {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

/// Build an index expression.
///
/// Entries may be integers, ranges, `ndarray::Slice`s, or `Indexer`s:
///
/// ```
/// use polyglot::{key, Indexer};
///
/// let key = key![0, 1..3, Indexer::Ellipsis, ..];
/// assert_eq!(key.len(), 4);
/// ```
#[macro_export]
macro_rules! key {
    ($($entry:expr),* $(,)?) => {
        vec![$($crate::Indexer::from($entry)),*]
    };
}

/// Expand an index expression to exactly one entry per dimension.
///
/// The first ellipsis is replaced by as many full slices as are needed to index every dimension,
/// any later ellipsis stands for a single full slice, and missing trailing entries are padded with
/// full slices.
///
pub fn expanded_indexer(key: &[Indexer], ndim: usize) -> Result<Vec<Indexer>> {
    let mut expanded = Vec::with_capacity(ndim);
    let mut found_ellipsis = false;
    for indexer in key {
        match indexer {
            Indexer::Ellipsis if !found_ellipsis => {
                found_ellipsis = true;
                let fill = (ndim + 1).saturating_sub(key.len());
                expanded.extend((0..fill).map(|_| Indexer::full()));
            }
            Indexer::Ellipsis => expanded.push(Indexer::full()),
            indexer => expanded.push(*indexer),
        }
    }

    if expanded.len() > ndim {
        return Err(Error::Index(format!(
            "too many indices: {} for {ndim} dimensions",
            expanded.len()
        )));
    }
    expanded.resize(ndim, Indexer::full());

    Ok(expanded)
}

/// A resolved selection along a single axis of a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selector {
    /// A single fixed position. The axis is not visible in the selected data.
    Index(usize),

    /// ``len`` positions starting at ``start`` and advancing by ``step``, which may be negative.
    Range {
        start: usize,
        step: isize,
        len: usize,
    },
}

impl Selector {
    /// The whole of an axis with the given length.
    pub fn full(len: usize) -> Self {
        Self::Range {
            start: 0,
            step: 1,
            len,
        }
    }

    /// Position in the buffer of the ``i``th selected element. ``i`` must be in bounds.
    fn position(start: usize, step: isize, i: usize) -> usize {
        (start as isize + step * i as isize) as usize
    }

    fn slice_info(&self) -> SliceInfoElem {
        match *self {
            Self::Index(index) => SliceInfoElem::Index(index as isize),
            Self::Range { len: 0, .. } => SliceInfoElem::Slice {
                start: 0,
                end: Some(0),
                step: 1,
            },
            Self::Range { start, step, len } => {
                let last = Self::position(start, step, len - 1) as isize;
                if step > 0 {
                    SliceInfoElem::Slice {
                        start: start as isize,
                        end: Some(last + 1),
                        step,
                    }
                } else {
                    SliceInfoElem::Slice {
                        start: last,
                        end: Some(start as isize + 1),
                        step,
                    }
                }
            }
        }
    }

    /// Check that this selector stays inside an axis of the given length.
    fn check(&self, axis_len: usize) -> Result<()> {
        let in_bounds = match *self {
            Self::Index(index) => index < axis_len,
            Self::Range { len: 0, .. } => true,
            Self::Range { start, step, len } => {
                let last = start as isize + step * (len as isize - 1);
                start < axis_len && last >= 0 && (last as usize) < axis_len
            }
        };

        if in_bounds {
            Ok(())
        } else {
            Err(Error::Index(format!(
                "{self:?} is out of bounds for axis with length {axis_len}"
            )))
        }
    }
}

pub(crate) fn resolve_index(index: isize, len: usize) -> Result<usize> {
    let resolved = if index < 0 { index + len as isize } else { index };
    if resolved < 0 || resolved >= len as isize {
        return Err(Error::Index(format!(
            "index {index} is out of bounds for axis with length {len}"
        )));
    }

    Ok(resolved as usize)
}

/// Resolve a slice against an axis of length ``len``, returning the position of the first
/// selected element, the step and the number of selected elements.
///
/// As with ndarray, a negative step selects the elements of ``start..end`` in reverse order.
///
fn resolve_slice(slice: &Slice, len: usize) -> Result<(usize, isize, usize)> {
    if slice.step == 0 {
        return Err(Error::Index("slice step cannot be zero".to_string()));
    }

    let absolute = |index: isize| if index < 0 { index + len as isize } else { index };
    let start = absolute(slice.start);
    let end = absolute(slice.end.unwrap_or(len as isize));
    if start < 0 || start > len as isize || end < 0 || end > len as isize {
        return Err(Error::Index(format!(
            "slice {slice:?} is out of bounds for axis with length {len}"
        )));
    }

    let start = start as usize;
    let end = (end as usize).max(start);
    let stride = slice.step.unsigned_abs();
    let count = (end - start + stride - 1) / stride;

    let first = if slice.step < 0 && count > 0 {
        end - 1
    } else {
        start
    };

    Ok((first, slice.step, count))
}

/// The region of a buffer a variable can see: one selector per axis of the buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection(Vec<Selector>);

impl Selection {
    /// Select the whole of a buffer with the given shape.
    pub fn full(shape: &[usize]) -> Self {
        Self(shape.iter().map(|&len| Selector::full(len)).collect())
    }

    /// Shape of the selected data. Axes with a fixed position don't appear.
    pub fn shape(&self) -> Vec<usize> {
        self.0
            .iter()
            .filter_map(|selector| match selector {
                Selector::Index(_) => None,
                Selector::Range { len, .. } => Some(*len),
            })
            .collect()
    }

    /// Number of dimensions of the selected data
    pub fn ndim(&self) -> usize {
        self.0
            .iter()
            .filter(|selector| matches!(selector, Selector::Range { .. }))
            .count()
    }

    /// Whether this selects the whole of a buffer with the given shape, in order.
    pub fn is_full(&self, shape: &[usize]) -> bool {
        *self == Self::full(shape)
    }

    /// Apply an expanded index expression, with one entry per visible dimension, to this selection.
    pub fn compose(&self, key: &[Indexer]) -> Result<Self> {
        if key.len() != self.ndim() {
            return Err(Error::Index(format!(
                "expected {} indices, got {}",
                self.ndim(),
                key.len()
            )));
        }

        let mut key = key.iter();
        let mut composed = Vec::with_capacity(self.0.len());
        for selector in &self.0 {
            // Axes fixed by an earlier index aren't visible, so they don't consume a key entry.
            let (start, step, len) = match *selector {
                Selector::Index(_) => {
                    composed.push(*selector);
                    continue;
                }
                Selector::Range { start, step, len } => (start, step, len),
            };
            let Some(indexer) = key.next() else {
                composed.push(*selector);
                continue;
            };
            let selector = match indexer {
                Indexer::Index(index) => {
                    let index = resolve_index(*index, len)?;
                    Selector::Index(Selector::position(start, step, index))
                }
                Indexer::Slice(slice) => {
                    let (first, substep, count) = resolve_slice(slice, len)?;
                    let start = if count > 0 {
                        Selector::position(start, step, first)
                    } else {
                        start
                    };
                    Selector::Range {
                        start,
                        step: step * substep,
                        len: count,
                    }
                }
                Indexer::Ellipsis => {
                    return Err(Error::Index(
                        "index expression must be expanded before it is applied".to_string(),
                    ))
                }
            };
            composed.push(selector);
        }

        Ok(Self(composed))
    }

    /// Fix the first visible axis at position ``n``, which must be less than its length.
    pub(crate) fn select_first(&self, n: usize) -> Self {
        let mut selectors = self.0.clone();
        if let Some(selector) = selectors
            .iter_mut()
            .find(|selector| matches!(selector, Selector::Range { .. }))
        {
            if let Selector::Range { start, step, .. } = *selector {
                *selector = Selector::Index(Selector::position(start, step, n));
            }
        }

        Self(selectors)
    }

    /// Check that this selection fits inside a buffer with the given shape.
    pub fn check(&self, shape: &[usize]) -> Result<()> {
        if self.0.len() != shape.len() {
            return Err(Error::Index(format!(
                "selection has {} axes but the array has {}",
                self.0.len(),
                shape.len()
            )));
        }
        for (selector, &len) in self.0.iter().zip(shape) {
            selector.check(len)?;
        }

        Ok(())
    }

    fn slice_info(&self) -> Vec<SliceInfoElem> {
        self.0.iter().map(Selector::slice_info).collect()
    }
}

impl Deref for Selection {
    type Target = [Selector];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Selector>> for Selection {
    fn from(selectors: Vec<Selector>) -> Self {
        Self(selectors)
    }
}

/// Copy the selected region out of an array.
///
/// Backing stores that keep (or can cheaply produce) their data as an ndarray can use this to
/// implement [`BackingStore::read`](crate::BackingStore::read).
///
pub fn select<T: Clone>(array: ArrayViewD<T>, selection: &[Selector]) -> Result<ArrayD<T>> {
    let selection = Selection::from(selection.to_vec());
    selection.check(array.shape())?;
    let info = selection.slice_info();

    Ok(array.slice_move(&info[..]).to_owned())
}

/// Borrow the selected region of an array. The selection must already have been checked.
pub(crate) fn select_view<'a, T>(
    array: ArrayViewD<'a, T>,
    selection: &Selection,
) -> ArrayViewD<'a, T> {
    let info = selection.slice_info();

    array.slice_move(&info[..])
}

/// Borrow the selected region of an array mutably. The selection must already have been checked.
pub(crate) fn select_mut<'a, T>(
    array: ArrayViewMutD<'a, T>,
    selection: &Selection,
) -> ArrayViewMutD<'a, T> {
    let info = selection.slice_info();

    array.slice_move(&info[..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array};

    fn full(ndim: usize) -> Vec<Indexer> {
        vec![Indexer::full(); ndim]
    }

    #[test]
    fn test_key_macro() {
        let key = key![1, -1, 2..4, .., 1.., ..=2_usize, Slice::new(0, None, 2)];
        assert_eq!(key[0], Indexer::Index(1));
        assert_eq!(key[1], Indexer::Index(-1));
        assert_eq!(key[2], Indexer::Slice(Slice::new(2, Some(4), 1)));
        assert_eq!(key[3], Indexer::full());
        assert_eq!(key[4], Indexer::Slice(Slice::new(1, None, 1)));
        assert_eq!(key[5], Indexer::Slice(Slice::new(0, Some(3), 1)));
        assert_eq!(key[6], Indexer::Slice(Slice::new(0, None, 2)));
    }

    #[test]
    fn test_expanded_indexer_pads() {
        assert_eq!(expanded_indexer(&[], 3).unwrap(), full(3));
        assert_eq!(
            expanded_indexer(&key![1], 3).unwrap(),
            vec![Indexer::Index(1), Indexer::full(), Indexer::full()]
        );
    }

    #[test]
    fn test_expanded_indexer_ellipsis() {
        let key = key![Indexer::Ellipsis, 0];
        assert_eq!(
            expanded_indexer(&key, 3).unwrap(),
            vec![Indexer::full(), Indexer::full(), Indexer::Index(0)]
        );

        let key = key![0, Indexer::Ellipsis, 1];
        assert_eq!(
            expanded_indexer(&key, 2).unwrap(),
            vec![Indexer::Index(0), Indexer::Index(1)]
        );

        let key = key![Indexer::Ellipsis, 0, Indexer::Ellipsis];
        assert_eq!(
            expanded_indexer(&key, 3).unwrap(),
            vec![Indexer::full(), Indexer::Index(0), Indexer::full()]
        );
    }

    #[test]
    fn test_expanded_indexer_too_many() {
        assert!(matches!(
            expanded_indexer(&key![0, 0, 0], 2),
            Err(Error::Index(_))
        ));
        assert!(matches!(expanded_indexer(&key![0], 0), Err(Error::Index(_))));
    }

    #[test]
    fn test_resolve_slice() {
        assert_eq!(resolve_slice(&Slice::new(0, None, 1), 5).unwrap(), (0, 1, 5));
        assert_eq!(resolve_slice(&Slice::new(1, Some(4), 2), 5).unwrap(), (1, 2, 2));
        assert_eq!(resolve_slice(&Slice::new(-2, None, 1), 5).unwrap(), (3, 1, 2));
        assert_eq!(resolve_slice(&Slice::new(0, None, -1), 5).unwrap(), (4, -1, 5));
        assert_eq!(resolve_slice(&Slice::new(0, Some(5), -2), 5).unwrap(), (4, -2, 3));
        assert_eq!(resolve_slice(&Slice::new(3, Some(1), 1), 5).unwrap().2, 0);
        assert!(resolve_slice(&Slice::new(0, Some(6), 1), 5).is_err());
        assert!(matches!(
            resolve_slice(
                &Slice {
                    start: 0,
                    end: None,
                    step: 0
                },
                5
            ),
            Err(Error::Index(_))
        ));
    }

    #[test]
    fn test_compose_matches_ndarray() {
        let array = Array::from_shape_vec((4, 5), (0..20).collect::<Vec<i32>>())
            .unwrap()
            .into_dyn();
        let selection = Selection::full(array.shape());

        let key = key![Slice::new(0, None, -1), Slice::new(1, Some(5), 2)];
        let view = selection.compose(&key).unwrap();
        assert_eq!(view.shape(), vec![4, 2]);
        assert_eq!(
            select(array.view(), &view).unwrap(),
            arr2(&[[16, 18], [11, 13], [6, 8], [1, 3]]).into_dyn()
        );

        // A view of a view
        let key = key![1..3, -1];
        let view = view.compose(&key).unwrap();
        assert_eq!(view.shape(), vec![2]);
        assert_eq!(select(array.view(), &view).unwrap(), arr1(&[13, 8]).into_dyn());
    }

    #[test]
    fn test_compose_index_drops_axis() {
        let array = arr2(&[[1, 2, 3], [4, 5, 6]]).into_dyn();
        let view = Selection::full(array.shape()).compose(&key![-1, ..]).unwrap();
        assert_eq!(view.ndim(), 1);
        assert_eq!(view[0], Selector::Index(1));
        assert_eq!(select(array.view(), &view).unwrap(), arr1(&[4, 5, 6]).into_dyn());
    }

    #[test]
    fn test_compose_skips_fixed_axes() {
        let array = Array::from_shape_vec((3, 4), (0..12).collect::<Vec<i32>>())
            .unwrap()
            .into_dyn();
        let row = Selection::full(array.shape()).compose(&key![1, ..]).unwrap();
        assert_eq!(row.ndim(), 1);

        let part = row.compose(&key![1..3]).unwrap();
        assert_eq!(part.shape(), vec![2]);
        assert_eq!(select(array.view(), &part).unwrap(), arr1(&[5, 6]).into_dyn());

        let cell = row.compose(&key![2]).unwrap();
        assert_eq!(cell.ndim(), 0);
        assert_eq!(&cell[..], &[Selector::Index(1), Selector::Index(2)]);

        let column = Selection::full(array.shape()).compose(&key![.., -1]).unwrap();
        let cell = column.compose(&key![0]).unwrap();
        assert_eq!(&cell[..], &[Selector::Index(0), Selector::Index(3)]);
        assert!(matches!(column.compose(&key![3]), Err(Error::Index(_))));
    }

    #[test]
    fn test_compose_out_of_bounds() {
        let selection = Selection::full(&[2, 3]);
        assert!(matches!(selection.compose(&key![2, 0]), Err(Error::Index(_))));
        assert!(matches!(selection.compose(&key![-3, 0]), Err(Error::Index(_))));
        assert!(matches!(selection.compose(&key![0]), Err(Error::Index(_))));
    }

    #[test]
    fn test_compose_empty_slice() {
        let array = arr1(&[1, 2, 3]).into_dyn();
        let view = Selection::full(&[3]).compose(&key![3..]).unwrap();
        assert_eq!(view.shape(), vec![0]);
        assert_eq!(select(array.view(), &view).unwrap().len(), 0);
    }

    #[test]
    fn test_select_first() {
        let array = arr2(&[[1, 2], [3, 4], [5, 6]]).into_dyn();
        let view = Selection::full(array.shape())
            .compose(&key![Slice::new(0, None, -1), ..])
            .unwrap();
        let row = view.select_first(0);
        assert_eq!(select(array.view(), &row).unwrap(), arr1(&[5, 6]).into_dyn());
    }

    #[test]
    fn test_select_checks_bounds() {
        let array = arr1(&[1, 2, 3]).into_dyn();
        assert!(select(array.view(), &[Selector::Index(3)]).is_err());
        assert!(select(array.view(), &[Selector::full(4)]).is_err());
        assert!(select(array.view(), &[]).is_err());
    }

    #[test]
    fn test_select_mut() {
        let mut array = arr2(&[[1, 2], [3, 4]]).into_dyn();
        let selection = Selection::full(array.shape()).compose(&key![.., 1]).unwrap();
        select_mut(array.view_mut(), &selection).fill(0);
        assert_eq!(array, arr2(&[[1, 0], [3, 0]]).into_dyn());
    }
}
