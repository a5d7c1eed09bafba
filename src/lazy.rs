//! Memoized, index-addressed child lists
//!
//! Every "children of a node" accessor is backed by a [`LazyList`]: a count
//! and a per-index creator. Items are created on first demand, at most once
//! per index, and the full list is built once and then handed out by reference.

use crate::error::Result;
use std::cell::{OnceCell, RefCell};
use std::fmt;

type Creator<T> = Box<dyn Fn(usize) -> Result<T>>;

pub struct LazyList<T> {
    count_fn: Box<dyn Fn() -> usize>,
    count: OnceCell<usize>,
    creator: Creator<T>,
    slots: RefCell<Vec<Option<T>>>,
    all: OnceCell<Vec<T>>,
}

impl<T: Clone> LazyList<T> {
    /// List whose length is itself computed on first use
    pub fn new(
        count: impl Fn() -> usize + 'static,
        creator: impl Fn(usize) -> Result<T> + 'static,
    ) -> Self {
        Self {
            count_fn: Box::new(count),
            count: OnceCell::new(),
            creator: Box::new(creator),
            slots: RefCell::new(Vec::new()),
            all: OnceCell::new(),
        }
    }

    pub fn with_len(len: usize, creator: impl Fn(usize) -> Result<T> + 'static) -> Self {
        Self::new(move || len, creator)
    }

    /// List with no items
    pub fn empty() -> Self {
        Self::with_len(0, |_| unreachable!("empty list has no items"))
    }

    pub fn len(&self) -> usize {
        *self.count.get_or_init(|| (self.count_fn)())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `index`, creating it if this is the first request for it
    pub fn get(&self, index: usize) -> Result<Option<T>> {
        let len = self.len();
        if index >= len {
            return Ok(None);
        }
        if let Some(item) = self.slots.borrow().get(index).and_then(Clone::clone) {
            return Ok(Some(item));
        }
        let item = (self.creator)(index)?;
        let mut slots = self.slots.borrow_mut();
        if slots.len() < len {
            slots.resize_with(len, || None);
        }
        Ok(Some(slots[index].get_or_insert(item).clone()))
    }

    /// All items in order; built once, then returned by reference
    pub fn items(&self) -> Result<&[T]> {
        if let Some(all) = self.all.get() {
            return Ok(all);
        }
        let len = self.len();
        let mut items = Vec::with_capacity(len);
        for index in 0..len {
            if let Some(item) = self.get(index)? {
                items.push(item);
            }
        }
        Ok(self.all.get_or_init(|| items))
    }

    /// Last item, if any
    pub fn last(&self) -> Result<Option<T>> {
        match self.len() {
            0 => Ok(None),
            len => self.get(len - 1),
        }
    }

    /// Number of items materialized so far
    pub fn created(&self) -> usize {
        self.slots.borrow().iter().filter(|s| s.is_some()).count()
    }
}

impl<T> fmt::Debug for LazyList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyList")
            .field("len", &self.count.get())
            .field("complete", &self.all.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_list(len: usize) -> (LazyList<Rc<String>>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let list = LazyList::with_len(len, move |i| {
            counter.set(counter.get() + 1);
            Ok(Rc::new(format!("item {}", i)))
        });
        (list, calls)
    }

    #[test]
    fn test_nothing_created_at_construction() {
        let (list, calls) = counting_list(3);
        assert_eq!(list.len(), 3);
        assert_eq!(calls.get(), 0);
        assert_eq!(list.created(), 0);
    }

    #[test]
    fn test_creator_called_once_per_index() {
        let (list, calls) = counting_list(3);
        let first = list.get(1).unwrap().unwrap();
        assert_eq!(calls.get(), 1);
        let again = list.get(1).unwrap().unwrap();
        assert!(Rc::ptr_eq(&first, &again));
        assert_eq!(calls.get(), 1);

        let all = list.items().unwrap();
        assert_eq!(all.len(), 3);
        assert!(Rc::ptr_eq(&all[1], &first));
        assert_eq!(calls.get(), 3);

        list.items().unwrap();
        list.items().unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_items_returned_by_reference() {
        let (list, _) = counting_list(2);
        let a = list.items().unwrap().as_ptr();
        let b = list.items().unwrap().as_ptr();
        assert_eq!(a, b);
    }

    #[test]
    fn test_out_of_range_is_none() {
        let (list, calls) = counting_list(2);
        assert!(list.get(2).unwrap().is_none());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_count_is_lazy() {
        let count_calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count_calls);
        let list: LazyList<usize> = LazyList::new(
            move || {
                counter.set(counter.get() + 1);
                4
            },
            Ok,
        );
        assert_eq!(count_calls.get(), 0);
        assert_eq!(list.len(), 4);
        assert_eq!(list.len(), 4);
        assert_eq!(count_calls.get(), 1);
        assert_eq!(list.last().unwrap(), Some(3));
    }

    #[test]
    fn test_creator_error_is_not_cached() {
        let list: LazyList<usize> = LazyList::with_len(1, |_| {
            Err(crate::Error::shape("test", "broken"))
        });
        assert!(list.get(0).is_err());
        assert!(list.items().is_err());
        assert_eq!(list.created(), 0);
    }

    #[test]
    fn test_empty_list() {
        let list: LazyList<u8> = LazyList::empty();
        assert!(list.is_empty());
        assert!(list.items().unwrap().is_empty());
        assert_eq!(list.last().unwrap(), None);
    }
}
