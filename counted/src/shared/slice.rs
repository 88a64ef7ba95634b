//! Shared arrays

use std::ops::Index;
use std::slice::SliceIndex;

use super::Shared;
use crate::alloc::Global;
use crate::alloc_prelude::{Box, Vec};
use crate::deleter::ArrayDelete;

impl<T> Shared<[T]> {
    /// Place a boxed slice under shared ownership, released with [`ArrayDelete`]
    #[inline]
    pub fn from_box_slice(items: Box<[T]>) -> Self {
        unsafe { Self::from_raw_slice(Box::into_raw(items)) }
    }

    /// Place the elements of `items` under shared ownership
    #[inline]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self::from_box_slice(items.into_boxed_slice())
    }

    /// Take shared ownership of a slice obtained from `Box::<[T]>::into_raw`
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from `Box::<[T]>::into_raw`, and must not be
    /// owned by anything else
    #[inline]
    pub unsafe fn from_raw_slice(ptr: *mut [T]) -> Self {
        Self::from_raw_in(ptr, ArrayDelete, Global)
    }

    /// the number of elements, `0` if this handle is empty
    #[inline]
    pub fn len(&self) -> usize {
        self.get().map_or(0, <[T]>::len)
    }

    /// `true` if there are no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, I: SliceIndex<[T]>> Index<I> for Shared<[T]> {
    type Output = I::Output;

    #[inline]
    fn index(&self, index: I) -> &I::Output {
        &(**self)[index]
    }
}

impl<T> From<Vec<T>> for Shared<[T]> {
    #[inline]
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deleter::DefaultDelete;
    use std::cell::Cell;

    #[test]
    fn index_and_write() {
        let ai: Shared<[Cell<i32>]> = (0..20).map(Cell::new).collect::<Vec<_>>().into();
        ai[5].set(400);
        assert_eq!(ai[5].get(), 400);
        assert_eq!(ai.len(), 20);
        assert_eq!(ai[1..3].iter().map(Cell::get).sum::<i32>(), 3);
    }

    #[test]
    fn array_deleter_by_default() {
        let ai = Shared::from_vec(vec![1, 2, 3]);
        assert!(ai.deleter::<ArrayDelete>().is_some());
        assert!(ai.deleter::<DefaultDelete>().is_none());
    }

    #[test]
    fn empty_slice_handle() {
        let empty = Shared::<[u8]>::empty();
        assert_eq!(empty.len(), 0);
        assert!(empty.is_empty());
    }
}
