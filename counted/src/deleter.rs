//! Deletion policies
//!
//! A deletion policy is moved into the control block when a raw resource is
//! wrapped, and called exactly once, when the last strong handle goes away.

use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::alloc_prelude::Box;

/// Releases a raw resource
///
/// Implemented by [`DefaultDelete`], [`ArrayDelete`], and by every
/// `FnMut(NonNull<T>)` closure.
pub trait Deleter<T: ?Sized> {
    /// # Safety
    ///
    /// * `ptr` must be a resource this policy knows how to release
    /// * `ptr` must not be used again after this call
    unsafe fn delete(&mut self, ptr: NonNull<T>);
}

/// Releases a single object that was allocated as a [`Box`]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultDelete;

impl<T: ?Sized> Deleter<T> for DefaultDelete {
    #[inline]
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        drop(Box::from_raw(ptr.as_ptr()))
    }
}

/// Releases an array that was allocated as a boxed slice
///
/// Only usable with slice resources, wrapping a single object with this policy
/// does not compile.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayDelete;

impl<T> Deleter<[T]> for ArrayDelete {
    #[inline]
    unsafe fn delete(&mut self, ptr: NonNull<[T]>) {
        drop(Box::from_raw(ptr.as_ptr()))
    }
}

impl<T: ?Sized, F: FnMut(NonNull<T>)> Deleter<T> for F {
    #[inline]
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        self(ptr)
    }
}

/// Does nothing, for resources whose storage is owned elsewhere
///
/// Useful to hand out handles to `'static` data.
pub struct NoDelete<T: ?Sized>(PhantomData<fn(NonNull<T>)>);

impl<T: ?Sized> NoDelete<T> {
    /// create a no-op deletion policy
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: ?Sized> Default for NoDelete<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for NoDelete<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Copy for NoDelete<T> {}

impl<T: ?Sized> Deleter<T> for NoDelete<T> {
    #[inline]
    unsafe fn delete(&mut self, _: NonNull<T>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Tracked(Rc<Cell<usize>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn default_delete_drops_box() {
        let drops = Rc::new(Cell::new(0));
        let ptr = Box::into_raw(Box::new(Tracked(drops.clone())));

        unsafe { DefaultDelete.delete(NonNull::new_unchecked(ptr)) }
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn array_delete_drops_every_element() {
        let drops = Rc::new(Cell::new(0));
        let items = (0..10).map(|_| Tracked(drops.clone())).collect::<Vec<_>>();
        let ptr = Box::into_raw(items.into_boxed_slice());

        unsafe { ArrayDelete.delete(NonNull::new_unchecked(ptr)) }
        assert_eq!(drops.get(), 10);
    }

    #[test]
    fn closure_policy() {
        let mut seen = None;
        let value = 5_i32;
        let ptr = NonNull::from(&value);

        unsafe { (|p: NonNull<i32>| seen = Some(*p.as_ptr())).delete(ptr) }
        assert_eq!(seen, Some(5));
    }

    #[test]
    fn no_delete_for_static_data() {
        static ANSWER: i32 = 42;

        let ptr = &ANSWER as *const i32 as *mut i32;
        let shared = unsafe { crate::Shared::from_raw_with(ptr, NoDelete::<i32>::new()) };
        let copy = shared.clone();

        drop(shared);
        assert_eq!(*copy, 42);
        assert!(copy.deleter::<NoDelete<i32>>().is_some());
    }
}
