//! A single-owner pointer with a pluggable deletion policy
//!
//! `Unique` owns a raw resource and releases it with its policy when dropped,
//! unless ownership is handed off first. That makes it the guard of choice
//! while a resource is on its way to a longer-lived owner, for example a
//! [`Shared`](crate::Shared), which takes the policy along.

use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

use crate::alloc_prelude::Box;
use crate::deleter::{DefaultDelete, Deleter};

/// The single owner of a raw resource
pub struct Unique<T: ?Sized, D: Deleter<T> = DefaultDelete> {
    ptr: Option<NonNull<T>>,
    deleter: D,
}

impl<T: ?Sized> Unique<T> {
    /// take ownership of a box
    #[inline]
    pub fn new(value: Box<T>) -> Self {
        unsafe { Self::from_raw_with(Box::into_raw(value), DefaultDelete) }
    }
}

impl<T: ?Sized, D: Deleter<T>> Unique<T, D> {
    /// Take ownership of a raw pointer which is released by `deleter`
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a resource which `deleter` can release, and must
    /// not be owned by anything else
    #[inline]
    pub unsafe fn from_raw_with(ptr: *mut T, deleter: D) -> Self {
        Self {
            ptr: NonNull::new(ptr),
            deleter,
        }
    }

    /// Split into the resource and the policy, without releasing anything
    ///
    /// The caller becomes responsible for releasing the resource.
    #[inline]
    pub fn into_raw_parts(this: Self) -> (Option<NonNull<T>>, D) {
        let this = ManuallyDrop::new(this);
        (this.ptr, unsafe { ptr::read(&this.deleter) })
    }

    /// a reference to the resource, or `None` if empty
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// a mutable reference to the resource, or `None` if empty
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.ptr.map(|ptr| unsafe { &mut *ptr.as_ptr() })
    }

    /// `true` if there is no resource
    #[inline]
    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    /// the deletion policy
    #[inline]
    pub fn deleter(&self) -> &D {
        &self.deleter
    }

    /// Give up ownership without releasing the resource
    #[inline]
    pub fn release(&mut self) -> Option<NonNull<T>> {
        self.ptr.take()
    }

    /// Release the current resource and take ownership of `ptr`
    ///
    /// # Safety
    ///
    /// same as [`from_raw_with`](Self::from_raw_with)
    pub unsafe fn reset(&mut self, ptr: *mut T) {
        let old = std::mem::replace(&mut self.ptr, NonNull::new(ptr));

        if let Some(old) = old {
            self.deleter.delete(old)
        }
    }

    /// release the current resource, leaving this empty
    #[inline]
    pub fn clear(&mut self) {
        if let Some(old) = self.ptr.take() {
            unsafe { self.deleter.delete(old) }
        }
    }
}

impl<T: ?Sized, D: Deleter<T>> Drop for Unique<T, D> {
    #[inline]
    fn drop(&mut self) {
        self.clear()
    }
}

impl<T: ?Sized, D: Deleter<T>> Deref for Unique<T, D> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced an empty `Unique`"),
        }
    }
}

impl<T: ?Sized, D: Deleter<T>> DerefMut for Unique<T, D> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(value) => value,
            None => panic!("dereferenced an empty `Unique`"),
        }
    }
}

impl<T: ?Sized> From<Box<T>> for Unique<T> {
    fn from(value: Box<T>) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized + fmt::Debug, D: Deleter<T>> fmt::Debug for Unique<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Unique").field(&value).finish(),
            None => f.write_str("Unique(<empty>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deleter::ArrayDelete;
    use crate::Shared;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn move_between_owners() {
        let ui = Unique::new(Box::new(1234));
        let ui2 = ui;
        let mut ui3 = Unique::<i32>::from(Box::new(0));
        assert_eq!(*ui3, 0);
        ui3 = ui2;
        assert_eq!(*ui3, 1234);
    }

    #[test]
    fn release_and_reset() {
        let mut ud = Unique::new(Box::new(987));
        let raw = ud.release().unwrap();
        assert!(ud.is_null());

        unsafe { ud.reset(raw.as_ptr()) };
        assert_eq!(*ud, 987);
    }

    #[test]
    fn array_form() {
        let items = vec![0; 20].into_boxed_slice();
        let mut uia = unsafe { Unique::from_raw_with(Box::into_raw(items), ArrayDelete) };

        for i in 0..20 {
            uia[i] = i;
        }

        assert_eq!(uia.iter().sum::<usize>(), 190);
    }

    #[test]
    fn guard_releases_on_drop() {
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        let deleter = move |ptr: NonNull<u8>| {
            seen.set(seen.get() + 1);
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        };

        let guard = unsafe { Unique::from_raw_with(Box::into_raw(Box::new(3_u8)), deleter) };
        drop(guard);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn into_shared_keeps_deleter() {
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        let deleter = move |ptr: NonNull<u8>| {
            seen.set(seen.get() + 1);
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        };

        let unique = unsafe { Unique::from_raw_with(Box::into_raw(Box::new(3_u8)), deleter) };
        let shared: Shared<u8> = Shared::from(unique);
        let copy = shared.clone();
        assert_eq!(count.get(), 0);

        drop(shared);
        drop(copy);
        assert_eq!(count.get(), 1);
    }
}
