//! A single-threaded reference counting pointer with pluggable deletion
//!
//! A [`Shared`] owns one strong reference to a control block. Cloning it adds a
//! strong reference, dropping it removes one, and the last one to go destroys
//! the resource. Handles are not thread safe in any way, they are neither
//! `Send` nor `Sync`.
//!
//! A handle stores its own typed pointer next to the control block, so the same
//! resource can be viewed at different types (see [`Shared::map`]) while all of
//! the views share one set of counters.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;

use crate::alloc::{Global, RawAlloc};
use crate::alloc_prelude::Box;
use crate::block::{self, BlockRef, Inline, OutOfLine};
use crate::deleter::{DefaultDelete, Deleter};
use crate::error::AllocError;
use crate::unique::Unique;
use crate::weak::Weak;

mod cast;
mod slice;

/// A handle's view of a control block
pub(crate) struct Raw<T: ?Sized> {
    pub(crate) ptr: NonNull<T>,
    pub(crate) block: BlockRef,
}

impl<T: ?Sized> Clone for Raw<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Raw<T> {}

impl<T: ?Sized> Raw<T> {
    #[inline]
    pub(crate) fn addr(self) -> usize {
        self.ptr.cast::<u8>().as_ptr() as usize
    }
}

/// An owning, reference counted handle
///
/// A `Shared` is either empty or holds one strong reference to a control block.
/// Empty handles come from [`Shared::empty`], from wrapping a null pointer, from
/// a failed cast, from locking an expired [`Weak`], or from a failed
/// allocation.
pub struct Shared<T: ?Sized> {
    pub(crate) raw: Option<Raw<T>>,
    _owns: PhantomData<T>,
}

impl<T: ?Sized> Shared<T> {
    /// create an empty handle
    #[inline]
    pub const fn empty() -> Self {
        Self {
            raw: None,
            _owns: PhantomData,
        }
    }

    /// # Safety
    ///
    /// the caller must have already added the strong reference this handle owns
    #[inline]
    pub(crate) unsafe fn from_raw_parts(raw: Raw<T>) -> Self {
        Self {
            raw: Some(raw),
            _owns: PhantomData,
        }
    }

    /// takes the first strong reference of a freshly allocated block
    ///
    /// # Safety
    ///
    /// `block` must be freshly allocated with both counters at zero
    unsafe fn adopt(ptr: NonNull<T>, block: BlockRef) -> Self {
        debug_assert_eq!((block.strong(), block.weak()), (0, 0));
        block.add_strong();
        Self::from_raw_parts(Raw { ptr, block })
    }

    /// Place a boxed value under shared ownership
    ///
    /// The box is released with [`DefaultDelete`] once the last strong handle
    /// is dropped.
    #[inline]
    pub fn from_box(value: Box<T>) -> Self {
        Self::from_box_in(value, Global)
    }

    /// Place a boxed value under shared ownership, allocating the control
    /// block with `alloc`
    #[inline]
    pub fn from_box_in<A: RawAlloc + 'static>(value: Box<T>, alloc: A) -> Self {
        unsafe { Self::from_raw_in(Box::into_raw(value), DefaultDelete, alloc) }
    }

    /// Take shared ownership of a raw pointer obtained from [`Box::into_raw`]
    ///
    /// A null pointer yields an empty handle.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from `Box::into_raw`, and must not be owned
    /// by anything else
    #[inline]
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self::from_raw_in(ptr, DefaultDelete, Global)
    }

    /// Take shared ownership of a raw pointer which is released by `deleter`
    ///
    /// A null pointer yields an empty handle, `deleter` is dropped without
    /// being called in that case.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a resource which `deleter` can release, and must
    /// not be owned by anything else
    #[inline]
    pub unsafe fn from_raw_with<D: Deleter<T> + 'static>(ptr: *mut T, deleter: D) -> Self {
        Self::from_raw_in(ptr, deleter, Global)
    }

    /// Take shared ownership of a raw pointer which is released by `deleter`,
    /// allocating the control block with `alloc`
    ///
    /// If the control block can't be allocated the resource is released right
    /// away and the handle is empty.
    ///
    /// # Safety
    ///
    /// same as [`from_raw_with`](Self::from_raw_with)
    pub unsafe fn from_raw_in<D, A>(ptr: *mut T, deleter: D, alloc: A) -> Self
    where
        D: Deleter<T> + 'static,
        A: RawAlloc + 'static,
    {
        Self::from_unique_in(Unique::from_raw_with(ptr, deleter), alloc)
    }

    /// Move the resource of a [`Unique`] under shared ownership, keeping its
    /// deletion policy
    pub fn from_unique_in<D, A>(unique: Unique<T, D>, alloc: A) -> Self
    where
        D: Deleter<T> + 'static,
        A: RawAlloc + 'static,
    {
        let (ptr, deleter) = match Unique::into_raw_parts(unique) {
            (Some(ptr), deleter) => (ptr, deleter),
            (None, _) => return Self::empty(),
        };

        match block::allocate(OutOfLine::new(ptr, deleter, alloc)) {
            Ok(block) => unsafe { Self::adopt(ptr, block) },
            Err(block) => {
                block.abandon();
                Self::empty()
            }
        }
    }

    /// Try to get a strong handle out of a weak one
    ///
    /// Returns an empty handle if the resource has already been destroyed.
    #[inline]
    pub fn from_weak(weak: &Weak<T>) -> Self {
        match weak.raw {
            Some(raw) if unsafe { raw.block.try_add_strong() } => unsafe {
                Self::from_raw_parts(raw)
            },
            _ => Self::empty(),
        }
    }

    /// create a weak handle to this resource
    #[inline]
    pub fn downgrade(this: &Self) -> Weak<T> {
        Weak::from(this)
    }

    /// a reference to the resource, or `None` if this handle is empty
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.raw.map(|raw| unsafe { &*raw.ptr.as_ptr() })
    }

    /// the pointer to the resource, or `None` if this handle is empty
    #[inline]
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.raw.map(|raw| raw.ptr)
    }

    /// the pointer held by the control block
    ///
    /// This is the resource as it was originally wrapped, which differs from
    /// [`as_ptr`](Self::as_ptr) for handles created by [`map`](Self::map)
    #[inline]
    pub fn owner_ptr(&self) -> Option<NonNull<()>> {
        self.raw.map(|raw| unsafe { raw.block.get() })
    }

    /// `true` if this handle is empty
    #[inline]
    pub fn is_null(&self) -> bool {
        self.raw.is_none()
    }

    /// the number of strong handles to this resource, `0` if empty
    #[inline]
    pub fn use_count(&self) -> usize {
        self.raw.map_or(0, |raw| raw.block.strong())
    }

    /// the number of weak handles to this resource, `0` if empty
    #[inline]
    pub fn weak_count(&self) -> usize {
        self.raw
            .map_or(0, |raw| raw.block.weak() - raw.block.strong())
    }

    /// `true` if this is the only strong handle
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.use_count() == 1
    }

    /// A mutable reference to the resource if no other handle can observe it
    ///
    /// Returns `None` if there are other strong handles or any weak handles.
    #[inline]
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        let raw = this.raw?;
        if raw.block.strong() == 1 && raw.block.weak() == 1 {
            unsafe { Some(&mut *raw.ptr.as_ptr()) }
        } else {
            None
        }
    }

    /// `true` if both handles share a control block, whatever their types
    #[inline]
    pub fn owner_eq<U: ?Sized>(&self, other: &Shared<U>) -> bool {
        self.raw.map(|raw| raw.block) == other.raw.map(|raw| raw.block)
    }

    /// The deletion policy of this resource, if it is a `D`
    ///
    /// Always `None` for empty handles and for handles made by
    /// [`Shared::new`], which have no deletion policy.
    pub fn deleter<D: Any>(&self) -> Option<&D> {
        let raw = self.raw?;
        unsafe {
            raw.block
                .deleter(TypeId::of::<D>())
                .map(|ptr| &*ptr.cast::<D>().as_ptr())
        }
    }

    /// drop this handle's reference, leaving it empty
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::empty();
    }

    /// exchange the resources of two handles, leaving all counters as they are
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other)
    }

    /// move the reference out of this handle, leaving it empty
    #[inline]
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::empty())
    }

    #[inline]
    fn addr(&self) -> usize {
        self.raw.map_or(0, Raw::addr)
    }
}

impl<T> Shared<T> {
    /// Place `value` under shared ownership
    ///
    /// The value and its control block share one allocation. If that
    /// allocation fails `value` is dropped and the handle is empty, use
    /// [`try_new_in`](Self::try_new_in) to get the value back instead.
    #[inline]
    pub fn new(value: T) -> Self {
        Self::new_in(value, Global)
    }

    /// Place `value` under shared ownership, in one allocation from `alloc`
    #[inline]
    pub fn new_in<A: RawAlloc + 'static>(value: T, alloc: A) -> Self {
        Self::try_new_in(value, alloc).unwrap_or_else(|_| Self::empty())
    }

    /// Place `value` under shared ownership, in one allocation from `alloc`
    ///
    /// Returns the value inside the error if the allocation fails.
    pub fn try_new_in<A: RawAlloc + 'static>(value: T, alloc: A) -> Result<Self, AllocError<T>> {
        match block::allocate(Inline::new(value, alloc)) {
            Ok(block) => unsafe { Ok(Self::adopt(block.get().cast(), block)) },
            Err(block) => Err(AllocError::new(
                block.into_value(),
                std::alloc::Layout::new::<Inline<T, A>>(),
            )),
        }
    }
}

impl<T: ?Sized> Drop for Shared<T> {
    #[inline]
    fn drop(&mut self) {
        if let Some(raw) = self.raw {
            unsafe { raw.block.release_strong() }
        }
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    #[inline]
    fn clone(&self) -> Self {
        match self.raw {
            Some(raw) => unsafe {
                raw.block.add_strong();
                Self::from_raw_parts(raw)
            },
            None => Self::empty(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if self.owner_eq(source) {
            self.raw = source.raw;
        } else {
            *self = source.clone();
        }
    }
}

impl<T: ?Sized> Default for Shared<T> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> Deref for Shared<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced an empty `Shared`"),
        }
    }
}

impl<T: ?Sized> AsRef<T> for Shared<T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized> From<Box<T>> for Shared<T> {
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T: ?Sized, D: Deleter<T> + 'static> From<Unique<T, D>> for Shared<T> {
    fn from(unique: Unique<T, D>) -> Self {
        Self::from_unique_in(unique, Global)
    }
}

impl<T: ?Sized, U: ?Sized> PartialEq<Shared<U>> for Shared<T> {
    #[inline]
    fn eq(&self, other: &Shared<U>) -> bool {
        self.addr() == other.addr()
    }
}

impl<T: ?Sized> Eq for Shared<T> {}

impl<T: ?Sized, U: ?Sized> PartialOrd<Shared<U>> for Shared<T> {
    #[inline]
    fn partial_cmp(&self, other: &Shared<U>) -> Option<Ordering> {
        Some(self.addr().cmp(&other.addr()))
    }
}

impl<T: ?Sized> Ord for Shared<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.addr().cmp(&other.addr())
    }
}

impl<T: ?Sized> Hash for Shared<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state)
    }
}

impl<T: ?Sized> fmt::Pointer for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&(self.addr() as *const ()), f)
    }
}

impl<T: ?Sized + fmt::Display> fmt::Display for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Shared").field(&value).finish(),
            None => f.write_str("Shared(<empty>)"),
        }
    }
}

/// The deletion policy of `shared`, if it is a `D`
#[inline]
pub fn get_deleter<D: Any, T: ?Sized>(shared: &Shared<T>) -> Option<&D> {
    shared.deleter::<D>()
}
