//! Allocators for control block storage
//!
//! A control block is allocated through the allocator given at construction,
//! asked for the block's own concrete [`Layout`]. The allocator never needs to
//! know which block shape it is serving, only how big and how aligned it is.

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::alloc_prelude::{alloc, dealloc};

/// A source of memory for control blocks
///
/// A copy of the allocator is stored inside every block it allocated and is
/// used to free that block again once the last handle is gone.
///
/// # Safety
///
/// * memory returned by `allocate` must be valid for reads and writes of
/// `layout.size()` bytes and aligned to `layout.align()`
/// * memory returned by `allocate` on any clone of an allocator must be
/// accepted by `deallocate` on any other clone of it
/// * the allocator must not panic from either method
pub unsafe trait RawAlloc: Clone {
    /// allocates memory for `layout`
    ///
    /// returns `None` if no memory could be provided, a control block is
    /// never created in that case
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// # Safety
    ///
    /// * `ptr` must have been returned by `allocate` with the same `layout`
    /// * `ptr` must not have been deallocated already
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global allocator, reporting exhaustion as `None` instead of aborting
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Global;

unsafe impl RawAlloc for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            // every block has a header, so this only guards the contract of `alloc`
            return Some(unsafe { NonNull::new_unchecked(layout.align() as *mut u8) });
        }

        NonNull::new(unsafe { alloc(layout) })
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            dealloc(ptr.as_ptr(), layout)
        }
    }
}

unsafe impl<A: RawAlloc> RawAlloc for &A {
    #[inline(always)]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        A::allocate(self, layout)
    }

    #[inline(always)]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        A::deallocate(self, ptr, layout)
    }
}
