//! a control block which stores the resource right after its header

use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

use super::{ControlBlock, Header};
use crate::alloc::RawAlloc;

/// Owns the resource by value, so block and resource share one allocation
///
/// The value is initialized from construction until `destroy`, after which
/// only the header and the allocator are live.
#[repr(C)]
pub struct Inline<T, A> {
    header: Header,
    alloc: A,
    value: MaybeUninit<T>,
}

impl<T, A: RawAlloc + 'static> Inline<T, A> {
    pub fn new(value: T, alloc: A) -> Self {
        Self {
            header: Header::new::<Self>(),
            alloc,
            value: MaybeUninit::new(value),
        }
    }

    /// takes the value back out of a block that never made it to the heap
    pub fn into_value(self) -> T {
        unsafe { self.value.assume_init() }
    }

    /// the resource of a block living on the heap
    ///
    /// # Safety
    ///
    /// `this` must point to a live block
    #[inline]
    pub unsafe fn value_ptr(this: NonNull<Self>) -> NonNull<T> {
        NonNull::new_unchecked(ptr::addr_of_mut!((*this.as_ptr()).value).cast::<T>())
    }
}

unsafe impl<T, A: RawAlloc + 'static> ControlBlock for Inline<T, A> {
    type Alloc = A;

    #[inline]
    fn alloc(&self) -> &A {
        &self.alloc
    }

    #[inline]
    unsafe fn get(this: NonNull<Self>) -> NonNull<()> {
        Self::value_ptr(this).cast()
    }

    unsafe fn destroy(this: NonNull<Self>) {
        ptr::drop_in_place(Self::value_ptr(this).as_ptr())
    }

    unsafe fn destroy_block(this: NonNull<Self>) {
        let alloc = ptr::read(&(*this.as_ptr()).alloc);
        alloc.deallocate(this.cast(), std::alloc::Layout::new::<Self>());
    }
}
