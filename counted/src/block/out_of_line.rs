//! a control block which points to a separately allocated resource

use std::any::{Any, TypeId};
use std::ptr::{self, NonNull};

use super::{ControlBlock, Header};
use crate::alloc::RawAlloc;
use crate::deleter::Deleter;

/// Owns the resource through a raw pointer, and releases it with `D`
#[repr(C)]
pub struct OutOfLine<T: ?Sized, D, A> {
    header: Header,
    ptr: NonNull<T>,
    deleter: D,
    alloc: A,
}

impl<T: ?Sized, D: Deleter<T> + Any, A: RawAlloc + 'static> OutOfLine<T, D, A> {
    pub fn new(ptr: NonNull<T>, deleter: D, alloc: A) -> Self {
        Self {
            header: Header::new::<Self>(),
            ptr,
            deleter,
            alloc,
        }
    }

    /// releases the resource of a block that never made it to the heap
    pub fn abandon(mut self) {
        unsafe { self.deleter.delete(self.ptr) }
    }
}

unsafe impl<T: ?Sized, D: Deleter<T> + Any, A: RawAlloc + 'static> ControlBlock
    for OutOfLine<T, D, A>
{
    type Alloc = A;

    #[inline]
    fn alloc(&self) -> &A {
        &self.alloc
    }

    #[inline]
    unsafe fn get(this: NonNull<Self>) -> NonNull<()> {
        (*this.as_ptr()).ptr.cast()
    }

    unsafe fn deleter(this: NonNull<Self>, id: TypeId) -> Option<NonNull<()>> {
        if id == TypeId::of::<D>() {
            Some(NonNull::from(&(*this.as_ptr()).deleter).cast())
        } else {
            None
        }
    }

    unsafe fn destroy(this: NonNull<Self>) {
        let this = this.as_ptr();
        let ptr = (*this).ptr;
        (*this).deleter.delete(ptr)
    }

    unsafe fn destroy_block(this: NonNull<Self>) {
        let raw = this.as_ptr();
        let alloc = ptr::read(&(*raw).alloc);
        ptr::drop_in_place(&mut (*raw).deleter);
        alloc.deallocate(this.cast(), std::alloc::Layout::new::<Self>());
    }
}
