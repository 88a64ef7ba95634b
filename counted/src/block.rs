//! Control blocks
//!
//! Every block starts with a [`Header`] holding the two counters and a pointer
//! to a static [`VTable`]. The concrete block shapes live in the submodules and
//! are only ever seen by the constructors, everything else talks to a block
//! through a type erased [`BlockRef`].
//!
//! Every strong reference also owns one weak unit, so `weak >= strong` holds at
//! all times. The resource is destroyed when `strong` drops to zero, the block
//! is freed when `weak` does. Since a live strong reference keeps `weak`
//! positive, the block is always freed after the resource.

use std::any::TypeId;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::alloc::RawAlloc;

pub mod inline;
pub mod out_of_line;

pub use inline::Inline;
pub use out_of_line::OutOfLine;

/// The part of every control block that is shared by all block shapes
pub struct Header {
    strong: Cell<usize>,
    weak: Cell<usize>,
    vtable: &'static VTable,
}

impl Header {
    /// a header for a block of type `B`, with both counters at zero
    pub fn new<B: ControlBlock>() -> Self {
        Self {
            strong: Cell::new(0),
            weak: Cell::new(0),
            vtable: &VTableOf::<B>::VTABLE,
        }
    }
}

pub struct VTable {
    get: unsafe fn(NonNull<Header>) -> NonNull<()>,
    deleter: unsafe fn(NonNull<Header>, TypeId) -> Option<NonNull<()>>,
    destroy: unsafe fn(NonNull<Header>),
    destroy_block: unsafe fn(NonNull<Header>),
}

struct VTableOf<B>(PhantomData<B>);

impl<B: ControlBlock> VTableOf<B> {
    const VTABLE: VTable = VTable {
        get: Self::get,
        deleter: Self::deleter,
        destroy: Self::destroy,
        destroy_block: Self::destroy_block,
    };

    unsafe fn get(header: NonNull<Header>) -> NonNull<()> {
        B::get(header.cast())
    }

    unsafe fn deleter(header: NonNull<Header>, id: TypeId) -> Option<NonNull<()>> {
        B::deleter(header.cast(), id)
    }

    unsafe fn destroy(header: NonNull<Header>) {
        B::destroy(header.cast())
    }

    unsafe fn destroy_block(header: NonNull<Header>) {
        B::destroy_block(header.cast())
    }
}

/// A concrete control block shape
///
/// # Safety
///
/// * the implementing type must be `#[repr(C)]` with a [`Header`] created by
/// `Header::new::<Self>()` as its first field
/// * `destroy` must release the resource, it is called at most once
/// * `destroy_block` must free the memory the block was allocated in with the
/// allocator returned by `alloc`, and must not touch the resource
pub unsafe trait ControlBlock: Sized {
    /// the allocator this block was allocated with
    type Alloc: RawAlloc;

    fn alloc(&self) -> &Self::Alloc;

    /// # Safety
    ///
    /// `this` must point to a live block
    unsafe fn get(this: NonNull<Self>) -> NonNull<()>;

    /// # Safety
    ///
    /// `this` must point to a live block
    unsafe fn deleter(_this: NonNull<Self>, _id: TypeId) -> Option<NonNull<()>> {
        None
    }

    /// # Safety
    ///
    /// `this` must point to a live block whose resource has not been destroyed
    unsafe fn destroy(this: NonNull<Self>);

    /// # Safety
    ///
    /// `this` must point to a live block whose resource has been destroyed,
    /// `this` dangles after this call
    unsafe fn destroy_block(this: NonNull<Self>);
}

/// Moves `block` into memory obtained from its own allocator
///
/// This is the only place control blocks are allocated. On failure the block
/// is handed back untouched so the caller can dispose of the resource inside it.
pub fn allocate<B: ControlBlock>(block: B) -> Result<BlockRef, B> {
    let layout = std::alloc::Layout::new::<B>();

    let ptr = match block.alloc().allocate(layout) {
        Some(ptr) => ptr.cast::<B>(),
        None => {
            warn!(
                "failed to allocate a control block of {} bytes",
                layout.size()
            );
            return Err(block);
        }
    };

    unsafe {
        ptr.as_ptr().write(block);
    }

    trace!("allocated control block {:p}", ptr);

    Ok(BlockRef(ptr.cast()))
}

/// A type erased pointer to a live control block
///
/// `BlockRef` does not own anything by itself, every `BlockRef` held by a
/// handle is paired with one unit of the counter that handle represents.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BlockRef(NonNull<Header>);

impl BlockRef {
    #[inline]
    fn strong_cell(&self) -> &Cell<usize> {
        unsafe { &(*self.0.as_ptr()).strong }
    }

    #[inline]
    fn weak_cell(&self) -> &Cell<usize> {
        unsafe { &(*self.0.as_ptr()).weak }
    }

    #[inline]
    fn vtable(self) -> &'static VTable {
        unsafe { (*self.0.as_ptr()).vtable }
    }

    /// the number of strong references
    #[inline]
    pub fn strong(self) -> usize {
        self.strong_cell().get()
    }

    /// the raw weak counter, which includes one unit per strong reference
    #[inline]
    pub fn weak(self) -> usize {
        self.weak_cell().get()
    }

    /// the address of the block, used to compare ownership
    #[inline]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }

    /// the resource pointer stored in the block
    ///
    /// # Safety
    ///
    /// the block must be live
    #[inline]
    pub unsafe fn get(self) -> NonNull<()> {
        (self.vtable().get)(self.0)
    }

    /// # Safety
    ///
    /// the block must be live
    #[inline]
    pub unsafe fn deleter(self, id: TypeId) -> Option<NonNull<()>> {
        (self.vtable().deleter)(self.0, id)
    }

    /// # Safety
    ///
    /// the block must be live, and the resource must not have been destroyed
    #[inline]
    pub unsafe fn add_strong(self) {
        let strong = self.strong_cell();
        assert!(strong.get() != usize::MAX, "strong count overflow");
        strong.set(strong.get() + 1);
        self.add_weak();
    }

    /// adds a strong reference if the resource is still alive
    ///
    /// # Safety
    ///
    /// the block must be live
    #[inline]
    pub unsafe fn try_add_strong(self) -> bool {
        if self.strong() == 0 {
            false
        } else {
            self.add_strong();
            true
        }
    }

    /// # Safety
    ///
    /// * the caller must own one strong reference, which is consumed
    /// * the block may dangle after this call
    pub unsafe fn release_strong(self) {
        let strong = self.strong_cell();
        let count = strong.get();
        assert!(count > 0, "released a strong reference of a dead resource");
        strong.set(count - 1);

        if count == 1 {
            trace!("destroying the resource of control block {:p}", self.0);
            (self.vtable().destroy)(self.0);
        }

        self.release_weak()
    }

    /// # Safety
    ///
    /// the block must be live
    #[inline]
    pub unsafe fn add_weak(self) {
        let weak = self.weak_cell();
        assert!(weak.get() != usize::MAX, "weak count overflow");
        weak.set(weak.get() + 1);
    }

    /// # Safety
    ///
    /// * the caller must own one weak unit, which is consumed
    /// * the block may dangle after this call
    pub unsafe fn release_weak(self) {
        let weak = self.weak_cell();
        let count = weak.get();
        assert!(count > 0, "released a weak reference of a freed block");
        weak.set(count - 1);

        if count == 1 {
            debug_assert_eq!(self.strong(), 0);
            let destroy_block = self.vtable().destroy_block;
            trace!("freeing control block {:p}", self.0);
            destroy_block(self.0)
        }
    }
}

impl fmt::Debug for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockRef")
            .field("addr", &self.0)
            .field("strong", &self.strong())
            .field("weak", &self.weak())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::Global;
    use crate::alloc_prelude::Box;
    use std::rc::Rc;

    fn counting_block(drops: Rc<Cell<usize>>) -> BlockRef {
        let ptr = NonNull::from(Box::leak(Box::new(7_u32)));
        let deleter = move |ptr: NonNull<u32>| {
            drops.set(drops.get() + 1);
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        };

        match allocate(OutOfLine::new(ptr, deleter, Global)) {
            Ok(block) => block,
            Err(_) => panic!("allocation failed"),
        }
    }

    #[test]
    fn strong_implies_weak() {
        let drops = Rc::new(Cell::new(0));
        let block = counting_block(drops.clone());

        unsafe {
            block.add_strong();
            assert_eq!((block.strong(), block.weak()), (1, 1));

            block.add_strong();
            block.add_weak();
            assert_eq!((block.strong(), block.weak()), (2, 3));

            block.release_strong();
            assert_eq!((block.strong(), block.weak()), (1, 2));
            assert_eq!(drops.get(), 0);

            block.release_strong();
            assert_eq!((block.strong(), block.weak()), (0, 1));
            assert_eq!(drops.get(), 1);

            assert!(!block.try_add_strong());

            block.release_weak();
        }

        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn get_returns_resource() {
        let drops = Rc::new(Cell::new(0));
        let block = counting_block(drops);

        unsafe {
            block.add_strong();
            assert_eq!(*block.get().cast::<u32>().as_ref(), 7);
            block.release_strong();
        }
    }

    #[test]
    #[should_panic]
    fn release_without_strong() {
        let block = counting_block(Rc::new(Cell::new(0)));

        unsafe {
            block.add_weak();
            block.release_strong();
        }
    }
}
