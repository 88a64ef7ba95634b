//! Random sequences of handle operations against a model of the counters

use counted::{Global, RawAlloc, Shared, Weak};
use proptest::prelude::*;
use proptest::sample::Index;

use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;
use std::rc::Rc;

#[derive(Default)]
struct Ledger {
    drops: Cell<usize>,
    allocs: Cell<usize>,
    frees: Cell<usize>,
    freed_before_drop: Cell<bool>,
}

struct Tracked(Rc<Ledger>);

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.drops.set(self.0.drops.get() + 1);
    }
}

/// forwards to `Global`, writing every call into the ledger
#[derive(Clone)]
struct Counting(Rc<Ledger>);

unsafe impl RawAlloc for Counting {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        self.0.allocs.set(self.0.allocs.get() + 1);
        Global.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if self.0.drops.get() == 0 {
            self.0.freed_before_drop.set(true);
        }

        self.0.frees.set(self.0.frees.get() + 1);
        Global.deallocate(ptr, layout)
    }
}

#[derive(Debug, Clone)]
enum Op {
    Clone(Index),
    Drop(Index),
    Take(Index),
    Downgrade(Index),
    Lock(Index),
    DropWeak(Index),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<Index>().prop_map(Op::Clone),
        any::<Index>().prop_map(Op::Drop),
        any::<Index>().prop_map(Op::Take),
        any::<Index>().prop_map(Op::Downgrade),
        any::<Index>().prop_map(Op::Lock),
        any::<Index>().prop_map(Op::DropWeak),
    ]
}

fn run(ops: Vec<Op>, inline: bool) -> Result<(), TestCaseError> {
    let ledger = Rc::new(Ledger::default());
    let value = Tracked(ledger.clone());
    let alloc = Counting(ledger.clone());

    let first = if inline {
        Shared::new_in(value, alloc)
    } else {
        Shared::from_box_in(Box::new(value), alloc)
    };

    let mut strong = vec![first];
    let mut weak: Vec<Weak<Tracked>> = Vec::new();

    for op in ops {
        match op {
            Op::Clone(i) if !strong.is_empty() => {
                let copy = strong[i.index(strong.len())].clone();
                strong.push(copy);
            }
            Op::Drop(i) if !strong.is_empty() => {
                strong.swap_remove(i.index(strong.len()));
            }
            Op::Take(i) if !strong.is_empty() => {
                let i = i.index(strong.len());
                let moved = strong[i].take();
                prop_assert!(strong[i].is_null());
                strong.push(moved);
            }
            Op::Downgrade(i) if !strong.is_empty() => {
                weak.push(Shared::downgrade(&strong[i.index(strong.len())]));
            }
            Op::Lock(i) if !weak.is_empty() => {
                strong.push(weak[i.index(weak.len())].lock());
            }
            Op::DropWeak(i) if !weak.is_empty() => {
                weak.swap_remove(i.index(weak.len()));
            }
            _ => {}
        }

        let live = strong.iter().filter(|h| !h.is_null()).count();
        let observing = weak.iter().filter(|w| w.weak_count() != 0).count();

        for handle in strong.iter().filter(|h| !h.is_null()) {
            prop_assert_eq!(handle.use_count(), live);
            prop_assert_eq!(handle.weak_count(), observing);
        }

        for handle in weak.iter().filter(|w| w.weak_count() != 0) {
            prop_assert_eq!(handle.use_count(), live);
            prop_assert_eq!(handle.expired(), live == 0);
        }

        prop_assert_eq!(ledger.allocs.get(), 1);
        prop_assert_eq!(ledger.drops.get(), (live == 0) as usize);
        prop_assert_eq!(ledger.frees.get(), (live == 0 && observing == 0) as usize);
    }

    drop(strong);
    drop(weak);

    prop_assert_eq!(ledger.allocs.get(), 1);
    prop_assert_eq!(ledger.drops.get(), 1);
    prop_assert_eq!(ledger.frees.get(), 1);
    prop_assert!(!ledger.freed_before_drop.get());

    Ok(())
}

proptest! {
    #[test]
    fn inline_block(ops in prop::collection::vec(op_strategy(), 0..64)) {
        run(ops, true)?;
    }

    #[test]
    fn out_of_line_block(ops in prop::collection::vec(op_strategy(), 0..64)) {
        run(ops, false)?;
    }
}

#[test]
fn refused_allocation_drops_value() {
    #[derive(Clone)]
    struct Refuse(Rc<Ledger>);

    unsafe impl RawAlloc for Refuse {
        fn allocate(&self, _: Layout) -> Option<NonNull<u8>> {
            self.0.allocs.set(self.0.allocs.get() + 1);
            None
        }

        unsafe fn deallocate(&self, _: NonNull<u8>, _: Layout) {
            self.0.frees.set(self.0.frees.get() + 1);
        }
    }

    let ledger = Rc::new(Ledger::default());

    let inline = Shared::new_in(Tracked(ledger.clone()), Refuse(ledger.clone()));
    assert!(inline.is_null());
    assert_eq!(ledger.drops.get(), 1);

    let boxed = Shared::from_box_in(Box::new(Tracked(ledger.clone())), Refuse(ledger.clone()));
    assert!(boxed.is_null());
    assert_eq!(ledger.drops.get(), 2);

    let err = match Shared::try_new_in(Tracked(ledger.clone()), Refuse(ledger.clone())) {
        Ok(_) => panic!("allocation should have been refused"),
        Err(err) => err,
    };
    assert_eq!(ledger.drops.get(), 2);
    drop(err.into_inner());
    assert_eq!(ledger.drops.get(), 3);

    assert_eq!(ledger.allocs.get(), 3);
    assert_eq!(ledger.frees.get(), 0);
}
