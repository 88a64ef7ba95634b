//! Single-threaded shared ownership pointers built on an explicit control block
//!
//! [`Shared`] is an owning handle, [`Weak`] an observing one. Both point at a
//! control block which holds a strong and a weak counter and knows how to tear
//! down the resource it owns. The resource is destroyed when the last `Shared`
//! goes away, the block itself when the last handle of either kind does.
//!
//! Nothing in this crate is thread safe: the counters are plain [`Cell`]s and
//! every handle is `!Send` and `!Sync`.
//!
//! Reference cycles made of `Shared` handles are never collected, they leak.
//! Break them with [`Weak`].
//!
//! [`Cell`]: core::cell::Cell
#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]

#[cfg(not(feature = "std"))]
extern crate core as std;

extern crate alloc as alloc_crate;

mod alloc_prelude {
    cfg_if::cfg_if! {
        if #[cfg(feature = "std")] {
            pub use std::boxed::Box;
            pub use std::vec::Vec;
            pub use std::alloc::{alloc, dealloc};
        } else {
            pub use alloc_crate::boxed::Box;
            pub use alloc_crate::vec::Vec;
            pub use alloc_crate::alloc::{alloc, dealloc};
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "log")] {
        macro_rules! trace {
            ($($args:tt)*) => { log::trace!(target: "counted", $($args)*) };
        }

        macro_rules! warn {
            ($($args:tt)*) => { log::warn!(target: "counted", $($args)*) };
        }
    } else {
        macro_rules! trace {
            ($($args:tt)*) => {{ let _ = format_args!($($args)*); }};
        }

        macro_rules! warn {
            ($($args:tt)*) => {{ let _ = format_args!($($args)*); }};
        }
    }
}

pub mod alloc;
mod block;
pub mod deleter;
pub mod enable_shared;
mod error;
pub mod shared;
pub mod unique;
pub mod weak;

pub use self::alloc::{Global, RawAlloc};
pub use deleter::{ArrayDelete, DefaultDelete, Deleter, NoDelete};
pub use enable_shared::{EnableShared, WeakThis};
pub use error::AllocError;
pub use shared::{get_deleter, Shared};
pub use unique::Unique;
pub use weak::Weak;
