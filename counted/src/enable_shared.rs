//! Handing out handles to `self`
//!
//! A type that wants to create [`Shared`] handles to itself from its own
//! methods embeds a [`WeakThis`] and implements [`EnableShared`]. The
//! `WeakThis` starts out empty, and is filled in when the value is first put
//! under shared ownership through one of the `*_enabled` constructors, or
//! by passing any handle through [`Shared::enable`].
//!
//! ```
//! use counted::{EnableShared, Shared, WeakThis};
//!
//! struct Node {
//!     this: WeakThis<Node>,
//!     value: u32,
//! }
//!
//! impl EnableShared for Node {
//!     fn weak_this(&self) -> &WeakThis<Self> {
//!         &self.this
//!     }
//! }
//!
//! let node = Shared::new_enabled(Node { this: WeakThis::new(), value: 3 });
//! let again = node.shared_from_this();
//!
//! assert!(again == node);
//! assert_eq!(node.use_count(), 2);
//! ```

use std::cell::Cell;
use std::fmt;

use crate::alloc::{Global, RawAlloc};
use crate::alloc_prelude::Box;
use crate::deleter::Deleter;
use crate::error::AllocError;
use crate::shared::Shared;
use crate::unique::Unique;
use crate::weak::Weak;

/// A weak handle a value holds to itself
///
/// Cloning a `WeakThis` yields an empty one, a copy of a value is a different
/// resource.
pub struct WeakThis<T: ?Sized> {
    weak: Cell<Weak<T>>,
}

impl<T: ?Sized> WeakThis<T> {
    /// create an empty `WeakThis`
    #[inline]
    pub const fn new() -> Self {
        Self {
            weak: Cell::new(Weak::new()),
        }
    }

    /// A strong handle to the owning resource
    ///
    /// Empty if the value was never placed under shared ownership, or if that
    /// ownership has ended.
    pub fn lock(&self) -> Shared<T> {
        let weak = self.weak.take();
        let shared = weak.lock();
        self.weak.set(weak);
        shared
    }

    /// a weak handle to the owning resource
    pub fn get(&self) -> Weak<T> {
        let weak = self.weak.take();
        let copy = weak.clone();
        self.weak.set(weak);
        copy
    }

    /// `true` once the value has been placed under shared ownership
    pub fn is_installed(&self) -> bool {
        let weak = self.weak.take();
        let installed = weak.use_count() != 0;
        self.weak.set(weak);
        installed
    }

    /// Point this at the resource owned by `shared`
    ///
    /// Does nothing if this already points at a live resource.
    fn install(&self, shared: &Shared<T>) {
        let current = self.weak.take();

        if current.expired() {
            trace!("installing self reference");
            self.weak.set(Shared::downgrade(shared));
        } else {
            self.weak.set(current);
        }
    }
}

impl<T: ?Sized> Default for WeakThis<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for WeakThis<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for WeakThis<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(WeakThis)")
    }
}

/// A value which can hand out shared handles to itself
pub trait EnableShared {
    /// the self reference embedded in this value
    fn weak_this(&self) -> &WeakThis<Self>;

    /// A new strong handle to this value
    ///
    /// Empty if this value isn't under shared ownership, which is a bug in the
    /// caller.
    fn shared_from_this(&self) -> Shared<Self> {
        self.weak_this().lock()
    }

    /// a new weak handle to this value
    fn weak_from_this(&self) -> Weak<Self> {
        self.weak_this().get()
    }
}

impl<T: EnableShared + ?Sized> Shared<T> {
    /// Let the resource of `this` hand out handles to itself
    ///
    /// Works on a handle from any constructor. Does nothing for an empty
    /// handle, or if the resource is already enabled.
    ///
    /// ```
    /// use counted::{EnableShared, Shared, Unique, WeakThis};
    ///
    /// struct Node(WeakThis<Node>);
    ///
    /// impl EnableShared for Node {
    ///     fn weak_this(&self) -> &WeakThis<Self> {
    ///         &self.0
    ///     }
    /// }
    ///
    /// let unique = Unique::new(Box::new(Node(WeakThis::new())));
    /// let node: Shared<Node> = Shared::enable(Shared::from(unique));
    ///
    /// assert!(node.shared_from_this() == node);
    /// ```
    pub fn enable(this: Self) -> Self {
        if let Some(value) = this.get() {
            value.weak_this().install(&this);
        }

        this
    }

    /// like [`Shared::from_box`], and lets the value hand out handles to itself
    #[inline]
    pub fn from_box_enabled(value: Box<T>) -> Self {
        Self::enable(Self::from_box(value))
    }

    /// like [`Shared::from_box_in`], and lets the value hand out handles to itself
    #[inline]
    pub fn from_box_enabled_in<A: RawAlloc + 'static>(value: Box<T>, alloc: A) -> Self {
        Self::enable(Self::from_box_in(value, alloc))
    }

    /// like [`Shared::from_raw_in`], and lets the value hand out handles to itself
    ///
    /// # Safety
    ///
    /// same as [`Shared::from_raw_in`]
    #[inline]
    pub unsafe fn from_raw_enabled_in<D, A>(ptr: *mut T, deleter: D, alloc: A) -> Self
    where
        D: Deleter<T> + 'static,
        A: RawAlloc + 'static,
    {
        Self::enable(Self::from_raw_in(ptr, deleter, alloc))
    }

    /// like [`Shared::from_unique_in`], and lets the value hand out handles to
    /// itself
    #[inline]
    pub fn from_unique_enabled_in<D, A>(unique: Unique<T, D>, alloc: A) -> Self
    where
        D: Deleter<T> + 'static,
        A: RawAlloc + 'static,
    {
        Self::enable(Self::from_unique_in(unique, alloc))
    }
}

impl<T: EnableShared> Shared<T> {
    /// like [`Shared::new`], and lets the value hand out handles to itself
    #[inline]
    pub fn new_enabled(value: T) -> Self {
        Self::new_enabled_in(value, Global)
    }

    /// like [`Shared::new_in`], and lets the value hand out handles to itself
    #[inline]
    pub fn new_enabled_in<A: RawAlloc + 'static>(value: T, alloc: A) -> Self {
        Self::enable(Self::new_in(value, alloc))
    }

    /// like [`Shared::try_new_in`], and lets the value hand out handles to
    /// itself
    #[inline]
    pub fn try_new_enabled_in<A: RawAlloc + 'static>(
        value: T,
        alloc: A,
    ) -> Result<Self, AllocError<T>> {
        Self::try_new_in(value, alloc).map(Self::enable)
    }
}
