//! Non-owning handles
//!
//! A [`Weak`] keeps the control block alive, but not the resource. It can be
//! turned back into a [`Shared`] for as long as some other `Shared` keeps the
//! resource alive.
//!
//! Two resources holding `Shared` handles to each other are never destroyed.
//! Making one direction of the cycle `Weak` fixes that.

use std::fmt;

use crate::shared::{Raw, Shared};

/// A non-owning handle to a shared resource
pub struct Weak<T: ?Sized> {
    pub(crate) raw: Option<Raw<T>>,
}

impl<T: ?Sized> Weak<T> {
    /// create an empty weak handle, which is always expired
    #[inline]
    pub const fn new() -> Self {
        Self { raw: None }
    }

    /// the number of strong handles to the resource, `0` if expired or empty
    #[inline]
    pub fn use_count(&self) -> usize {
        self.raw.map_or(0, |raw| raw.block.strong())
    }

    /// the number of weak handles to the resource, including this one
    #[inline]
    pub fn weak_count(&self) -> usize {
        self.raw
            .map_or(0, |raw| raw.block.weak() - raw.block.strong())
    }

    /// `true` if the resource has been destroyed, or if this handle is empty
    #[inline]
    pub fn expired(&self) -> bool {
        self.use_count() == 0
    }

    /// A strong handle to the resource
    ///
    /// Returns an empty handle if the resource has been destroyed.
    #[inline]
    pub fn lock(&self) -> Shared<T> {
        Shared::from_weak(self)
    }

    /// `true` if both handles share a control block, whatever their types
    #[inline]
    pub fn owner_eq<U: ?Sized>(&self, other: &Weak<U>) -> bool {
        self.raw.map(|raw| raw.block) == other.raw.map(|raw| raw.block)
    }

    /// drop this handle's reference, leaving it empty
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// exchange the resources of two handles
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other)
    }
}

impl<T: ?Sized> From<&Shared<T>> for Weak<T> {
    #[inline]
    fn from(shared: &Shared<T>) -> Self {
        if let Some(raw) = shared.raw {
            unsafe { raw.block.add_weak() }
        }

        Self { raw: shared.raw }
    }
}

impl<T: ?Sized> Drop for Weak<T> {
    #[inline]
    fn drop(&mut self) {
        if let Some(raw) = self.raw {
            unsafe { raw.block.release_weak() }
        }
    }
}

impl<T: ?Sized> Clone for Weak<T> {
    #[inline]
    fn clone(&self) -> Self {
        if let Some(raw) = self.raw {
            unsafe { raw.block.add_weak() }
        }

        Self { raw: self.raw }
    }

    fn clone_from(&mut self, source: &Self) {
        if self.owner_eq(source) {
            self.raw = source.raw;
        } else {
            *self = source.clone();
        }
    }
}

impl<T: ?Sized> Default for Weak<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Weak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(Weak)")
    }
}
