//! Viewing a shared resource at a different type
//!
//! Every cast shares the control block of its source: a successful cast adds
//! one strong reference, a failed one adds nothing and yields an empty handle.
//! The source handle is never consumed.

use std::any::Any;
use std::ptr::NonNull;

use super::{Raw, Shared};

impl<T: ?Sized + 'static> Shared<T> {
    /// Share the resource under a different type
    ///
    /// `f` projects the resource to the part that the new handle points to.
    /// This covers upcasts to trait objects as well as handles to fields.
    ///
    /// ```
    /// use counted::Shared;
    /// use std::fmt::Display;
    ///
    /// let value = Shared::new(12_u32);
    /// let shown: Shared<dyn Display> = Shared::map(&value, |v| v as &dyn Display);
    ///
    /// assert_eq!(shown.to_string(), "12");
    /// assert_eq!(value.use_count(), 2);
    /// assert!(shown == value);
    /// ```
    pub fn map<U: ?Sized, F: FnOnce(&T) -> &U>(this: &Self, f: F) -> Shared<U> {
        Self::dynamic_cast(this, move |value| Some(f(value)))
    }

    /// Share the resource under a different type, if `f` allows it
    ///
    /// Returns an empty handle and leaves the counters alone if `f` returns
    /// `None`.
    pub fn dynamic_cast<U: ?Sized, F: FnOnce(&T) -> Option<&U>>(this: &Self, f: F) -> Shared<U> {
        let raw = match this.raw {
            Some(raw) => raw,
            None => return Shared::empty(),
        };

        let ptr = match f(unsafe { &*raw.ptr.as_ptr() }) {
            Some(value) => NonNull::from(value),
            None => return Shared::empty(),
        };

        unsafe {
            raw.block.add_strong();
            Shared::from_raw_parts(Raw {
                ptr,
                block: raw.block,
            })
        }
    }

    /// Share the resource as a `U` without any check
    ///
    /// # Safety
    ///
    /// the resource must be a valid `U`
    pub unsafe fn cast<U>(this: &Self) -> Shared<U> {
        match this.raw {
            Some(raw) => {
                raw.block.add_strong();
                Shared::from_raw_parts(Raw {
                    ptr: raw.ptr.cast(),
                    block: raw.block,
                })
            }
            None => Shared::empty(),
        }
    }

    /// A mutable reference to a resource which is shared
    ///
    /// This is the cast that drops constness. It returns a reference borrowed
    /// from this handle rather than a new handle, so the counters are left
    /// alone and `self` keeps the resource alive while the reference is used.
    ///
    /// # Panics
    ///
    /// if this handle is empty
    ///
    /// # Safety
    ///
    /// no other reference to the resource may be live while the returned one
    /// is, through this handle or any other
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn cast_mut(&self) -> &mut T {
        match self.raw {
            Some(raw) => &mut *raw.ptr.as_ptr(),
            None => panic!("dereferenced an empty `Shared`"),
        }
    }
}

impl<T: Any> Shared<T> {
    /// erase the type of the resource, keeping this handle's reference
    pub fn into_any(mut this: Self) -> Shared<dyn Any> {
        match this.raw.take() {
            Some(raw) => unsafe {
                Shared::from_raw_parts(Raw {
                    ptr: NonNull::new_unchecked(raw.ptr.as_ptr() as *mut dyn Any),
                    block: raw.block,
                })
            },
            None => Shared::empty(),
        }
    }
}

impl Shared<dyn Any> {
    /// Share the resource as a `U`, if that is what it is
    ///
    /// ```
    /// use counted::Shared;
    ///
    /// let any = Shared::into_any(Shared::new(5_i64));
    ///
    /// assert!(Shared::downcast::<String>(&any).is_null());
    /// assert_eq!(*Shared::downcast::<i64>(&any), 5);
    /// ```
    pub fn downcast<U: Any>(this: &Self) -> Shared<U> {
        Self::dynamic_cast(this, <dyn Any>::downcast_ref::<U>)
    }
}
