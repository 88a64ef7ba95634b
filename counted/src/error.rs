use std::alloc::Layout;
use std::fmt;

/// The error return type of the fallible constructors of [`Shared`](crate::Shared)
///
/// Contains the value that could not be placed under shared ownership, and the
/// layout of the control block that could not be allocated
pub struct AllocError<T> {
    value: T,
    layout: Layout,
}

impl<T> AllocError<T> {
    pub(crate) fn new(value: T, layout: Layout) -> Self {
        Self { value, layout }
    }

    /// the layout of the control block which could not be allocated
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// recover the value
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> fmt::Debug for AllocError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocError")
            .field("layout", &self.layout)
            .finish()
    }
}

impl<T> fmt::Display for AllocError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to allocate a control block of {} bytes (align {})",
            self.layout.size(),
            self.layout.align()
        )
    }
}

#[cfg(feature = "std")]
impl<T> std::error::Error for AllocError<T> {}
