use std::fmt;

/// Opaque token handed to native callers in place of an object reference.
///
/// Zero is never allocated and doubles as the "no object" value inside the
/// boundary structures. A handle carries no kind: which registry table it is
/// looked up in decides what it names.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Handle(u64);

impl Handle {
    pub const NULL: Handle = Handle(0);

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Handle {
    #[inline]
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<Handle> for u64 {
    #[inline]
    fn from(h: Handle) -> Self {
        h.0
    }
}
