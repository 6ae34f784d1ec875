// SPDX-License-Identifier: BSD-3-Clause
//! Shared-ownership pointers for the program graph.
//!
//! Program graph nodes are immutable once a [`crate::llvm::Module`] is built,
//! so they are shared with [`triomphe::Arc`], which skips weak counts.
//! Names that must have a stable *identity* (instructions, parameters,
//! functions) are wrapped in [`UArc`] instead.

use std::fmt::Display;
use std::hash::Hash;
use std::ptr;

pub use triomphe::Arc;

/// A thread-safe, reference-counting pointer to a unique `T`.
///
/// Uniqueness means that the programmer asserts that no two `UArc<T>`s will
/// hold equal `T`-values. Based on this assumption, the [`Eq`] instance
/// simply compares the pointer values, and [`Hash`] just hashes the
/// pointer. Two instructions with equal contents in different places of a
/// module are therefore different values, which is exactly the identity the
/// origin tracer's visited set needs.
#[derive(Debug)]
pub struct UArc<T>(Arc<T>);

fn _assert_uarc_sync_send()
where
    UArc<()>: Send + Sync,
{
}

impl<T> UArc<T> {
    pub(crate) fn new(t: T) -> Self {
        Self(Arc::new(t))
    }
}

impl<T> Clone for UArc<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// Hashes the pointer
impl<T> Hash for UArc<T> {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        ptr::hash(Arc::as_ptr(&self.0), state)
    }
}

/// Compares the pointers
impl<T> PartialEq for UArc<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

/// Compares the pointers
impl<T> Eq for UArc<T> {}

/// Only displays the value
impl<T: Display> Display for UArc<T> {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<T> std::ops::Deref for UArc<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

#[cfg(test)]
mod tests {
    use super::UArc;

    #[test]
    fn identity_not_contents() {
        let a = UArc::new(String::from("x"));
        let b = UArc::new(String::from("x"));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(*a, *b);
    }
}
