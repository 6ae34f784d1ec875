// SPDX-License-Identifier: BSD-3-Clause
//! Well-known allocation and deallocation entry points.

use std::fmt::Display;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// What a known runtime entry point does with memory.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocKind {
    AlignedAlloc,
    PosixAlignedAlloc,
    Calloc,
    Free,
    Malloc,
    Realloc,
    ReallocArray,
    OperatorNew,
    OperatorNewNothrow,
    OperatorNewAligned,
    OperatorNewAlignedNothrow,
    OperatorDelete,
    OperatorDeleteSized,
    OperatorDeleteAligned,
    OperatorDeleteAlignedSized,
}

impl AllocKind {
    pub fn name(self) -> &'static str {
        match self {
            AllocKind::AlignedAlloc => "aligned_alloc",
            AllocKind::PosixAlignedAlloc => "posix_aligned_alloc",
            AllocKind::Calloc => "calloc",
            AllocKind::Free => "free",
            AllocKind::Malloc => "malloc",
            AllocKind::Realloc => "realloc",
            AllocKind::ReallocArray => "realloc_array",
            AllocKind::OperatorNew => "operator_new",
            AllocKind::OperatorNewNothrow => "operator_new_nothrow",
            AllocKind::OperatorNewAligned => "operator_new_aligned",
            AllocKind::OperatorNewAlignedNothrow => "operator_new_aligned_nothrow",
            AllocKind::OperatorDelete => "operator_delete",
            AllocKind::OperatorDeleteSized => "operator_delete_sized",
            AllocKind::OperatorDeleteAligned => "operator_delete_aligned",
            AllocKind::OperatorDeleteAlignedSized => "operator_delete_aligned_sized",
        }
    }
}

impl Display for AllocKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

static ALLOC_FUNCTIONS: Lazy<FxHashMap<&'static str, AllocKind>> = Lazy::new(|| {
    use AllocKind::*;
    [
        ("aligned_alloc", AlignedAlloc),
        ("calloc", Calloc),
        ("free", Free),
        ("malloc", Malloc),
        ("memalign", AlignedAlloc),
        ("posix_memalign", PosixAlignedAlloc),
        ("realloc", Realloc),
        ("reallocarray", ReallocArray),
        // operator delete[] / operator delete
        ("_ZdaPv", OperatorDelete),
        ("_ZdaPvm", OperatorDeleteSized),
        ("_ZdaPvSt11align_val_t", OperatorDeleteAligned),
        ("_ZdaPvmSt11align_val_t", OperatorDeleteAlignedSized),
        ("_ZdlPv", OperatorDelete),
        ("_ZdlPvm", OperatorDeleteSized),
        ("_ZdlPvSt11align_val_t", OperatorDeleteAligned),
        ("_ZdlPvmSt11align_val_t", OperatorDeleteAlignedSized),
        // operator new[] / operator new
        ("_Znam", OperatorNew),
        ("_ZnamRKSt9nothrow_t", OperatorNewNothrow),
        ("_ZnamSt11align_val_t", OperatorNewAligned),
        ("_ZnamSt11align_val_tRKSt9nothrow_t", OperatorNewAlignedNothrow),
        ("_Znwm", OperatorNew),
        ("_ZnwmRKSt9nothrow_t", OperatorNewNothrow),
        ("_ZnwmSt11align_val_t", OperatorNewAligned),
        ("_ZnwmSt11align_val_tRKSt9nothrow_t", OperatorNewAlignedNothrow),
        //
        ("__builtin_calloc", Calloc),
        ("__builtin_free", Free),
        ("__builtin_malloc", Malloc),
        ("__builtin_operator_delete", OperatorDelete),
        ("__builtin_operator_new", OperatorNew),
        ("__builtin_realloc", Realloc),
        ("__libc_calloc", Calloc),
        ("__libc_free", Free),
        ("__libc_malloc", Malloc),
        ("__libc_memalign", AlignedAlloc),
        ("__libc_realloc", Realloc),
    ]
    .into_iter()
    .collect()
});

/// Look up a symbol name in the table of known allocator entry points.
#[inline]
pub fn alloc_kind(symbol: &str) -> Option<AllocKind> {
    ALLOC_FUNCTIONS.get(symbol).copied()
}

#[cfg(test)]
mod tests {
    use super::{alloc_kind, AllocKind, ALLOC_FUNCTIONS};

    #[test]
    fn libc() {
        assert_eq!(Some(AllocKind::Malloc), alloc_kind("malloc"));
        assert_eq!(Some(AllocKind::AlignedAlloc), alloc_kind("memalign"));
        assert_eq!(Some(AllocKind::AlignedAlloc), alloc_kind("__libc_memalign"));
        assert_eq!(Some(AllocKind::ReallocArray), alloc_kind("reallocarray"));
        assert_eq!(None, alloc_kind("mallocx"));
        assert_eq!(None, alloc_kind(""));
    }

    #[test]
    fn operators() {
        assert_eq!(Some(AllocKind::OperatorNew), alloc_kind("_Znwm"));
        assert_eq!(
            Some(AllocKind::OperatorNewAlignedNothrow),
            alloc_kind("_ZnamSt11align_val_tRKSt9nothrow_t")
        );
        assert_eq!(Some(AllocKind::OperatorDeleteSized), alloc_kind("_ZdlPvm"));
    }

    #[test]
    fn table() {
        assert_eq!(35, ALLOC_FUNCTIONS.len());
        assert_eq!("operator_delete_sized", AllocKind::OperatorDeleteSized.to_string());
    }
}
