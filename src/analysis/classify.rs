// SPDX-License-Identifier: BSD-3-Clause
//! Allocation classifier
//!
//! Decides whether an origin found by the tracer is a "known, bounded"
//! source of pointers: an allocation (stack or heap), a global, a function,
//! or one of a few constants. Everything else, e.g. parameters of entry
//! points, calls to unknown external functions, and unresolved indirect
//! calls, is *non-allocating*; those are the origins worth a closer look.

use std::fmt::Display;

use crate::{
    alloc::{alloc_kind, AllocKind},
    demangle::{Demangler, CppDemangler},
    llvm::constant::Constant,
    llvm::instruction::{Call, Opcode},
    llvm::{Callee, Invoke, LocalName, Operand, TerminatorOpcode},
    signatures::{AllocType, Signatures},
};

use super::origin::{Def, Graph};

/// Coarse description of an origin
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginKind {
    /// `alloca`
    Stack,
    /// Call to a well-known allocator or deallocator
    Allocator(AllocKind),
    /// Call to a function described by a user-supplied signature
    Signature(AllocType),
    /// Call into the C++ standard library
    StdCall,
    LandingPad,
    Global,
    Function,
    Null,
    Poison,
    DataArray,
    /// Any other constant
    Constant,
    /// Call to a function without a body
    ExternalCall,
    /// Indirect call or inline assembly
    UnresolvedCall,
    /// Parameter with no (or incompletely known) callers
    Argument,
    /// Any other instruction
    Instruction,
}

impl OriginKind {
    pub fn is_allocating(self) -> bool {
        match self {
            OriginKind::Stack
            | OriginKind::Allocator(_)
            | OriginKind::StdCall
            | OriginKind::LandingPad
            | OriginKind::Global
            | OriginKind::Function
            | OriginKind::Null
            | OriginKind::Poison
            | OriginKind::DataArray => true,
            OriginKind::Signature(t) => t != AllocType::Top,
            OriginKind::Constant
            | OriginKind::ExternalCall
            | OriginKind::UnresolvedCall
            | OriginKind::Argument
            | OriginKind::Instruction => false,
        }
    }
}

impl Display for OriginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OriginKind::Stack => write!(f, "stack"),
            OriginKind::Allocator(k) => write!(f, "allocator ({})", k),
            OriginKind::Signature(t) => write!(f, "signature ({:?})", t),
            OriginKind::StdCall => write!(f, "std call"),
            OriginKind::LandingPad => write!(f, "landing pad"),
            OriginKind::Global => write!(f, "global"),
            OriginKind::Function => write!(f, "function"),
            OriginKind::Null => write!(f, "null"),
            OriginKind::Poison => write!(f, "poison"),
            OriginKind::DataArray => write!(f, "data array"),
            OriginKind::Constant => write!(f, "constant"),
            OriginKind::ExternalCall => write!(f, "external call"),
            OriginKind::UnresolvedCall => write!(f, "unresolved call"),
            OriginKind::Argument => write!(f, "argument"),
            OriginKind::Instruction => write!(f, "instruction"),
        }
    }
}

pub struct Classifier {
    signatures: Signatures,
    demangler: Box<dyn Demangler>,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("signatures", &self.signatures)
            .finish_non_exhaustive()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier::new(Signatures::default())
    }
}

impl Classifier {
    pub fn new(signatures: Signatures) -> Self {
        Classifier {
            signatures,
            demangler: Box::new(CppDemangler),
        }
    }

    pub fn with_demangler(self, demangler: Box<dyn Demangler>) -> Self {
        Classifier {
            demangler,
            ..self
        }
    }

    /// Classify a call by the symbol name of its direct callee: first the
    /// table of well-known allocators, then user signatures, then the
    /// standard-library prefix.
    pub fn callee(&self, symbol: &str) -> OriginKind {
        if let Some(k) = alloc_kind(symbol) {
            return OriginKind::Allocator(k);
        }
        if let Some(t) = self.signatures.return_alloc(symbol) {
            return OriginKind::Signature(t);
        }
        if self.demangler.is_std(symbol) {
            return OriginKind::StdCall;
        }
        OriginKind::ExternalCall
    }

    fn call(&self, callee: &Callee) -> OriginKind {
        match callee.direct() {
            Some(f) => self.callee(f.get()),
            None => OriginKind::UnresolvedCall,
        }
    }

    pub fn classify(&self, graph: &Graph<'_>, origin: &Operand) -> OriginKind {
        match origin {
            Operand::Constant(c) => match &**c {
                Constant::Function(_) => OriginKind::Function,
                Constant::Global(_) => OriginKind::Global,
                Constant::Null => OriginKind::Null,
                Constant::Poison => OriginKind::Poison,
                Constant::DataArray(_) => OriginKind::DataArray,
                _ => OriginKind::Constant,
            },
            Operand::Metadata => OriginKind::Constant,
            Operand::Local(LocalName::Parameter(_)) => OriginKind::Argument,
            Operand::Local(LocalName::Instruction(i)) => match graph.def(i) {
                Some(Def::Instruction(Opcode::Alloca(_))) => OriginKind::Stack,
                Some(Def::Instruction(Opcode::LandingPad)) => OriginKind::LandingPad,
                Some(Def::Instruction(Opcode::Call(Call { callee, .. }))) => self.call(callee),
                Some(Def::Terminator(TerminatorOpcode::Invoke(Invoke { callee, .. }))) => {
                    self.call(callee)
                }
                _ => OriginKind::Instruction,
            },
        }
    }

    pub fn is_allocating(&self, graph: &Graph<'_>, origin: &Operand) -> bool {
        self.classify(graph, origin).is_allocating()
    }
}
