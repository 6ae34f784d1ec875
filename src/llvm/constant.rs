// SPDX-License-Identifier: BSD-3-Clause
use std::fmt::Display;

use crate::arc::{Arc, UArc};

use super::name::{FunctionName, GlobalName};

/// Constants and constant expressions.
///
/// Constants are compared structurally, mirroring LLVM's uniquing of
/// constants: two `null`s are the same value, as are two references to the
/// same global.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Constant {
    Function(UArc<FunctionName>),
    Global(Arc<GlobalName>),
    Int { bits: u32, value: u64 },
    Null,
    Undef,
    Poison,
    AggregateZero,
    /// Array of plain data elements, e.g., a string literal
    DataArray(Vec<u64>),
    Array(Vec<Arc<Constant>>),
    Struct(Vec<Arc<Constant>>),
    // Expressions
    AddrSpaceCast(Arc<Constant>),
    BitCast(Arc<Constant>),
    GetElementPtr(Arc<Constant>),
    IntToPtr(Arc<Constant>),
    PtrToInt(Arc<Constant>),
    //
    Other,
}

impl Constant {
    /// The function a constant refers to, looking through pointer casts.
    pub fn function(&self) -> Option<&UArc<FunctionName>> {
        match self {
            Constant::Function(f) => Some(f),
            Constant::BitCast(c) | Constant::AddrSpaceCast(c) => c.function(),
            _ => None,
        }
    }

    /// The global variable a constant addresses, looking through
    /// [`Constant::look_through`] expressions.
    pub fn global(&self) -> Option<&Arc<GlobalName>> {
        match self {
            Constant::Global(g) => Some(g),
            _ => self.look_through()?.global(),
        }
    }

    /// The operand of a zero-cost constant expression, i.e., one that yields
    /// the same address as its operand (modulo a constant offset).
    pub(crate) fn look_through(&self) -> Option<&Arc<Constant>> {
        match self {
            Constant::AddrSpaceCast(c) | Constant::BitCast(c) | Constant::GetElementPtr(c) => {
                Some(c)
            }
            // No `_` pattern to ensure this is updated if the type changes
            Constant::Function(_) => None,
            Constant::Global(_) => None,
            Constant::Int { .. } => None,
            Constant::Null => None,
            Constant::Undef => None,
            Constant::Poison => None,
            Constant::AggregateZero => None,
            Constant::DataArray(_) => None,
            Constant::Array(_) => None,
            Constant::Struct(_) => None,
            Constant::IntToPtr(_) => None,
            Constant::PtrToInt(_) => None,
            Constant::Other => None,
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Function(func) => write!(f, "{}", func),
            Constant::Global(g) => write!(f, "{}", g),
            Constant::Int { value, bits } => write!(f, "i{} {}", bits, value),
            Constant::Null => write!(f, "null"),
            Constant::Undef => write!(f, "undef"),
            Constant::Poison => write!(f, "poison"),
            Constant::AggregateZero => write!(f, "zeroinitializer"),
            Constant::DataArray(elems) => write!(f, "<data array of {}>", elems.len()),
            Constant::Array(elems) => write!(
                f,
                "[ {} ]",
                elems
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Constant::Struct(fields) => write!(
                f,
                "{{ {} }}",
                fields
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Constant::AddrSpaceCast(c) => write!(f, "addrspacecast({})", c),
            Constant::BitCast(c) => write!(f, "bitcast({})", c),
            Constant::GetElementPtr(c) => write!(f, "getelementptr({})", c),
            Constant::IntToPtr(c) => write!(f, "inttoptr({})", c),
            Constant::PtrToInt(c) => write!(f, "ptrtoint({})", c),
            Constant::Other => write!(f, "<some constant>"),
        }
    }
}
