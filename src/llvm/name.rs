// SPDX-License-Identifier: BSD-3-Clause
use std::fmt::Display;

use crate::arc::UArc;

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct GlobalName(String);

impl GlobalName {
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GlobalName {
    fn from(s: &str) -> Self {
        GlobalName(s.to_string())
    }
}

impl From<String> for GlobalName {
    fn from(s: String) -> Self {
        GlobalName(s)
    }
}

impl Display for GlobalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// The (mangled) symbol name of a function.
///
/// Within a module every function name is allocated exactly once and shared
/// as a `UArc<FunctionName>`, so comparing two of those compares pointers.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FunctionName(String);

impl From<&str> for FunctionName {
    fn from(s: &str) -> Self {
        FunctionName(s.to_string())
    }
}

impl From<String> for FunctionName {
    fn from(s: String) -> Self {
        FunctionName(s)
    }
}

impl<T> PartialEq<T> for FunctionName
where
    T: AsRef<str>,
{
    fn eq(&self, other: &T) -> bool {
        self.0.as_str().eq(other.as_ref())
    }
}

impl FunctionName {
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for FunctionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct BlockName {
    parent_function: UArc<FunctionName>,
    label: String,
}

impl BlockName {
    pub(crate) fn new(parent_function: UArc<FunctionName>, label: String) -> Self {
        Self {
            parent_function,
            label,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Display for BlockName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.parent_function.get(), self.label)
    }
}

/// Position of an instruction (or terminator) within its function.
///
/// Terminators get index `instrs.len()` of their block.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct InstructionName {
    parent_function: UArc<FunctionName>,
    parent_block: UArc<BlockName>,
    idx: usize,
}

impl InstructionName {
    pub(crate) fn new(
        parent_function: UArc<FunctionName>,
        parent_block: UArc<BlockName>,
        idx: usize,
    ) -> Self {
        Self {
            parent_function,
            parent_block,
            idx,
        }
    }

    #[inline]
    pub fn function(&self) -> &UArc<FunctionName> {
        &self.parent_function
    }

    #[inline]
    pub fn block(&self) -> &UArc<BlockName> {
        &self.parent_block
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.idx
    }
}

impl Display for InstructionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.parent_block, self.idx)
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ParameterName {
    parent_function: UArc<FunctionName>,
    name: String,
    position: usize,
}

impl ParameterName {
    pub(crate) fn new(parent_function: UArc<FunctionName>, name: String, position: usize) -> Self {
        Self {
            parent_function,
            name,
            position,
        }
    }

    #[inline]
    pub fn function(&self) -> &UArc<FunctionName> {
        &self.parent_function
    }

    /// Zero-based position in the parameter list
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }
}

impl Display for ParameterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:%{}", self.parent_function.get(), self.name)
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum LocalName {
    Parameter(UArc<ParameterName>),
    Instruction(UArc<InstructionName>),
}

impl LocalName {
    pub fn function(&self) -> &UArc<FunctionName> {
        match self {
            LocalName::Parameter(p) => p.function(),
            LocalName::Instruction(i) => i.function(),
        }
    }
}

impl Display for LocalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalName::Parameter(p) => write!(f, "{}", p),
            LocalName::Instruction(i) => write!(f, "{}", i),
        }
    }
}
