// SPDX-License-Identifier: BSD-3-Clause
use crate::arc::{Arc, UArc};

use super::constant::Constant;
use super::name::{FunctionName, InstructionName, LocalName, ParameterName};

/// A use of a value: the handle the origin tracer walks over.
///
/// Cloning is cheap (reference-count bumps only), and equality is value
/// identity: locals compare by the identity of their defining instruction
/// or parameter, constants structurally.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Operand {
    Constant(Arc<Constant>),
    Local(LocalName),
    Metadata,
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Constant(c) => write!(f, "{}", c),
            Operand::Local(l) => write!(f, "{}", l),
            Operand::Metadata => write!(f, "<metadata>"),
        }
    }
}

impl Operand {
    pub fn constant(c: Constant) -> Self {
        Operand::Constant(Arc::new(c))
    }

    pub fn instruction(i: UArc<InstructionName>) -> Self {
        Operand::Local(LocalName::Instruction(i))
    }

    pub fn parameter(p: UArc<ParameterName>) -> Self {
        Operand::Local(LocalName::Parameter(p))
    }

    pub fn function(f: UArc<FunctionName>) -> Self {
        Operand::constant(Constant::Function(f))
    }

    pub fn null() -> Self {
        Operand::constant(Constant::Null)
    }

    pub fn int(bits: u32, value: u64) -> Self {
        Operand::constant(Constant::Int { bits, value })
    }

    pub(crate) fn instruction_name(&self) -> Option<&UArc<InstructionName>> {
        match self {
            Operand::Local(LocalName::Instruction(i)) => Some(i),
            _ => None,
        }
    }

    /// The function whose body defines this operand, if it is a local.
    pub fn parent_function(&self) -> Option<&UArc<FunctionName>> {
        match self {
            Operand::Local(l) => Some(l.function()),
            Operand::Constant(_) => None,
            Operand::Metadata => None,
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Callee {
    Operand(Operand),
    Asm,
}

impl Callee {
    /// The statically known target, looking through constant pointer casts.
    /// `None` for indirect calls and inline assembly.
    pub fn direct(&self) -> Option<&UArc<FunctionName>> {
        match self {
            Callee::Operand(Operand::Constant(c)) => c.function(),
            Callee::Operand(_) => None,
            Callee::Asm => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Callee, Operand};
    use crate::arc::UArc;
    use crate::llvm::constant::Constant;
    use crate::llvm::FunctionName;

    #[test]
    fn direct_callee_through_bitcast() {
        let f = UArc::new(FunctionName::from("f"));
        let cast = Operand::constant(Constant::BitCast(crate::arc::Arc::new(
            Constant::Function(f.clone()),
        )));
        assert_eq!(Some(&f), Callee::Operand(cast).direct());
        assert_eq!(None, Callee::Operand(Operand::null()).direct());
        assert_eq!(None, Callee::Asm.direct());
    }

    #[test]
    fn constants_compare_structurally() {
        assert_eq!(Operand::null(), Operand::null());
        assert_eq!(Operand::int(64, 3), Operand::int(64, 3));
        assert_ne!(Operand::int(64, 3), Operand::int(32, 3));
    }
}
