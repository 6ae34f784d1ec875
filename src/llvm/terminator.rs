// SPDX-License-Identifier: BSD-3-Clause
use super::operand::{Callee, Operand};
use super::Ty;

/// `invoke` is a call that is also a block terminator (it has an unwind
/// edge). For origin tracing it behaves exactly like [`super::instruction::Call`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Invoke {
    pub callee: Callee,
    pub args: Vec<Operand>,
    /// Parallel to `args`
    pub arg_tys: Vec<Ty>,
}

impl Invoke {
    pub(crate) fn operands(&self) -> Vec<Operand> {
        let mut v = self.args.clone();
        match &self.callee {
            Callee::Operand(o) => v.push(o.clone()),
            Callee::Asm => (),
        };
        v
    }

    /// Arguments of pointer type, with their positions
    pub fn pointer_args(&self) -> impl Iterator<Item = (usize, &Operand)> + '_ {
        self.args
            .iter()
            .zip(&self.arg_tys)
            .enumerate()
            .filter(|(_, (_, ty))| ty.is_pointer())
            .map(|(i, (op, _))| (i, op))
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Ret {
    pub operand: Option<Operand>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum TerminatorOpcode {
    Invoke(Invoke),
    Ret(Ret),
    Other,
}

impl TerminatorOpcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            TerminatorOpcode::Invoke(_) => "invoke",
            TerminatorOpcode::Ret(_) => "ret",
            TerminatorOpcode::Other => "<other terminator>",
        }
    }

    pub(crate) fn operands(&self) -> Vec<Operand> {
        match self {
            TerminatorOpcode::Invoke(t) => t.operands(),
            TerminatorOpcode::Ret(Ret { operand }) => operand.iter().cloned().collect(),
            TerminatorOpcode::Other => Vec::new(),
        }
    }
}
