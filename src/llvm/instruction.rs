// SPDX-License-Identifier: BSD-3-Clause
use super::operand::{Callee, Operand};
use super::Ty;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Alloca {
    pub num_elements: Operand,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct AddrSpaceCast {
    pub pointer: Operand,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct BitCast {
    pub pointer: Operand,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Call {
    pub callee: Callee,
    pub args: Vec<Operand>,
    /// Parallel to `args`
    pub arg_tys: Vec<Ty>,
}

impl Call {
    pub(crate) fn operands(&self) -> Vec<Operand> {
        let mut os = match &self.callee {
            Callee::Asm => vec![],
            Callee::Operand(op) => vec![op.clone()],
        };
        os.extend(self.args.iter().cloned());
        os
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
pub struct ExtractValue {
    pub aggregate: Operand,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct GetElementPtr {
    pub pointer: Operand,
    pub indices: Vec<Operand>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct InsertValue {
    pub aggregate: Operand,
    pub element: Operand,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct IntToPtr {
    pub int: Operand,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Load {
    pub pointer: Operand,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Phi {
    pub values: Vec<Operand>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct PtrToInt {
    pub pointer: Operand,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Select {
    pub condition: Operand,
    pub true_value: Operand,
    pub false_value: Operand,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Store {
    pub value: Operand,
    pub pointer: Operand,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Opcode {
    Alloca(Alloca),
    AddrSpaceCast(AddrSpaceCast),
    BitCast(BitCast),
    Call(Call),
    ExtractValue(ExtractValue),
    GetElementPtr(GetElementPtr),
    InsertValue(InsertValue),
    IntToPtr(IntToPtr),
    LandingPad,
    Load(Load),
    Phi(Phi),
    PtrToInt(PtrToInt),
    Select(Select),
    Store(Store),
    //
    Other,
}

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Alloca(_) => "alloca",
            Opcode::AddrSpaceCast(_) => "addrspacecast",
            Opcode::BitCast(_) => "bitcast",
            Opcode::Call(_) => "call",
            Opcode::ExtractValue(_) => "extractvalue",
            Opcode::GetElementPtr(_) => "getelementptr",
            Opcode::InsertValue(_) => "insertvalue",
            Opcode::IntToPtr(_) => "inttoptr",
            Opcode::LandingPad => "landingpad",
            Opcode::Load(_) => "load",
            Opcode::Phi(_) => "phi",
            Opcode::PtrToInt(_) => "ptrtoint",
            Opcode::Select(_) => "select",
            Opcode::Store(_) => "store",
            Opcode::Other => "<other>",
        }
    }

    pub(crate) fn operands(&self) -> Vec<Operand> {
        match self {
            Opcode::Alloca(a) => vec![a.num_elements.clone()],
            Opcode::AddrSpaceCast(c) => vec![c.pointer.clone()],
            Opcode::BitCast(c) => vec![c.pointer.clone()],
            Opcode::Call(c) => c.operands(),
            Opcode::ExtractValue(e) => vec![e.aggregate.clone()],
            Opcode::GetElementPtr(GetElementPtr { pointer, indices }) => {
                let mut ops = vec![pointer.clone()];
                ops.extend(indices.iter().cloned());
                ops
            }
            Opcode::InsertValue(i) => vec![i.aggregate.clone(), i.element.clone()],
            Opcode::IntToPtr(i) => vec![i.int.clone()],
            Opcode::LandingPad => vec![],
            Opcode::Load(l) => vec![l.pointer.clone()],
            Opcode::Phi(p) => p.values.clone(),
            Opcode::PtrToInt(p) => vec![p.pointer.clone()],
            Opcode::Select(s) => vec![
                s.condition.clone(),
                s.true_value.clone(),
                s.false_value.clone(),
            ],
            Opcode::Store(s) => vec![s.value.clone(), s.pointer.clone()],
            //
            Opcode::Other => vec![],
        }
    }
}
