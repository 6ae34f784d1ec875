// SPDX-License-Identifier: BSD-3-Clause
//! Representation of an LLVM module that is amenable to origin tracing.
//!
//! The tracer needs three things from a program: the defining operation of
//! every local value, the returns of every function body, and the call sites
//! of every function. Rather than walking `llvm_ir`'s structures directly, a
//! module is converted once into the types below. Instructions and
//! parameters receive unique names ([`UArc`]) that serve as value identities,
//! and operands refer to them directly, so no name resolution happens during
//! tracing.
//!
//! Modules come from LLVM bitcode (the `llvm` feature, see [`bitcode`]) or
//! are assembled programmatically with [`builder::ModuleBuilder`].

use std::collections::{HashMap, HashSet};

use rustc_hash::FxHashSet;

use crate::arc::{Arc, UArc};

use self::instruction::Opcode;

#[cfg(feature = "llvm")]
pub mod bitcode;
pub mod builder;
pub mod constant;
mod error;
pub use error::*;
mod name;
pub use name::*;
mod operand;
pub use operand::*;
pub mod instruction;
pub mod terminator;
pub use terminator::*;

/// Just enough of LLVM's type system to tell pointers apart from
/// everything else.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Ty {
    Pointer,
    Int(u32),
    Aggregate,
    Void,
    Other,
}

impl Ty {
    #[inline]
    pub fn is_pointer(self) -> bool {
        matches!(self, Ty::Pointer)
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Instruction {
    pub name: UArc<InstructionName>,
    pub opcode: Opcode,
    pub ty: Ty,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Terminator {
    pub name: UArc<InstructionName>,
    pub opcode: TerminatorOpcode,
    pub ty: Ty,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Block {
    pub name: UArc<BlockName>,
    pub instrs: Vec<Instruction>,
    pub terminator: Terminator,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Function {
    pub parameters: Vec<UArc<ParameterName>>,
    pub blocks: Vec<Block>,
}

impl Function {
    /// Operands of all `ret` terminators, in block order
    pub fn returned(&self) -> impl Iterator<Item = &Operand> + '_ {
        self.blocks.iter().filter_map(|b| match &b.terminator.opcode {
            TerminatorOpcode::Ret(Ret { operand }) => operand.as_ref(),
            TerminatorOpcode::Invoke(_) => None,
            TerminatorOpcode::Other => None,
        })
    }
}

#[derive(Debug, Default)]
pub struct Module {
    pub name: String,
    /// Functions without a body
    pub decls: HashSet<UArc<FunctionName>>,
    pub functions: HashMap<UArc<FunctionName>, Function>,
    pub globals: HashSet<Arc<GlobalName>>,
}

impl Module {
    /// Defined functions, sorted by symbol name
    pub fn sorted_functions(&self) -> Vec<(&UArc<FunctionName>, &Function)> {
        let mut fs: Vec<_> = self.functions.iter().collect();
        fs.sort_by(|(f, _), (g, _)| f.get().cmp(g.get()));
        fs
    }

    /// Check that every local operand is defined in the function that uses
    /// it and that every referenced function and global belongs to this
    /// module.
    pub fn validate(&self) -> Result<(), Error> {
        for (f_name, f) in &self.functions {
            let mut locals: FxHashSet<LocalName> = f
                .parameters
                .iter()
                .map(|p| LocalName::Parameter(p.clone()))
                .collect();
            for b in &f.blocks {
                for i in &b.instrs {
                    locals.insert(LocalName::Instruction(i.name.clone()));
                }
                locals.insert(LocalName::Instruction(b.terminator.name.clone()));
            }
            let uses = f.blocks.iter().flat_map(|b| {
                b.instrs
                    .iter()
                    .flat_map(|i| i.opcode.operands())
                    .chain(b.terminator.opcode.operands())
            });
            for op in uses {
                match &op {
                    Operand::Local(l) => {
                        if !locals.contains(l) {
                            return Err(Error(format!("{} uses undefined local {}", f_name, l)));
                        }
                    }
                    Operand::Constant(c) => {
                        if let Some(g) = c.function() {
                            if !self.functions.contains_key(g) && !self.decls.contains(g) {
                                return Err(Error(format!(
                                    "{} refers to unknown function {}",
                                    f_name, g
                                )));
                            }
                        }
                        if let Some(g) = c.global() {
                            if !self.globals.contains(g) {
                                return Err(Error(format!(
                                    "{} refers to unknown global {}",
                                    f_name, g
                                )));
                            }
                        }
                    }
                    Operand::Metadata => (),
                }
            }
        }
        Ok(())
    }
}
