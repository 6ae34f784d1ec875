// SPDX-License-Identifier: BSD-3-Clause
//! Programmatic construction of [`Module`]s.
//!
//! Mostly useful for tests and benchmarks, and for embedders that already
//! hold an IR in memory and don't want to round-trip through bitcode.
//!
//! ```
//! use yapot::llvm::{builder::ModuleBuilder, Operand, Ty};
//!
//! let mut m = ModuleBuilder::new("example");
//! let malloc = m.declare("malloc").unwrap();
//! let mut f = m.function("main", &[]);
//! f.ret(None);
//! f.finish().unwrap();
//! let module = m.build().unwrap();
//! assert_eq!(1, module.functions.len());
//! # let _ = malloc;
//! ```

use std::collections::{HashMap, HashSet};

use crate::arc::{Arc, UArc};

use super::constant::Constant;
use super::instruction::{
    AddrSpaceCast, Alloca, BitCast, Call, ExtractValue, GetElementPtr, InsertValue, IntToPtr,
    Load, Opcode, Phi, PtrToInt, Select, Store,
};
use super::{
    Block, BlockName, Callee, Error, Function, FunctionName, GlobalName, Instruction,
    InstructionName, Invoke, Module, Operand, ParameterName, Ret, Terminator, TerminatorOpcode, Ty,
};

#[derive(Debug)]
pub struct ModuleBuilder {
    name: String,
    names: HashMap<String, UArc<FunctionName>>,
    decls: HashSet<UArc<FunctionName>>,
    functions: HashMap<UArc<FunctionName>, Function>,
    globals: HashSet<Arc<GlobalName>>,
}

impl ModuleBuilder {
    pub fn new(name: &str) -> Self {
        ModuleBuilder {
            name: name.to_string(),
            names: HashMap::new(),
            decls: HashSet::new(),
            functions: HashMap::new(),
            globals: HashSet::new(),
        }
    }

    /// The unique name of a function, which may be declared or defined
    /// later (e.g., for mutually recursive functions).
    pub fn function_name(&mut self, name: &str) -> UArc<FunctionName> {
        self.names
            .entry(name.to_string())
            .or_insert_with(|| UArc::new(FunctionName::from(name)))
            .clone()
    }

    fn check_fresh(&self, f: &UArc<FunctionName>) -> Result<(), Error> {
        if self.functions.contains_key(f) || self.decls.contains(f) {
            return Err(Error(format!("duplicate definition of {}", f)));
        }
        Ok(())
    }

    /// Declare an external function (one without a body).
    pub fn declare(&mut self, name: &str) -> Result<UArc<FunctionName>, Error> {
        let f = self.function_name(name);
        self.check_fresh(&f)?;
        self.decls.insert(f.clone());
        Ok(f)
    }

    /// Define a global variable and get an operand referring to its address.
    pub fn global(&mut self, name: &str) -> Operand {
        let g = Arc::new(GlobalName::from(name));
        self.globals.insert(g.clone());
        Operand::constant(Constant::Global(g))
    }

    /// Start defining a function. Call [`FunctionBuilder::finish`] to add it
    /// to the module.
    pub fn function<'m>(&'m mut self, name: &str, parameters: &[&str]) -> FunctionBuilder<'m> {
        let f_name = self.function_name(name);
        let params = parameters
            .iter()
            .enumerate()
            .map(|(i, p)| UArc::new(ParameterName::new(f_name.clone(), p.to_string(), i)))
            .collect();
        FunctionBuilder {
            module: self,
            name: f_name,
            parameters: params,
            blocks: Vec::new(),
            current: None,
        }
    }

    pub fn build(self) -> Result<Module, Error> {
        let module = Module {
            name: self.name,
            decls: self.decls,
            functions: self.functions,
            globals: self.globals,
        };
        module.validate()?;
        Ok(module)
    }
}

#[derive(Debug)]
struct OpenBlock {
    name: UArc<BlockName>,
    instrs: Vec<Instruction>,
}

#[derive(Debug)]
pub struct FunctionBuilder<'m> {
    module: &'m mut ModuleBuilder,
    name: UArc<FunctionName>,
    parameters: Vec<UArc<ParameterName>>,
    blocks: Vec<Block>,
    current: Option<OpenBlock>,
}

impl<'m> FunctionBuilder<'m> {
    pub fn name(&self) -> &UArc<FunctionName> {
        &self.name
    }

    /// The `i`th parameter.
    ///
    /// # Panics
    ///
    /// If the function has no such parameter.
    pub fn param(&self, i: usize) -> Operand {
        Operand::parameter(self.parameters[i].clone())
    }

    /// An operand referring to the address of a (possibly not yet defined)
    /// function of the enclosing module.
    pub fn function_ref(&mut self, name: &str) -> Operand {
        Operand::function(self.module.function_name(name))
    }

    /// Start a new basic block. An open block without terminator is closed
    /// with an unconditional branch.
    pub fn block(&mut self, label: &str) {
        self.close(TerminatorOpcode::Other, Ty::Void);
        self.current = Some(OpenBlock {
            name: UArc::new(BlockName::new(self.name.clone(), label.to_string())),
            instrs: Vec::new(),
        });
    }

    fn open(&mut self) -> &mut OpenBlock {
        if self.current.is_none() {
            let label = format!("bb{}", self.blocks.len());
            self.block(&label);
        }
        // Just opened above if it wasn't already
        self.current.get_or_insert_with(|| unreachable!())
    }

    fn close(&mut self, opcode: TerminatorOpcode, ty: Ty) -> Option<Operand> {
        let OpenBlock { name, instrs } = self.current.take()?;
        let term_name = UArc::new(InstructionName::new(
            self.name.clone(),
            name.clone(),
            instrs.len(),
        ));
        self.blocks.push(Block {
            name,
            instrs,
            terminator: Terminator {
                name: term_name.clone(),
                opcode,
                ty,
            },
        });
        Some(Operand::instruction(term_name))
    }

    fn push(&mut self, opcode: Opcode, ty: Ty) -> Operand {
        let f_name = self.name.clone();
        let block = self.open();
        let name = UArc::new(InstructionName::new(
            f_name,
            block.name.clone(),
            block.instrs.len(),
        ));
        block.instrs.push(Instruction {
            name: name.clone(),
            opcode,
            ty,
        });
        Operand::instruction(name)
    }

    pub fn alloca(&mut self) -> Operand {
        self.push(
            Opcode::Alloca(Alloca {
                num_elements: Operand::int(32, 1),
            }),
            Ty::Pointer,
        )
    }

    pub fn addrspacecast(&mut self, pointer: Operand) -> Operand {
        self.push(Opcode::AddrSpaceCast(AddrSpaceCast { pointer }), Ty::Pointer)
    }

    pub fn bitcast(&mut self, pointer: Operand) -> Operand {
        self.push(Opcode::BitCast(BitCast { pointer }), Ty::Pointer)
    }

    pub fn call(&mut self, callee: Operand, args: &[(Operand, Ty)], ty: Ty) -> Operand {
        self.push(
            Opcode::Call(Call {
                callee: Callee::Operand(callee),
                args: args.iter().map(|(op, _)| op.clone()).collect(),
                arg_tys: args.iter().map(|(_, ty)| *ty).collect(),
            }),
            ty,
        )
    }

    pub fn call_asm(&mut self, args: &[(Operand, Ty)], ty: Ty) -> Operand {
        self.push(
            Opcode::Call(Call {
                callee: Callee::Asm,
                args: args.iter().map(|(op, _)| op.clone()).collect(),
                arg_tys: args.iter().map(|(_, ty)| *ty).collect(),
            }),
            ty,
        )
    }

    pub fn extractvalue(&mut self, aggregate: Operand, ty: Ty) -> Operand {
        self.push(Opcode::ExtractValue(ExtractValue { aggregate }), ty)
    }

    pub fn gep(&mut self, pointer: Operand, indices: &[Operand]) -> Operand {
        self.push(
            Opcode::GetElementPtr(GetElementPtr {
                pointer,
                indices: indices.to_vec(),
            }),
            Ty::Pointer,
        )
    }

    pub fn insertvalue(&mut self, aggregate: Operand, element: Operand) -> Operand {
        self.push(
            Opcode::InsertValue(InsertValue { aggregate, element }),
            Ty::Aggregate,
        )
    }

    pub fn inttoptr(&mut self, int: Operand) -> Operand {
        self.push(Opcode::IntToPtr(IntToPtr { int }), Ty::Pointer)
    }

    pub fn landingpad(&mut self) -> Operand {
        self.push(Opcode::LandingPad, Ty::Aggregate)
    }

    pub fn load(&mut self, pointer: Operand, ty: Ty) -> Operand {
        self.push(Opcode::Load(Load { pointer }), ty)
    }

    pub fn phi(&mut self, values: &[Operand], ty: Ty) -> Operand {
        self.push(
            Opcode::Phi(Phi {
                values: values.to_vec(),
            }),
            ty,
        )
    }

    /// Add an incoming value to a `phi` created earlier, e.g., a value that
    /// is defined later in a loop body.
    pub fn add_incoming(&mut self, phi: &Operand, value: Operand) -> Result<(), Error> {
        let target = phi
            .instruction_name()
            .ok_or_else(|| Error(format!("{} is not an instruction", phi)))?;
        let instrs = self
            .blocks
            .iter_mut()
            .flat_map(|b| b.instrs.iter_mut())
            .chain(self.current.iter_mut().flat_map(|b| b.instrs.iter_mut()));
        for i in instrs {
            if i.name == *target {
                if let Opcode::Phi(p) = &mut i.opcode {
                    p.values.push(value);
                    return Ok(());
                }
                return Err(Error(format!("{} is not a phi", phi)));
            }
        }
        Err(Error(format!("no instruction {} in {}", phi, self.name)))
    }

    pub fn ptrtoint(&mut self, pointer: Operand) -> Operand {
        self.push(Opcode::PtrToInt(PtrToInt { pointer }), Ty::Int(64))
    }

    pub fn select(
        &mut self,
        condition: Operand,
        true_value: Operand,
        false_value: Operand,
        ty: Ty,
    ) -> Operand {
        self.push(
            Opcode::Select(Select {
                condition,
                true_value,
                false_value,
            }),
            ty,
        )
    }

    pub fn store(&mut self, value: Operand, pointer: Operand) {
        self.push(Opcode::Store(Store { value, pointer }), Ty::Void);
    }

    /// Any instruction the tracer has no special knowledge of
    pub fn other(&mut self, ty: Ty) -> Operand {
        self.push(Opcode::Other, ty)
    }

    pub fn ret(&mut self, operand: Option<Operand>) {
        self.open();
        self.close(TerminatorOpcode::Ret(Ret { operand }), Ty::Void);
    }

    /// Terminate the current block with an `invoke`. Instructions added
    /// afterwards go to a fresh block.
    pub fn invoke(&mut self, callee: Operand, args: &[(Operand, Ty)], ty: Ty) -> Operand {
        self.open();
        let opcode = TerminatorOpcode::Invoke(Invoke {
            callee: Callee::Operand(callee),
            args: args.iter().map(|(op, _)| op.clone()).collect(),
            arg_tys: args.iter().map(|(_, ty)| *ty).collect(),
        });
        self.close(opcode, ty)
            .unwrap_or_else(|| unreachable!("block was just opened"))
    }

    pub fn finish(mut self) -> Result<UArc<FunctionName>, Error> {
        self.close(TerminatorOpcode::Other, Ty::Void);
        self.module.check_fresh(&self.name)?;
        self.module.functions.insert(
            self.name.clone(),
            Function {
                parameters: self.parameters,
                blocks: self.blocks,
            },
        );
        Ok(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::ModuleBuilder;
    use crate::arc::Arc;
    use crate::llvm::constant::Constant;
    use crate::llvm::{GlobalName, Operand, TerminatorOpcode, Ty};

    #[test]
    fn blocks_and_terminators() {
        let mut m = ModuleBuilder::new("m");
        let mut f = m.function("f", &["p"]);
        let p = f.param(0);
        f.block("entry");
        let x = f.alloca();
        f.block("next");
        let l = f.load(x, Ty::Pointer);
        f.ret(Some(p));
        let name = f.finish().unwrap();
        let module = m.build().unwrap();

        let func = &module.functions[&name];
        assert_eq!(2, func.blocks.len());
        assert!(matches!(
            func.blocks[0].terminator.opcode,
            TerminatorOpcode::Other
        ));
        assert_eq!(1, func.returned().count());
        assert_eq!(Some(&name), l.parent_function());
    }

    #[test]
    fn duplicate_definition() {
        let mut m = ModuleBuilder::new("m");
        m.declare("f").unwrap();
        let mut f = m.function("f", &[]);
        f.ret(None);
        assert!(f.finish().is_err());
    }

    #[test]
    fn undefined_function_reference() {
        let mut m = ModuleBuilder::new("m");
        let mut f = m.function("f", &[]);
        let g = f.function_ref("g");
        f.call(g, &[], Ty::Void);
        f.ret(None);
        f.finish().unwrap();
        assert!(m.build().is_err());
    }

    #[test]
    fn undefined_global_reference() {
        let mut m = ModuleBuilder::new("m");
        let mut f = m.function("f", &[]);
        let g = Operand::constant(Constant::BitCast(Arc::new(Constant::Global(Arc::new(
            GlobalName::from("g"),
        )))));
        f.ret(Some(g));
        f.finish().unwrap();
        assert!(m.build().is_err());
    }

    #[test]
    fn foreign_local() {
        let mut m = ModuleBuilder::new("m");
        let mut f = m.function("f", &[]);
        let x = f.alloca();
        f.ret(None);
        f.finish().unwrap();
        let mut g = m.function("g", &[]);
        g.ret(Some(x));
        g.finish().unwrap();
        assert!(m.build().is_err());
    }

    #[test]
    fn phi_back_edge() {
        let mut m = ModuleBuilder::new("m");
        let mut f = m.function("f", &[]);
        f.block("loop");
        let phi = f.phi(&[Operand::null()], Ty::Pointer);
        let next = f.gep(phi.clone(), &[Operand::int(64, 1)]);
        f.add_incoming(&phi, next).unwrap();
        assert!(f.add_incoming(&Operand::null(), Operand::null()).is_err());
        f.ret(Some(phi));
        f.finish().unwrap();
        m.build().unwrap();
    }
}
