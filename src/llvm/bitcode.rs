// SPDX-License-Identifier: BSD-3-Clause
//! Conversion from [`llvm_ir::Module`].

use std::collections::{HashMap, HashSet};

use either::Either;
use llvm_ir::{types::Typed, Name};

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

fn name_string(n: &Name) -> String {
    match n {
        Name::Name(n) => (**n).clone(),
        Name::Number(n) => n.to_string(),
    }
}

fn ty(t: &llvm_ir::TypeRef) -> Ty {
    match &**t {
        llvm_ir::Type::PointerType { .. } => Ty::Pointer,
        llvm_ir::Type::IntegerType { bits } => Ty::Int(*bits),
        llvm_ir::Type::ArrayType { .. }
        | llvm_ir::Type::NamedStructType { .. }
        | llvm_ir::Type::StructType { .. }
        | llvm_ir::Type::VectorType { .. } => Ty::Aggregate,
        llvm_ir::Type::VoidType => Ty::Void,
        _ => Ty::Other,
    }
}

struct Converter<'module> {
    m: &'module llvm_ir::Module,
    globals: HashMap<&'module str, Arc<Constant>>,
}

impl<'module> Converter<'module> {
    /// Collect names of functions and global variables so that they are
    /// allocated exactly once. Aliases map to the constant they alias.
    fn new(m: &'module llvm_ir::Module) -> Result<Self, Error> {
        let mut globals: HashMap<&str, Arc<Constant>> = HashMap::with_capacity(
            m.functions.len()
                + m.func_declarations.len()
                + m.global_vars.len()
                + m.global_aliases.len(),
        );
        for f in &m.functions {
            globals.insert(
                f.name.as_ref(),
                Arc::new(Constant::Function(UArc::new(FunctionName::from(
                    f.name.clone(),
                )))),
            );
        }
        for f in &m.func_declarations {
            globals.insert(
                f.name.as_ref(),
                Arc::new(Constant::Function(UArc::new(FunctionName::from(
                    f.name.clone(),
                )))),
            );
        }
        for g in &m.global_vars {
            let n: &str = g.name.as_ref();
            globals.insert(n, Arc::new(Constant::Global(Arc::new(GlobalName::from(n)))));
        }

        let mut conv = Converter { m, globals };
        // An alias may name another alias, so resolve in rounds until every
        // alias is known or a round makes no progress.
        let mut pending: Vec<&llvm_ir::module::GlobalAlias> = m.global_aliases.iter().collect();
        while !pending.is_empty() {
            let before = pending.len();
            let mut rest = Vec::new();
            for a in pending {
                match conv.constant(&a.aliasee) {
                    Ok(c) => {
                        conv.globals.insert(a.name.as_ref(), c);
                    }
                    Err(_) => rest.push(a),
                }
            }
            if rest.len() == before {
                let n: &str = rest[0].name.as_ref();
                return Err(Error(format!("Couldn't resolve alias {}", n)));
            }
            pending = rest;
        }
        Ok(conv)
    }

    fn function_name(&self, name: &str) -> Result<UArc<FunctionName>, Error> {
        match self.globals.get(name).map(|c| &**c) {
            Some(Constant::Function(f)) => Ok(f.clone()),
            _ => Err(Error(format!("No such function: {}", name))),
        }
    }

    fn global_name(&self, name: &str) -> Result<Arc<GlobalName>, Error> {
        match self.globals.get(name).map(|c| &**c) {
            Some(Constant::Global(g)) => Ok(g.clone()),
            _ => Err(Error(format!("No such global: {}", name))),
        }
    }

    fn constant(&self, c: &llvm_ir::Constant) -> Result<Arc<Constant>, Error> {
        let inner = |c: &llvm_ir::ConstantRef| self.constant(c);
        Ok(match c {
            llvm_ir::Constant::GlobalReference { name, .. } => {
                let n: &str = name.as_ref();
                return self
                    .globals
                    .get(n)
                    .cloned()
                    .ok_or_else(|| Error(format!("Couldn't find global {}", n)));
            }
            llvm_ir::Constant::Int { bits, value } => Arc::new(Constant::Int {
                bits: *bits,
                value: *value,
            }),
            llvm_ir::Constant::Null(_) => Arc::new(Constant::Null),
            llvm_ir::Constant::Undef(_) => Arc::new(Constant::Undef),
            llvm_ir::Constant::Poison(_) => Arc::new(Constant::Poison),
            llvm_ir::Constant::AggregateZero(_) => Arc::new(Constant::AggregateZero),
            llvm_ir::Constant::Array { elements, .. } => {
                let ints: Option<Vec<u64>> = elements
                    .iter()
                    .map(|e| match &**e {
                        llvm_ir::Constant::Int { value, .. } => Some(*value),
                        _ => None,
                    })
                    .collect();
                match ints {
                    Some(data) if !elements.is_empty() => Arc::new(Constant::DataArray(data)),
                    _ => Arc::new(Constant::Array(
                        elements.iter().map(inner).collect::<Result<_, _>>()?,
                    )),
                }
            }
            llvm_ir::Constant::Struct { values, .. } => Arc::new(Constant::Struct(
                values.iter().map(inner).collect::<Result<_, _>>()?,
            )),
            // Expressions
            llvm_ir::Constant::AddrSpaceCast(c) => {
                Arc::new(Constant::AddrSpaceCast(inner(&c.operand)?))
            }
            llvm_ir::Constant::BitCast(c) => Arc::new(Constant::BitCast(inner(&c.operand)?)),
            llvm_ir::Constant::GetElementPtr(c) => {
                Arc::new(Constant::GetElementPtr(inner(&c.address)?))
            }
            llvm_ir::Constant::IntToPtr(c) => Arc::new(Constant::IntToPtr(inner(&c.operand)?)),
            llvm_ir::Constant::PtrToInt(c) => Arc::new(Constant::PtrToInt(inner(&c.operand)?)),
            _ => Arc::new(Constant::Other),
        })
    }

    fn operand(
        &self,
        locals: &HashMap<&Name, Operand>,
        op: &llvm_ir::Operand,
    ) -> Result<Operand, Error> {
        match op {
            llvm_ir::Operand::MetadataOperand => Ok(Operand::Metadata),
            llvm_ir::Operand::ConstantOperand(c) => self.constant(c).map(Operand::Constant),
            llvm_ir::Operand::LocalOperand { name, .. } => locals
                .get(name)
                .cloned()
                .ok_or_else(|| Error(format!("Bad local: {}", name))),
        }
    }

    fn callee(
        &self,
        locals: &HashMap<&Name, Operand>,
        function: &Either<llvm_ir::function::InlineAssembly, llvm_ir::Operand>,
    ) -> Result<Callee, Error> {
        Ok(match function {
            Either::Left(_asm) => Callee::Asm,
            Either::Right(op) => Callee::Operand(self.operand(locals, op)?),
        })
    }

    #[allow(clippy::type_complexity)]
    fn arguments(
        &self,
        locals: &HashMap<&Name, Operand>,
        arguments: &[(llvm_ir::Operand, Vec<llvm_ir::function::ParameterAttribute>)],
    ) -> Result<(Vec<Operand>, Vec<Ty>), Error> {
        let mut args = Vec::with_capacity(arguments.len());
        let mut tys = Vec::with_capacity(arguments.len());
        for (op, _) in arguments {
            args.push(self.operand(locals, op)?);
            tys.push(ty(&op.get_type(&self.m.types)));
        }
        Ok((args, tys))
    }

    fn opcode(
        &self,
        locals: &HashMap<&Name, Operand>,
        i: &llvm_ir::Instruction,
    ) -> Result<Opcode, Error> {
        let op = |o: &llvm_ir::Operand| self.operand(locals, o);
        Ok(match i {
            llvm_ir::Instruction::Alloca(a) => Opcode::Alloca(Alloca {
                num_elements: op(&a.num_elements)?,
            }),
            llvm_ir::Instruction::AddrSpaceCast(c) => Opcode::AddrSpaceCast(AddrSpaceCast {
                pointer: op(&c.operand)?,
            }),
            llvm_ir::Instruction::BitCast(c) => Opcode::BitCast(BitCast {
                pointer: op(&c.operand)?,
            }),
            llvm_ir::Instruction::Call(c) => {
                let (args, arg_tys) = self.arguments(locals, &c.arguments)?;
                Opcode::Call(Call {
                    callee: self.callee(locals, &c.function)?,
                    args,
                    arg_tys,
                })
            }
            llvm_ir::Instruction::ExtractValue(e) => Opcode::ExtractValue(ExtractValue {
                aggregate: op(&e.aggregate)?,
            }),
            llvm_ir::Instruction::GetElementPtr(g) => Opcode::GetElementPtr(GetElementPtr {
                pointer: op(&g.address)?,
                indices: g.indices.iter().map(op).collect::<Result<_, _>>()?,
            }),
            llvm_ir::Instruction::InsertValue(iv) => Opcode::InsertValue(InsertValue {
                aggregate: op(&iv.aggregate)?,
                element: op(&iv.element)?,
            }),
            llvm_ir::Instruction::IntToPtr(c) => Opcode::IntToPtr(IntToPtr {
                int: op(&c.operand)?,
            }),
            llvm_ir::Instruction::LandingPad(_) => Opcode::LandingPad,
            llvm_ir::Instruction::Load(l) => Opcode::Load(Load {
                pointer: op(&l.address)?,
            }),
            llvm_ir::Instruction::Phi(p) => Opcode::Phi(Phi {
                values: p
                    .incoming_values
                    .iter()
                    .map(|(v, _)| op(v))
                    .collect::<Result<_, _>>()?,
            }),
            llvm_ir::Instruction::PtrToInt(c) => Opcode::PtrToInt(PtrToInt {
                pointer: op(&c.operand)?,
            }),
            llvm_ir::Instruction::Select(s) => Opcode::Select(Select {
                condition: op(&s.condition)?,
                true_value: op(&s.true_value)?,
                false_value: op(&s.false_value)?,
            }),
            llvm_ir::Instruction::Store(s) => Opcode::Store(Store {
                value: op(&s.value)?,
                pointer: op(&s.address)?,
            }),
            _ => Opcode::Other,
        })
    }

    fn terminator_opcode(
        &self,
        locals: &HashMap<&Name, Operand>,
        t: &llvm_ir::Terminator,
    ) -> Result<TerminatorOpcode, Error> {
        Ok(match t {
            llvm_ir::Terminator::Ret(r) => TerminatorOpcode::Ret(Ret {
                operand: match &r.return_operand {
                    None => None,
                    Some(o) => Some(self.operand(locals, o)?),
                },
            }),
            llvm_ir::Terminator::Invoke(i) => {
                let (args, arg_tys) = self.arguments(locals, &i.arguments)?;
                TerminatorOpcode::Invoke(Invoke {
                    callee: self.callee(locals, &i.function)?,
                    args,
                    arg_tys,
                })
            }
            _ => TerminatorOpcode::Other,
        })
    }

    fn function(
        &self,
        f: &'module llvm_ir::Function,
        name: &UArc<FunctionName>,
    ) -> Result<Function, Error> {
        let mut locals = HashMap::<&Name, Operand>::new();

        let mut parameters = Vec::with_capacity(f.parameters.len());
        for (i, p) in f.parameters.iter().enumerate() {
            let p_name = UArc::new(ParameterName::new(name.clone(), name_string(&p.name), i));
            locals.insert(&p.name, Operand::parameter(p_name.clone()));
            parameters.push(p_name);
        }

        // Name every local first: LLVM sometimes references values before
        // their definitions (phis along back edges).
        let mut names = Vec::with_capacity(f.basic_blocks.len());
        for b in &f.basic_blocks {
            let block_name = UArc::new(BlockName::new(name.clone(), name_string(&b.name)));
            let mut instr_names = Vec::with_capacity(b.instrs.len());
            for (idx, instr) in b.instrs.iter().enumerate() {
                let inst_name =
                    UArc::new(InstructionName::new(name.clone(), block_name.clone(), idx));
                if let Some(n) = instr.try_get_result() {
                    locals.insert(n, Operand::instruction(inst_name.clone()));
                }
                instr_names.push(inst_name);
            }
            let term_name = UArc::new(InstructionName::new(
                name.clone(),
                block_name.clone(),
                b.instrs.len(),
            ));
            if let Some(n) = b.term.try_get_result() {
                locals.insert(n, Operand::instruction(term_name.clone()));
            }
            names.push((block_name, instr_names, term_name));
        }

        let mut blocks = Vec::with_capacity(f.basic_blocks.len());
        for (b, (block_name, instr_names, term_name)) in f.basic_blocks.iter().zip(names) {
            let mut instrs = Vec::with_capacity(b.instrs.len());
            for (i, i_name) in b.instrs.iter().zip(instr_names) {
                instrs.push(Instruction {
                    name: i_name,
                    opcode: self.opcode(&locals, i)?,
                    ty: ty(&i.get_type(&self.m.types)),
                });
            }
            blocks.push(Block {
                name: block_name,
                instrs,
                terminator: Terminator {
                    name: term_name,
                    opcode: self.terminator_opcode(&locals, &b.term)?,
                    ty: ty(&b.term.get_type(&self.m.types)),
                },
            });
        }

        Ok(Function { parameters, blocks })
    }
}

impl Module {
    /// Convert a parsed bitcode module, e.g., from
    /// [`llvm_ir::Module::from_bc_path`].
    pub fn from_llvm(m: &llvm_ir::Module) -> Result<Self, Error> {
        let conv = Converter::new(m)?;

        let mut functions = HashMap::with_capacity(m.functions.len());
        for f in &m.functions {
            let name = conv.function_name(&f.name)?;
            let func = conv.function(f, &name)?;
            functions.insert(name, func);
        }

        let decls = m
            .func_declarations
            .iter()
            .map(|d| conv.function_name(&d.name))
            .collect::<Result<HashSet<_>, _>>()?;

        let globals = m
            .global_vars
            .iter()
            .map(|g| conv.global_name(g.name.as_ref()))
            .collect::<Result<HashSet<_>, _>>()?;

        let module = Module {
            name: m.name.clone(),
            decls,
            functions,
            globals,
        };
        module.validate()?;
        Ok(module)
    }
}
