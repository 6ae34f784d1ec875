// SPDX-License-Identifier: BSD-3-Clause
//! Pointer-origin tracing
//!
//! Given a value, walk backwards through its definitions to the places that
//! could have produced it: allocations, globals, constants, and calls that
//! can't be looked into. The walk crosses function boundaries in both
//! directions, from a call to the returns of its callee and from a parameter
//! to the arguments at its call sites.
//!
//! The analysis is context- and flow-insensitive. A `load` is assumed to
//! produce something with the same origin as its pointer operand.
//!
//! Termination is guaranteed by a visited set keyed on canonical values
//! (see [`Graph::canonicalize`]): each canonical value is examined at most
//! once per trace. Cycles (recursion, loops through `phi`s) are cut off
//! silently, so the origins of a strongly-connected cluster depend on which
//! member is reached first.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::{
    arc::UArc,
    llvm::instruction::{
        AddrSpaceCast, BitCast, Call, ExtractValue, GetElementPtr, InsertValue, IntToPtr, Load,
        Opcode, Phi, Select,
    },
    llvm::{
        Callee, Function, FunctionName, InstructionName, Invoke, LocalName, Module, Operand,
        ParameterName, TerminatorOpcode,
    },
};

use super::callgraph::CallGraph;

/// Bound on the number of casts [`Graph::canonicalize`] strips
pub const MAX_LOOKTHROUGH: usize = 6;

/// Canonical values examined during one trace
pub type VisitedSet = FxHashSet<Operand>;

/// The operation that defines a local value
#[derive(Clone, Copy, Debug)]
pub enum Def<'module> {
    Instruction(&'module Opcode),
    Terminator(&'module TerminatorOpcode),
}

/// Read-only view of a module, indexed for tracing.
#[derive(Debug)]
pub struct Graph<'module> {
    module: &'module Module,
    defs: FxHashMap<UArc<InstructionName>, Def<'module>>,
    call_graph: CallGraph,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceResult {
    /// Without duplicates, in the order they were found
    pub origins: Vec<Operand>,
    /// Deepest level of the walk, where the traced value is at level 0.
    /// Diagnostic only.
    pub max_depth: usize,
    /// Number of distinct canonical values examined
    pub visited: usize,
}

enum Step {
    Origin,
    Through(Vec<Operand>),
    /// Both an origin itself and a link to other values
    Partial(Vec<Operand>),
}

impl<'module> Graph<'module> {
    pub fn new(module: &'module Module) -> Self {
        let mut defs = FxHashMap::default();
        for f in module.functions.values() {
            for b in &f.blocks {
                for i in &b.instrs {
                    defs.insert(i.name.clone(), Def::Instruction(&i.opcode));
                }
                defs.insert(b.terminator.name.clone(), Def::Terminator(&b.terminator.opcode));
            }
        }
        Graph {
            module,
            defs,
            call_graph: CallGraph::new(module),
        }
    }

    #[inline]
    pub fn module(&self) -> &'module Module {
        self.module
    }

    pub fn def(&self, name: &UArc<InstructionName>) -> Option<Def<'module>> {
        self.defs.get(name).copied()
    }

    /// Statically known callee with a body
    pub fn body(&self, callee: &Callee) -> Option<(&'module UArc<FunctionName>, &'module Function)> {
        let f = callee.direct()?;
        self.module.functions.get_key_value(f)
    }

    /// Strip pointer casts (`bitcast`, `addrspacecast`, and constant
    /// `getelementptr` expressions), looking through at most
    /// [`MAX_LOOKTHROUGH`] of them. Doesn't follow data flow.
    pub fn canonicalize(&self, value: &Operand) -> Operand {
        let mut v = value.clone();
        for _ in 0..MAX_LOOKTHROUGH {
            let next = match &v {
                Operand::Constant(c) => c.look_through().cloned().map(Operand::Constant),
                Operand::Local(LocalName::Instruction(i)) => match self.def(i) {
                    Some(Def::Instruction(Opcode::BitCast(BitCast { pointer })))
                    | Some(Def::Instruction(Opcode::AddrSpaceCast(AddrSpaceCast { pointer }))) => {
                        Some(pointer.clone())
                    }
                    _ => None,
                },
                Operand::Local(LocalName::Parameter(_)) => None,
                Operand::Metadata => None,
            };
            match next {
                Some(n) => v = n,
                None => break,
            }
        }
        v
    }

    fn call_step(&self, callee: &Callee) -> Step {
        match self.body(callee) {
            Some((_, f)) => Step::Through(f.returned().cloned().collect()),
            None => {
                match callee.direct() {
                    Some(f) => debug!("Call to {} without body", f),
                    None => debug!("Unresolved callee"),
                }
                Step::Origin
            }
        }
    }

    fn parameter_step(&self, p: &UArc<ParameterName>) -> Step {
        let sites = self.call_graph.call_sites(p.function());
        let mut unbound = sites.is_empty();
        let mut args = Vec::with_capacity(sites.len());
        for site in sites {
            match site.argument(p.position()) {
                Some(a) => args.push(a.clone()),
                None => unbound = true,
            }
        }
        if !unbound {
            Step::Through(args)
        } else if args.is_empty() {
            Step::Origin
        } else {
            Step::Partial(args)
        }
    }

    fn step(&self, root: &Operand) -> Step {
        let i = match root {
            Operand::Local(LocalName::Instruction(i)) => i,
            Operand::Local(LocalName::Parameter(p)) => return self.parameter_step(p),
            Operand::Constant(_) => return Step::Origin,
            Operand::Metadata => return Step::Origin,
        };
        let Some(def) = self.def(i) else {
            debug!("No definition for {}", i);
            return Step::Origin;
        };
        match def {
            Def::Terminator(TerminatorOpcode::Invoke(Invoke { callee, .. })) => {
                self.call_step(callee)
            }
            Def::Terminator(TerminatorOpcode::Ret(_)) => Step::Origin,
            Def::Terminator(TerminatorOpcode::Other) => Step::Origin,
            Def::Instruction(opcode) => match opcode {
                Opcode::Call(Call { callee, .. }) => self.call_step(callee),
                Opcode::Load(Load { pointer }) => Step::Through(vec![pointer.clone()]),
                Opcode::GetElementPtr(GetElementPtr { pointer, .. }) => {
                    Step::Through(vec![pointer.clone()])
                }
                Opcode::ExtractValue(ExtractValue { aggregate }) => {
                    Step::Through(vec![aggregate.clone()])
                }
                Opcode::InsertValue(InsertValue { aggregate, .. }) => {
                    Step::Through(vec![aggregate.clone()])
                }
                Opcode::IntToPtr(IntToPtr { int }) => Step::Through(vec![int.clone()]),
                Opcode::Phi(Phi { values }) => Step::Through(values.clone()),
                Opcode::Select(Select {
                    true_value,
                    false_value,
                    ..
                }) => Step::Through(vec![true_value.clone(), false_value.clone()]),
                // No `_` pattern to ensure this is updated if the type changes
                Opcode::Alloca(_) => Step::Origin,
                Opcode::AddrSpaceCast(_) => Step::Origin,
                Opcode::BitCast(_) => Step::Origin,
                Opcode::LandingPad => Step::Origin,
                Opcode::PtrToInt(_) => Step::Origin,
                Opcode::Store(_) => Step::Origin,
                Opcode::Other => Step::Origin,
            },
        }
    }

    /// Trace the origins of `value` with a fresh visited set.
    pub fn trace_origin(&self, value: &Operand) -> TraceResult {
        let mut visited = VisitedSet::default();
        let mut origins = Vec::new();
        let max_depth = self.trace_origin_with(value, &mut visited, 0, &mut origins);
        TraceResult {
            origins,
            max_depth,
            visited: visited.len(),
        }
    }

    /// Canonicalize `value` and mark it visited. Records it in `origins` if
    /// it is one, and returns the values to trace next, if any.
    fn visit(
        &self,
        value: &Operand,
        visited: &mut VisitedSet,
        origins: &mut Vec<Operand>,
    ) -> Option<Vec<Operand>> {
        let root = self.canonicalize(value);
        if visited.contains(&root) {
            return None;
        }
        visited.insert(root.clone());
        match self.step(&root) {
            Step::Origin => {
                origins.push(root);
                None
            }
            Step::Through(children) => Some(children),
            Step::Partial(children) => {
                origins.push(root);
                Some(children)
            }
        }
    }

    /// Trace the origins of `value`, found at level `depth` of an enclosing
    /// walk, into `origins`. Values already in `visited` contribute nothing.
    ///
    /// Returns the deepest level reached. Siblings share a running depth:
    /// each child is traced one level below the deepest level its parent
    /// and earlier siblings reached.
    pub fn trace_origin_with(
        &self,
        value: &Operand,
        visited: &mut VisitedSet,
        depth: usize,
        origins: &mut Vec<Operand>,
    ) -> usize {
        struct Frame {
            children: std::vec::IntoIter<Operand>,
            depth: usize,
        }

        let Some(children) = self.visit(value, visited, origins) else {
            return depth;
        };
        // Depth-first, children in operand order
        let mut stack = vec![Frame {
            children: children.into_iter(),
            depth,
        }];
        let mut reached = depth;
        while let Some(frame) = stack.last_mut() {
            frame.depth = frame.depth.max(reached);
            match frame.children.next() {
                Some(child) => {
                    let d = frame.depth + 1;
                    if let Some(children) = self.visit(&child, visited, origins) {
                        stack.push(Frame {
                            children: children.into_iter(),
                            depth: d,
                        });
                    }
                    reached = d;
                }
                None => {
                    reached = frame.depth;
                    stack.pop();
                }
            }
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::Graph;
    use crate::llvm::builder::ModuleBuilder;
    use crate::llvm::constant::Constant;
    use crate::llvm::{Operand, Ty};

    #[test]
    fn canonicalize_strips_casts() {
        let mut m = ModuleBuilder::new("m");
        let g = m.global("g");
        let mut f = m.function("f", &[]);
        let x = f.alloca();
        let c1 = f.bitcast(x.clone());
        let c2 = f.addrspacecast(c1);
        let gep = f.gep(x.clone(), &[Operand::int(64, 1)]);
        f.ret(None);
        f.finish().unwrap();
        let module = m.build().unwrap();
        let graph = Graph::new(&module);

        assert_eq!(x, graph.canonicalize(&c2));
        // Instruction GEPs are followed by the tracer, not stripped
        assert_eq!(gep, graph.canonicalize(&gep));
        let Operand::Constant(gc) = &g else {
            unreachable!()
        };
        let cast = Operand::constant(Constant::GetElementPtr(crate::arc::Arc::new(
            Constant::BitCast(gc.clone()),
        )));
        assert_eq!(g, graph.canonicalize(&cast));
    }

    #[test]
    fn canonicalize_is_bounded() {
        let mut m = ModuleBuilder::new("m");
        let mut f = m.function("f", &[]);
        let x = f.alloca();
        let mut casts = vec![x.clone()];
        for _ in 0..8 {
            let c = f.bitcast(casts[casts.len() - 1].clone());
            casts.push(c);
        }
        f.ret(None);
        f.finish().unwrap();
        let module = m.build().unwrap();
        let graph = Graph::new(&module);

        assert_eq!(casts[2], graph.canonicalize(&casts[8]));
        assert_eq!(x, graph.canonicalize(&casts[6]));
    }

    #[test]
    fn select_ignores_condition() {
        let mut m = ModuleBuilder::new("m");
        let g = m.global("g");
        let mut f = m.function("f", &["c"]);
        let c = f.param(0);
        let x = f.alloca();
        let s = f.select(c, x.clone(), g.clone(), Ty::Pointer);
        f.ret(None);
        f.finish().unwrap();
        let module = m.build().unwrap();
        let graph = Graph::new(&module);

        let t = graph.trace_origin(&s);
        assert_eq!(vec![x, g], t.origins);
        // `g` is traced below the level `x` reached
        assert_eq!(2, t.max_depth);
        assert_eq!(3, t.visited);
    }
}
