// SPDX-License-Identifier: BSD-3-Clause
//! Per-argument origin reports
//!
//! Traces every pointer-typed argument of every call in a module, each with
//! its own visited set, and classifies the origins found.

#[cfg(feature = "par")]
use rayon::prelude::*;
use tracing::{info, trace_span};

use crate::{
    arc::UArc,
    llvm::instruction::{Call, Opcode},
    llvm::{
        Callee, Function, FunctionName, InstructionName, Invoke, Module, Operand, TerminatorOpcode,
    },
};

use super::classify::{Classifier, OriginKind};
use super::origin::{Def, Graph};

#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    /// Print per-function statistics to stderr
    pub debug: bool,
    /// Only report arguments with at least one non-allocating origin
    pub only_unresolved: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct OriginReport {
    pub origin: String,
    /// Function containing the origin, for instructions and parameters
    pub function: Option<String>,
    pub kind: OriginKind,
    pub allocating: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ArgReport {
    pub position: usize,
    pub arg: String,
    pub max_depth: usize,
    /// Number of distinct values examined
    pub indirections: usize,
    pub non_alloc_origins: usize,
    pub origins: Vec<OriginReport>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct CallReport {
    pub instruction: String,
    /// Symbol name of the direct callee
    pub callee: Option<String>,
    pub args: Vec<ArgReport>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FunctionReport {
    pub name: String,
    pub calls: Vec<CallReport>,
}

/// Counts over the whole module, regardless of [`Options::only_unresolved`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct Summary {
    /// Number of defined functions
    pub functions: usize,
    /// Number of `call`s and `invoke`s
    pub calls: usize,
    /// Number of pointer-typed arguments to calls, i.e., of traces
    pub pointer_args: usize,
    /// Pointer-typed arguments with at least one non-allocating origin.
    /// Lower is better.
    pub unresolved_args: usize,
    /// Largest number of values examined by a single trace
    pub max_indirections: usize,
}

impl Summary {
    fn add(&mut self, f: &FunctionReport) {
        self.functions += 1;
        self.calls += f.calls.len();
        for c in &f.calls {
            self.pointer_args += c.args.len();
            for a in &c.args {
                if a.non_alloc_origins > 0 {
                    self.unresolved_args += 1;
                }
                self.max_indirections = self.max_indirections.max(a.indirections);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ModuleReport {
    pub name: String,
    /// Sorted by name
    pub functions: Vec<FunctionReport>,
    pub summary: Summary,
}

fn call_text(name: &UArc<InstructionName>, mnemonic: &str, callee: &Callee) -> String {
    match callee {
        Callee::Operand(op) => format!("{} = {} {}", name, mnemonic, op),
        Callee::Asm => format!("{} = {} asm", name, mnemonic),
    }
}

fn origin_text(graph: &Graph<'_>, origin: &Operand) -> String {
    let Some(name) = origin.instruction_name() else {
        return origin.to_string();
    };
    match graph.def(name) {
        Some(Def::Instruction(Opcode::Call(Call { callee, .. }))) => {
            call_text(name, "call", callee)
        }
        Some(Def::Terminator(TerminatorOpcode::Invoke(Invoke { callee, .. }))) => {
            call_text(name, "invoke", callee)
        }
        Some(Def::Instruction(opcode)) => format!("{} = {}", name, opcode.mnemonic()),
        Some(Def::Terminator(opcode)) => format!("{} = {}", name, opcode.mnemonic()),
        None => name.to_string(),
    }
}

/// Trace one argument.
pub fn argument(
    graph: &Graph<'_>,
    classifier: &Classifier,
    position: usize,
    arg: &Operand,
) -> ArgReport {
    let _span = trace_span!("argument").entered();
    let trace = graph.trace_origin(arg);
    let origins: Vec<_> = trace
        .origins
        .iter()
        .map(|o| {
            let kind = classifier.classify(graph, o);
            OriginReport {
                origin: origin_text(graph, o),
                function: o.parent_function().map(|f| f.get().to_string()),
                kind,
                allocating: kind.is_allocating(),
            }
        })
        .collect();
    ArgReport {
        position,
        arg: arg.to_string(),
        max_depth: trace.max_depth,
        indirections: trace.visited,
        non_alloc_origins: origins.iter().filter(|o| !o.allocating).count(),
        origins,
    }
}

fn call<'a>(
    graph: &Graph<'_>,
    classifier: &Classifier,
    name: &UArc<InstructionName>,
    mnemonic: &str,
    callee: &Callee,
    pointer_args: impl Iterator<Item = (usize, &'a Operand)>,
) -> CallReport {
    CallReport {
        instruction: call_text(name, mnemonic, callee),
        callee: callee.direct().map(|f| f.get().to_string()),
        args: pointer_args
            .map(|(i, a)| argument(graph, classifier, i, a))
            .collect(),
    }
}

/// Report on all calls in `f`, in block order.
pub fn function(
    graph: &Graph<'_>,
    classifier: &Classifier,
    name: &UArc<FunctionName>,
    f: &Function,
) -> FunctionReport {
    let _span = trace_span!("function").entered();
    let mut calls = Vec::new();
    for b in &f.blocks {
        for i in &b.instrs {
            if let Opcode::Call(c) = &i.opcode {
                calls.push(call(
                    graph,
                    classifier,
                    &i.name,
                    "call",
                    &c.callee,
                    c.pointer_args(),
                ));
            }
        }
        if let TerminatorOpcode::Invoke(inv) = &b.terminator.opcode {
            calls.push(call(
                graph,
                classifier,
                &b.terminator.name,
                "invoke",
                &inv.callee,
                inv.pointer_args(),
            ));
        }
    }
    FunctionReport {
        name: name.get().to_string(),
        calls,
    }
}

#[cfg(not(feature = "par"))]
fn functions(graph: &Graph<'_>, classifier: &Classifier) -> Vec<FunctionReport> {
    graph
        .module()
        .sorted_functions()
        .into_iter()
        .map(|(name, f)| function(graph, classifier, name, f))
        .collect()
}

#[cfg(feature = "par")]
fn functions(graph: &Graph<'_>, classifier: &Classifier) -> Vec<FunctionReport> {
    graph
        .module()
        .sorted_functions()
        .par_iter()
        .map(|(name, f)| function(graph, classifier, name, f))
        .collect()
}

/// Origin reports for every pointer-typed call argument in `module`
pub fn analysis(module: &Module, classifier: &Classifier, opts: &Options) -> ModuleReport {
    let _span = trace_span!("analysis").entered();
    let graph = Graph::new(module);
    let mut functions = functions(&graph, classifier);

    let mut summary = Summary::default();
    for f in &functions {
        summary.add(f);
        if opts.debug {
            let args: usize = f.calls.iter().map(|c| c.args.len()).sum();
            let unresolved: usize = f
                .calls
                .iter()
                .flat_map(|c| &c.args)
                .filter(|a| a.non_alloc_origins > 0)
                .count();
            eprintln!(
                "{}: {} calls, {} pointer arguments, {} unresolved",
                f.name,
                f.calls.len(),
                args,
                unresolved
            );
        }
    }
    info!(
        "Traced {} arguments of {} calls, {} unresolved",
        summary.pointer_args, summary.calls, summary.unresolved_args
    );

    if opts.only_unresolved {
        for f in &mut functions {
            for c in &mut f.calls {
                c.args.retain(|a| a.non_alloc_origins > 0);
            }
            f.calls.retain(|c| !c.args.is_empty());
        }
        functions.retain(|f| !f.calls.is_empty());
    }

    ModuleReport {
        name: module.name.clone(),
        functions,
        summary,
    }
}
