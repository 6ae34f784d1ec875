// SPDX-License-Identifier: BSD-3-Clause
//! Call-site index
//!
//! For every defined function, the call sites that target it, together with
//! the actual argument each one binds to each formal parameter. Besides
//! direct calls (possibly through constant pointer casts of the callee), this
//! includes *callback* call sites: calls to a known broker such as
//! `pthread_create` that will eventually call one of its arguments.
//!
//! Other uses of a function's address (stores, comparisons, indirect calls
//! through locals) do not create call sites.

use rustc_hash::FxHashMap;

use crate::{
    arc::UArc,
    llvm::instruction::Opcode,
    llvm::{Callee, FunctionName, InstructionName, Module, Operand, TerminatorOpcode},
};

/// A function that calls one of its arguments
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Broker {
    pub name: &'static str,
    /// Argument position of the callback
    pub callee: usize,
    /// Broker argument bound to each callback parameter, `None` if unknown
    pub params: &'static [Option<usize>],
    /// Callback parameters after `params` are bound to the broker's
    /// arguments starting at this position
    pub variadic: Option<usize>,
}

impl Broker {
    fn bind(&self, args: &[Operand], nparams: usize) -> Vec<Option<Operand>> {
        (0..nparams)
            .map(|p| {
                let arg = match self.params.get(p) {
                    Some(a) => *a,
                    None => self.variadic.map(|first| first + p - self.params.len()),
                };
                arg.and_then(|a| args.get(a)).cloned()
            })
            .collect()
    }
}

pub static BROKERS: [Broker; 3] = [
    // int pthread_create(pthread_t *, const pthread_attr_t *, void *(*)(void *), void *)
    Broker {
        name: "pthread_create",
        callee: 2,
        params: &[Some(3)],
        variadic: None,
    },
    // void __kmpc_fork_call(ident_t *, kmp_int32 argc, kmpc_micro, ...)
    //
    // The first two parameters of the outlined function are the global and
    // bound thread IDs, supplied by the runtime.
    Broker {
        name: "__kmpc_fork_call",
        callee: 2,
        params: &[None, None],
        variadic: Some(3),
    },
    Broker {
        name: "__kmpc_fork_teams",
        callee: 2,
        params: &[None, None],
        variadic: Some(3),
    },
];

pub fn broker(name: &str) -> Option<&'static Broker> {
    BROKERS.iter().find(|b| b.name == name)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSite {
    /// The `call` or `invoke`
    pub instruction: UArc<InstructionName>,
    /// Set for callback call sites
    pub broker: Option<&'static Broker>,
    bound: Vec<Option<Operand>>,
}

impl CallSite {
    /// The actual argument bound to the formal parameter at `position`.
    /// `None` if the call passes fewer arguments, or if the broker doesn't
    /// say.
    pub fn argument(&self, position: usize) -> Option<&Operand> {
        self.bound.get(position).and_then(Option::as_ref)
    }
}

#[derive(Debug, Default)]
pub struct CallGraph {
    sites: FxHashMap<UArc<FunctionName>, Vec<CallSite>>,
}

impl CallGraph {
    pub fn new(module: &Module) -> Self {
        let mut sites: FxHashMap<UArc<FunctionName>, Vec<CallSite>> = FxHashMap::default();
        let nparams = |f: &UArc<FunctionName>| module.functions.get(f).map(|f| f.parameters.len());

        let mut add = |name: &UArc<InstructionName>, callee: &Callee, args: &[Operand]| {
            let Some(target) = callee.direct() else {
                return;
            };
            if let Some(n) = nparams(target) {
                sites.entry(target.clone()).or_default().push(CallSite {
                    instruction: name.clone(),
                    broker: None,
                    bound: (0..n).map(|p| args.get(p).cloned()).collect(),
                });
            }
            if let Some(b) = broker(target.get()) {
                let callback = args.get(b.callee).and_then(|a| match a {
                    Operand::Constant(c) => c.function(),
                    _ => None,
                });
                if let Some(cb) = callback {
                    if let Some(n) = nparams(cb) {
                        sites.entry(cb.clone()).or_default().push(CallSite {
                            instruction: name.clone(),
                                    broker: Some(b),
                            bound: b.bind(args, n),
                        });
                    }
                }
            }
        };

        // Sorted, so that call sites are listed in a deterministic order
        for (_, f) in module.sorted_functions() {
            for b in &f.blocks {
                for i in &b.instrs {
                    if let Opcode::Call(c) = &i.opcode {
                        add(&i.name, &c.callee, &c.args);
                    }
                }
                match &b.terminator.opcode {
                    TerminatorOpcode::Invoke(i) => add(&b.terminator.name, &i.callee, &i.args),
                    // No `_` pattern to ensure this is updated if the type changes
                    TerminatorOpcode::Ret(_) => (),
                    TerminatorOpcode::Other => (),
                }
            }
        }
        CallGraph { sites }
    }

    /// Call sites targeting `f`, in module order
    pub fn call_sites(&self, f: &UArc<FunctionName>) -> &[CallSite] {
        self.sites.get(f).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of call edges
    pub fn len(&self) -> usize {
        self.sites.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{broker, CallGraph};
    use crate::llvm::builder::ModuleBuilder;
    use crate::llvm::{Operand, Ty};

    #[test]
    fn kmpc_binding() {
        let b = broker("__kmpc_fork_call").unwrap();
        let args: Vec<_> = (0..5).map(|i| Operand::int(32, i)).collect();
        let bound = b.bind(&args, 4);
        assert_eq!(
            vec![None, None, Some(Operand::int(32, 3)), Some(Operand::int(32, 4))],
            bound
        );
        assert!(broker("malloc").is_none());
    }

    #[test]
    fn direct_and_callback_sites() {
        let mut m = ModuleBuilder::new("m");
        let create = m
            .declare("pthread_create")
            .unwrap();

        let mut w = m.function("worker", &["arg"]);
        let arg = w.param(0);
        w.ret(Some(arg));
        let worker = w.finish().unwrap();

        let mut f = m.function("main", &[]);
        let x = f.alloca();
        let tid = f.alloca();
        let direct = f.call(
            Operand::function(worker.clone()),
            &[(x.clone(), Ty::Pointer)],
            Ty::Pointer,
        );
        f.call(
            Operand::function(create),
            &[
                (tid, Ty::Pointer),
                (Operand::null(), Ty::Pointer),
                (Operand::function(worker.clone()), Ty::Pointer),
                (x.clone(), Ty::Pointer),
            ],
            Ty::Int(32),
        );
        f.ret(Some(Operand::int(32, 0)));
        f.finish().unwrap();
        let module = m.build().unwrap();

        let cg = CallGraph::new(&module);
        let sites = cg.call_sites(&worker);
        assert_eq!(2, sites.len());
        assert_eq!(direct.instruction_name(), Some(&sites[0].instruction));
        assert!(sites[0].broker.is_none());
        assert_eq!(Some(&x), sites[0].argument(0));
        assert_eq!("pthread_create", sites[1].broker.unwrap().name);
        assert_eq!(Some(&x), sites[1].argument(0));
        assert_eq!(None, sites[1].argument(1));
        // Declarations have no parameters to bind
        assert_eq!(2, cg.len());
    }
}
