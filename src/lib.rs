// SPDX-License-Identifier: BSD-3-Clause
//! Yet Another Pointer-Origin Tracer for LLVM
//!
//! For each pointer passed to a call, find the allocations, globals,
//! constants and opaque calls it could have come from, and flag those whose
//! origins aren't all known allocations.
//!
//! ```
//! use yapot::{analysis::report, llvm::builder::ModuleBuilder, Classifier, Operand, Ty};
//!
//! let mut m = ModuleBuilder::new("example");
//! let sink = m.declare("sink").unwrap();
//! let mut f = m.function("main", &[]);
//! let x = f.alloca();
//! f.call(Operand::function(sink), &[(x, Ty::Pointer)], Ty::Void);
//! f.ret(None);
//! f.finish().unwrap();
//! let module = m.build().unwrap();
//!
//! let out = report::analysis(&module, &Classifier::default(), &report::Options::default());
//! assert_eq!(1, out.summary.pointer_args);
//! assert_eq!(0, out.summary.unresolved_args);
//! ```

pub mod alloc;
pub mod analysis;
pub mod arc;
pub mod demangle;
pub mod layers;
pub mod llvm;
pub mod signatures;

pub use alloc::AllocKind;
pub use analysis::classify::{Classifier, OriginKind};
pub use analysis::origin::{Graph, TraceResult, VisitedSet};
pub use analysis::report::{self, ModuleReport};
pub use arc::{Arc, UArc};
pub use demangle::{CppDemangler, Demangler};
pub use llvm::{Callee, FunctionName, Module, Operand, Ty};
pub use signatures::Signatures;
