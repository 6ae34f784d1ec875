// To debug or develop a test, try `eprintln!("{}", serde_json::to_string_pretty(&out).unwrap())`
//
// Requires clang 14 on the PATH.

#![cfg(feature = "llvm")]

use std::{path::PathBuf, process::Command};

use yapot::{
    report::{self, ModuleReport, Options},
    Classifier, Module, OriginKind,
};

// ------------------------------------------------------------------
// Helpers

fn compile(prog: &str, dir: &str, opt: u8) -> llvm_ir::Module {
    let out = format!("tests/{}/{}-{}.bc", dir, prog, opt);
    let compiler = if prog.ends_with(".c") {
        "clang"
    } else if prog.ends_with(".cpp") {
        "clang++"
    } else {
        panic!("Bad program path, expected .c or .cpp: {prog}");
    };
    let status = Command::new(compiler)
        .arg("-emit-llvm")
        .arg("-c")
        .arg(format!("-O{}", opt))
        .arg("-Werror")
        .arg("-o")
        .arg(&out)
        .arg(format!("tests/{}/{}", dir, prog))
        .status()
        .unwrap();
    assert!(status.success());
    llvm_ir::Module::from_bc_path(PathBuf::from(&out)).unwrap()
}

fn convert(program: &str, opt: u8) -> Module {
    let llvm_module = compile(program, "bitcode", opt);
    match Module::from_llvm(&llvm_module) {
        Ok(m) => m,
        Err(e) => panic!("{}", e),
    }
}

/// Check every call to `assert_allocating` and `assert_unresolved`, and
/// return how many there were.
fn check_assertions(out: &ModuleReport) -> usize {
    let mut checked = 0;
    for f in &out.functions {
        for c in &f.calls {
            match c.callee.as_deref() {
                Some("assert_allocating") => {
                    for a in &c.args {
                        assert_eq!(0, a.non_alloc_origins, "{}: {:#?}", f.name, a);
                    }
                }
                Some("assert_unresolved") => {
                    for a in &c.args {
                        assert!(a.non_alloc_origins > 0, "{}: {:#?}", f.name, a);
                    }
                }
                Some(name) if name.starts_with("assert_") => {
                    panic!("Unknown assertion: {name}")
                }
                _ => continue,
            }
            checked += 1;
        }
    }
    checked
}

fn check(program: &str, opt: u8) -> ModuleReport {
    let module = convert(program, opt);
    let out = report::analysis(&module, &Classifier::default(), &Options::default());
    assert!(check_assertions(&out) > 0);
    out
}

// ------------------------------------------------------------------

// The call goes through `@id_alias`, which has to resolve to `@id`
#[test]
fn alias_o0() {
    check("alias.c", 0);
}

#[test]
fn alias_o1() {
    check("alias.c", 1);
}

#[test]
fn alloca_o0() {
    check("alloca.c", 0);
}

#[test]
fn alloca_o1() {
    check("alloca.c", 1);
}

#[test]
fn alloca_o2() {
    check("alloca.c", 2);
}

// At -O0 every local lives in a stack slot, so the parameter is never
// reached.
#[test]
fn argv_o1() {
    check("argv.c", 1);
}

#[test]
fn argv_o2() {
    check("argv.c", 2);
}

#[test]
fn bar_o0() {
    check("bar.c", 0);
}

#[test]
fn bar_o1() {
    let out = check("bar.c", 1);
    assert_eq!(3, out.summary.functions);
}

#[test]
fn bar_o2() {
    check("bar.c", 2);
}

#[test]
fn getenv_o1() {
    let out = check("getenv.c", 1);
    let kinds: Vec<_> = out
        .functions
        .iter()
        .flat_map(|f| &f.calls)
        .filter(|c| c.callee.as_deref() == Some("assert_unresolved"))
        .flat_map(|c| &c.args)
        .flat_map(|a| &a.origins)
        .map(|o| o.kind)
        .collect();
    assert_eq!(vec![OriginKind::ExternalCall], kinds);
}

#[test]
fn malloc_o0() {
    check("malloc.c", 0);
}

#[test]
fn malloc_o1() {
    check("malloc.c", 1);
}

#[test]
fn malloc_o2() {
    check("malloc.c", 2);
}

#[test]
fn pthread_o0() {
    check("pthread.c", 0);
}

#[test]
fn pthread_o1() {
    check("pthread.c", 1);
}

#[test]
fn recursion_o0() {
    check("recursion.c", 0);
}

#[test]
fn recursion_o1() {
    check("recursion.c", 1);
}

#[test]
fn recursion_o2() {
    check("recursion.c", 2);
}

#[test]
fn select_o0() {
    check("select.c", 0);
}

#[test]
fn select_o1() {
    check("select.c", 1);
}

#[test]
fn select_o2() {
    check("select.c", 2);
}

#[test]
fn deterministic() {
    let module = convert("bar.c", 1);
    let classifier = Classifier::default();
    let opts = Options::default();
    assert_eq!(
        report::analysis(&module, &classifier, &opts),
        report::analysis(&module, &classifier, &opts)
    );
}
