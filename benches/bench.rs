use criterion::{black_box, criterion_group, criterion_main, Criterion};

use yapot::{
    llvm::builder::ModuleBuilder,
    report::{self, Options},
    Classifier, Graph, Module, Operand, Ty,
};

// ------------------------------------------------------------------

/// `len` functions `f0`..`fN`, each passing its parameter (through a few
/// GEPs and a loop phi) to the next and to `sink`, and returning the next
/// one's result. `main` calls `f0` with a stack and a heap pointer; the
/// first of these calls is returned along with the module.
fn chain(len: usize) -> (Module, Operand) {
    let mut m = ModuleBuilder::new("chain");
    let malloc = m.declare("malloc").unwrap();
    let sink = m.declare("sink").unwrap();

    for i in 0..len {
        let name = format!("f{}", i);
        let mut f = m.function(&name, &["p"]);
        let p = f.param(0);
        f.block("entry");
        let slot = f.alloca();
        f.store(p.clone(), slot.clone());
        f.block("loop");
        let phi = f.phi(&[p], Ty::Pointer);
        let gep = f.gep(phi.clone(), &[Operand::int(64, 1)]);
        f.add_incoming(&phi, gep.clone()).unwrap();
        let cast = f.bitcast(gep);
        f.call(
            Operand::function(sink.clone()),
            &[(cast.clone(), Ty::Pointer)],
            Ty::Void,
        );
        f.block("exit");
        let r = if i + 1 < len {
            let next = f.function_ref(&format!("f{}", i + 1));
            f.call(next, &[(cast, Ty::Pointer)], Ty::Pointer)
        } else {
            f.load(slot, Ty::Pointer)
        };
        f.ret(Some(r));
        f.finish().unwrap();
    }

    let mut f = m.function("main", &[]);
    let f0 = f.function_ref("f0");
    let x = f.alloca();
    let h = f.call(
        Operand::function(malloc),
        &[(Operand::int(64, 64), Ty::Int(64))],
        Ty::Pointer,
    );
    let call = f.call(f0.clone(), &[(x, Ty::Pointer)], Ty::Pointer);
    f.call(f0, &[(h, Ty::Pointer)], Ty::Pointer);
    f.ret(Some(Operand::int(32, 0)));
    f.finish().unwrap();
    (m.build().unwrap(), call)
}

// ------------------------------------------------------------------

pub fn graph_100(c: &mut Criterion) {
    let (m, _) = chain(100);
    c.bench_function("Graph::new(chain-100)", |b| {
        b.iter(|| Graph::new(black_box(&m)))
    });
}

pub fn trace_100(c: &mut Criterion) {
    let (m, call) = chain(100);
    let graph = Graph::new(&m);
    c.bench_function("Graph::trace_origin(chain-100)", |b| {
        b.iter(|| graph.trace_origin(black_box(&call)))
    });
}

pub fn analysis_100(c: &mut Criterion) {
    let (m, _) = chain(100);
    let classifier = Classifier::default();
    c.bench_function("report::analysis(chain-100)", |b| {
        b.iter(|| report::analysis(black_box(&m), &classifier, &Options::default()))
    });
}

pub fn analysis_1000(c: &mut Criterion) {
    let (m, _) = chain(1000);
    let classifier = Classifier::default();
    c.bench_function("report::analysis(chain-1000)", |b| {
        b.iter(|| report::analysis(black_box(&m), &classifier, &Options::default()))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = graph_100, trace_100, analysis_100, analysis_1000
}
criterion_main!(benches);
