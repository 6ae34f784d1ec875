// SPDX-License-Identifier: BSD-3-Clause
use std::io::{self, Write};

use anyhow::{Context, Error, Result};
use clap::Parser;

use tracing_flame::FlameLayer;
use tracing_subscriber::{fmt, prelude::*};

use yapot::{
    analysis::report::{self, ModuleReport},
    layers, llvm, Classifier, Signatures,
};

mod cli;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn setup_global_subscriber() -> Result<impl Drop> {
    let filter_layer = tracing::level_filters::LevelFilter::TRACE;
    let fmt_layer = fmt::Layer::default().with_writer(io::stderr);
    let (flame_layer, guard) =
        FlameLayer::with_file("./tracing.folded").context("Couldn't create ./tracing.folded")?;
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(flame_layer)
        .with(layers::SpanTimeLayer)
        .init();
    Ok(guard)
}

fn print_text(out: &mut impl Write, report: &ModuleReport) -> io::Result<()> {
    writeln!(out, "module: {}", report.name)?;
    for f in &report.functions {
        writeln!(out, "{}", f.name)?;
        for c in &f.calls {
            writeln!(out, "  {}", c.instruction)?;
            for a in &c.args {
                writeln!(
                    out,
                    "    arg {} ({}): max depth {}, indirections {}, non-allocating origins {}",
                    a.position, a.arg, a.max_depth, a.indirections, a.non_alloc_origins
                )?;
                for o in &a.origins {
                    match &o.function {
                        Some(func) => writeln!(out, "      {} (in {}) [{}]", o.origin, func, o.kind)?,
                        None => writeln!(out, "      {} [{}]", o.origin, o.kind)?,
                    }
                }
            }
        }
    }
    let s = &report.summary;
    writeln!(out)?;
    writeln!(out, "functions: {}", s.functions)?;
    writeln!(out, "calls: {}", s.calls)?;
    writeln!(out, "pointer arguments: {}", s.pointer_args)?;
    writeln!(out, "unresolved arguments: {}", s.unresolved_args)?;
    writeln!(out, "max indirections: {}", s.max_indirections)?;
    Ok(())
}

fn main() -> Result<()> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    let args = cli::Args::parse();

    let _guard = if args.tracing {
        Some(setup_global_subscriber()?)
    } else {
        None
    };

    let signatures = match &args.signatures {
        Some(path) => Signatures::from_path(path)
            .with_context(|| format!("Couldn't load signatures from {}", path.display()))?,
        None => Signatures::default(),
    };
    let classifier = Classifier::new(signatures);

    let llvm_module = llvm_ir::Module::from_bc_path(&args.module)
        .map_err(Error::msg)
        .with_context(|| {
            format!(
                "Couldn't parse LLVM bitcode module at {}",
                args.module.display()
            )
        })?;
    let module = llvm::Module::from_llvm(&llvm_module).context("Malformed LLVM module")?;
    drop(llvm_module);

    let opts = report::Options {
        debug: args.debug,
        only_unresolved: args.only_unresolved,
    };
    let out = report::analysis(&module, &classifier, &opts);

    if !args.quiet {
        let mut stdout = io::stdout().lock();
        if args.json {
            serde_json::to_writer_pretty(&mut stdout, &out).context("Couldn't write report")?;
            writeln!(stdout)?;
        } else {
            print_text(&mut stdout, &out)?;
        }
    }

    Ok(())
}
