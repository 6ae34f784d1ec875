// SPDX-License-Identifier: BSD-3-Clause
use std::path::PathBuf;

/// Pointer-origin tracing for LLVM bitcode
#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Debug
    #[arg(long)]
    pub debug: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// LLVM bitcode module
    #[arg()]
    pub module: PathBuf,

    /// Only report arguments with non-allocating origins
    #[arg(long)]
    pub only_unresolved: bool,

    /// Quiet
    #[arg(long)]
    pub quiet: bool,

    /// Allocator signatures
    #[arg(short, long)]
    pub signatures: Option<PathBuf>,

    /// Tracing
    #[arg(long)]
    pub tracing: bool,
}
