// SPDX-License-Identifier: BSD-3-Clause
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, thiserror::Error)]
#[error("Malformed LLVM module: {0}")]
pub struct Error(pub String);
