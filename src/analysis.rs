// SPDX-License-Identifier: BSD-3-Clause
pub mod callgraph;
pub mod classify;
pub mod origin;
pub mod report;
