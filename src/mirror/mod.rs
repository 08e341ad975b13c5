// src/mirror/mod.rs
// =============================================================================
// This module contains the traversal engine: everything between "here is the
// root response" and "the tree is on disk".
//
// Submodules:
// - engine: the task queue / bounded pool that walks the remote tree
// - links: href extraction, link resolution, local names from urls
// - sink: directory creation and chunked file writes
// - report: what happened during a run (files, failures)
// =============================================================================

mod engine;
mod links;
mod report;
mod sink;

pub use engine::{Mirror, MirrorConfig};
pub use report::{FailureKind, Report};
