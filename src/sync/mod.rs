// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace selection, mirror writes, the sync registry and the event handlers
//! that drive convergence.

pub mod convergence;
pub mod manager;
pub mod registry;
pub mod selector;
pub mod writer;

pub use convergence::{converge, ConvergencePlan};
pub use manager::{SyncEvent, SyncManager};
pub use registry::{SyncRecord, SyncRegistry};
pub use selector::MatchExpression;
pub use writer::{build_mirror, mirror_owner, MirrorWriter, UpsertOutcome};
