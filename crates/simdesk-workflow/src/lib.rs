//! simdesk Workflow
//!
//! Analysis of flow definitions. The repository never runs a flow; this
//! crate checks that what administrators author is coherent before it is
//! saved:
//! - every action target names a stage present in the flow
//! - stages and per-node actions are unique
//! - module and role references resolve
//! - structural findings (unreachable stages, terminal stages with exits,
//!   rollback loops) are reported as warnings

mod error;
mod graph;
mod validate;

pub use error::{FlowError, FlowWarning, InvalidFlow};
pub use graph::{FlowGraph, Transition};
pub use validate::{FlowValidator, ValidationReport};
