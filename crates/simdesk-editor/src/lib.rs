//! simdesk Editor
//!
//! Edit operations administrators perform on a task template:
//! - [`FlowEditor`]: add, edit, delete and reorder flow nodes; toggle actions
//!   and bind their targets
//! - [`ModuleEditor`]: select, reorder and override module attachments
//!
//! Editors work on owned copies. Callers persist the result as one
//! revision-checked document write.

mod error;
mod flow;
mod modules;
mod reorder;

pub use error::EditError;
pub use flow::{DeletedNode, FlowEditor};
pub use modules::{AttachmentPatch, ModuleEditor};
pub use reorder::move_item;
