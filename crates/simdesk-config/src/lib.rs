//! simdesk Config
//!
//! This crate contains the serializable record types for simdesk: the
//! task-template and flow-definition schema plus the reference data and
//! operational records administrators maintain.
//!
//! Flow documents are read leniently. Older shapes (`cancel` for the
//! cancelled stage, `targetStep`/`targetRole` on actions, a flat
//! `currentHandler` string on nodes) are accepted and normalized, and
//! documents are always written back in the canonical shape.

mod action;
mod directory;
mod error;
mod flow;
mod handler;
mod node;
mod records;
mod stage;
mod task;
mod template;

pub use action::{Action, ActionKind};
pub use directory::{
  LEVEL_COLORS, MAX_ROLE_LEVEL, OrgType, Organization, Program, Region, Role, Tpa, level_color,
};
pub use error::ConfigError;
pub use flow::FlowDef;
pub use handler::Handler;
pub use node::{FlowNode, NodeKey};
pub use records::{
  Access, BillingStatus, Customer, CustomerPatch, Iccid, Page, Permission, TpaBilling,
};
pub use stage::Stage;
pub use task::{Task, TaskStatus};
pub use template::{DEFAULT_DISPLAY_ORDER, ModuleAttachment, TaskTemplate, VISIBLE_TO_ALL};
