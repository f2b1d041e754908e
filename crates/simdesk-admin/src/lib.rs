//! simdesk Admin
//!
//! Services behind the back-office screens. Each one ties the pure rules in
//! `simdesk-workflow` and `simdesk-records` to the document store:
//! - [`TemplateService`]: validated, revision-checked template writes
//! - [`Directory`]: roles, organization tree, regions, programs and TPAs
//! - [`PermissionService`]: the persisted permission matrix
//! - [`Records`]: customers with allocated codes, ICCIDs, billing and CSV export
//! - [`TaskService`]: task instances started from templates

mod directory;
mod error;
mod permissions;
mod records;
mod tasks;
mod templates;

pub use directory::Directory;
pub use error::AdminError;
pub use permissions::PermissionService;
pub use records::Records;
pub use tasks::TaskService;
pub use templates::TemplateService;
