//! simdesk Records
//!
//! Rules that apply to stored records rather than to flow definitions:
//! customer code sequencing, the organization tree, TPA link checks, the
//! sparse permission matrix and CSV export.

mod code;
mod error;
pub mod export;
mod hierarchy;
mod permissions;
mod tpa;

pub use code::{format_customer_code, next_customer_code, parse_customer_code};
pub use error::RecordError;
pub use export::{CustomerField, DateRange, write_billing, write_customers, write_iccids};
pub use hierarchy::{OrgReferences, check_delete, check_parent, references_to};
pub use permissions::{PermissionMatrix, Toggled};
pub use tpa::{Orphan, TpaChecker};
