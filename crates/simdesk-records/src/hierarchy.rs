//! Organization tree rules.
//!
//! Departments are roots, channels hang off a department and subchannels
//! off a channel.

use simdesk_config::{Organization, Tpa};

use crate::error::RecordError;

/// Check that `org` may sit under `parent`.
///
/// `parent` is the organization `org.parent_id` resolves to, or `None` when
/// the id is unset. A set id that didn't resolve should be reported with
/// [`RecordError::ParentNotFound`] by the caller before getting here.
pub fn check_parent(org: &Organization, parent: Option<&Organization>) -> Result<(), RecordError> {
  match (org.org_type.expected_parent(), parent) {
    (None, None) => Ok(()),
    (None, Some(_)) => Err(RecordError::UnexpectedParent {
      child: org.org_type,
    }),
    (Some(expected), None) => Err(RecordError::MissingParent {
      child: org.org_type,
      expected,
    }),
    (Some(expected), Some(p)) if p.org_type == expected => Ok(()),
    (Some(expected), Some(p)) => Err(RecordError::WrongParentType {
      child: org.org_type,
      expected,
      actual: p.org_type,
    }),
  }
}

/// What still points at an organization that is about to be deleted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrgReferences {
  /// Ids of direct child organizations.
  pub children: Vec<String>,
  /// Names of TPAs linking the organization as a channel.
  pub tpas: Vec<String>,
}

impl OrgReferences {
  pub fn is_empty(&self) -> bool {
    self.children.is_empty() && self.tpas.is_empty()
  }
}

/// Collect the references to organization `id` (named `name`).
///
/// `orgs` yields `(id, organization)` pairs for the whole tree.
pub fn references_to<'a>(
  id: &str,
  name: &str,
  orgs: impl IntoIterator<Item = (&'a str, &'a Organization)>,
  tpas: impl IntoIterator<Item = &'a Tpa>,
) -> OrgReferences {
  let children = orgs
    .into_iter()
    .filter(|(_, org)| org.parent_id.as_deref() == Some(id))
    .map(|(child_id, _)| child_id.to_string())
    .collect();

  let tpas = tpas
    .into_iter()
    .filter(|tpa| tpa.channels.iter().any(|c| c == name))
    .map(|tpa| tpa.name.clone())
    .collect();

  OrgReferences { children, tpas }
}

/// Reject deleting an organization that still has children.
///
/// TPA links don't block the delete; they turn into orphans the TPA check
/// reports.
pub fn check_delete(name: &str, refs: &OrgReferences) -> Result<(), RecordError> {
  if refs.children.is_empty() {
    return Ok(());
  }
  Err(RecordError::HasChildren {
    name: name.to_string(),
    children: refs.children.len(),
  })
}
