use std::collections::HashMap;

use simdesk_config::{Access, Page, Permission};

/// Result of [`PermissionMatrix::toggle`], telling the caller which store
/// write to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggled {
  /// No row existed; this one was materialized.
  Created(Permission),
  Updated(Permission),
}

impl Toggled {
  pub fn permission(&self) -> &Permission {
    match self {
      Toggled::Created(p) | Toggled::Updated(p) => p,
    }
  }
}

/// Sparse `(role, page)` permission rows. A missing row grants nothing.
#[derive(Debug, Clone, Default)]
pub struct PermissionMatrix {
  rows: HashMap<(String, Page), Permission>,
}

impl PermissionMatrix {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build from stored rows. A later row for the same key wins.
  pub fn from_rows(rows: impl IntoIterator<Item = Permission>) -> Self {
    let rows = rows
      .into_iter()
      .map(|p| ((p.role_id.clone(), p.page), p))
      .collect();
    Self { rows }
  }

  pub fn get(&self, role_id: &str, page: Page) -> Option<&Permission> {
    self.rows.get(&(role_id.to_string(), page))
  }

  pub fn allows(&self, role_id: &str, page: Page, access: Access) -> bool {
    self
      .get(role_id, page)
      .is_some_and(|row| row.get(access))
  }

  /// Set one flag, creating the row with only that flag if it's missing.
  pub fn toggle(&mut self, role_id: &str, page: Page, access: Access, value: bool) -> Toggled {
    let key = (role_id.to_string(), page);
    match self.rows.get_mut(&key) {
      Some(row) => {
        row.set(access, value);
        Toggled::Updated(row.clone())
      }
      None => {
        let row = Permission::only(role_id, page, access, value);
        self.rows.insert(key, row.clone());
        Toggled::Created(row)
      }
    }
  }

  /// Rows for one role, in page order.
  pub fn for_role(&self, role_id: &str) -> Vec<&Permission> {
    Page::ALL
      .iter()
      .filter_map(|&page| self.get(role_id, page))
      .collect()
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_absent_row_denies() {
    let matrix = PermissionMatrix::new();
    for page in Page::ALL {
      assert!(!matrix.allows("role-1", page, Access::View));
    }
  }

  #[test]
  fn test_toggle_materializes_then_updates() {
    let mut matrix = PermissionMatrix::new();

    let first = matrix.toggle("role-1", Page::Tasks, Access::Edit, true);
    assert!(matches!(first, Toggled::Created(_)));
    assert!(matrix.allows("role-1", Page::Tasks, Access::Edit));
    assert!(!matrix.allows("role-1", Page::Tasks, Access::View));

    let second = matrix.toggle("role-1", Page::Tasks, Access::View, true);
    assert!(matches!(second, Toggled::Updated(_)));
    assert!(second.permission().can_edit);
    assert_eq!(matrix.len(), 1);
  }

  #[test]
  fn test_from_rows_and_for_role() {
    let matrix = PermissionMatrix::from_rows([
      Permission::only("admin", Page::ConfigCenter, Access::Delete, true),
      Permission::only("admin", Page::Dashboard, Access::View, true),
      Permission::only("seller", Page::Tasks, Access::View, true),
    ]);

    let pages: Vec<_> = matrix.for_role("admin").iter().map(|p| p.page).collect();
    assert_eq!(pages, vec![Page::Dashboard, Page::ConfigCenter]);
    assert!(!matrix.allows("seller", Page::ConfigCenter, Access::View));
  }
}
