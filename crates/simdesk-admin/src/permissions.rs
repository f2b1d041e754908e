use std::sync::Arc;

use simdesk_config::{Access, Page, Permission};
use simdesk_records::{PermissionMatrix, Toggled};
use simdesk_store::{ListQuery, Repository, Store};

use crate::error::AdminError;

/// Persisted permission matrix.
pub struct PermissionService {
  rows: Repository<Permission>,
}

impl PermissionService {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self {
      rows: Repository::new(store),
    }
  }

  pub async fn matrix(&self) -> Result<PermissionMatrix, AdminError> {
    let rows = self.rows.list(&ListQuery::new()).await?;
    Ok(PermissionMatrix::from_rows(rows.into_iter().map(|d| d.data)))
  }

  pub async fn allows(&self, role_id: &str, page: Page, access: Access) -> Result<bool, AdminError> {
    let rows = self.rows.filter("role_id", role_id, &ListQuery::new()).await?;
    let matrix = PermissionMatrix::from_rows(rows.into_iter().map(|d| d.data));
    Ok(matrix.allows(role_id, page, access))
  }

  /// Set one flag and persist the row, creating it on first use.
  pub async fn toggle(
    &self,
    role_id: &str,
    page: Page,
    access: Access,
    value: bool,
  ) -> Result<Permission, AdminError> {
    let rows = self.rows.filter("role_id", role_id, &ListQuery::new()).await?;
    let existing = rows.into_iter().find(|d| d.data.page == page);

    let mut matrix = PermissionMatrix::from_rows(existing.iter().map(|d| d.data.clone()));
    let toggled = matrix.toggle(role_id, page, access, value);

    let saved = match (toggled, existing) {
      (Toggled::Updated(row), Some(doc)) => self.rows.update(&doc.id, &row, doc.revision).await?,
      (toggled, _) => self.rows.create(toggled.permission()).await?,
    };
    tracing::info!(role_id, page = page.as_str(), ?access, value, "permission toggled");
    Ok(saved.data)
  }
}
