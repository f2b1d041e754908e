use std::sync::Arc;

use simdesk_config::{OrgType, Organization, Program, Region, Role, Tpa};
use simdesk_records::{
  OrgReferences, Orphan, RecordError, TpaChecker, check_delete, check_parent, references_to,
};
use simdesk_store::{Document, ListQuery, Repository, Store};

use crate::error::AdminError;

/// Reference data: roles, the organization tree, regions, programs and TPAs.
pub struct Directory {
  roles: Repository<Role>,
  orgs: Repository<Organization>,
  regions: Repository<Region>,
  programs: Repository<Program>,
  tpas: Repository<Tpa>,
}

impl Directory {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self {
      roles: Repository::new(store.clone()),
      orgs: Repository::new(store.clone()),
      regions: Repository::new(store.clone()),
      programs: Repository::new(store.clone()),
      tpas: Repository::new(store),
    }
  }

  /// Add a role. The color defaults to the level palette.
  ///
  /// Names are unique; the store's index decides, so two concurrent adds
  /// of the same name leave exactly one role.
  pub async fn add_role(
    &self,
    name: &str,
    level: u8,
    color: Option<String>,
  ) -> Result<Document<Role>, AdminError> {
    let mut role = Role::new(name.trim(), level)?;
    if let Some(color) = color {
      role.color = color;
    }
    let doc = self
      .roles
      .create(&role)
      .await
      .map_err(|e| role_taken(&role.name, e))?;
    tracing::info!(id = %doc.id, name = %role.name, level, "role created");
    Ok(doc)
  }

  pub async fn role(&self, id: &str) -> Result<Document<Role>, AdminError> {
    Ok(self.roles.get(id).await?)
  }

  /// Roles, most senior first.
  pub async fn roles(&self) -> Result<Vec<Document<Role>>, AdminError> {
    Ok(self.roles.list(&ListQuery::new().sorted("-level")?).await?)
  }

  /// Rename or re-level a role read at `expected_revision`.
  pub async fn update_role(
    &self,
    id: &str,
    role: &Role,
    expected_revision: i64,
  ) -> Result<Document<Role>, AdminError> {
    let mut role = role.clone();
    role.name = role.name.trim().to_string();
    role.validate()?;
    let doc = self
      .roles
      .update(id, &role, expected_revision)
      .await
      .map_err(|e| role_taken(&role.name, e))?;
    tracing::info!(id, revision = doc.revision, name = %role.name, "role updated");
    Ok(doc)
  }

  pub async fn delete_role(&self, id: &str) -> Result<(), AdminError> {
    self.roles.delete(id).await?;
    tracing::info!(id, "role deleted");
    Ok(())
  }

  pub async fn add_org(&self, org: &Organization) -> Result<Document<Organization>, AdminError> {
    let parent = match &org.parent_id {
      Some(id) => Some(self.parent(id).await?),
      None => None,
    };
    check_parent(org, parent.as_ref())?;

    let doc = self.orgs.create(org).await?;
    tracing::info!(id = %doc.id, name = %org.name, kind = %org.org_type, "organization created");
    Ok(doc)
  }

  /// Update an organization, re-running the tree checks.
  ///
  /// The new shape must fit under its parent, and any existing children
  /// must still fit under it.
  pub async fn update_org(
    &self,
    id: &str,
    org: &Organization,
    expected_revision: i64,
  ) -> Result<Document<Organization>, AdminError> {
    let parent = match &org.parent_id {
      Some(parent_id) => Some(self.parent(parent_id).await?),
      None => None,
    };
    check_parent(org, parent.as_ref())?;

    let children = self
      .orgs
      .filter("parent_id", id, &ListQuery::new())
      .await?;
    for child in &children {
      check_parent(&child.data, Some(org))?;
    }

    let doc = self.orgs.update(id, org, expected_revision).await?;
    tracing::info!(id, revision = doc.revision, "organization updated");
    Ok(doc)
  }

  async fn parent(&self, id: &str) -> Result<Organization, AdminError> {
    match self.orgs.get(id).await {
      Ok(doc) => Ok(doc.data),
      Err(simdesk_store::Error::NotFound { .. }) => {
        Err(RecordError::ParentNotFound(id.to_string()).into())
      }
      Err(e) => Err(e.into()),
    }
  }

  pub async fn orgs(&self) -> Result<Vec<Document<Organization>>, AdminError> {
    Ok(self.orgs.list(&ListQuery::new().sorted("name")?).await?)
  }

  /// What still references organization `id`.
  pub async fn org_references(&self, id: &str) -> Result<OrgReferences, AdminError> {
    let target = self.orgs.get(id).await?;
    let orgs = self.orgs.list(&ListQuery::new()).await?;
    let tpas = self.tpas.list(&ListQuery::new()).await?;

    Ok(references_to(
      id,
      &target.data.name,
      orgs.iter().map(|d| (d.id.as_str(), &d.data)),
      tpas.iter().map(|d| &d.data),
    ))
  }

  /// Delete an organization.
  ///
  /// Without `cascade` an organization with children is rejected; with it
  /// the whole subtree goes, leaves first. TPAs linking a deleted
  /// organization are left in place and returned so the caller can report
  /// them; they show up as orphans afterwards.
  pub async fn delete_org(&self, id: &str, cascade: bool) -> Result<OrgReferences, AdminError> {
    let refs = self.org_references(id).await?;
    let name = self.orgs.get(id).await?.data.name;
    if !cascade {
      check_delete(&name, &refs)?;
    }

    let orgs = self.orgs.list(&ListQuery::new()).await?;
    let mut doomed = vec![id.to_string()];
    let mut i = 0;
    while i < doomed.len() {
      let parent = doomed[i].clone();
      doomed.extend(
        orgs
          .iter()
          .filter(|o| o.data.parent_id.as_deref() == Some(parent.as_str()))
          .map(|o| o.id.clone()),
      );
      i += 1;
    }

    let mut tpas = Vec::new();
    for org_id in doomed.iter().rev() {
      if org_id != id {
        tpas.extend(self.org_references(org_id).await?.tpas);
      }
      self.orgs.delete(org_id).await?;
    }
    tpas.extend(refs.tpas);
    tpas.sort();
    tpas.dedup();

    for tpa in &tpas {
      tracing::warn!(%tpa, organization = %name, "tpa still links deleted organization");
    }
    tracing::info!(id, %name, removed = doomed.len(), "organization deleted");
    Ok(OrgReferences {
      children: doomed.split_off(1),
      tpas,
    })
  }

  pub async fn add_region(
    &self,
    name: &str,
    color: Option<String>,
  ) -> Result<Document<Region>, AdminError> {
    let region = new_region(name, color)?;
    let doc = self.regions.create(&region).await?;
    tracing::info!(id = %doc.id, name = %region.name, "region created");
    Ok(doc)
  }

  pub async fn region(&self, id: &str) -> Result<Document<Region>, AdminError> {
    Ok(self.regions.get(id).await?)
  }

  pub async fn regions(&self) -> Result<Vec<Document<Region>>, AdminError> {
    Ok(self.regions.list(&ListQuery::new().sorted("name")?).await?)
  }

  /// Update a region read at `expected_revision`.
  ///
  /// TPAs link regions by name, so a rename can orphan them; the orphans
  /// are returned.
  pub async fn update_region(
    &self,
    id: &str,
    name: &str,
    color: Option<String>,
    expected_revision: i64,
  ) -> Result<(Document<Region>, Vec<Orphan>), AdminError> {
    let region = new_region(name, color)?;
    let doc = self.regions.update(id, &region, expected_revision).await?;
    tracing::info!(id, revision = doc.revision, name = %region.name, "region updated");
    let orphans = self.tpa_orphans().await?;
    Ok((doc, orphans))
  }

  /// Delete a region, returning the TPA links it leaves dangling.
  pub async fn delete_region(&self, id: &str) -> Result<Vec<Orphan>, AdminError> {
    self.regions.delete(id).await?;
    tracing::info!(id, "region deleted");
    self.tpa_orphans().await
  }

  pub async fn add_program(&self, program: &Program) -> Result<Document<Program>, AdminError> {
    program.validate()?;
    let doc = self.programs.create(program).await?;
    tracing::info!(id = %doc.id, name = %program.name, "program created");
    Ok(doc)
  }

  pub async fn programs(&self) -> Result<Vec<Document<Program>>, AdminError> {
    Ok(self.programs.list(&ListQuery::new().sorted("name")?).await?)
  }

  /// Save a TPA. Dangling links are logged and returned but never block
  /// the write.
  pub async fn add_tpa(&self, tpa: &Tpa) -> Result<(Document<Tpa>, Vec<Orphan>), AdminError> {
    let doc = self.tpas.create(tpa).await?;
    tracing::info!(id = %doc.id, name = %tpa.name, "tpa created");
    let orphans = self.tpa_orphans_for([tpa]).await?;
    Ok((doc, orphans))
  }

  pub async fn update_tpa(
    &self,
    id: &str,
    tpa: &Tpa,
    expected_revision: i64,
  ) -> Result<(Document<Tpa>, Vec<Orphan>), AdminError> {
    let doc = self.tpas.update(id, tpa, expected_revision).await?;
    tracing::info!(id, revision = doc.revision, "tpa updated");
    let orphans = self.tpa_orphans_for([tpa]).await?;
    Ok((doc, orphans))
  }

  pub async fn tpas(&self) -> Result<Vec<Document<Tpa>>, AdminError> {
    Ok(self.tpas.list(&ListQuery::new().sorted("name")?).await?)
  }

  /// Orphan report across every stored TPA.
  pub async fn tpa_orphans(&self) -> Result<Vec<Orphan>, AdminError> {
    let tpas = self.tpas().await?;
    self.tpa_orphans_for(tpas.iter().map(|d| &d.data)).await
  }

  async fn tpa_orphans_for<'t>(
    &self,
    tpas: impl IntoIterator<Item = &'t Tpa>,
  ) -> Result<Vec<Orphan>, AdminError> {
    let regions = self.regions.list(&ListQuery::new()).await?;
    let orgs = self.orgs.list(&ListQuery::new()).await?;

    let checker = TpaChecker::new(
      regions.iter().map(|r| r.data.name.as_str()),
      orgs
        .iter()
        .filter(|o| o.data.org_type == OrgType::Channel)
        .map(|o| o.data.name.as_str()),
    );
    Ok(checker.report(tpas))
  }
}

fn role_taken(name: &str, err: simdesk_store::Error) -> AdminError {
  match err {
    simdesk_store::Error::Duplicate { .. } => AdminError::AlreadyExists {
      kind: "role",
      name: name.to_string(),
    },
    e => e.into(),
  }
}

fn new_region(name: &str, color: Option<String>) -> Result<Region, AdminError> {
  let name = name.trim();
  if name.is_empty() {
    return Err(simdesk_config::ConfigError::EmptyField {
      field: "region name",
    }
    .into());
  }
  Ok(Region {
    name: name.to_string(),
    color,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use simdesk_store::SqliteStore;

  async fn directory() -> Directory {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().await.unwrap());
    Directory::new(store)
  }

  fn org(name: &str, org_type: OrgType, parent: Option<&str>) -> Organization {
    Organization {
      name: name.to_string(),
      org_type,
      parent_id: parent.map(str::to_string),
    }
  }

  #[tokio::test]
  async fn test_roles_sorted_by_level() {
    let dir = directory().await;
    dir.add_role("Seller", 1, None).await.unwrap();
    dir.add_role("Director", 6, Some("#000000".to_string())).await.unwrap();

    let roles = dir.roles().await.unwrap();
    assert_eq!(roles[0].data.name, "Director");
    assert_eq!(roles[0].data.color, "#000000");
    assert_eq!(roles[1].data.color, "#60A5FA");
    assert!(dir.add_role("Root", 9, None).await.is_err());
    assert!(matches!(
      dir.add_role(" Seller ", 2, None).await,
      Err(AdminError::AlreadyExists { kind: "role", .. })
    ));
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_concurrent_role_adds_keep_one() {
    let tmp = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", tmp.path().join("simdesk.db").display());
    let store: Arc<dyn Store> = Arc::new(SqliteStore::connect(&url).await.unwrap());
    let dir = Arc::new(Directory::new(store));

    let handles: Vec<_> = (0..4)
      .map(|_| {
        let dir = dir.clone();
        tokio::spawn(async move { dir.add_role("Manager", 3, None).await })
      })
      .collect();

    let mut created = 0;
    for handle in handles {
      match handle.await.unwrap() {
        Ok(_) => created += 1,
        Err(AdminError::AlreadyExists { kind: "role", name }) => assert_eq!(name, "Manager"),
        Err(e) => panic!("unexpected error: {}", e),
      }
    }
    assert_eq!(created, 1);
    assert_eq!(dir.roles().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_update_and_delete_role() {
    let dir = directory().await;
    let seller = dir.add_role("Seller", 1, None).await.unwrap();
    dir.add_role("Manager", 3, None).await.unwrap();

    let mut renamed = seller.data.clone();
    renamed.name = "Manager".to_string();
    assert!(matches!(
      dir.update_role(&seller.id, &renamed, seller.revision).await,
      Err(AdminError::AlreadyExists { kind: "role", .. })
    ));

    renamed.name = " Senior Seller ".to_string();
    renamed.level = 2;
    let updated = dir
      .update_role(&seller.id, &renamed, seller.revision)
      .await
      .unwrap();
    assert_eq!(updated.revision, 2);
    assert_eq!(updated.data.name, "Senior Seller");

    assert!(matches!(
      dir.update_role(&seller.id, &renamed, seller.revision).await,
      Err(AdminError::Store(simdesk_store::Error::Conflict { .. }))
    ));

    dir.delete_role(&seller.id).await.unwrap();
    assert_eq!(dir.roles().await.unwrap().len(), 1);
    assert!(dir.role(&seller.id).await.is_err());
  }

  #[tokio::test]
  async fn test_region_rename_reports_orphans() {
    let dir = directory().await;
    let north = dir.add_region("North", None).await.unwrap();
    let coast = dir.add_region("Coast", None).await.unwrap();
    let tpa = Tpa {
      name: "North Agents".to_string(),
      regions: vec!["North".to_string(), "Coast".to_string()],
      channels: vec![],
      seller_rates: Default::default(),
    };
    dir.add_tpa(&tpa).await.unwrap();

    let (renamed, orphans) = dir
      .update_region(&north.id, "Northern", Some("#10B981".to_string()), north.revision)
      .await
      .unwrap();
    assert_eq!(renamed.data.name, "Northern");
    assert_eq!(
      orphans,
      vec![Orphan::Region {
        tpa: "North Agents".to_string(),
        region: "North".to_string()
      }]
    );

    let orphans = dir.delete_region(&coast.id).await.unwrap();
    assert_eq!(orphans.len(), 2);
    assert!(matches!(
      dir.update_region(&north.id, " ", None, renamed.revision).await,
      Err(AdminError::Config(_))
    ));
  }

  #[tokio::test]
  async fn test_org_tree_enforced() {
    let dir = directory().await;
    let sales = dir
      .add_org(&org("Sales", OrgType::Department, None))
      .await
      .unwrap();
    let retail = dir
      .add_org(&org("Retail", OrgType::Channel, Some(sales.id.as_str())))
      .await
      .unwrap();

    let wrong = dir
      .add_org(&org("Kiosks", OrgType::Subchannel, Some(sales.id.as_str())))
      .await;
    assert!(matches!(
      wrong,
      Err(AdminError::Record(RecordError::WrongParentType { .. }))
    ));

    let missing = dir
      .add_org(&org("Kiosks", OrgType::Subchannel, Some("nope")))
      .await;
    assert!(matches!(
      missing,
      Err(AdminError::Record(RecordError::ParentNotFound(_)))
    ));

    dir
      .add_org(&org("Kiosks", OrgType::Subchannel, Some(retail.id.as_str())))
      .await
      .unwrap();
    assert_eq!(dir.orgs().await.unwrap().len(), 3);
  }

  #[tokio::test]
  async fn test_delete_org_with_children_rejected() {
    let dir = directory().await;
    let sales = dir
      .add_org(&org("Sales", OrgType::Department, None))
      .await
      .unwrap();
    let retail = dir
      .add_org(&org("Retail", OrgType::Channel, Some(sales.id.as_str())))
      .await
      .unwrap();

    assert!(matches!(
      dir.delete_org(&sales.id, false).await,
      Err(AdminError::Record(RecordError::HasChildren { .. }))
    ));

    let tpa = Tpa {
      name: "North Agents".to_string(),
      regions: vec![],
      channels: vec!["Retail".to_string()],
      seller_rates: Default::default(),
    };
    let (_, orphans) = dir.add_tpa(&tpa).await.unwrap();
    assert!(orphans.is_empty());

    let refs = dir.delete_org(&retail.id, false).await.unwrap();
    assert_eq!(refs.tpas, vec!["North Agents".to_string()]);

    let orphans = dir.tpa_orphans().await.unwrap();
    assert_eq!(
      orphans,
      vec![Orphan::Channel {
        tpa: "North Agents".to_string(),
        channel: "Retail".to_string()
      }]
    );
  }

  #[tokio::test]
  async fn test_cascade_delete_removes_subtree() {
    let dir = directory().await;
    let sales = dir
      .add_org(&org("Sales", OrgType::Department, None))
      .await
      .unwrap();
    let retail = dir
      .add_org(&org("Retail", OrgType::Channel, Some(sales.id.as_str())))
      .await
      .unwrap();
    let kiosks = dir
      .add_org(&org("Kiosks", OrgType::Subchannel, Some(retail.id.as_str())))
      .await
      .unwrap();
    dir
      .add_org(&org("Field", OrgType::Department, None))
      .await
      .unwrap();
    let tpa = Tpa {
      name: "North Agents".to_string(),
      regions: vec![],
      channels: vec!["Retail".to_string()],
      seller_rates: Default::default(),
    };
    dir.add_tpa(&tpa).await.unwrap();

    let refs = dir.delete_org(&sales.id, true).await.unwrap();
    assert_eq!(refs.children, vec![retail.id.clone(), kiosks.id.clone()]);
    assert_eq!(refs.tpas, vec!["North Agents".to_string()]);

    let left: Vec<_> = dir
      .orgs()
      .await
      .unwrap()
      .into_iter()
      .map(|d| d.data.name)
      .collect();
    assert_eq!(left, vec!["Field".to_string()]);
  }

  #[tokio::test]
  async fn test_update_org_keeps_children_valid() {
    let dir = directory().await;
    let sales = dir
      .add_org(&org("Sales", OrgType::Department, None))
      .await
      .unwrap();
    let retail = dir
      .add_org(&org("Retail", OrgType::Channel, Some(sales.id.as_str())))
      .await
      .unwrap();

    dir
      .add_org(&org("Kiosks", OrgType::Subchannel, Some(retail.id.as_str())))
      .await
      .unwrap();

    // Retail can't turn into a department while a subchannel hangs off it.
    let promoted = dir
      .update_org(&retail.id, &org("Retail", OrgType::Department, None), retail.revision)
      .await;
    assert!(matches!(
      promoted,
      Err(AdminError::Record(RecordError::WrongParentType { .. }))
    ));

    let renamed = dir
      .update_org(
        &retail.id,
        &org("Retail East", OrgType::Channel, Some(sales.id.as_str())),
        retail.revision,
      )
      .await
      .unwrap();
    assert_eq!(renamed.revision, 2);
    assert_eq!(renamed.data.name, "Retail East");
  }

  #[tokio::test]
  async fn test_tpa_orphans_do_not_block_write() {
    let dir = directory().await;
    dir.add_region("North", None).await.unwrap();

    let tpa = Tpa {
      name: "Coastal".to_string(),
      regions: vec!["North".to_string(), "Atlantis".to_string()],
      channels: vec![],
      seller_rates: Default::default(),
    };
    let (doc, orphans) = dir.add_tpa(&tpa).await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(dir.tpas().await.unwrap()[0].id, doc.id);
  }
}
