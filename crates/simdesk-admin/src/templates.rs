use std::sync::Arc;

use simdesk_config::{Role, TaskTemplate};
use simdesk_editor::move_item;
use simdesk_modules::ModuleRegistry;
use simdesk_store::{Document, ListQuery, Repository, Store, collections};
use simdesk_workflow::{FlowValidator, FlowWarning, ValidationReport};

use crate::error::AdminError;

/// Task template lifecycle: validate, store, reorder.
///
/// Every write validates the whole template against the module registry and
/// the stored roles first. Updates carry the revision the caller read, so a
/// concurrent edit is rejected instead of overwritten.
pub struct TemplateService<R: ModuleRegistry> {
  templates: Repository<TaskTemplate>,
  roles: Repository<Role>,
  registry: R,
}

impl<R: ModuleRegistry> TemplateService<R> {
  pub fn new(store: Arc<dyn Store>, registry: R) -> Self {
    Self {
      templates: Repository::new(store.clone()),
      roles: Repository::new(store),
      registry,
    }
  }

  /// Validate without writing.
  ///
  /// Role names are only checked once at least one role exists, so a fresh
  /// install can author templates before the directory is filled in.
  pub async fn validate(&self, template: &TaskTemplate) -> Result<ValidationReport, AdminError> {
    let catalog = self.registry.catalog().await?;
    let roles = self.roles.list(&ListQuery::new()).await?;
    let role_names: Vec<&str> = roles.iter().map(|r| r.data.name.as_str()).collect();

    let mut validator = FlowValidator::new().with_modules(&catalog);
    if !role_names.is_empty() {
      validator = validator.with_roles(role_names.iter().copied());
    }
    Ok(validator.validate_template(template))
  }

  async fn check(&self, template: &TaskTemplate) -> Result<Vec<FlowWarning>, AdminError> {
    let warnings = self.validate(template).await?.into_result()?;
    for warning in &warnings {
      tracing::warn!(template = %template.name, %warning, "flow warning");
    }
    Ok(warnings)
  }

  pub async fn create(&self, template: &TaskTemplate) -> Result<Document<TaskTemplate>, AdminError> {
    self.check(template).await?;
    let doc = self.templates.create(template).await?;
    tracing::info!(id = %doc.id, name = %template.name, "template created");
    Ok(doc)
  }

  /// Save an edited template read at `expected_revision`.
  pub async fn save(
    &self,
    id: &str,
    template: &TaskTemplate,
    expected_revision: i64,
  ) -> Result<Document<TaskTemplate>, AdminError> {
    self.check(template).await?;
    let doc = self
      .templates
      .update(id, template, expected_revision)
      .await?;
    tracing::info!(id, revision = doc.revision, "template saved");
    Ok(doc)
  }

  pub async fn get(&self, id: &str) -> Result<Document<TaskTemplate>, AdminError> {
    Ok(self.templates.get(id).await?)
  }

  /// All templates in display order.
  pub async fn list(&self) -> Result<Vec<Document<TaskTemplate>>, AdminError> {
    let query = ListQuery::new().sorted("display_order")?;
    Ok(self.templates.list(&query).await?)
  }

  pub async fn delete(&self, id: &str) -> Result<(), AdminError> {
    self.templates.delete(id).await?;
    tracing::info!(id, "template deleted");
    Ok(())
  }

  /// Move a template to position `to` and renumber `display_order`.
  ///
  /// Only templates whose position changed are written.
  pub async fn reorder(&self, id: &str, to: usize) -> Result<Vec<Document<TaskTemplate>>, AdminError> {
    let mut docs = self.list().await?;
    let from = docs
      .iter()
      .position(|d| d.id == id)
      .ok_or_else(|| simdesk_store::Error::NotFound {
        collection: collections::TASK_TEMPLATES.to_string(),
        id: id.to_string(),
      })?;
    move_item(&mut docs, from, to);

    let mut saved = Vec::with_capacity(docs.len());
    for (position, mut doc) in docs.into_iter().enumerate() {
      let order = position as i64;
      if doc.data.display_order != order {
        doc.data.display_order = order;
        doc = self.templates.update(&doc.id, &doc.data, doc.revision).await?;
      }
      saved.push(doc);
    }
    tracing::info!(id, to, "templates reordered");
    Ok(saved)
  }
}
