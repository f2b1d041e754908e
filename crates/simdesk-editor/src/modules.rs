use simdesk_config::ModuleAttachment;
use simdesk_modules::ModuleCatalog;

use crate::error::EditError;
use crate::reorder::move_item;

/// Changes to one attachment. `None` fields are left as they are.
#[derive(Debug, Clone, Default)]
pub struct AttachmentPatch {
  pub display_name: Option<String>,
  pub required: Option<bool>,
  pub visible_to: Option<Vec<String>>,
}

/// Editor over a template's ordered module attachments.
#[derive(Debug, Clone, Default)]
pub struct ModuleEditor {
  modules: Vec<ModuleAttachment>,
}

impl ModuleEditor {
  pub fn new(modules: Vec<ModuleAttachment>) -> Self {
    Self { modules }
  }

  pub fn modules(&self) -> &[ModuleAttachment] {
    &self.modules
  }

  pub fn into_modules(self) -> Vec<ModuleAttachment> {
    self.modules
  }

  /// Replace the attachment list with `selected`, in selection order.
  ///
  /// Existing overrides are reused; new ids are seeded from the registry
  /// defaults. Deselected attachments are dropped.
  pub fn select(&mut self, selected: &[&str], catalog: &ModuleCatalog) -> Result<(), EditError> {
    let mut next: Vec<ModuleAttachment> = Vec::with_capacity(selected.len());

    for &id in selected {
      if next.iter().any(|m| m.module_id == id) {
        return Err(EditError::DuplicateSelection(id.to_string()));
      }

      let attachment = match self.modules.iter().find(|m| m.module_id == id) {
        Some(existing) => existing.clone(),
        None => catalog
          .get(id)
          .ok_or_else(|| EditError::UnknownModule(id.to_string()))?
          .attachment(),
      };
      next.push(attachment);
    }

    let dropped = self
      .modules
      .iter()
      .filter(|m| !selected.contains(&m.module_id.as_str()))
      .count();
    tracing::debug!(selected = next.len(), dropped, "module selection updated");

    self.modules = next;
    Ok(())
  }

  pub fn move_module(&mut self, module_id: &str, to: usize) -> Result<(), EditError> {
    let from = self.position(module_id)?;
    move_item(&mut self.modules, from, to);
    Ok(())
  }

  pub fn update(&mut self, module_id: &str, patch: AttachmentPatch) -> Result<(), EditError> {
    let position = self.position(module_id)?;
    let attachment = &mut self.modules[position];

    if let Some(name) = patch.display_name {
      attachment.display_name = name;
    }
    if let Some(required) = patch.required {
      attachment.required = required;
    }
    if let Some(visible_to) = patch.visible_to {
      attachment.visible_to = visible_to;
    }
    Ok(())
  }

  fn position(&self, module_id: &str) -> Result<usize, EditError> {
    self
      .modules
      .iter()
      .position(|m| m.module_id == module_id)
      .ok_or_else(|| EditError::ModuleNotAttached(module_id.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use simdesk_modules::builtin_modules;

  fn catalog() -> ModuleCatalog {
    ModuleCatalog::new(builtin_modules())
  }

  #[test]
  fn test_select_seeds_from_registry() {
    let mut editor = ModuleEditor::default();
    editor.select(&["customer", "gps_location"], &catalog()).unwrap();

    let modules = editor.modules();
    assert_eq!(modules.len(), 2);
    assert_eq!(modules[0].display_name, "Customer");
    assert!(modules[0].required);
    assert_eq!(modules[1].display_name, "GPS Location");
    assert_eq!(modules[1].visible_to, vec!["all".to_string()]);
  }

  #[test]
  fn test_select_keeps_overrides_and_drops_deselected() {
    let mut editor = ModuleEditor::default();
    editor.select(&["note", "priority"], &catalog()).unwrap();
    editor
      .update(
        "note",
        AttachmentPatch {
          display_name: Some("Visit notes".to_string()),
          required: Some(true),
          ..Default::default()
        },
      )
      .unwrap();

    editor.select(&["image_upload", "note"], &catalog()).unwrap();

    let ids: Vec<_> = editor.modules().iter().map(|m| m.module_id.as_str()).collect();
    assert_eq!(ids, vec!["image_upload", "note"]);
    assert_eq!(editor.modules()[1].display_name, "Visit notes");
    assert!(editor.modules()[1].required);
  }

  #[test]
  fn test_select_rejects_unknown_and_repeated() {
    let mut editor = ModuleEditor::default();
    assert_eq!(
      editor.select(&["fingerprint"], &catalog()),
      Err(EditError::UnknownModule("fingerprint".to_string()))
    );
    assert_eq!(
      editor.select(&["note", "note"], &catalog()),
      Err(EditError::DuplicateSelection("note".to_string()))
    );
    assert!(editor.modules().is_empty());
  }

  #[test]
  fn test_move_module() {
    let mut editor = ModuleEditor::default();
    editor
      .select(&["channel", "customer", "date_range"], &catalog())
      .unwrap();
    editor.move_module("date_range", 0).unwrap();

    let ids: Vec<_> = editor.modules().iter().map(|m| m.module_id.as_str()).collect();
    assert_eq!(ids, vec!["date_range", "channel", "customer"]);
    assert_eq!(
      editor.move_module("note", 1),
      Err(EditError::ModuleNotAttached("note".to_string()))
    );
  }
}
