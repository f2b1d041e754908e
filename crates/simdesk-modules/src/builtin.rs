use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::RegistryError;
use crate::module::{ModuleDef, ModuleDefaults};
use crate::registry::ModuleRegistry;

// (id, name, icon, description, required)
const CATALOG: &[(&str, &str, &str, &str, bool)] = &[
  ("channel", "Channel", "Radio", "Select channel from organization", false),
  ("customer", "Customer", "UserCircle", "Select customer with auto-filled region", true),
  ("date_range", "Date Range", "Calendar", "Select date range", false),
  ("priority", "Priority", "AlertCircle", "Select priority level", false),
  ("note", "Note", "FileText", "Text area for notes", false),
  ("gps_location", "GPS Location", "MapPin", "Upload GPS location (5 decimal places)", false),
  ("image_upload", "Image Upload", "Image", "Upload image", false),
  ("seller_count", "Seller Count", "Users", "Number of sellers required", false),
  ("iccid_sequence", "ICCID Sequence", "Hash", "ICCID number range generator", false),
  ("program_selector", "Program Selector", "Target", "Select program from list", false),
  ("actual_sellers", "Actual Sellers", "Users", "Input actual number of sellers", false),
  ("iccid_type", "ICCID Type", "Tag", "Select ICCID type (Free SIM/MD SIM)", false),
  ("tpa_selector", "TPA Selector", "Users", "Select TPA from library", false),
];

/// The modules shipped with simdesk, in catalog order.
pub fn builtin_modules() -> Vec<ModuleDef> {
  CATALOG
    .iter()
    .map(|&(id, name, icon, description, required)| ModuleDef {
      id: id.to_string(),
      module_type: id.to_string(),
      name: name.to_string(),
      icon: icon.to_string(),
      description: description.to_string(),
      config: ModuleDefaults {
        required,
        ..ModuleDefaults::default()
      },
    })
    .collect()
}

pub fn is_builtin(id: &str) -> bool {
  CATALOG.iter().any(|(builtin, ..)| *builtin == id)
}

/// Read-only registry over the built-in catalog.
pub struct BuiltinRegistry {
  modules: Vec<ModuleDef>,
  index: HashMap<String, usize>,
}

impl BuiltinRegistry {
  pub fn new() -> Self {
    let modules = builtin_modules();
    let index = modules
      .iter()
      .enumerate()
      .map(|(i, m)| (m.id.clone(), i))
      .collect();
    Self { modules, index }
  }
}

impl Default for BuiltinRegistry {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl ModuleRegistry for BuiltinRegistry {
  async fn get(&self, id: &str) -> Result<Option<ModuleDef>, RegistryError> {
    Ok(self.index.get(id).map(|&i| self.modules[i].clone()))
  }

  async fn list(&self) -> Result<Vec<ModuleDef>, RegistryError> {
    Ok(self.modules.clone())
  }

  async fn install(&self, module: ModuleDef) -> Result<ModuleDef, RegistryError> {
    Err(RegistryError::BuiltIn { id: module.id })
  }

  async fn remove(&self, id: &str) -> Result<(), RegistryError> {
    if is_builtin(id) {
      Err(RegistryError::BuiltIn { id: id.to_string() })
    } else {
      Err(RegistryError::NotFound { id: id.to_string() })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_catalog_has_thirteen_unique_modules() {
    let modules = builtin_modules();
    assert_eq!(modules.len(), 13);

    let mut ids: Vec<_> = modules.iter().map(|m| m.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 13);
  }

  #[test]
  fn test_only_customer_required_by_default() {
    let required: Vec<_> = builtin_modules()
      .into_iter()
      .filter(|m| m.config.required)
      .map(|m| m.id)
      .collect();
    assert_eq!(required, vec!["customer".to_string()]);
  }

  #[tokio::test]
  async fn test_builtin_registry_is_read_only() {
    let registry = BuiltinRegistry::new();

    let gps = registry.get("gps_location").await.unwrap().unwrap();
    assert_eq!(gps.icon, "MapPin");
    assert!(registry.get("fingerprint").await.unwrap().is_none());

    assert!(matches!(
      registry.remove("note").await,
      Err(RegistryError::BuiltIn { .. })
    ));
  }
}
