use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::RegistryError;
use crate::module::ModuleDef;

/// Registry of modules that task templates and flow nodes may reference.
#[async_trait]
pub trait ModuleRegistry: Send + Sync {
  /// Get a module by id.
  async fn get(&self, id: &str) -> Result<Option<ModuleDef>, RegistryError>;

  /// List all modules in catalog order.
  async fn list(&self) -> Result<Vec<ModuleDef>, RegistryError>;

  /// Install an additional module definition.
  async fn install(&self, module: ModuleDef) -> Result<ModuleDef, RegistryError>;

  /// Remove an installed module.
  async fn remove(&self, id: &str) -> Result<(), RegistryError>;

  /// Take an in-memory snapshot for synchronous lookups.
  async fn catalog(&self) -> Result<ModuleCatalog, RegistryError> {
    Ok(ModuleCatalog::new(self.list().await?))
  }
}

/// A point-in-time copy of a registry's modules.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
  modules: Vec<ModuleDef>,
  index: HashMap<String, usize>,
}

impl ModuleCatalog {
  /// Build a catalog. Later entries replace earlier ones with the same id.
  pub fn new(modules: Vec<ModuleDef>) -> Self {
    let mut catalog = Self::default();
    for module in modules {
      match catalog.index.get(&module.id) {
        Some(&i) => catalog.modules[i] = module,
        None => {
          catalog.index.insert(module.id.clone(), catalog.modules.len());
          catalog.modules.push(module);
        }
      }
    }
    catalog
  }

  pub fn get(&self, id: &str) -> Option<&ModuleDef> {
    self.index.get(id).map(|&i| &self.modules[i])
  }

  pub fn contains(&self, id: &str) -> bool {
    self.index.contains_key(id)
  }

  pub fn iter(&self) -> impl Iterator<Item = &ModuleDef> {
    self.modules.iter()
  }

  pub fn len(&self) -> usize {
    self.modules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::builtin::builtin_modules;

  #[test]
  fn test_catalog_override_keeps_position() {
    let mut modules = builtin_modules();
    let mut note = modules[4].clone();
    note.name = "Remarks".to_string();
    modules.push(note);

    let catalog = ModuleCatalog::new(modules);
    assert_eq!(catalog.len(), 13);
    assert_eq!(catalog.get("note").unwrap().name, "Remarks");
    assert_eq!(catalog.iter().nth(4).unwrap().id, "note");
  }
}
