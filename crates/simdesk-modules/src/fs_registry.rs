use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::builtin::{builtin_modules, is_builtin};
use crate::error::RegistryError;
use crate::module::ModuleDef;
use crate::registry::ModuleRegistry;

/// Filesystem-backed module registry layered over the built-in catalog.
///
/// Installed modules are stored one per file:
/// ```text
/// {root}/
/// ├── signature.json
/// └── barcode_scan.json
/// ```
/// Built-in modules are always present and cannot be replaced.
pub struct FsModuleRegistry {
  root: PathBuf,
}

impl FsModuleRegistry {
  /// Create a new filesystem registry at the given root path.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Get the root directory of the registry.
  pub fn root(&self) -> &Path {
    &self.root
  }

  fn module_path(&self, id: &str) -> PathBuf {
    self.root.join(format!("{}.json", id))
  }

  async fn read_module(path: &Path) -> Result<ModuleDef, RegistryError> {
    let content = fs::read_to_string(path).await?;
    let module: ModuleDef = serde_json::from_str(&content)?;
    Ok(module)
  }

  /// Installed (non built-in) modules, sorted by id.
  async fn installed(&self) -> Result<Vec<ModuleDef>, RegistryError> {
    let mut modules = Vec::new();

    if !self.root.exists() {
      return Ok(modules);
    }

    let mut entries = fs::read_dir(&self.root).await?;
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") {
        continue;
      }

      match Self::read_module(&path).await {
        Ok(module) if !is_builtin(&module.id) => modules.push(module),
        Ok(module) => {
          tracing::warn!(id = %module.id, path = %path.display(), "ignoring file that shadows a built-in module");
        }
        Err(e) => {
          tracing::warn!(path = %path.display(), error = %e, "skipping unreadable module file");
        }
      }
    }

    modules.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(modules)
  }
}

#[async_trait]
impl ModuleRegistry for FsModuleRegistry {
  async fn get(&self, id: &str) -> Result<Option<ModuleDef>, RegistryError> {
    if let Some(module) = builtin_modules().into_iter().find(|m| m.id == id) {
      return Ok(Some(module));
    }
    if !ModuleDef::is_valid_id(id) {
      return Ok(None);
    }

    let path = self.module_path(id);
    if !path.exists() {
      return Ok(None);
    }
    Self::read_module(&path).await.map(Some)
  }

  async fn list(&self) -> Result<Vec<ModuleDef>, RegistryError> {
    let mut modules = builtin_modules();
    modules.extend(self.installed().await?);
    Ok(modules)
  }

  async fn install(&self, module: ModuleDef) -> Result<ModuleDef, RegistryError> {
    if !ModuleDef::is_valid_id(&module.id) {
      return Err(RegistryError::InvalidId { id: module.id });
    }
    if is_builtin(&module.id) {
      return Err(RegistryError::BuiltIn { id: module.id });
    }

    let path = self.module_path(&module.id);
    if path.exists() {
      return Err(RegistryError::AlreadyExists { id: module.id });
    }

    fs::create_dir_all(&self.root).await?;
    let content = serde_json::to_string_pretty(&module)?;
    fs::write(&path, content).await?;

    tracing::info!(id = %module.id, path = %path.display(), "installed module");
    Ok(module)
  }

  async fn remove(&self, id: &str) -> Result<(), RegistryError> {
    if is_builtin(id) {
      return Err(RegistryError::BuiltIn { id: id.to_string() });
    }

    match self.get(id).await? {
      Some(_) => {
        fs::remove_file(self.module_path(id)).await?;
        tracing::info!(id = %id, "removed module");
        Ok(())
      }
      None => Err(RegistryError::NotFound { id: id.to_string() }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::module::ModuleDefaults;

  fn signature_module() -> ModuleDef {
    ModuleDef {
      id: "signature".to_string(),
      module_type: "signature".to_string(),
      name: "Signature".to_string(),
      icon: "PenTool".to_string(),
      description: "Customer signature capture".to_string(),
      config: ModuleDefaults::default(),
    }
  }

  #[tokio::test]
  async fn test_missing_root_lists_builtins() {
    let dir = tempfile::tempdir().unwrap();
    let registry = FsModuleRegistry::new(dir.path().join("absent"));

    let modules = registry.list().await.unwrap();
    assert_eq!(modules.len(), 13);
  }

  #[tokio::test]
  async fn test_install_get_remove() {
    let dir = tempfile::tempdir().unwrap();
    let registry = FsModuleRegistry::new(dir.path());

    registry.install(signature_module()).await.unwrap();
    let found = registry.get("signature").await.unwrap().unwrap();
    assert_eq!(found.name, "Signature");

    let catalog = registry.catalog().await.unwrap();
    assert_eq!(catalog.len(), 14);
    assert_eq!(catalog.iter().last().unwrap().id, "signature");

    assert!(matches!(
      registry.install(signature_module()).await,
      Err(RegistryError::AlreadyExists { .. })
    ));

    registry.remove("signature").await.unwrap();
    assert!(registry.get("signature").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_builtins_protected() {
    let dir = tempfile::tempdir().unwrap();
    let registry = FsModuleRegistry::new(dir.path());

    let mut shadow = signature_module();
    shadow.id = "note".to_string();
    assert!(matches!(
      registry.install(shadow).await,
      Err(RegistryError::BuiltIn { .. })
    ));
    assert!(matches!(
      registry.remove("customer").await,
      Err(RegistryError::BuiltIn { .. })
    ));
  }

  #[tokio::test]
  async fn test_rejects_path_like_ids() {
    let dir = tempfile::tempdir().unwrap();
    let registry = FsModuleRegistry::new(dir.path());

    let mut module = signature_module();
    module.id = "../escape".to_string();
    assert!(matches!(
      registry.install(module).await,
      Err(RegistryError::InvalidId { .. })
    ));
    assert!(registry.get("../escape").await.unwrap().is_none());
  }
}
