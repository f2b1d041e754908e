use thiserror::Error;

/// Errors that can occur when working with the module registry.
#[derive(Debug, Error)]
pub enum RegistryError {
  /// Module not found in the registry.
  #[error("module not found: {id}")]
  NotFound { id: String },

  /// A module with this id is already installed.
  #[error("module already exists: {id}")]
  AlreadyExists { id: String },

  /// Built-in modules cannot be replaced or removed.
  #[error("module '{id}' is built in and cannot be modified")]
  BuiltIn { id: String },

  /// Module ids become file names, so they are restricted.
  #[error("invalid module id: '{id}'")]
  InvalidId { id: String },

  /// IO error when reading/writing module files.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// Failed to parse a module definition.
  #[error("invalid module definition: {0}")]
  InvalidDefinition(#[from] serde_json::Error),
}
