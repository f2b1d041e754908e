use thiserror::Error;

/// Errors from the administration services.
#[derive(Debug, Error)]
pub enum AdminError {
  /// The template failed validation and was not written.
  #[error(transparent)]
  InvalidTemplate(#[from] simdesk_workflow::InvalidFlow),

  #[error("{kind} '{name}' already exists")]
  AlreadyExists { kind: &'static str, name: String },

  #[error(transparent)]
  Config(#[from] simdesk_config::ConfigError),

  #[error(transparent)]
  Record(#[from] simdesk_records::RecordError),

  #[error("module registry error: {0}")]
  Registry(#[from] simdesk_modules::RegistryError),

  #[error(transparent)]
  Store(#[from] simdesk_store::Error),
}
