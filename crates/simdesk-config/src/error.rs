use thiserror::Error;

/// Errors raised while reading configuration documents.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// A flow node was submitted without a stage id.
  #[error("flow node has no stage id")]
  MissingStage,

  #[error("unknown stage: {0}")]
  UnknownStage(String),

  #[error("unknown action: {0}")]
  UnknownAction(String),

  #[error("unknown handler type: {0}")]
  UnknownHandlerType(String),

  #[error("handler type 'role' requires a role name")]
  MissingHandlerRole,

  #[error("unknown organization type: {0}")]
  UnknownOrgType(String),

  #[error("role level {0} is out of range (0-7)")]
  RoleLevelOutOfRange(u8),

  #[error("{field} must not be empty")]
  EmptyField { field: &'static str },

  #[error("end date {end} is before start date {start}")]
  InvalidDateRange {
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
  },

  #[error("unknown page: {0}")]
  UnknownPage(String),

  #[error("unknown task status: {0}")]
  UnknownTaskStatus(String),
}
