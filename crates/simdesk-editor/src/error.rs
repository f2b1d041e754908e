use simdesk_config::{ActionKind, NodeKey, Stage};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
  /// The node was removed or never existed (e.g. a stale edit session).
  #[error("flow node not found: {0}")]
  NodeNotFound(NodeKey),

  #[error("stage '{0}' is already in the flow")]
  DuplicateStage(Stage),

  #[error("action '{action}' is not enabled on '{stage}'")]
  ActionNotFound { stage: Stage, action: ActionKind },

  #[error("target stage '{0}' is not in the flow")]
  UnknownTarget(Stage),

  #[error("module not found in registry: {0}")]
  UnknownModule(String),

  #[error("module '{0}' is not attached to the template")]
  ModuleNotAttached(String),

  #[error("module '{0}' selected more than once")]
  DuplicateSelection(String),
}
