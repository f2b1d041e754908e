use std::fmt;

use serde::Serialize;
use simdesk_config::{ActionKind, Stage};
use thiserror::Error;

/// A problem that makes a flow definition unsafe to save.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowError {
  #[error("template name is empty")]
  EmptyTemplateName,

  #[error("stage '{stage}' appears more than once")]
  DuplicateStage { stage: Stage },

  #[error("action '{action}' on '{stage}' targets missing stage '{target}'")]
  DanglingTarget {
    stage: Stage,
    action: ActionKind,
    target: Stage,
  },

  #[error("action '{action}' is configured more than once on '{stage}'")]
  DuplicateAction { stage: Stage, action: ActionKind },

  #[error("module '{module_id}' is attached more than once")]
  DuplicateModule { module_id: String },

  #[error("unknown module '{module_id}'{}", at_stage(.stage))]
  UnknownModule {
    module_id: String,
    stage: Option<Stage>,
  },

  #[error("role handler on '{stage}' names no role")]
  EmptyRoleHandler { stage: Stage },

  #[error("role '{role}' used by {usage} does not exist")]
  UnknownRole { role: String, usage: String },
}

fn at_stage(stage: &Option<Stage>) -> String {
  match stage {
    Some(s) => format!(" at stage '{}'", s),
    None => String::new(),
  }
}

/// A questionable but saveable property of a flow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowWarning {
  /// The flow has nodes but no draft stage to start from.
  MissingDraft,
  /// The draft stage exists but is not the first node.
  DraftNotFirst,
  /// No action path leads from the entry stage to this stage.
  Unreachable { stage: Stage },
  /// A done/cancelled stage still has an outgoing target.
  TerminalHasTarget { stage: Stage, action: ActionKind },
  /// Following targets from `from` leads back to `to`.
  Cycle { from: Stage, to: Stage },
  /// A non-terminal stage has no handler assigned.
  NoHandler { stage: Stage },
}

impl fmt::Display for FlowWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FlowWarning::MissingDraft => write!(f, "flow has no 'draft' stage"),
      FlowWarning::DraftNotFirst => write!(f, "'draft' is not the first stage"),
      FlowWarning::Unreachable { stage } => {
        write!(f, "stage '{}' is unreachable from the entry stage", stage)
      }
      FlowWarning::TerminalHasTarget { stage, action } => write!(
        f,
        "terminal stage '{}' has outgoing action '{}'",
        stage, action
      ),
      FlowWarning::Cycle { from, to } => {
        write!(f, "stage '{}' leads back to '{}'", from, to)
      }
      FlowWarning::NoHandler { stage } => write!(f, "stage '{}' has no handler", stage),
    }
  }
}

/// Returned when a flow definition fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid flow definition: {}", join(.errors))]
pub struct InvalidFlow {
  pub errors: Vec<FlowError>,
}

fn join(errors: &[FlowError]) -> String {
  errors
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("; ")
}
