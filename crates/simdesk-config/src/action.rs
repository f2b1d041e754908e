use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::handler::Handler;
use crate::stage::Stage;

/// A transition a handler may take at a flow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
  Save,
  Submit,
  Approve,
  Reject,
  Rollback,
  Cancel,
}

impl ActionKind {
  pub const ALL: [ActionKind; 6] = [
    ActionKind::Save,
    ActionKind::Submit,
    ActionKind::Approve,
    ActionKind::Reject,
    ActionKind::Rollback,
    ActionKind::Cancel,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ActionKind::Save => "save",
      ActionKind::Submit => "submit",
      ActionKind::Approve => "approve",
      ActionKind::Reject => "reject",
      ActionKind::Rollback => "rollback",
      ActionKind::Cancel => "cancel",
    }
  }

  pub fn display_name(&self) -> &'static str {
    match self {
      ActionKind::Save => "Save Draft",
      ActionKind::Submit => "Submit",
      ActionKind::Approve => "Approve",
      ActionKind::Reject => "Reject",
      ActionKind::Rollback => "Rollback",
      ActionKind::Cancel => "Cancel",
    }
  }

  pub fn color(&self) -> &'static str {
    match self {
      ActionKind::Save => "#94A3B8",
      ActionKind::Submit => "#3B82F6",
      ActionKind::Approve => "#10B981",
      ActionKind::Reject => "#EF4444",
      ActionKind::Rollback => "#F59E0B",
      ActionKind::Cancel => "#6B7280",
    }
  }
}

impl fmt::Display for ActionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ActionKind {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ActionKind::ALL
      .into_iter()
      .find(|kind| kind.as_str() == s)
      .ok_or_else(|| ConfigError::UnknownAction(s.to_string()))
  }
}

/// An action configured on a flow node, with its optional bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawAction")]
pub struct Action {
  pub id: ActionKind,
  pub name: String,
  pub color: String,
  /// Stage the task moves to when this action is taken.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_node: Option<Stage>,
  /// Overrides the handler at the target stage.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next_handler: Option<Handler>,
}

impl Action {
  /// A catalog action with no bindings.
  pub fn new(id: ActionKind) -> Self {
    Self {
      id,
      name: id.display_name().to_string(),
      color: id.color().to_string(),
      target_node: None,
      next_handler: None,
    }
  }

  pub fn with_target(mut self, target: Stage) -> Self {
    self.target_node = Some(target);
    self
  }

  pub fn with_next_handler(mut self, handler: Handler) -> Self {
    self.next_handler = Some(handler);
    self
  }
}

/// Wire shape accepted on input, including the older `targetStep` and
/// `targetRole` field names.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAction {
  id: ActionKind,
  #[serde(default)]
  name: Option<String>,
  #[serde(default)]
  color: Option<String>,
  #[serde(default, alias = "targetStep")]
  target_node: Option<String>,
  #[serde(default)]
  next_handler: Option<RawHandler>,
  #[serde(default)]
  target_role: Option<String>,
}

/// `nextHandler` is either the tagged object or a flat string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawHandler {
  Tagged(Handler),
  Flat(String),
}

impl TryFrom<RawAction> for Action {
  type Error = ConfigError;

  fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
    let target_node = match raw.target_node.as_deref().map(str::trim) {
      None | Some("") => None,
      Some(stage) => Some(stage.parse()?),
    };

    let next_handler = match raw.next_handler {
      Some(RawHandler::Tagged(handler)) => Some(handler),
      Some(RawHandler::Flat(value)) => Handler::from_flat(&value),
      None => None,
    }
    .or_else(|| raw.target_role.as_deref().and_then(Handler::from_flat));

    Ok(Self {
      id: raw.id,
      name: raw
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| raw.id.display_name().to_string()),
      color: raw
        .color
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| raw.id.color().to_string()),
      target_node,
      next_handler,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_legacy_target_step_alias() {
    let action: Action = serde_json::from_value(serde_json::json!({
      "id": "approve",
      "name": "Approve",
      "targetStep": "done"
    }))
    .unwrap();

    assert_eq!(action.target_node, Some(Stage::Done));
    assert_eq!(action.color, "#10B981");
  }

  #[test]
  fn test_empty_target_is_none() {
    let action: Action = serde_json::from_value(serde_json::json!({
      "id": "submit",
      "targetNode": "",
      "targetRole": ""
    }))
    .unwrap();

    assert_eq!(action.target_node, None);
    assert_eq!(action.next_handler, None);
    assert_eq!(action.name, "Submit");
  }

  #[test]
  fn test_target_role_becomes_role_handler() {
    let action: Action = serde_json::from_value(serde_json::json!({
      "id": "rollback",
      "targetNode": "draft",
      "targetRole": "Sales"
    }))
    .unwrap();

    assert_eq!(action.next_handler, Some(Handler::role("Sales")));
  }

  #[test]
  fn test_flat_next_handler() {
    let action: Action = serde_json::from_value(serde_json::json!({
      "id": "submit",
      "targetStep": "pending",
      "nextHandler": "initiator"
    }))
    .unwrap();

    assert_eq!(action.next_handler, Some(Handler::Initiator));
  }

  #[test]
  fn test_unknown_target_rejected() {
    let result: Result<Action, _> = serde_json::from_value(serde_json::json!({
      "id": "rollback",
      "targetNode": "archive"
    }));
    assert!(result.is_err());
  }

  #[test]
  fn test_serializes_canonical_names() {
    let action = Action::new(ActionKind::Rollback)
      .with_target(Stage::Draft)
      .with_next_handler(Handler::Initiator);
    let json = serde_json::to_value(&action).unwrap();

    assert_eq!(json["targetNode"], "draft");
    assert_eq!(json["nextHandler"]["handlerType"], "initiator");
    assert!(json.get("targetStep").is_none());
  }
}
