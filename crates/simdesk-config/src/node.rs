use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::{Action, ActionKind};
use crate::error::ConfigError;
use crate::handler::Handler;
use crate::stage::Stage;

/// Stable identity of a flow node. Survives reordering and edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(Uuid);

impl NodeKey {
  pub fn generate() -> Self {
    Self(Uuid::new_v4())
  }
}

impl fmt::Display for NodeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}

impl std::str::FromStr for NodeKey {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Uuid::parse_str(s).map(Self)
  }
}

/// One stage of a task's workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawFlowNode")]
pub struct FlowNode {
  pub key: NodeKey,
  pub id: Stage,
  #[serde(flatten, skip_serializing_if = "Option::is_none")]
  pub handler: Option<Handler>,
  pub actions: Vec<Action>,
  /// Module ids attached at this stage.
  pub modules: Vec<String>,
  /// Roles copied on transitions out of this stage, on top of the flow-wide list.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub cc_roles: Vec<String>,
}

impl FlowNode {
  pub fn new(id: Stage) -> Self {
    Self {
      key: NodeKey::generate(),
      id,
      handler: None,
      actions: Vec::new(),
      modules: Vec::new(),
      cc_roles: Vec::new(),
    }
  }

  pub fn with_handler(mut self, handler: Handler) -> Self {
    self.handler = Some(handler);
    self
  }

  pub fn with_action(mut self, action: Action) -> Self {
    self.actions.push(action);
    self
  }

  pub fn with_module(mut self, module_id: impl Into<String>) -> Self {
    self.modules.push(module_id.into());
    self
  }

  pub fn action(&self, kind: ActionKind) -> Option<&Action> {
    self.actions.iter().find(|a| a.id == kind)
  }

  pub fn action_mut(&mut self, kind: ActionKind) -> Option<&mut Action> {
    self.actions.iter_mut().find(|a| a.id == kind)
  }

  pub fn has_action(&self, kind: ActionKind) -> bool {
    self.action(kind).is_some()
  }

  /// Stages reachable in one step from this node, in action order.
  pub fn targets(&self) -> impl Iterator<Item = (ActionKind, Stage)> + '_ {
    self
      .actions
      .iter()
      .filter_map(|a| a.target_node.map(|t| (a.id, t)))
  }
}

/// Wire shape accepted on input. Older documents carry a flat
/// `currentHandler` string instead of `handlerType`/`handlerValue`,
/// and may omit the node key.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFlowNode {
  #[serde(default)]
  key: Option<NodeKey>,
  #[serde(default)]
  id: String,
  #[serde(default)]
  handler_type: Option<String>,
  #[serde(default)]
  handler_value: Option<String>,
  #[serde(default)]
  current_handler: Option<String>,
  #[serde(default)]
  actions: Vec<Action>,
  #[serde(default)]
  modules: Vec<String>,
  #[serde(default)]
  cc_roles: Vec<String>,
}

impl TryFrom<RawFlowNode> for FlowNode {
  type Error = ConfigError;

  fn try_from(raw: RawFlowNode) -> Result<Self, Self::Error> {
    let id: Stage = raw.id.trim().parse()?;

    let handler = match raw.handler_type.as_deref().map(str::trim) {
      Some(t) if !t.is_empty() => {
        // An unfilled role picker is stored as `role` with an empty value.
        if t == "role" && raw.handler_value.as_deref().is_none_or(|v| v.trim().is_empty()) {
          None
        } else {
          Some(Handler::from_parts(t, raw.handler_value.as_deref())?)
        }
      }
      _ => raw.current_handler.as_deref().and_then(Handler::from_flat),
    };

    Ok(Self {
      key: raw.key.unwrap_or_else(NodeKey::generate),
      id,
      handler,
      actions: raw.actions,
      modules: raw.modules,
      cc_roles: raw.cc_roles,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_canonical_handler_shape() {
    let node: FlowNode = serde_json::from_value(serde_json::json!({
      "id": "pending",
      "handlerType": "role",
      "handlerValue": "Manager",
      "actions": [{"id": "approve", "targetNode": "done"}],
      "modules": ["gps_location"]
    }))
    .unwrap();

    assert_eq!(node.id, Stage::Pending);
    assert_eq!(node.handler, Some(Handler::role("Manager")));
    assert_eq!(node.modules, vec!["gps_location".to_string()]);
    assert_eq!(
      node.targets().collect::<Vec<_>>(),
      vec![(ActionKind::Approve, Stage::Done)]
    );
  }

  #[test]
  fn test_legacy_current_handler() {
    let node: FlowNode = serde_json::from_value(serde_json::json!({
      "id": "cancel",
      "currentHandler": "initiator",
      "ccRoles": ["Admin"]
    }))
    .unwrap();

    assert_eq!(node.id, Stage::Cancelled);
    assert_eq!(node.handler, Some(Handler::Initiator));
    assert_eq!(node.cc_roles, vec!["Admin".to_string()]);
  }

  #[test]
  fn test_unfilled_role_picker_means_no_handler() {
    let node: FlowNode = serde_json::from_value(serde_json::json!({
      "id": "draft",
      "handlerType": "role",
      "handlerValue": ""
    }))
    .unwrap();

    assert_eq!(node.handler, None);
  }

  #[test]
  fn test_missing_stage_rejected() {
    let result: Result<FlowNode, _> =
      serde_json::from_value(serde_json::json!({"id": "", "currentHandler": "current"}));
    assert!(result.is_err());
  }

  #[test]
  fn test_key_generated_when_absent_and_kept_when_present() {
    let node: FlowNode = serde_json::from_value(serde_json::json!({"id": "draft"})).unwrap();
    let json = serde_json::to_value(&node).unwrap();
    let again: FlowNode = serde_json::from_value(json.clone()).unwrap();

    assert_eq!(again.key, node.key);
    assert_eq!(json["key"], node.key.to_string());
  }

  #[test]
  fn test_writes_canonical_handler_fields() {
    let node = FlowNode::new(Stage::Pending1).with_handler(Handler::role("Supervisor"));
    let json = serde_json::to_value(&node).unwrap();

    assert_eq!(json["handlerType"], "role");
    assert_eq!(json["handlerValue"], "Supervisor");
    assert!(json.get("currentHandler").is_none());
    assert!(json.get("ccRoles").is_none());
  }
}
