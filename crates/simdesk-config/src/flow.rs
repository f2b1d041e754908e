use serde::{Deserialize, Serialize};

use crate::node::{FlowNode, NodeKey};
use crate::stage::Stage;
use crate::template::null_as_default;

/// The `flow_config` of a task template: ordered nodes plus roles that are
/// copied on every transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowDef {
  #[serde(default, deserialize_with = "null_as_default")]
  pub nodes: Vec<FlowNode>,
  #[serde(rename = "ccRoles", default, deserialize_with = "null_as_default")]
  pub cc_roles: Vec<String>,
}

impl FlowDef {
  pub fn new(nodes: Vec<FlowNode>) -> Self {
    Self {
      nodes,
      cc_roles: Vec::new(),
    }
  }

  /// Get the first node for a stage.
  pub fn node(&self, stage: Stage) -> Option<&FlowNode> {
    self.nodes.iter().find(|n| n.id == stage)
  }

  pub fn node_by_key(&self, key: NodeKey) -> Option<&FlowNode> {
    self.nodes.iter().find(|n| n.key == key)
  }

  pub fn node_by_key_mut(&mut self, key: NodeKey) -> Option<&mut FlowNode> {
    self.nodes.iter_mut().find(|n| n.key == key)
  }

  pub fn position(&self, key: NodeKey) -> Option<usize> {
    self.nodes.iter().position(|n| n.key == key)
  }

  pub fn contains(&self, stage: Stage) -> bool {
    self.node(stage).is_some()
  }

  pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
    self.nodes.iter().map(|n| n.id)
  }

  /// Roles notified on a transition out of `stage`.
  pub fn cc_roles_for(&self, stage: Stage) -> Vec<&str> {
    let mut roles: Vec<&str> = self.cc_roles.iter().map(String::as_str).collect();
    if let Some(node) = self.node(stage) {
      for role in &node.cc_roles {
        if !roles.contains(&role.as_str()) {
          roles.push(role);
        }
      }
    }
    roles
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::action::{Action, ActionKind};
  use crate::handler::Handler;

  fn sample_flow() -> FlowDef {
    FlowDef {
      nodes: vec![
        FlowNode::new(Stage::Draft)
          .with_handler(Handler::Initiator)
          .with_action(Action::new(ActionKind::Save))
          .with_action(Action::new(ActionKind::Submit).with_target(Stage::Pending)),
        FlowNode::new(Stage::Pending)
          .with_handler(Handler::role("Manager"))
          .with_action(Action::new(ActionKind::Approve).with_target(Stage::Done))
          .with_action(
            Action::new(ActionKind::Rollback)
              .with_target(Stage::Draft)
              .with_next_handler(Handler::Initiator),
          ),
        FlowNode::new(Stage::Done),
      ],
      cc_roles: vec!["Admin".to_string()],
    }
  }

  #[test]
  fn test_json_round_trip_preserves_order_and_bindings() {
    let flow = sample_flow();
    let json = serde_json::to_string(&flow).unwrap();
    let back: FlowDef = serde_json::from_str(&json).unwrap();

    assert_eq!(back, flow);
    assert_eq!(
      back.stages().collect::<Vec<_>>(),
      vec![Stage::Draft, Stage::Pending, Stage::Done]
    );
    let rollback = back.nodes[1].action(ActionKind::Rollback).unwrap();
    assert_eq!(rollback.target_node, Some(Stage::Draft));
    assert_eq!(rollback.next_handler, Some(Handler::Initiator));
  }

  #[test]
  fn test_cc_roles_default_to_empty() {
    let flow: FlowDef = serde_json::from_str(r#"{"nodes": []}"#).unwrap();
    assert!(flow.cc_roles.is_empty());
    let json = serde_json::to_value(&flow).unwrap();
    assert_eq!(json["ccRoles"], serde_json::json!([]));
  }

  #[test]
  fn test_cc_roles_merge_node_level() {
    let mut flow = sample_flow();
    flow.nodes[1].cc_roles = vec!["Finance".to_string(), "Admin".to_string()];

    assert_eq!(flow.cc_roles_for(Stage::Pending), vec!["Admin", "Finance"]);
    assert_eq!(flow.cc_roles_for(Stage::Draft), vec!["Admin"]);
  }

  #[test]
  fn test_lookup_by_key() {
    let flow = sample_flow();
    let key = flow.nodes[2].key;
    assert_eq!(flow.position(key), Some(2));
    assert_eq!(flow.node_by_key(key).map(|n| n.id), Some(Stage::Done));
  }
}
