use simdesk_config::{Action, ActionKind, FlowDef, FlowNode, Handler, NodeKey, Stage};
use simdesk_modules::ModuleCatalog;

use crate::error::EditError;
use crate::reorder::move_item;

/// Result of deleting a node.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedNode {
  pub node: FlowNode,
  /// Number of actions on other nodes whose target pointed at the deleted stage
  /// and were cleared.
  pub cleared_targets: usize,
}

/// In-memory editor over a flow definition.
///
/// Nodes are addressed by their stable [`NodeKey`], so an edit started
/// before a reorder still lands on the right node. Every operation leaves
/// the flow free of dangling targets it introduced itself.
#[derive(Debug, Clone, Default)]
pub struct FlowEditor {
  flow: FlowDef,
}

impl FlowEditor {
  pub fn new(flow: FlowDef) -> Self {
    Self { flow }
  }

  pub fn flow(&self) -> &FlowDef {
    &self.flow
  }

  pub fn into_flow(self) -> FlowDef {
    self.flow
  }

  /// Append a node. Its stage must not already be in the flow.
  pub fn add_node(&mut self, node: FlowNode) -> Result<NodeKey, EditError> {
    if self.flow.contains(node.id) {
      return Err(EditError::DuplicateStage(node.id));
    }
    self.check_targets(&node)?;

    let key = node.key;
    tracing::debug!(stage = %node.id, key = %key, "adding flow node");
    self.flow.nodes.push(node);
    Ok(key)
  }

  /// Replace the node with `key`. The key is kept.
  ///
  /// If the stage changes, targets elsewhere that pointed at the old stage
  /// follow it to the new one.
  pub fn edit_node(&mut self, key: NodeKey, mut node: FlowNode) -> Result<(), EditError> {
    let position = self.flow.position(key).ok_or(EditError::NodeNotFound(key))?;
    let old_stage = self.flow.nodes[position].id;

    if node.id != old_stage && self.flow.contains(node.id) {
      return Err(EditError::DuplicateStage(node.id));
    }

    node.key = key;
    // Self-targets may use either the old or the new stage.
    for action in &node.actions {
      if let Some(target) = action.target_node
        && target != node.id
        && target != old_stage
        && !self.flow.contains(target)
      {
        return Err(EditError::UnknownTarget(target));
      }
    }

    let new_stage = node.id;
    self.flow.nodes[position] = node;
    if new_stage != old_stage {
      let moved = self.retarget(old_stage, Some(new_stage));
      tracing::debug!(from = %old_stage, to = %new_stage, moved, "stage renamed");
    }
    Ok(())
  }

  /// Remove a node and clear every target that pointed at its stage.
  pub fn delete_node(&mut self, key: NodeKey) -> Result<DeletedNode, EditError> {
    let position = self.flow.position(key).ok_or(EditError::NodeNotFound(key))?;
    let node = self.flow.nodes.remove(position);
    let cleared_targets = self.retarget(node.id, None);

    tracing::debug!(stage = %node.id, cleared_targets, "deleted flow node");
    Ok(DeletedNode {
      node,
      cleared_targets,
    })
  }

  /// Move a node to `to`; positions past the end move it to the end.
  pub fn move_node(&mut self, key: NodeKey, to: usize) -> Result<(), EditError> {
    let from = self.flow.position(key).ok_or(EditError::NodeNotFound(key))?;
    move_item(&mut self.flow.nodes, from, to);
    Ok(())
  }

  /// Enable or disable an action on a node. Returns whether it is now enabled.
  ///
  /// Enabling adds the catalog action without bindings. Disabling removes
  /// every action with that id.
  pub fn toggle_action(&mut self, key: NodeKey, kind: ActionKind) -> Result<bool, EditError> {
    let node = self.node_mut(key)?;
    if node.has_action(kind) {
      node.actions.retain(|a| a.id != kind);
      Ok(false)
    } else {
      node.actions.push(Action::new(kind));
      Ok(true)
    }
  }

  /// Bind the target stage and handler override of an enabled action.
  pub fn set_action_target(
    &mut self,
    key: NodeKey,
    kind: ActionKind,
    target: Option<Stage>,
    next_handler: Option<Handler>,
  ) -> Result<(), EditError> {
    if let Some(stage) = target
      && !self.flow.contains(stage)
    {
      return Err(EditError::UnknownTarget(stage));
    }

    let node = self.node_mut(key)?;
    let stage = node.id;
    let action = node
      .action_mut(kind)
      .ok_or(EditError::ActionNotFound {
        stage,
        action: kind,
      })?;
    action.target_node = target;
    action.next_handler = next_handler;
    Ok(())
  }

  pub fn set_handler(&mut self, key: NodeKey, handler: Option<Handler>) -> Result<(), EditError> {
    self.node_mut(key)?.handler = handler;
    Ok(())
  }

  /// Replace the modules attached at a stage. Ids must exist in `catalog`.
  pub fn set_node_modules(
    &mut self,
    key: NodeKey,
    modules: Vec<String>,
    catalog: &ModuleCatalog,
  ) -> Result<(), EditError> {
    if let Some(unknown) = modules.iter().find(|id| !catalog.contains(id)) {
      return Err(EditError::UnknownModule(unknown.clone()));
    }
    self.node_mut(key)?.modules = modules;
    Ok(())
  }

  /// Replace the flow-wide cc list, dropping blanks and repeats.
  pub fn set_cc_roles(&mut self, roles: Vec<String>) {
    let mut cleaned: Vec<String> = Vec::with_capacity(roles.len());
    for role in roles {
      let role = role.trim();
      if !role.is_empty() && !cleaned.iter().any(|r| r == role) {
        cleaned.push(role.to_string());
      }
    }
    self.flow.cc_roles = cleaned;
  }

  fn node_mut(&mut self, key: NodeKey) -> Result<&mut FlowNode, EditError> {
    self
      .flow
      .node_by_key_mut(key)
      .ok_or(EditError::NodeNotFound(key))
  }

  fn check_targets(&self, node: &FlowNode) -> Result<(), EditError> {
    for (_, target) in node.targets() {
      if target != node.id && !self.flow.contains(target) {
        return Err(EditError::UnknownTarget(target));
      }
    }
    Ok(())
  }

  /// Point every action targeting `from` at `to`. Returns how many changed.
  fn retarget(&mut self, from: Stage, to: Option<Stage>) -> usize {
    let mut changed = 0;
    for node in &mut self.flow.nodes {
      for action in &mut node.actions {
        if action.target_node == Some(from) {
          action.target_node = to;
          changed += 1;
        }
      }
    }
    changed
  }
}
