use std::collections::{HashMap, HashSet, VecDeque};

use simdesk_config::{ActionKind, FlowDef, Stage};

/// One `(stage, action) → target` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  pub from: Stage,
  pub action: ActionKind,
  pub to: Stage,
}

/// Graph structure for traversal and analysis of a flow definition.
///
/// Only transitions whose target stage exists in the flow become edges.
#[derive(Debug, Clone)]
pub struct FlowGraph {
  /// Stages in node order.
  stages: Vec<Stage>,
  /// Adjacency list: stage -> downstream stages (deduplicated, in action order).
  adjacency: HashMap<Stage, Vec<Stage>>,
  /// Reverse adjacency: stage -> upstream stages.
  reverse_adjacency: HashMap<Stage, Vec<Stage>>,
  transitions: Vec<Transition>,
  entry: Option<Stage>,
}

impl FlowGraph {
  /// Build a graph from a flow definition.
  pub fn new(flow: &FlowDef) -> Self {
    let mut stages = Vec::new();
    let mut adjacency: HashMap<Stage, Vec<Stage>> = HashMap::new();
    let mut reverse_adjacency: HashMap<Stage, Vec<Stage>> = HashMap::new();

    for node in &flow.nodes {
      if !stages.contains(&node.id) {
        stages.push(node.id);
      }
      adjacency.entry(node.id).or_default();
      reverse_adjacency.entry(node.id).or_default();
    }

    let mut transitions = Vec::new();
    for node in &flow.nodes {
      for (action, target) in node.targets() {
        if !adjacency.contains_key(&target) {
          continue;
        }
        transitions.push(Transition {
          from: node.id,
          action,
          to: target,
        });

        let downstream = adjacency.entry(node.id).or_default();
        if !downstream.contains(&target) {
          downstream.push(target);
          reverse_adjacency.entry(target).or_default().push(node.id);
        }
      }
    }

    // Draft is the entry point; flows without one start at their first node.
    let entry = if stages.contains(&Stage::Draft) {
      Some(Stage::Draft)
    } else {
      stages.first().copied()
    };

    Self {
      stages,
      adjacency,
      reverse_adjacency,
      transitions,
      entry,
    }
  }

  /// The stage a new task starts in.
  pub fn entry(&self) -> Option<Stage> {
    self.entry
  }

  pub fn stages(&self) -> &[Stage] {
    &self.stages
  }

  pub fn transitions(&self) -> &[Transition] {
    &self.transitions
  }

  /// Get downstream stages for a given stage.
  pub fn downstream(&self, stage: Stage) -> &[Stage] {
    self
      .adjacency
      .get(&stage)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get upstream stages for a given stage.
  pub fn upstream(&self, stage: Stage) -> &[Stage] {
    self
      .reverse_adjacency
      .get(&stage)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Stages reachable from the entry stage, entry included.
  pub fn reachable(&self) -> HashSet<Stage> {
    let mut seen = HashSet::new();
    let Some(entry) = self.entry else {
      return seen;
    };

    let mut queue = VecDeque::from([entry]);
    seen.insert(entry);
    while let Some(stage) = queue.pop_front() {
      for &next in self.downstream(stage) {
        if seen.insert(next) {
          queue.push_back(next);
        }
      }
    }
    seen
  }

  /// Stages in node order that cannot be reached from the entry stage.
  pub fn unreachable(&self) -> Vec<Stage> {
    let reachable = self.reachable();
    self
      .stages
      .iter()
      .filter(|s| !reachable.contains(s))
      .copied()
      .collect()
  }

  /// Back edges found by a depth-first walk, as `(from, to)` pairs.
  ///
  /// Rollback loops show up here; they are legitimate in approval flows.
  pub fn back_edges(&self) -> Vec<(Stage, Stage)> {
    // 0 = unvisited, 1 = on the current path, 2 = done
    let mut color: HashMap<Stage, u8> = self.stages.iter().map(|s| (*s, 0u8)).collect();
    let mut found = Vec::new();

    fn dfs(
      stage: Stage,
      graph: &FlowGraph,
      color: &mut HashMap<Stage, u8>,
      found: &mut Vec<(Stage, Stage)>,
    ) {
      color.insert(stage, 1);
      for &next in graph.downstream(stage) {
        match color.get(&next) {
          Some(1) => found.push((stage, next)),
          Some(0) => dfs(next, graph, color, found),
          _ => {}
        }
      }
      color.insert(stage, 2);
    }

    let roots = self.entry.into_iter().chain(self.stages.iter().copied());
    for stage in roots {
      if color.get(&stage) == Some(&0) {
        dfs(stage, self, &mut color, &mut found);
      }
    }
    found
  }

  pub fn is_acyclic(&self) -> bool {
    self.back_edges().is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use simdesk_config::{Action, FlowNode};

  fn approval_flow() -> FlowDef {
    FlowDef::new(vec![
      FlowNode::new(Stage::Draft)
        .with_action(Action::new(ActionKind::Submit).with_target(Stage::Pending))
        .with_action(Action::new(ActionKind::Cancel).with_target(Stage::Cancelled)),
      FlowNode::new(Stage::Pending)
        .with_action(Action::new(ActionKind::Approve).with_target(Stage::Done))
        .with_action(Action::new(ActionKind::Rollback).with_target(Stage::Draft)),
      FlowNode::new(Stage::Done),
      FlowNode::new(Stage::Cancelled),
    ])
  }

  #[test]
  fn test_entry_and_adjacency() {
    let graph = FlowGraph::new(&approval_flow());

    assert_eq!(graph.entry(), Some(Stage::Draft));
    assert_eq!(
      graph.downstream(Stage::Draft),
      &[Stage::Pending, Stage::Cancelled]
    );
    assert_eq!(graph.upstream(Stage::Draft), &[Stage::Pending]);
    assert_eq!(graph.transitions().len(), 4);
  }

  #[test]
  fn test_all_reachable() {
    let graph = FlowGraph::new(&approval_flow());
    assert!(graph.unreachable().is_empty());
  }

  #[test]
  fn test_unreachable_stage() {
    let mut flow = approval_flow();
    flow.nodes.push(FlowNode::new(Stage::Pending3));

    let graph = FlowGraph::new(&flow);
    assert_eq!(graph.unreachable(), vec![Stage::Pending3]);
  }

  #[test]
  fn test_rollback_is_a_back_edge() {
    let graph = FlowGraph::new(&approval_flow());
    assert_eq!(graph.back_edges(), vec![(Stage::Pending, Stage::Draft)]);
    assert!(!graph.is_acyclic());
  }

  #[test]
  fn test_missing_targets_are_not_edges() {
    let flow = FlowDef::new(vec![
      FlowNode::new(Stage::Draft)
        .with_action(Action::new(ActionKind::Submit).with_target(Stage::Pending1)),
    ]);
    let graph = FlowGraph::new(&flow);

    assert!(graph.downstream(Stage::Draft).is_empty());
    assert!(graph.is_acyclic());
  }

  #[test]
  fn test_entry_falls_back_to_first_node() {
    let flow = FlowDef::new(vec![FlowNode::new(Stage::Pending), FlowNode::new(Stage::Done)]);
    assert_eq!(FlowGraph::new(&flow).entry(), Some(Stage::Pending));
    assert_eq!(FlowGraph::new(&FlowDef::default()).entry(), None);
  }
}
