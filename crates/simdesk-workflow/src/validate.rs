use std::collections::HashSet;

use serde::Serialize;
use simdesk_config::{FlowDef, Handler, Stage, TaskTemplate};
use simdesk_modules::ModuleCatalog;

use crate::error::{FlowError, FlowWarning, InvalidFlow};
use crate::graph::FlowGraph;

/// Outcome of validating a flow definition or task template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
  pub errors: Vec<FlowError>,
  pub warnings: Vec<FlowWarning>,
}

impl ValidationReport {
  pub fn is_valid(&self) -> bool {
    self.errors.is_empty()
  }

  /// Convert into a result, keeping warnings on success.
  pub fn into_result(self) -> Result<Vec<FlowWarning>, InvalidFlow> {
    if self.errors.is_empty() {
      Ok(self.warnings)
    } else {
      Err(InvalidFlow {
        errors: self.errors,
      })
    }
  }
}

/// Checks flow definitions against the module catalog and the known roles.
///
/// Module and role checks only run when a catalog or role list is supplied.
#[derive(Debug, Default)]
pub struct FlowValidator<'a> {
  modules: Option<&'a ModuleCatalog>,
  roles: Option<HashSet<&'a str>>,
}

impl<'a> FlowValidator<'a> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_modules(mut self, catalog: &'a ModuleCatalog) -> Self {
    self.modules = Some(catalog);
    self
  }

  pub fn with_roles(mut self, roles: impl IntoIterator<Item = &'a str>) -> Self {
    self.roles = Some(roles.into_iter().collect());
    self
  }

  /// Validate a whole task template: name, attached modules and flow.
  pub fn validate_template(&self, template: &TaskTemplate) -> ValidationReport {
    let mut report = ValidationReport::default();

    if template.name.trim().is_empty() {
      report.errors.push(FlowError::EmptyTemplateName);
    }

    let mut seen = HashSet::new();
    for attachment in &template.modules {
      if !seen.insert(attachment.module_id.as_str()) {
        report.errors.push(FlowError::DuplicateModule {
          module_id: attachment.module_id.clone(),
        });
      }
      self.check_module(&attachment.module_id, None, &mut report);
    }

    let flow_report = self.validate_flow(&template.flow_config);
    report.errors.extend(flow_report.errors);
    report.warnings.extend(flow_report.warnings);
    report
  }

  /// Validate a flow definition on its own.
  pub fn validate_flow(&self, flow: &FlowDef) -> ValidationReport {
    let mut report = ValidationReport::default();

    let mut stages = HashSet::new();
    for node in &flow.nodes {
      if !stages.insert(node.id) {
        report
          .errors
          .push(FlowError::DuplicateStage { stage: node.id });
      }
    }

    for node in &flow.nodes {
      let mut actions = HashSet::new();
      for action in &node.actions {
        if !actions.insert(action.id) {
          report.errors.push(FlowError::DuplicateAction {
            stage: node.id,
            action: action.id,
          });
        }

        if let Some(target) = action.target_node {
          if !stages.contains(&target) {
            report.errors.push(FlowError::DanglingTarget {
              stage: node.id,
              action: action.id,
              target,
            });
          } else if node.id.is_terminal() {
            report.warnings.push(FlowWarning::TerminalHasTarget {
              stage: node.id,
              action: action.id,
            });
          }
        }

        if let Some(handler) = &action.next_handler {
          self.check_handler(handler, node.id, &mut report);
        }
      }

      match &node.handler {
        Some(handler) => self.check_handler(handler, node.id, &mut report),
        None if !node.id.is_terminal() => {
          report.warnings.push(FlowWarning::NoHandler { stage: node.id });
        }
        None => {}
      }

      for module_id in &node.modules {
        self.check_module(module_id, Some(node.id), &mut report);
      }
      for role in &node.cc_roles {
        self.check_role(role, format!("cc list of '{}'", node.id), &mut report);
      }
    }

    for role in &flow.cc_roles {
      self.check_role(role, "flow cc list".to_string(), &mut report);
    }

    if !flow.nodes.is_empty() {
      match flow.nodes.iter().position(|n| n.id == Stage::Draft) {
        None => report.warnings.push(FlowWarning::MissingDraft),
        Some(0) => {}
        Some(_) => report.warnings.push(FlowWarning::DraftNotFirst),
      }
    }

    let graph = FlowGraph::new(flow);
    for stage in graph.unreachable() {
      report.warnings.push(FlowWarning::Unreachable { stage });
    }
    for (from, to) in graph.back_edges() {
      report.warnings.push(FlowWarning::Cycle { from, to });
    }

    tracing::debug!(
      nodes = flow.nodes.len(),
      errors = report.errors.len(),
      warnings = report.warnings.len(),
      "validated flow"
    );

    report
  }

  fn check_module(&self, module_id: &str, stage: Option<Stage>, report: &mut ValidationReport) {
    if let Some(catalog) = self.modules
      && !catalog.contains(module_id)
    {
      report.errors.push(FlowError::UnknownModule {
        module_id: module_id.to_string(),
        stage,
      });
    }
  }

  fn check_handler(&self, handler: &Handler, stage: Stage, report: &mut ValidationReport) {
    match handler.role_name() {
      Some(role) if role.trim().is_empty() => {
        report.errors.push(FlowError::EmptyRoleHandler { stage });
      }
      Some(role) => self.check_role(role, format!("handler of '{}'", stage), report),
      None => {}
    }
  }

  fn check_role(&self, role: &str, usage: String, report: &mut ValidationReport) {
    if let Some(roles) = &self.roles
      && !roles.contains(role)
    {
      report.errors.push(FlowError::UnknownRole {
        role: role.to_string(),
        usage,
      });
    }
  }
}
