use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::flow::FlowDef;
use crate::template::{ModuleAttachment, TaskTemplate, null_as_default};

/// Where a started task currently sits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
  #[default]
  Draft,
  Pending,
  Done,
  Cancelled,
}

impl TaskStatus {
  pub const ALL: [TaskStatus; 4] = [
    TaskStatus::Draft,
    TaskStatus::Pending,
    TaskStatus::Done,
    TaskStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      TaskStatus::Draft => "draft",
      TaskStatus::Pending => "pending",
      TaskStatus::Done => "done",
      TaskStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for TaskStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TaskStatus {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    TaskStatus::ALL
      .into_iter()
      .find(|t| t.as_str() == s)
      .ok_or_else(|| ConfigError::UnknownTaskStatus(s.to_string()))
  }
}

/// A task started from a template.
///
/// The template's modules and flow are copied in at start, so later
/// template edits don't change running tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub icon: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub icon_color: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub modules: Vec<ModuleAttachment>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub flow_config: FlowDef,
  /// Email of the assignee.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assigned_to: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub status: TaskStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub customer: Option<String>,
}

impl Task {
  pub fn from_template(template: &TaskTemplate) -> Self {
    Self {
      name: template.name.clone(),
      icon: template.icon.clone(),
      icon_color: template.icon_color.clone(),
      description: template.description.clone(),
      modules: template.modules.clone(),
      flow_config: template.flow_config.clone(),
      assigned_to: None,
      status: TaskStatus::Draft,
      customer: None,
    }
  }
}
