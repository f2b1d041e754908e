use serde::{Deserialize, Deserializer, Serialize};

use crate::flow::FlowDef;

/// Visibility keyword meaning "every role".
pub const VISIBLE_TO_ALL: &str = "all";

/// Default sort position for templates that were never reordered.
pub const DEFAULT_DISPLAY_ORDER: i64 = 999;

/// A per-task override of a registry module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleAttachment {
  pub module_id: String,
  pub display_name: String,
  #[serde(default)]
  pub required: bool,
  #[serde(default = "visible_to_all")]
  pub visible_to: Vec<String>,
}

impl ModuleAttachment {
  /// Whether a holder of `role` sees this module.
  pub fn is_visible_to(&self, role: &str) -> bool {
    self
      .visible_to
      .iter()
      .any(|r| r == VISIBLE_TO_ALL || r == role)
  }
}

pub(crate) fn visible_to_all() -> Vec<String> {
  vec![VISIBLE_TO_ALL.to_string()]
}

/// Read an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_display_order() -> i64 {
  DEFAULT_DISPLAY_ORDER
}

/// A reusable workflow definition that task instances are started from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub icon: Option<String>,
  #[serde(default, alias = "iconColor", skip_serializing_if = "Option::is_none")]
  pub icon_color: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default = "default_display_order")]
  pub display_order: i64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub modules: Vec<ModuleAttachment>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub flow_config: FlowDef,
}

impl TaskTemplate {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      icon: None,
      icon_color: None,
      description: None,
      display_order: DEFAULT_DISPLAY_ORDER,
      modules: Vec::new(),
      flow_config: FlowDef::default(),
    }
  }

  pub fn module(&self, module_id: &str) -> Option<&ModuleAttachment> {
    self.modules.iter().find(|m| m.module_id == module_id)
  }

  /// Every module id referenced by the template or one of its nodes.
  pub fn referenced_module_ids(&self) -> impl Iterator<Item = &str> {
    self.modules.iter().map(|m| m.module_id.as_str()).chain(
      self
        .flow_config
        .nodes
        .iter()
        .flat_map(|n| n.modules.iter().map(String::as_str)),
    )
  }
}
