use serde::{Deserialize, Serialize};
use simdesk_config::{ModuleAttachment, VISIBLE_TO_ALL};

/// Default settings a module starts with when attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDefaults {
  #[serde(default)]
  pub required: bool,
  #[serde(default = "all_roles")]
  pub visible_to: Vec<String>,
}

impl Default for ModuleDefaults {
  fn default() -> Self {
    Self {
      required: false,
      visible_to: all_roles(),
    }
  }
}

fn all_roles() -> Vec<String> {
  vec![VISIBLE_TO_ALL.to_string()]
}

/// A registry entry: a reusable form field such as GPS capture or image upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDef {
  /// Stable key referenced by task templates and flow nodes.
  pub id: String,

  #[serde(rename = "type")]
  pub module_type: String,

  pub name: String,

  /// Icon name from the UI icon set, e.g. "MapPin".
  pub icon: String,

  #[serde(default)]
  pub description: String,

  #[serde(default)]
  pub config: ModuleDefaults,
}

impl ModuleDef {
  /// Build a per-task attachment seeded from this module's defaults.
  pub fn attachment(&self) -> ModuleAttachment {
    ModuleAttachment {
      module_id: self.id.clone(),
      display_name: self.name.clone(),
      required: self.config.required,
      visible_to: self.config.visible_to.clone(),
    }
  }

  /// Module ids are used as file names by the filesystem registry.
  pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
      && id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
  }
}
