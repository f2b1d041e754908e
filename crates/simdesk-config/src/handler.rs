use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Who handles a task while it sits at a flow node.
///
/// Serialized as `{"handlerType": "role", "handlerValue": "Manager"}`,
/// `{"handlerType": "current"}` or `{"handlerType": "initiator"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "handlerType", rename_all = "lowercase")]
pub enum Handler {
  /// Anyone holding the named role.
  Role {
    #[serde(rename = "handlerValue")]
    role: String,
  },
  /// The person currently holding the task keeps it.
  Current,
  /// The person who started the task.
  Initiator,
}

impl Handler {
  pub fn role(name: impl Into<String>) -> Self {
    Handler::Role { role: name.into() }
  }

  /// Build a handler from the `handlerType`/`handlerValue` pair.
  pub fn from_parts(handler_type: &str, value: Option<&str>) -> Result<Self, ConfigError> {
    match handler_type {
      "role" => match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(Handler::role(v)),
        _ => Err(ConfigError::MissingHandlerRole),
      },
      "current" => Ok(Handler::Current),
      "initiator" => Ok(Handler::Initiator),
      other => Err(ConfigError::UnknownHandlerType(other.to_string())),
    }
  }

  /// Read the flat `currentHandler` string used by older documents.
  ///
  /// Returns `None` for an empty string (no handler picked yet).
  pub fn from_flat(value: &str) -> Option<Self> {
    match value.trim() {
      "" => None,
      "initiator" => Some(Handler::Initiator),
      "current" => Some(Handler::Current),
      role => Some(Handler::role(role)),
    }
  }

  /// The role name for role handlers.
  pub fn role_name(&self) -> Option<&str> {
    match self {
      Handler::Role { role } => Some(role),
      _ => None,
    }
  }
}

impl fmt::Display for Handler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Handler::Role { role } => write!(f, "role:{}", role),
      Handler::Current => f.write_str("current"),
      Handler::Initiator => f.write_str("initiator"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_role_handler_serialization() {
    let handler = Handler::role("Manager");
    let json = serde_json::to_value(&handler).unwrap();
    assert_eq!(
      json,
      serde_json::json!({"handlerType": "role", "handlerValue": "Manager"})
    );
    let back: Handler = serde_json::from_value(json).unwrap();
    assert_eq!(back, handler);
  }

  #[test]
  fn test_unit_handlers_have_no_value() {
    let json = serde_json::to_value(Handler::Initiator).unwrap();
    assert_eq!(json, serde_json::json!({"handlerType": "initiator"}));
  }

  #[test]
  fn test_from_flat() {
    assert_eq!(Handler::from_flat("initiator"), Some(Handler::Initiator));
    assert_eq!(Handler::from_flat("current"), Some(Handler::Current));
    assert_eq!(Handler::from_flat("Sales"), Some(Handler::role("Sales")));
    assert_eq!(Handler::from_flat("  "), None);
  }

  #[test]
  fn test_from_parts_requires_role_value() {
    assert!(matches!(
      Handler::from_parts("role", Some("")),
      Err(ConfigError::MissingHandlerRole)
    ));
    assert!(matches!(
      Handler::from_parts("boss", None),
      Err(ConfigError::UnknownHandlerType(_))
    ));
    assert_eq!(Handler::from_parts("current", Some("ignored")).unwrap(), Handler::Current);
  }
}
