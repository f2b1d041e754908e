use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A workflow stage. Flow nodes are identified by their stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  Draft,
  Pending,
  Pending1,
  Pending2,
  Pending3,
  Done,
  #[serde(alias = "cancel")]
  Cancelled,
}

impl Stage {
  pub const ALL: [Stage; 7] = [
    Stage::Draft,
    Stage::Pending,
    Stage::Pending1,
    Stage::Pending2,
    Stage::Pending3,
    Stage::Done,
    Stage::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Stage::Draft => "draft",
      Stage::Pending => "pending",
      Stage::Pending1 => "pending1",
      Stage::Pending2 => "pending2",
      Stage::Pending3 => "pending3",
      Stage::Done => "done",
      Stage::Cancelled => "cancelled",
    }
  }

  /// Display name shown in the stage catalog.
  pub fn display_name(&self) -> &'static str {
    match self {
      Stage::Draft => "Draft",
      Stage::Pending => "Pending",
      Stage::Pending1 => "Pending 1",
      Stage::Pending2 => "Pending 2",
      Stage::Pending3 => "Pending 3",
      Stage::Done => "Done",
      Stage::Cancelled => "Cancelled",
    }
  }

  pub fn color(&self) -> &'static str {
    match self {
      Stage::Draft => "#94A3B8",
      Stage::Pending | Stage::Pending1 | Stage::Pending2 | Stage::Pending3 => "#F59E0B",
      Stage::Done => "#10B981",
      Stage::Cancelled => "#EF4444",
    }
  }

  /// Terminal stages end a task; they are expected to carry no outgoing targets.
  pub fn is_terminal(&self) -> bool {
    matches!(self, Stage::Done | Stage::Cancelled)
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Stage {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "draft" => Ok(Stage::Draft),
      "pending" => Ok(Stage::Pending),
      "pending1" => Ok(Stage::Pending1),
      "pending2" => Ok(Stage::Pending2),
      "pending3" => Ok(Stage::Pending3),
      "done" => Ok(Stage::Done),
      "cancelled" | "cancel" => Ok(Stage::Cancelled),
      "" => Err(ConfigError::MissingStage),
      other => Err(ConfigError::UnknownStage(other.to_string())),
    }
  }
}
