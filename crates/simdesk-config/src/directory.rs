//! Reference data maintained by administrators: roles, the organization
//! tree, regions, programs and third-party agents.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Display colors indexed by role level.
pub const LEVEL_COLORS: [&str; 8] = [
  "#94A3B8", "#60A5FA", "#34D399", "#FBBF24", "#FB923C", "#F87171", "#C084FC", "#DC2626",
];

pub const MAX_ROLE_LEVEL: u8 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
  pub name: String,
  #[serde(default)]
  pub level: u8,
  #[serde(default)]
  pub color: String,
}

impl Role {
  /// A role colored from the level palette.
  pub fn new(name: impl Into<String>, level: u8) -> Result<Self, ConfigError> {
    let role = Self {
      name: name.into(),
      level,
      color: level_color(level).to_string(),
    };
    role.validate()?;
    Ok(role)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.name.trim().is_empty() {
      return Err(ConfigError::EmptyField { field: "role name" });
    }
    if self.level > MAX_ROLE_LEVEL {
      return Err(ConfigError::RoleLevelOutOfRange(self.level));
    }
    Ok(())
  }
}

pub fn level_color(level: u8) -> &'static str {
  LEVEL_COLORS
    .get(level as usize)
    .copied()
    .unwrap_or(LEVEL_COLORS[0])
}

/// Tier of an organization in the department → channel → subchannel tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgType {
  Department,
  Channel,
  Subchannel,
}

impl OrgType {
  /// The type a parent must have, or `None` for roots.
  pub fn expected_parent(&self) -> Option<OrgType> {
    match self {
      OrgType::Department => None,
      OrgType::Channel => Some(OrgType::Department),
      OrgType::Subchannel => Some(OrgType::Channel),
    }
  }
}

impl fmt::Display for OrgType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      OrgType::Department => "department",
      OrgType::Channel => "channel",
      OrgType::Subchannel => "subchannel",
    })
  }
}

impl FromStr for OrgType {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "department" => Ok(OrgType::Department),
      "channel" => Ok(OrgType::Channel),
      "subchannel" => Ok(OrgType::Subchannel),
      other => Err(ConfigError::UnknownOrgType(other.to_string())),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
  pub name: String,
  #[serde(rename = "type")]
  pub org_type: OrgType,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub organization: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start_date: Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub end_date: Option<NaiveDate>,
}

impl Program {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.name.trim().is_empty() {
      return Err(ConfigError::EmptyField {
        field: "program name",
      });
    }
    if let (Some(start), Some(end)) = (self.start_date, self.end_date)
      && end < start
    {
      return Err(ConfigError::InvalidDateRange { start, end });
    }
    Ok(())
  }
}

/// A third-party agent. Regions and channels are linked by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tpa {
  pub name: String,
  #[serde(default)]
  pub regions: Vec<String>,
  #[serde(default)]
  pub channels: Vec<String>,
  /// Rate per approved seller, keyed by region name.
  #[serde(default)]
  pub seller_rates: BTreeMap<String, f64>,
}

impl Tpa {
  pub fn rate_for(&self, region: &str) -> Option<f64> {
    self.seller_rates.get(region).copied()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_role_color_from_level() {
    let role = Role::new("Supervisor", 3).unwrap();
    assert_eq!(role.color, "#FBBF24");
  }

  #[test]
  fn test_role_level_bounds() {
    assert!(matches!(
      Role::new("Root", 8),
      Err(ConfigError::RoleLevelOutOfRange(8))
    ));
    assert!(matches!(
      Role::new(" ", 1),
      Err(ConfigError::EmptyField { .. })
    ));
  }

  #[test]
  fn test_org_type_parents() {
    assert_eq!(OrgType::Department.expected_parent(), None);
    assert_eq!(OrgType::Channel.expected_parent(), Some(OrgType::Department));
    assert_eq!(OrgType::Subchannel.expected_parent(), Some(OrgType::Channel));
  }

  #[test]
  fn test_organization_type_field_name() {
    let org: Organization = serde_json::from_value(serde_json::json!({
      "name": "Retail",
      "type": "channel",
      "parent_id": "dept-1"
    }))
    .unwrap();
    assert_eq!(org.org_type, OrgType::Channel);
    assert_eq!(org.parent_id.as_deref(), Some("dept-1"));
  }

  #[test]
  fn test_program_date_range() {
    let program = Program {
      name: "Summer".to_string(),
      organization: None,
      start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
      end_date: NaiveDate::from_ymd_opt(2024, 5, 1),
    };
    assert!(matches!(
      program.validate(),
      Err(ConfigError::InvalidDateRange { .. })
    ));
  }
}
