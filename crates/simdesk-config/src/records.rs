//! Operational records: customers, ICCIDs, TPA billing and page permissions.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
  pub customer_name: String,
  #[serde(default)]
  pub code: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub region: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub channel: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sub_channel: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub follow_up_sss: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub population: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub longitude: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub latitude: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub signal: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub program: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contact_person: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contact_phone: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iccid {
  pub iccid: String,
  #[serde(rename = "type")]
  pub iccid_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub program: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub program_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub customer_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub department: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub channel: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub region: Option<String>,
}

impl Iccid {
  /// Type code for modem-data cards, which carry no customer or program.
  pub const MODEM_DATA: &'static str = "MD";

  /// Drop the fields that don't apply to this card type.
  pub fn normalize(&mut self) {
    if self.iccid_type == Self::MODEM_DATA {
      self.customer_name = None;
      self.program = None;
    }
  }
}

/// Fields applied to many customers at once. Unset or blank fields leave
/// the customer's value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub region: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub follow_up_sss: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub program: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub signal: Option<String>,
}

impl CustomerPatch {
  fn fields(&self) -> [&Option<String>; 4] {
    [&self.region, &self.follow_up_sss, &self.program, &self.signal]
  }

  pub fn is_empty(&self) -> bool {
    self
      .fields()
      .into_iter()
      .all(|f| f.as_deref().is_none_or(|v| v.trim().is_empty()))
  }

  /// Apply the filled-in fields. Returns whether anything changed.
  pub fn apply(&self, customer: &mut Customer) -> bool {
    let mut changed = false;
    let targets = [
      (&self.region, &mut customer.region),
      (&self.follow_up_sss, &mut customer.follow_up_sss),
      (&self.program, &mut customer.program),
      (&self.signal, &mut customer.signal),
    ];
    for (value, target) in targets {
      if let Some(value) = value.as_deref().map(str::trim)
        && !value.is_empty()
        && target.as_deref() != Some(value)
      {
        *target = Some(value.to_string());
        changed = true;
      }
    }
    changed
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
  #[default]
  Draft,
  Pending,
  Approved,
  Paid,
}

impl fmt::Display for BillingStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      BillingStatus::Draft => "draft",
      BillingStatus::Pending => "pending",
      BillingStatus::Approved => "approved",
      BillingStatus::Paid => "paid",
    })
  }
}

/// One billing line for a TPA activity session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TpaBilling {
  pub tpa_id: String,
  pub tpa_name: String,
  pub activity_session: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub required_sellers: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub actual_sellers: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub approved_sellers: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub seller_rate: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total_amount: Option<f64>,
  #[serde(default)]
  pub status: BillingStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub billing_date: Option<NaiveDate>,
}

impl TpaBilling {
  /// The explicit total, or approved sellers times the rate.
  pub fn total(&self) -> f64 {
    self.total_amount.unwrap_or_else(|| {
      self.approved_sellers.unwrap_or(0.0) * self.seller_rate.unwrap_or(0.0)
    })
  }
}

/// Pages guarded by the permission matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Page {
  Dashboard,
  Tasks,
  CrmCustomers,
  #[serde(rename = "TPAManagement")]
  TpaManagement,
  Support,
  ConfigCenter,
}

impl Page {
  pub const ALL: [Page; 6] = [
    Page::Dashboard,
    Page::Tasks,
    Page::CrmCustomers,
    Page::TpaManagement,
    Page::Support,
    Page::ConfigCenter,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Page::Dashboard => "Dashboard",
      Page::Tasks => "Tasks",
      Page::CrmCustomers => "CrmCustomers",
      Page::TpaManagement => "TPAManagement",
      Page::Support => "Support",
      Page::ConfigCenter => "ConfigCenter",
    }
  }
}

impl FromStr for Page {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Page::ALL
      .into_iter()
      .find(|p| p.as_str() == s)
      .ok_or_else(|| ConfigError::UnknownPage(s.to_string()))
  }
}

/// The four operations a permission row grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
  View,
  Create,
  Edit,
  Delete,
}

/// A stored `(role, page)` permission row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
  pub role_id: String,
  pub page: Page,
  #[serde(default)]
  pub can_view: bool,
  #[serde(default)]
  pub can_create: bool,
  #[serde(default)]
  pub can_edit: bool,
  #[serde(default)]
  pub can_delete: bool,
}

impl Permission {
  /// A row granting only `access`, as created on the first toggle.
  pub fn only(role_id: impl Into<String>, page: Page, access: Access, value: bool) -> Self {
    let mut row = Self {
      role_id: role_id.into(),
      page,
      can_view: false,
      can_create: false,
      can_edit: false,
      can_delete: false,
    };
    row.set(access, value);
    row
  }

  pub fn get(&self, access: Access) -> bool {
    match access {
      Access::View => self.can_view,
      Access::Create => self.can_create,
      Access::Edit => self.can_edit,
      Access::Delete => self.can_delete,
    }
  }

  pub fn set(&mut self, access: Access, value: bool) {
    match access {
      Access::View => self.can_view = value,
      Access::Create => self.can_create = value,
      Access::Edit => self.can_edit = value,
      Access::Delete => self.can_delete = value,
    }
  }
}
