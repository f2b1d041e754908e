//! CSV exports.
//!
//! Output is RFC 4180: the `csv` writer quotes any field holding a comma,
//! quote or line break and doubles embedded quotes.

use std::io;
use std::str::FromStr;

use chrono::NaiveDate;
use simdesk_config::{Customer, Iccid, TpaBilling};

use crate::error::RecordError;

/// Exportable customer columns, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CustomerField {
  CustomerName,
  Code,
  Region,
  Channel,
  SubChannel,
  FollowUpSss,
  Population,
  Address,
  Program,
  ContactPerson,
  ContactPhone,
  ContactEmail,
}

impl CustomerField {
  pub const ALL: [CustomerField; 12] = [
    CustomerField::CustomerName,
    CustomerField::Code,
    CustomerField::Region,
    CustomerField::Channel,
    CustomerField::SubChannel,
    CustomerField::FollowUpSss,
    CustomerField::Population,
    CustomerField::Address,
    CustomerField::Program,
    CustomerField::ContactPerson,
    CustomerField::ContactPhone,
    CustomerField::ContactEmail,
  ];

  /// Record field name.
  pub fn key(&self) -> &'static str {
    match self {
      CustomerField::CustomerName => "customer_name",
      CustomerField::Code => "code",
      CustomerField::Region => "region",
      CustomerField::Channel => "channel",
      CustomerField::SubChannel => "sub_channel",
      CustomerField::FollowUpSss => "follow_up_sss",
      CustomerField::Population => "population",
      CustomerField::Address => "address",
      CustomerField::Program => "program",
      CustomerField::ContactPerson => "contact_person",
      CustomerField::ContactPhone => "contact_phone",
      CustomerField::ContactEmail => "contact_email",
    }
  }

  /// Header label.
  pub fn label(&self) -> &'static str {
    match self {
      CustomerField::CustomerName => "Customer Name",
      CustomerField::Code => "Customer Code",
      CustomerField::Region => "Region",
      CustomerField::Channel => "Channel",
      CustomerField::SubChannel => "Sub-Channel",
      CustomerField::FollowUpSss => "Follow-up SSS",
      CustomerField::Population => "Population",
      CustomerField::Address => "Address",
      CustomerField::Program => "Program",
      CustomerField::ContactPerson => "Contact Person",
      CustomerField::ContactPhone => "Contact Phone",
      CustomerField::ContactEmail => "Contact Email",
    }
  }

  fn value(&self, c: &Customer) -> String {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    match self {
      CustomerField::CustomerName => c.customer_name.clone(),
      CustomerField::Code => c.code.clone(),
      CustomerField::Region => text(&c.region),
      CustomerField::Channel => text(&c.channel),
      CustomerField::SubChannel => text(&c.sub_channel),
      CustomerField::FollowUpSss => text(&c.follow_up_sss),
      CustomerField::Population => c.population.map(format_number).unwrap_or_default(),
      CustomerField::Address => text(&c.address),
      CustomerField::Program => text(&c.program),
      CustomerField::ContactPerson => text(&c.contact_person),
      CustomerField::ContactPhone => text(&c.contact_phone),
      CustomerField::ContactEmail => text(&c.contact_email),
    }
  }
}

impl FromStr for CustomerField {
  type Err = RecordError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    CustomerField::ALL
      .into_iter()
      .find(|f| f.key() == s)
      .ok_or_else(|| RecordError::UnknownField(s.to_string()))
  }
}

/// Inclusive `billing_date` window. Open ends match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
  pub start: Option<NaiveDate>,
  pub end: Option<NaiveDate>,
}

impl DateRange {
  pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
    Self { start, end }
  }

  /// Undated records are always included.
  pub fn includes(&self, date: Option<NaiveDate>) -> bool {
    let Some(date) = date else {
      return true;
    };
    self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
  }
}

pub const BILLING_HEADER: [&str; 9] = [
  "TPA Name",
  "Activity Session",
  "Required Sellers",
  "Actual Sellers",
  "Approved Sellers",
  "Seller Rate",
  "Total Amount",
  "Status",
  "Billing Date",
];

pub const ICCID_HEADER: [&str; 7] = [
  "ICCID",
  "Type",
  "Program",
  "Customer",
  "Department",
  "Channel",
  "Region",
];

/// Write customers with the selected columns.
///
/// Columns come out in catalog order whatever the selection order; an empty
/// selection exports every column.
pub fn write_customers<W: io::Write>(
  writer: W,
  customers: &[Customer],
  fields: &[CustomerField],
) -> Result<usize, RecordError> {
  let mut columns: Vec<CustomerField> = if fields.is_empty() {
    CustomerField::ALL.to_vec()
  } else {
    fields.to_vec()
  };
  columns.sort();
  columns.dedup();

  let mut csv = csv::Writer::from_writer(writer);
  csv.write_record(columns.iter().map(|f| f.label()))?;
  for customer in customers {
    csv.write_record(columns.iter().map(|f| f.value(customer)))?;
  }
  csv.flush()?;

  tracing::debug!(rows = customers.len(), columns = columns.len(), "exported customers");
  Ok(customers.len())
}

/// Write the billing lines falling in `range`. Returns the row count.
pub fn write_billing<W: io::Write>(
  writer: W,
  billings: &[TpaBilling],
  range: DateRange,
) -> Result<usize, RecordError> {
  let mut csv = csv::Writer::from_writer(writer);
  csv.write_record(BILLING_HEADER)?;

  let mut rows = 0;
  for b in billings.iter().filter(|b| range.includes(b.billing_date)) {
    let number = |v: Option<f64>| format_number(v.unwrap_or(0.0));
    csv.write_record([
      b.tpa_name.clone(),
      b.activity_session.clone(),
      number(b.required_sellers),
      number(b.actual_sellers),
      number(b.approved_sellers),
      number(b.seller_rate),
      format_number(b.total()),
      b.status.to_string(),
      b.billing_date.map(|d| d.to_string()).unwrap_or_default(),
    ])?;
    rows += 1;
  }
  csv.flush()?;

  tracing::debug!(rows, total = billings.len(), "exported billing");
  Ok(rows)
}

pub fn write_iccids<W: io::Write>(writer: W, iccids: &[Iccid]) -> Result<usize, RecordError> {
  let mut csv = csv::Writer::from_writer(writer);
  csv.write_record(ICCID_HEADER)?;
  for i in iccids {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    csv.write_record([
      i.iccid.clone(),
      i.iccid_type.clone(),
      program_label(i),
      text(&i.customer_name),
      text(&i.department),
      text(&i.channel),
      text(&i.region),
    ])?;
  }
  csv.flush()?;
  Ok(iccids.len())
}

/// The program's display name, falling back to its id.
fn program_label(i: &Iccid) -> String {
  i.program_name
    .as_deref()
    .filter(|name| !name.is_empty())
    .or(i.program.as_deref())
    .unwrap_or_default()
    .to_string()
}

/// Integral values print without a fractional part.
fn format_number(n: f64) -> String {
  if n.fract() == 0.0 && n.abs() < 1e15 {
    format!("{}", n as i64)
  } else {
    n.to_string()
  }
}
