use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use sqlx::types::Json;

use crate::Error;

/// A stored record with its bookkeeping columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T = Value> {
  pub id: String,
  /// Starts at 1, bumped on every update.
  pub revision: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub data: T,
}

impl Document<Value> {
  /// Deserialize the payload into a typed record.
  pub fn decode<T: DeserializeOwned>(self) -> Result<Document<T>, Error> {
    Ok(Document {
      data: serde_json::from_value(self.data)?,
      id: self.id,
      revision: self.revision,
      created_at: self.created_at,
      updated_at: self.updated_at,
    })
  }
}

/// A document row as stored in the database.
#[derive(Debug, FromRow)]
pub(crate) struct DocumentRow {
  pub id: String,
  pub revision: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub data: Json<Value>,
}

impl From<DocumentRow> for Document {
  fn from(row: DocumentRow) -> Self {
    Document {
      id: row.id,
      revision: row.revision,
      created_at: row.created_at,
      updated_at: row.updated_at,
      data: row.data.0,
    }
  }
}

/// Sort order in the `-field` / `field` convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
  pub field: String,
  pub descending: bool,
}

impl SortKey {
  pub fn parse(key: &str) -> Result<Self, Error> {
    let (field, descending) = match key.strip_prefix('-') {
      Some(field) => (field, true),
      None => (key, false),
    };
    check_field(field)?;
    Ok(Self {
      field: field.to_string(),
      descending,
    })
  }

  /// The SQL ordering expression. Bookkeeping columns sort directly,
  /// everything else goes through the JSON payload.
  pub(crate) fn to_sql(&self) -> String {
    let expr = match self.field.as_str() {
      "id" | "revision" | "created_at" | "updated_at" => self.field.clone(),
      // Entity convention for the creation timestamp.
      "created_date" => "created_at".to_string(),
      "updated_date" => "updated_at".to_string(),
      field => format!("json_extract(data, '$.{}')", field),
    };
    let direction = if self.descending { "DESC" } else { "ASC" };
    if expr == "created_at" {
      format!("created_at {}, id ASC", direction)
    } else {
      format!("{} {}, created_at ASC, id ASC", expr, direction)
    }
  }
}

/// Options for listing a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
  pub sort: Option<SortKey>,
  pub limit: Option<u32>,
}

impl ListQuery {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn sorted(mut self, key: &str) -> Result<Self, Error> {
    self.sort = Some(SortKey::parse(key)?);
    Ok(self)
  }

  pub fn limit(mut self, limit: u32) -> Self {
    self.limit = Some(limit);
    self
  }

  pub(crate) fn order_by(&self) -> String {
    match &self.sort {
      Some(key) => key.to_sql(),
      None => "created_at ASC, id ASC".to_string(),
    }
  }

  /// SQLite treats a negative limit as unbounded.
  pub(crate) fn sql_limit(&self) -> i64 {
    self.limit.map(i64::from).unwrap_or(-1)
  }
}

/// Field names end up inside a JSON path, so only identifiers are allowed.
pub(crate) fn check_field(field: &str) -> Result<(), Error> {
  let valid = !field.is_empty()
    && field
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '_')
    && !field.starts_with(|c: char| c.is_ascii_digit());
  if valid {
    Ok(())
  } else {
    Err(Error::InvalidField(field.to_string()))
  }
}
