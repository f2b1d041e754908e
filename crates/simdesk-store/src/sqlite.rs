use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use simdesk_config::Customer;
use simdesk_records::next_customer_code;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::types::Json;
use tracing::instrument;

use crate::document::{DocumentRow, check_field};
use crate::entity::collections;
use crate::{Document, Error, ListQuery, Store};

/// Attempts at allocating a customer code before giving up on a race.
const CODE_ATTEMPTS: usize = 3;

/// SQLite-based store implementation.
#[derive(Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open `url`, creating the database file if needed, and migrate it.
  pub async fn connect(url: &str) -> Result<Self, Error> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

    // Each connection to an in-memory database gets its own database, so
    // pin the pool to a single connection that never expires.
    let in_memory = url.contains(":memory:") || url.contains("mode=memory");
    let pool = if in_memory {
      SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(options)
        .await?
    } else {
      SqlitePoolOptions::new().connect_with(options).await?
    };

    let store = Self::new(pool);
    store.migrate().await?;
    tracing::debug!(url, "store opened");
    Ok(store)
  }

  /// A migrated in-memory store.
  pub async fn in_memory() -> Result<Self, Error> {
    Self::connect("sqlite::memory:").await
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }

  /// Create a customer with the next free code.
  ///
  /// The code is computed and the row inserted in one transaction that
  /// takes the write lock up front, so concurrent allocations queue on the
  /// busy timeout instead of failing the read-to-write upgrade. A writer
  /// that bypasses this path still trips the unique index, and allocation
  /// is retried.
  #[instrument(skip(self, customer), fields(name = %customer.customer_name))]
  pub async fn create_customer(&self, mut customer: Customer) -> Result<Document<Customer>, Error> {
    let mut attempt = 0;
    loop {
      attempt += 1;
      match self.try_create_customer(&mut customer).await {
        Err(Error::Duplicate { .. }) if attempt < CODE_ATTEMPTS => {
          tracing::warn!(attempt, code = %customer.code, "customer code taken, retrying");
        }
        result => return result,
      }
    }
  }

  async fn try_create_customer(
    &self,
    customer: &mut Customer,
  ) -> Result<Document<Customer>, Error> {
    let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

    let codes: Vec<Option<String>> = sqlx::query_scalar(
      r#"
      SELECT json_extract(data, '$.code')
      FROM documents
      WHERE collection = ?
      "#,
    )
    .bind(collections::CUSTOMERS)
    .fetch_all(&mut *tx)
    .await?;

    customer.code = next_customer_code(codes.iter().flatten().map(String::as_str))?;

    let data = serde_json::to_value(&*customer)?;
    let row = insert(&mut *tx, collections::CUSTOMERS, data).await?;
    tx.commit().await?;

    tracing::info!(id = %row.id, code = %customer.code, "customer created");
    Document::from(row).decode()
  }
}

fn new_id() -> String {
  uuid::Uuid::new_v4().simple().to_string()
}

async fn insert<'e, E>(executor: E, collection: &str, data: Value) -> Result<DocumentRow, Error>
where
  E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
  let now = Utc::now();
  sqlx::query_as(
    r#"
    INSERT INTO documents (collection, id, revision, data, created_at, updated_at)
    VALUES (?, ?, 1, ?, ?, ?)
    RETURNING id, revision, created_at, updated_at, data
    "#,
  )
  .bind(collection)
  .bind(new_id())
  .bind(Json(data))
  .bind(now)
  .bind(now)
  .fetch_one(executor)
  .await
  .map_err(|e| Error::from_write(collection, e))
}

fn not_found(collection: &str, id: &str) -> Error {
  Error::NotFound {
    collection: collection.to_string(),
    id: id.to_string(),
  }
}

#[async_trait]
impl Store for SqliteStore {
  #[instrument(skip(self, data))]
  async fn create(&self, collection: &str, data: Value) -> Result<Document, Error> {
    let row = insert(&self.pool, collection, data).await?;
    tracing::info!(id = %row.id, "document created");
    Ok(row.into())
  }

  #[instrument(skip(self))]
  async fn get(&self, collection: &str, id: &str) -> Result<Document, Error> {
    let row: Option<DocumentRow> = sqlx::query_as(
      r#"
      SELECT id, revision, created_at, updated_at, data
      FROM documents
      WHERE collection = ? AND id = ?
      "#,
    )
    .bind(collection)
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    row
      .map(Document::from)
      .ok_or_else(|| not_found(collection, id))
  }

  #[instrument(skip(self))]
  async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Document>, Error> {
    let sql = format!(
      r#"
      SELECT id, revision, created_at, updated_at, data
      FROM documents
      WHERE collection = ?
      ORDER BY {}
      LIMIT ?
      "#,
      query.order_by()
    );
    let rows: Vec<DocumentRow> = sqlx::query_as(&sql)
      .bind(collection)
      .bind(query.sql_limit())
      .fetch_all(&self.pool)
      .await?;

    tracing::debug!(count = rows.len(), "listed documents");
    Ok(rows.into_iter().map(Document::from).collect())
  }

  #[instrument(skip(self))]
  async fn filter(
    &self,
    collection: &str,
    field: &str,
    value: &Value,
    query: &ListQuery,
  ) -> Result<Vec<Document>, Error> {
    check_field(field)?;
    // IS rather than = so that a null value matches missing fields.
    let sql = format!(
      r#"
      SELECT id, revision, created_at, updated_at, data
      FROM documents
      WHERE collection = ? AND json_extract(data, ?) IS json_extract(?, '$')
      ORDER BY {}
      LIMIT ?
      "#,
      query.order_by()
    );
    let rows: Vec<DocumentRow> = sqlx::query_as(&sql)
      .bind(collection)
      .bind(format!("$.{}", field))
      .bind(value.to_string())
      .bind(query.sql_limit())
      .fetch_all(&self.pool)
      .await?;

    tracing::debug!(count = rows.len(), "filtered documents");
    Ok(rows.into_iter().map(Document::from).collect())
  }

  #[instrument(skip(self, data))]
  async fn update(
    &self,
    collection: &str,
    id: &str,
    data: Value,
    expected_revision: i64,
  ) -> Result<Document, Error> {
    let row: Option<DocumentRow> = sqlx::query_as(
      r#"
      UPDATE documents
      SET data = ?, revision = revision + 1, updated_at = ?
      WHERE collection = ? AND id = ? AND revision = ?
      RETURNING id, revision, created_at, updated_at, data
      "#,
    )
    .bind(Json(data))
    .bind(Utc::now())
    .bind(collection)
    .bind(id)
    .bind(expected_revision)
    .fetch_optional(&self.pool)
    .await
    .map_err(|e| Error::from_write(collection, e))?;

    if let Some(row) = row {
      tracing::info!(revision = row.revision, "document updated");
      return Ok(row.into());
    }

    let actual: Option<i64> =
      sqlx::query_scalar("SELECT revision FROM documents WHERE collection = ? AND id = ?")
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

    match actual {
      None => Err(not_found(collection, id)),
      Some(actual) => {
        tracing::warn!(expected_revision, actual, "stale update rejected");
        Err(Error::Conflict {
          collection: collection.to_string(),
          id: id.to_string(),
          expected: expected_revision,
          actual,
        })
      }
    }
  }

  #[instrument(skip(self))]
  async fn delete(&self, collection: &str, id: &str) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
      .bind(collection)
      .bind(id)
      .execute(&self.pool)
      .await?;

    if result.rows_affected() == 0 {
      return Err(not_found(collection, id));
    }
    tracing::info!("document deleted");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  async fn store() -> SqliteStore {
    SqliteStore::in_memory().await.unwrap()
  }

  #[tokio::test]
  async fn test_create_and_get() {
    let store = store().await;
    let doc = store
      .create("regions", json!({ "name": "North" }))
      .await
      .unwrap();
    assert_eq!(doc.revision, 1);

    let fetched = store.get("regions", &doc.id).await.unwrap();
    assert_eq!(fetched.data, json!({ "name": "North" }));

    let missing = store.get("roles", &doc.id).await;
    assert!(matches!(missing, Err(Error::NotFound { .. })));
  }

  #[tokio::test]
  async fn test_stale_revision_conflicts() {
    let store = store().await;
    let doc = store
      .create("task_templates", json!({ "name": "Visit" }))
      .await
      .unwrap();

    let updated = store
      .update("task_templates", &doc.id, json!({ "name": "Visit v2" }), 1)
      .await
      .unwrap();
    assert_eq!(updated.revision, 2);

    let stale = store
      .update("task_templates", &doc.id, json!({ "name": "Visit v1b" }), 1)
      .await;
    match stale {
      Err(Error::Conflict {
        expected, actual, ..
      }) => {
        assert_eq!(expected, 1);
        assert_eq!(actual, 2);
      }
      other => panic!("expected conflict, got {:?}", other),
    }

    let current = store.get("task_templates", &doc.id).await.unwrap();
    assert_eq!(current.data["name"], "Visit v2");

    let missing = store.update("task_templates", "nope", json!({}), 1).await;
    assert!(matches!(missing, Err(Error::NotFound { .. })));
  }

  #[tokio::test]
  async fn test_list_sort_and_limit() {
    let store = store().await;
    for (name, order) in [("b", 2), ("c", 3), ("a", 1)] {
      store
        .create("task_templates", json!({ "name": name, "display_order": order }))
        .await
        .unwrap();
    }

    let names = |docs: Vec<Document>| -> Vec<String> {
      docs
        .into_iter()
        .map(|d| d.data["name"].as_str().unwrap().to_string())
        .collect()
    };

    let asc = ListQuery::new().sorted("display_order").unwrap();
    let docs = store.list("task_templates", &asc).await.unwrap();
    assert_eq!(names(docs), vec!["a", "b", "c"]);

    let desc = ListQuery::new().sorted("-display_order").unwrap().limit(2);
    let docs = store.list("task_templates", &desc).await.unwrap();
    assert_eq!(names(docs), vec!["c", "b"]);
  }

  #[tokio::test]
  async fn test_filter_by_field() {
    let store = store().await;
    store
      .create("organizations", json!({ "name": "Sales", "type": "department" }))
      .await
      .unwrap();
    store
      .create(
        "organizations",
        json!({ "name": "Retail", "type": "channel", "parent_id": "d1" }),
      )
      .await
      .unwrap();

    let channels = store
      .filter("organizations", "type", &json!("channel"), &ListQuery::new())
      .await
      .unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].data["name"], "Retail");

    let roots = store
      .filter("organizations", "parent_id", &Value::Null, &ListQuery::new())
      .await
      .unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].data["name"], "Sales");

    let bad = store
      .filter("organizations", "a.b", &json!(1), &ListQuery::new())
      .await;
    assert!(matches!(bad, Err(Error::InvalidField(_))));
  }

  #[tokio::test]
  async fn test_delete() {
    let store = store().await;
    let doc = store.create("regions", json!({ "name": "X" })).await.unwrap();
    store.delete("regions", &doc.id).await.unwrap();
    assert!(matches!(
      store.delete("regions", &doc.id).await,
      Err(Error::NotFound { .. })
    ));
  }

  #[tokio::test]
  async fn test_customer_codes_fill_gaps() {
    let store = store().await;
    let customer = |name: &str| Customer {
      customer_name: name.to_string(),
      ..Default::default()
    };

    let first = store.create_customer(customer("A")).await.unwrap();
    let second = store.create_customer(customer("B")).await.unwrap();
    let third = store.create_customer(customer("C")).await.unwrap();
    assert_eq!(first.data.code, "S0001");
    assert_eq!(second.data.code, "S0002");
    assert_eq!(third.data.code, "S0003");

    store.delete(collections::CUSTOMERS, &second.id).await.unwrap();
    let refill = store.create_customer(customer("D")).await.unwrap();
    assert_eq!(refill.data.code, "S0002");
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_concurrent_customer_codes_are_distinct() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("simdesk.db").display());
    let store = SqliteStore::connect(&url).await.unwrap();

    let handles: Vec<_> = (0..8)
      .map(|i| {
        let store = store.clone();
        tokio::spawn(async move {
          store
            .create_customer(Customer {
              customer_name: format!("Customer {}", i),
              ..Default::default()
            })
            .await
        })
      })
      .collect();

    let mut codes = Vec::new();
    for handle in handles {
      codes.push(handle.await.unwrap().unwrap().data.code);
    }
    codes.sort();
    let expected: Vec<String> = (1..=8).map(|n| format!("S{:04}", n)).collect();
    assert_eq!(codes, expected);
  }

  #[tokio::test]
  async fn test_duplicate_role_name_rejected() {
    let store = store().await;
    store
      .create(collections::ROLES, json!({ "name": "Manager", "level": 3 }))
      .await
      .unwrap();
    let dup = store
      .create(collections::ROLES, json!({ "name": "Manager", "level": 4 }))
      .await;
    assert!(matches!(dup, Err(Error::Duplicate { .. })));

    // Other collections may repeat the name.
    store
      .create(collections::REGIONS, json!({ "name": "Manager" }))
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn test_duplicate_code_rejected() {
    let store = store().await;
    store
      .create(collections::CUSTOMERS, json!({ "customer_name": "A", "code": "S0001" }))
      .await
      .unwrap();
    let dup = store
      .create(collections::CUSTOMERS, json!({ "customer_name": "B", "code": "S0001" }))
      .await;
    assert!(matches!(dup, Err(Error::Duplicate { .. })));
  }
}
