//! simdesk Store
//!
//! This crate provides the document store for simdesk records. Every
//! collection (templates, roles, organizations, customers, ...) is a set of
//! JSON documents keyed by id, persisted to SQLite.
//!
//! The [`Store`] trait defines operations for:
//! - Listing and filtering a collection, with `-field` / `field` sorting
//! - Creating, reading and deleting documents
//! - Revision-checked updates: a write against a stale revision fails with
//!   [`Error::Conflict`] instead of overwriting the newer document
//!
//! [`Repository`] layers typed access over the raw documents.

mod document;
mod entity;
mod error;
mod sqlite;

pub use document::{Document, ListQuery, SortKey};
pub use entity::{Entity, Repository, collections};
pub use error::Error;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde_json::Value;

/// Storage trait for JSON document collections.
#[async_trait]
pub trait Store: Send + Sync {
  /// Create a document with a fresh id.
  async fn create(&self, collection: &str, data: Value) -> Result<Document, Error>;

  /// Get a document by id.
  async fn get(&self, collection: &str, id: &str) -> Result<Document, Error>;

  /// List a collection.
  async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Document>, Error>;

  /// List the documents whose top-level `field` equals `value`.
  async fn filter(
    &self,
    collection: &str,
    field: &str,
    value: &Value,
    query: &ListQuery,
  ) -> Result<Vec<Document>, Error>;

  /// Replace a document's payload if it is still at `expected_revision`.
  async fn update(
    &self,
    collection: &str,
    id: &str,
    data: Value,
    expected_revision: i64,
  ) -> Result<Document, Error>;

  /// Delete a document.
  async fn delete(&self, collection: &str, id: &str) -> Result<(), Error>;
}
