use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use simdesk_config::{
  Customer, Iccid, Organization, Permission, Program, Region, Role, Task, TaskTemplate, Tpa,
  TpaBilling,
};

use crate::{Document, Error, ListQuery, Store};

/// Collection names.
pub mod collections {
  pub const TASK_TEMPLATES: &str = "task_templates";
  pub const TASKS: &str = "tasks";
  pub const ROLES: &str = "roles";
  pub const ORGANIZATIONS: &str = "organizations";
  pub const REGIONS: &str = "regions";
  pub const PROGRAMS: &str = "programs";
  pub const TPAS: &str = "tpas";
  pub const TPA_BILLINGS: &str = "tpa_billings";
  pub const CUSTOMERS: &str = "customers";
  pub const ICCIDS: &str = "iccids";
  pub const PERMISSIONS: &str = "permissions";
}

/// A record type stored in its own collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
  const COLLECTION: &'static str;
}

macro_rules! entity {
  ($($ty:ty => $collection:ident),* $(,)?) => {
    $(impl Entity for $ty {
      const COLLECTION: &'static str = collections::$collection;
    })*
  };
}

entity! {
  TaskTemplate => TASK_TEMPLATES,
  Task => TASKS,
  Role => ROLES,
  Organization => ORGANIZATIONS,
  Region => REGIONS,
  Program => PROGRAMS,
  Tpa => TPAS,
  TpaBilling => TPA_BILLINGS,
  Customer => CUSTOMERS,
  Iccid => ICCIDS,
  Permission => PERMISSIONS,
}

/// Typed view of one collection.
pub struct Repository<T> {
  store: Arc<dyn Store>,
  _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      _entity: PhantomData,
    }
  }
}

impl<T: Entity> Repository<T> {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self {
      store,
      _entity: PhantomData,
    }
  }

  pub async fn create(&self, entity: &T) -> Result<Document<T>, Error> {
    let data = serde_json::to_value(entity)?;
    self.store.create(T::COLLECTION, data).await?.decode()
  }

  pub async fn get(&self, id: &str) -> Result<Document<T>, Error> {
    self.store.get(T::COLLECTION, id).await?.decode()
  }

  pub async fn list(&self, query: &ListQuery) -> Result<Vec<Document<T>>, Error> {
    let docs = self.store.list(T::COLLECTION, query).await?;
    docs.into_iter().map(Document::decode).collect()
  }

  pub async fn filter(
    &self,
    field: &str,
    value: impl Into<Value>,
    query: &ListQuery,
  ) -> Result<Vec<Document<T>>, Error> {
    let value = value.into();
    let docs = self
      .store
      .filter(T::COLLECTION, field, &value, query)
      .await?;
    docs.into_iter().map(Document::decode).collect()
  }

  pub async fn update(
    &self,
    id: &str,
    entity: &T,
    expected_revision: i64,
  ) -> Result<Document<T>, Error> {
    let data = serde_json::to_value(entity)?;
    self
      .store
      .update(T::COLLECTION, id, data, expected_revision)
      .await?
      .decode()
  }

  pub async fn delete(&self, id: &str) -> Result<(), Error> {
    self.store.delete(T::COLLECTION, id).await
  }
}
