use std::io;
use std::sync::Arc;

use simdesk_config::{Customer, CustomerPatch, Iccid, TpaBilling};
use simdesk_records::{
  CustomerField, DateRange, next_customer_code, write_billing, write_customers, write_iccids,
};
use simdesk_store::{Document, ListQuery, Repository, SqliteStore, Store};

use crate::error::AdminError;

/// Customers, ICCIDs and TPA billing, plus their CSV exports.
pub struct Records {
  store: SqliteStore,
  customers: Repository<Customer>,
  iccids: Repository<Iccid>,
  billings: Repository<TpaBilling>,
}

impl Records {
  pub fn new(store: SqliteStore) -> Self {
    let shared: Arc<dyn Store> = Arc::new(store.clone());
    Self {
      store,
      customers: Repository::new(shared.clone()),
      iccids: Repository::new(shared.clone()),
      billings: Repository::new(shared),
    }
  }

  /// The code the next customer would get. Informational only;
  /// [`Records::add_customer`] allocates atomically.
  pub async fn next_code(&self) -> Result<String, AdminError> {
    let customers = self.customers.list(&ListQuery::new()).await?;
    Ok(next_customer_code(
      customers.iter().map(|c| c.data.code.as_str()),
    )?)
  }

  pub async fn add_customer(&self, customer: Customer) -> Result<Document<Customer>, AdminError> {
    Ok(self.store.create_customer(customer).await?)
  }

  pub async fn customers(&self) -> Result<Vec<Document<Customer>>, AdminError> {
    Ok(self.customers.list(&ListQuery::new().sorted("code")?).await?)
  }

  /// Apply `patch` to every customer in `ids`, skipping customers it
  /// wouldn't change. Returns the customers that were written.
  ///
  /// Each customer is updated at the revision just read; a concurrent
  /// edit stops the batch with a conflict.
  pub async fn bulk_update_customers(
    &self,
    ids: &[String],
    patch: &CustomerPatch,
  ) -> Result<Vec<Document<Customer>>, AdminError> {
    if patch.is_empty() {
      return Ok(Vec::new());
    }

    let mut updated = Vec::new();
    for id in ids {
      let mut doc = self.customers.get(id).await?;
      if patch.apply(&mut doc.data) {
        updated.push(self.customers.update(id, &doc.data, doc.revision).await?);
      }
    }
    tracing::info!(selected = ids.len(), updated = updated.len(), "customers bulk updated");
    Ok(updated)
  }

  /// Add an ICCID. Modem-data cards lose their customer and program.
  pub async fn add_iccid(&self, iccid: &Iccid) -> Result<Document<Iccid>, AdminError> {
    let mut iccid = iccid.clone();
    iccid.normalize();
    let doc = self.iccids.create(&iccid).await?;
    tracing::info!(id = %doc.id, iccid = %iccid.iccid, "iccid created");
    Ok(doc)
  }

  pub async fn iccid(&self, id: &str) -> Result<Document<Iccid>, AdminError> {
    Ok(self.iccids.get(id).await?)
  }

  pub async fn iccids(&self) -> Result<Vec<Document<Iccid>>, AdminError> {
    Ok(self.iccids.list(&ListQuery::new().sorted("iccid")?).await?)
  }

  pub async fn update_iccid(
    &self,
    id: &str,
    iccid: &Iccid,
    expected_revision: i64,
  ) -> Result<Document<Iccid>, AdminError> {
    let mut iccid = iccid.clone();
    iccid.normalize();
    let doc = self.iccids.update(id, &iccid, expected_revision).await?;
    tracing::info!(id, revision = doc.revision, "iccid updated");
    Ok(doc)
  }

  pub async fn delete_iccid(&self, id: &str) -> Result<(), AdminError> {
    self.iccids.delete(id).await?;
    tracing::info!(id, "iccid deleted");
    Ok(())
  }

  pub async fn add_billing(&self, billing: &TpaBilling) -> Result<Document<TpaBilling>, AdminError> {
    let doc = self.billings.create(billing).await?;
    tracing::info!(id = %doc.id, tpa = %billing.tpa_name, "billing created");
    Ok(doc)
  }

  pub async fn export_customers<W: io::Write>(
    &self,
    writer: W,
    fields: &[CustomerField],
  ) -> Result<usize, AdminError> {
    let customers: Vec<Customer> = self.customers().await?.into_iter().map(|d| d.data).collect();
    Ok(write_customers(writer, &customers, fields)?)
  }

  /// Billing lines, newest first, within `range`.
  pub async fn export_billing<W: io::Write>(
    &self,
    writer: W,
    range: DateRange,
  ) -> Result<usize, AdminError> {
    let query = ListQuery::new().sorted("-billing_date")?;
    let billings: Vec<TpaBilling> = self
      .billings
      .list(&query)
      .await?
      .into_iter()
      .map(|d| d.data)
      .collect();
    Ok(write_billing(writer, &billings, range)?)
  }

  pub async fn export_iccids<W: io::Write>(&self, writer: W) -> Result<usize, AdminError> {
    let iccids: Vec<Iccid> = self.iccids().await?.into_iter().map(|d| d.data).collect();
    Ok(write_iccids(writer, &iccids)?)
  }
}
