use std::sync::Arc;

use simdesk_config::{Task, TaskStatus, TaskTemplate};
use simdesk_store::{Document, ListQuery, Repository, Store};

use crate::error::AdminError;

/// Task instances started from templates.
pub struct TaskService {
  tasks: Repository<Task>,
  templates: Repository<TaskTemplate>,
}

impl TaskService {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self {
      tasks: Repository::new(store.clone()),
      templates: Repository::new(store),
    }
  }

  /// Start a draft task from the stored template `template_id`.
  pub async fn start(
    &self,
    template_id: &str,
    assigned_to: Option<String>,
    customer: Option<String>,
  ) -> Result<Document<Task>, AdminError> {
    let template = self.templates.get(template_id).await?;
    let mut task = Task::from_template(&template.data);
    task.assigned_to = assigned_to;
    task.customer = customer;

    let doc = self.tasks.create(&task).await?;
    tracing::info!(id = %doc.id, template_id, name = %task.name, "task started");
    Ok(doc)
  }

  pub async fn get(&self, id: &str) -> Result<Document<Task>, AdminError> {
    Ok(self.tasks.get(id).await?)
  }

  /// Tasks newest first, optionally only those in `status`.
  pub async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<Document<Task>>, AdminError> {
    let query = ListQuery::new().sorted("-created_date")?;
    let docs = match status {
      Some(status) => self.tasks.filter("status", status.as_str(), &query).await?,
      None => self.tasks.list(&query).await?,
    };
    Ok(docs)
  }

  pub async fn update(
    &self,
    id: &str,
    task: &Task,
    expected_revision: i64,
  ) -> Result<Document<Task>, AdminError> {
    let doc = self.tasks.update(id, task, expected_revision).await?;
    tracing::info!(id, revision = doc.revision, status = %task.status, "task updated");
    Ok(doc)
  }

  /// Move a task to `status`, keeping everything else.
  pub async fn set_status(
    &self,
    id: &str,
    status: TaskStatus,
    expected_revision: i64,
  ) -> Result<Document<Task>, AdminError> {
    let mut task = self.tasks.get(id).await?.data;
    task.status = status;
    self.update(id, &task, expected_revision).await
  }

  pub async fn delete(&self, id: &str) -> Result<(), AdminError> {
    self.tasks.delete(id).await?;
    tracing::info!(id, "task deleted");
    Ok(())
  }
}
