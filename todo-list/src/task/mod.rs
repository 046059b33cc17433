use crate::clock::Clock;
use crate::entities::*;
use chrono::{DateTime, Utc};
use sea_orm::*;
use std::fmt;

pub mod form;
pub mod query;
pub mod web;

pub use crate::entities::task::Status as TaskStatus;
pub use form::{FieldErrors, TaskFormInput, TaskFormView, ValidTask};
pub use query::{TaskBoard, TaskFilter, TaskQuery};
pub use web::{TaskState, create_task_router};

impl TaskStatus {
    pub const ALL: [TaskStatus; 2] = [TaskStatus::Pending, TaskStatus::Resolved];

    /// Returns the stored name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Resolved => "RESOLVED",
        }
    }

    /// Returns the human readable label of the status.
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Resolved => "Resolved",
        }
    }

    /// Returns the other status.
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Resolved,
            TaskStatus::Resolved => TaskStatus::Pending,
        }
    }

    /// Parses a stored status name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(TaskStatus::Pending),
            "RESOLVED" => Some(TaskStatus::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: u32,
    title: String,
    description: String,
    due_date: DateTime<Utc>,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: u32,
        title: String,
        description: String,
        due_date: DateTime<Utc>,
        status: TaskStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            due_date,
            status,
            created_at,
            updated_at,
        }
    }

    /// Returns the ID of the task.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the title of the task.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description of the task.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns when the task is due.
    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    /// Returns the status of the task.
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    pub fn is_resolved(&self) -> bool {
        self.status == TaskStatus::Resolved
    }

    /// Due date as shown on the list page.
    pub fn due_date_display(&self) -> String {
        self.due_date.format("%b %-d, %Y %H:%M").to_string()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Task::new(
            model.id as u32,
            model.title,
            model.description,
            model.due_date,
            model.status,
            model.created_at,
            model.updated_at,
        )
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    /// Represents a task not found error.
    #[error("Task with ID {0} not found")]
    TaskNotFound(u32),
}

pub struct TaskService<'a> {
    db: &'a sea_orm::DatabaseConnection,
    clock: &'a dyn Clock,
}

impl<'a> TaskService<'a> {
    pub fn new(db: &'a sea_orm::DatabaseConnection, clock: &'a dyn Clock) -> Self {
        TaskService { db, clock }
    }

    /// Creates a new task from validated form input.
    ///
    /// Both audit timestamps are set to the current instant.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created `Task` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, input: ValidTask) -> Result<Task, TaskServiceError> {
        let now = self.clock.now();
        let active_model = task::ActiveModel {
            title: ActiveValue::Set(input.title),
            description: ActiveValue::Set(input.description),
            due_date: ActiveValue::Set(input.due_date),
            status: ActiveValue::Set(input.status),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        };
        let created_model = active_model.insert(self.db).await?;
        tracing::info!("Created task {}", created_model.id);
        Ok(Task::from(created_model))
    }

    /// Overwrites the editable fields of a task by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the task to edit.
    /// * `input` - The validated replacement values.
    ///
    /// # Returns
    ///
    /// A `Result` containing the updated `Task` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn update_task_by_id(
        &self,
        id: u32,
        input: ValidTask,
    ) -> Result<Task, TaskServiceError> {
        let task_to_update = self.find_model(id).await?;

        let mut active_model: task::ActiveModel = task_to_update.into();
        active_model.title = ActiveValue::Set(input.title);
        active_model.description = ActiveValue::Set(input.description);
        active_model.due_date = ActiveValue::Set(input.due_date);
        active_model.status = ActiveValue::Set(input.status);
        active_model.updated_at = ActiveValue::Set(self.clock.now());
        let updated_model = active_model.update(self.db).await?;

        tracing::info!("Updated task {}", id);
        Ok(Task::from(updated_model))
    }

    /// Flips a task between pending and resolved.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_task_by_id(&self, id: u32) -> Result<Task, TaskServiceError> {
        let task_to_toggle = self.find_model(id).await?;
        let toggled = task_to_toggle.status.toggled();

        let mut active_model: task::ActiveModel = task_to_toggle.into();
        active_model.status = ActiveValue::Set(toggled);
        active_model.updated_at = ActiveValue::Set(self.clock.now());
        let updated_model = active_model.update(self.db).await?;

        tracing::info!("Task {} is now {}", id, toggled.as_str());
        Ok(Task::from(updated_model))
    }

    /// Deletes a task by its ID.
    ///
    /// # Returns
    ///
    /// A `Result` containing the deleted `Task` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task_by_id(&self, id: u32) -> Result<Task, TaskServiceError> {
        let task_to_delete = self.find_model(id).await?;

        let deleted = Task::from(task_to_delete.clone());
        task_to_delete.delete(self.db).await?;
        tracing::info!("Deleted task {}", id);
        Ok(deleted)
    }

    /// Retrieves a task by its ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_task_by_id(&self, id: u32) -> Result<Task, TaskServiceError> {
        self.find_model(id).await.map(Task::from)
    }

    /// Retrieves every task, earliest due date first.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_tasks(&self) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = task::Entity::find()
            .order_by_asc(task::Column::DueDate)
            .order_by_asc(task::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    async fn find_model(&self, id: u32) -> Result<task::Model, TaskServiceError> {
        task::Entity::find_by_id(id as i32)
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }
}
