use chrono::{DateTime, Utc};
use sea_orm::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::entities::sea_orm_active_enums::TaskStatus;
use crate::entities::{task, user};

pub mod api;
pub mod validate;

pub use validate::TaskValidationError;

/// Number of tasks returned per listing page.
const PAGE_SIZE: u64 = 20;

/// A work item, as exposed to the rest of the application.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Task {
    id: Uuid,
    title: String,
    description: String,
    status: TaskStatus,
    priority: i32,
    due_date: DateTime<Utc>,
    assigned_to: Uuid,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Returns the ID of the task.
    pub fn id(&self) -> Uuid {
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

    /// Returns the status of the task.
    pub fn status(&self) -> &TaskStatus {
        &self.status
    }

    /// Returns the priority of the task.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the due date of the task.
    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    /// Returns the ID of the account the task is assigned to.
    pub fn assigned_to(&self) -> Uuid {
        self.assigned_to
    }

    /// Returns the ID of the account that created the task.
    pub fn created_by(&self) -> Uuid {
        self.created_by
    }

    /// Returns when the task was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the task was last updated.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            due_date: model.due_date,
            assigned_to: model.assigned_to,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Display summary of the account a task is assigned to.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AssigneeSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<user::Model> for AssigneeSummary {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
        }
    }
}

/// Display summary of the account that created a task.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CreatorSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<&user::Model> for CreatorSummary {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
        }
    }
}

/// A task joined with its assignee's display summary (read-side projection;
/// the stored record only carries the assignee's ID).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TaskWithAssignee {
    pub task: Task,
    pub assignee: Option<AssigneeSummary>,
}

/// A task with its assignee and creator summaries, as shown in listings.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TaskListing {
    pub task: Task,
    pub assignee: Option<AssigneeSummary>,
    pub creator: Option<CreatorSummary>,
}

/// One page of tasks plus pagination counters.
#[derive(Debug)]
pub struct TaskPage {
    pub tasks: Vec<TaskListing>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u64,
}

/// Filters for listing tasks.
#[derive(Debug, Default, Clone)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<i32>,
    pub assigned_to: Option<Uuid>,
}

/// Payload for creating a task. Fields hold raw JSON values so that type
/// mismatches reach the field validators rather than failing
/// deserialization.
#[derive(Debug, Default, Clone, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[schema(value_type = Option<String>)]
    pub title: Option<serde_json::Value>,
    #[schema(value_type = Option<String>)]
    pub description: Option<serde_json::Value>,
    #[schema(value_type = Option<String>)]
    pub status: Option<serde_json::Value>,
    #[schema(value_type = Option<i32>)]
    pub priority: Option<serde_json::Value>,
    #[schema(value_type = Option<String>)]
    pub due_date: Option<serde_json::Value>,
    #[schema(value_type = Option<String>)]
    pub assigned_to: Option<serde_json::Value>,
}

/// Partial update payload for a task. Absent fields leave the stored values
/// untouched; present fields hold raw JSON values for the same reason as
/// [`CreateTaskRequest`].
#[derive(Debug, Default, Clone, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[schema(value_type = Option<String>)]
    pub title: Option<serde_json::Value>,
    #[schema(value_type = Option<String>)]
    pub description: Option<serde_json::Value>,
    #[schema(value_type = Option<String>)]
    pub status: Option<serde_json::Value>,
    #[schema(value_type = Option<i32>)]
    pub priority: Option<serde_json::Value>,
    #[schema(value_type = Option<String>)]
    pub due_date: Option<serde_json::Value>,
    #[schema(value_type = Option<String>)]
    pub assigned_to: Option<serde_json::Value>,
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// The target task does not exist.
    #[error("Task not found")]
    TaskNotFound,
    /// The caller is neither the task's assignee nor an admin.
    #[error("Not authorized to update this task")]
    NotAuthorized,
    /// A creation payload is missing one of its required fields.
    #[error("Missing required fields")]
    MissingRequiredFields,
    /// A field in the payload failed validation.
    #[error(transparent)]
    Validation(#[from] TaskValidationError),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub struct TaskService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl TaskService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> TaskService {
        TaskService { db }
    }

    /// Creates a task owned by the caller.
    ///
    /// Title, description, due date and assignee are required; status and
    /// priority fall back to their defaults. All provided fields run through
    /// the same validators as updates, including the assignee existence
    /// check.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created task with its assignee summary, or
    /// an error otherwise.
    #[tracing::instrument(skip(self, request))]
    pub async fn create_task(
        &self,
        caller: &CurrentUser,
        request: &CreateTaskRequest,
    ) -> Result<TaskWithAssignee, TaskServiceError> {
        let (Some(raw_title), Some(raw_description), Some(raw_due_date), Some(raw_assigned_to)) = (
            &request.title,
            &request.description,
            &request.due_date,
            &request.assigned_to,
        ) else {
            return Err(TaskServiceError::MissingRequiredFields);
        };

        let title = validate::validate_title(raw_title)?;
        let description = validate::validate_description(raw_description)?;
        let status = match &request.status {
            Some(raw) => validate::validate_status(raw)?,
            None => TaskStatus::Todo,
        };
        let priority = match &request.priority {
            Some(raw) => validate::validate_priority(raw)?,
            None => 3,
        };
        let due_date = validate::validate_due_date(raw_due_date, Utc::now())?;
        let assigned_to = self.validate_assigned_to(raw_assigned_to).await?;

        let now = Utc::now();
        let active_model = task::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            title: ActiveValue::Set(title),
            description: ActiveValue::Set(description),
            status: ActiveValue::Set(status),
            priority: ActiveValue::Set(priority),
            due_date: ActiveValue::Set(due_date),
            assigned_to: ActiveValue::Set(assigned_to),
            created_by: ActiveValue::Set(caller.user_id),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        let created_model = active_model.insert(self.db).await?;

        self.with_assignee(Task::from(created_model)).await
    }

    /// Applies a partial update to a task on behalf of the caller.
    ///
    /// The pipeline loads the record, authorizes the caller (current
    /// assignee or admin), validates the provided fields in a fixed order
    /// (title, description, status, priority, due date, assignee), merges
    /// the validated values and persists them in a single write. The first
    /// invalid field aborts the whole update; nothing is persisted.
    ///
    /// An empty payload skips validation entirely and still performs one
    /// save, refreshing only the update timestamp.
    ///
    /// # Returns
    ///
    /// A `Result` containing the updated task with its assignee summary, or
    /// an error otherwise.
    #[tracing::instrument(skip(self, request))]
    pub async fn update_task(
        &self,
        task_id: Uuid,
        caller: &CurrentUser,
        request: &UpdateTaskRequest,
    ) -> Result<TaskWithAssignee, TaskServiceError> {
        let task_to_update = task::Entity::find_by_id(task_id)
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::TaskNotFound)?;

        if task_to_update.assigned_to != caller.user_id && !caller.is_admin() {
            return Err(TaskServiceError::NotAuthorized);
        }

        let mut active_model: task::ActiveModel = task_to_update.into();

        if let Some(raw) = &request.title {
            active_model.title = ActiveValue::Set(validate::validate_title(raw)?);
        }
        if let Some(raw) = &request.description {
            active_model.description = ActiveValue::Set(validate::validate_description(raw)?);
        }
        if let Some(raw) = &request.status {
            active_model.status = ActiveValue::Set(validate::validate_status(raw)?);
        }
        if let Some(raw) = &request.priority {
            active_model.priority = ActiveValue::Set(validate::validate_priority(raw)?);
        }
        if let Some(raw) = &request.due_date {
            active_model.due_date = ActiveValue::Set(validate::validate_due_date(raw, Utc::now())?);
        }
        if let Some(raw) = &request.assigned_to {
            active_model.assigned_to = ActiveValue::Set(self.validate_assigned_to(raw).await?);
        }

        active_model.updated_at = ActiveValue::Set(Utc::now());
        let updated_model = active_model.update(self.db).await?;

        self.with_assignee(Task::from(updated_model)).await
    }

    /// Retrieves one page of tasks matching the filter, newest first, with
    /// assignee and creator summaries resolved.
    ///
    /// # Arguments
    ///
    /// * `filter` - Optional status, priority and assignee constraints.
    /// * `page` - 1-based page number; values below 1 are clamped to 1.
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(
        &self,
        filter: &TaskFilter,
        page: u64,
    ) -> Result<TaskPage, TaskServiceError> {
        let page = page.max(1);

        let mut query = task::Entity::find();
        if let Some(status) = &filter.status {
            query = query.filter(task::Column::Status.eq(status.clone()));
        }
        if let Some(priority) = filter.priority {
            query = query.filter(task::Column::Priority.eq(priority));
        }
        if let Some(assigned_to) = filter.assigned_to {
            query = query.filter(task::Column::AssignedTo.eq(assigned_to));
        }

        let paginator = query
            .order_by_desc(task::Column::CreatedAt)
            .paginate(self.db, PAGE_SIZE);
        let total = paginator.num_items().await?;
        let pages = total.div_ceil(PAGE_SIZE);
        let models = paginator.fetch_page(page - 1).await?;

        let users = self.load_referenced_users(&models).await?;
        let tasks = models
            .into_iter()
            .map(|model| {
                let assignee = users.get(&model.assigned_to).cloned().map(Into::into);
                let creator = users.get(&model.created_by).map(Into::into);
                TaskListing {
                    task: Task::from(model),
                    assignee,
                    creator,
                }
            })
            .collect();

        Ok(TaskPage {
            tasks,
            total,
            pages,
            current_page: page,
        })
    }

    /// Deletes a task by its ID. Role checks happen at the API layer.
    ///
    /// # Returns
    ///
    /// A `Result` containing the deleted `Task` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task_by_id(&self, task_id: Uuid) -> Result<Task, TaskServiceError> {
        let task_to_delete = task::Entity::find_by_id(task_id)
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::TaskNotFound)?;

        let task_copy = Task::from(task_to_delete);
        task::Entity::delete_by_id(task_id).exec(self.db).await?;
        Ok(task_copy)
    }

    /// Validates an assignedTo value end to end: the identifier must be
    /// well-formed, then a fresh lookup must find the account. The lookup is
    /// skipped entirely for malformed identifiers.
    #[tracing::instrument(skip(self, value))]
    pub async fn validate_assigned_to(
        &self,
        value: &serde_json::Value,
    ) -> Result<Uuid, TaskServiceError> {
        let assignee_id = validate::validate_assignee_id(value)?;
        let assignee = user::Entity::find_by_id(assignee_id).one(self.db).await?;
        if assignee.is_none() {
            return Err(TaskValidationError::AssigneeNotFound.into());
        }
        Ok(assignee_id)
    }

    /// Resolves the assignee display summary for a task.
    async fn with_assignee(&self, task: Task) -> Result<TaskWithAssignee, TaskServiceError> {
        let assignee = user::Entity::find_by_id(task.assigned_to())
            .one(self.db)
            .await?
            .map(AssigneeSummary::from);
        Ok(TaskWithAssignee { task, assignee })
    }

    /// Batch-loads the accounts referenced by a page of tasks.
    async fn load_referenced_users(
        &self,
        models: &[task::Model],
    ) -> Result<HashMap<Uuid, user::Model>, TaskServiceError> {
        let mut user_ids: Vec<Uuid> = models
            .iter()
            .flat_map(|model| [model.assigned_to, model.created_by])
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let users = user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(self.db)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();
        Ok(users)
    }
}
