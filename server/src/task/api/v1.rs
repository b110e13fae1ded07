use crate::auth::CurrentUser;
use crate::entities::sea_orm_active_enums::TaskStatus;
use crate::task::{
    AssigneeSummary, CreateTaskRequest, CreatorSummary, TaskFilter, TaskListing, TaskPage,
    TaskService, TaskServiceError, TaskWithAssignee, UpdateTaskRequest,
};
use crate::web::AppState;
use crate::web::api::v1::ErrorResponse;
use axum::{
    Router,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{patch, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Assignee summary embedded in task responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct AssigneeJson {
    /// Unique identifier of the assignee
    id: Uuid,
    /// Display name of the assignee
    name: String,
    /// Email address of the assignee
    email: String,
}

impl From<AssigneeSummary> for AssigneeJson {
    fn from(summary: AssigneeSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            email: summary.email,
        }
    }
}

/// Creator summary embedded in task listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatorJson {
    /// Unique identifier of the creator
    id: Uuid,
    /// Display name of the creator
    name: String,
}

impl From<CreatorSummary> for CreatorJson {
    fn from(summary: CreatorSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
        }
    }
}

/// JSON representation of a Task for API responses. The assignee is
/// expanded to a display summary; the creator stays a plain identifier.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    /// Unique identifier of the task
    id: Uuid,
    /// Title of the task
    title: String,
    /// Description of the task
    description: String,
    /// Status of the task
    status: TaskStatus,
    /// Priority of the task, 1 to 5
    priority: i32,
    /// When the task is due
    due_date: DateTime<Utc>,
    /// The account the task is assigned to
    assigned_to: Option<AssigneeJson>,
    /// The account that created the task
    created_by: Uuid,
    /// When the task was created
    created_at: DateTime<Utc>,
    /// When the task was last updated
    updated_at: DateTime<Utc>,
}

impl From<TaskWithAssignee> for TaskJson {
    fn from(task_with_assignee: TaskWithAssignee) -> Self {
        let TaskWithAssignee { task, assignee } = task_with_assignee;
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().to_string(),
            status: task.status().clone(),
            priority: task.priority(),
            due_date: task.due_date(),
            assigned_to: assignee.map(AssigneeJson::from),
            created_by: task.created_by(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// JSON representation of a task in listings, with both the assignee and
/// the creator expanded.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskListingJson {
    /// Unique identifier of the task
    id: Uuid,
    /// Title of the task
    title: String,
    /// Description of the task
    description: String,
    /// Status of the task
    status: TaskStatus,
    /// Priority of the task, 1 to 5
    priority: i32,
    /// When the task is due
    due_date: DateTime<Utc>,
    /// The account the task is assigned to
    assigned_to: Option<AssigneeJson>,
    /// The account that created the task
    created_by: Option<CreatorJson>,
    /// When the task was created
    created_at: DateTime<Utc>,
    /// When the task was last updated
    updated_at: DateTime<Utc>,
}

impl From<TaskListing> for TaskListingJson {
    fn from(listing: TaskListing) -> Self {
        let TaskListing {
            task,
            assignee,
            creator,
        } = listing;
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().to_string(),
            status: task.status().clone(),
            priority: task.priority(),
            due_date: task.due_date(),
            assigned_to: assignee.map(AssigneeJson::from),
            created_by: creator.map(CreatorJson::from),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Pagination counters for task listings.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationJson {
    /// Total number of tasks matching the filter
    total: u64,
    /// Total number of pages
    pages: u64,
    /// The page carried in this response
    current_page: u64,
}

/// API response for listing tasks.
#[derive(Debug, Serialize, ToSchema)]
pub struct TasksResponse {
    /// One page of tasks
    tasks: Vec<TaskListingJson>,
    /// Pagination counters
    pagination: PaginationJson,
}

impl From<TaskPage> for TasksResponse {
    fn from(page: TaskPage) -> Self {
        Self {
            tasks: page.tasks.into_iter().map(TaskListingJson::from).collect(),
            pagination: PaginationJson {
                total: page.total,
                pages: page.pages,
                current_page: page.current_page,
            },
        }
    }
}

/// Query parameters for filtering task listings.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TasksQuery {
    /// Optional status to filter tasks by
    #[serde(default)]
    status: Option<TaskStatus>,
    /// Optional priority to filter tasks by
    #[serde(default)]
    priority: Option<i32>,
    /// Pass "me" to only list tasks assigned to the caller
    #[serde(default, rename = "assignedTo")]
    assigned_to: Option<String>,
    /// 1-based page number
    #[serde(default)]
    page: Option<u64>,
}

/// JSON response for a successful deletion.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteTaskResponse {
    /// Human-readable confirmation
    message: String,
}

/// Handler for POST /api/tasks - Creates a task owned by the caller.
#[tracing::instrument(skip(state, request))]
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskJson>), (StatusCode, Json<ErrorResponse>)> {
    let service = TaskService::new(&state.db);
    match service.create_task(&current_user, &request).await {
        Ok(created) => Ok((StatusCode::CREATED, Json(TaskJson::from(created)))),
        Err(err @ (TaskServiceError::MissingRequiredFields | TaskServiceError::Validation(_))) => {
            Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(err.to_string())),
            ))
        }
        Err(err) => {
            tracing::error!("Failed to create task: {}", err);
            Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Failed to create task".to_string())),
            ))
        }
    }
}

/// Handler for GET /api/tasks - Returns one page of tasks in JSON format.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(
        ("status" = Option<TaskStatus>, Query, description = "Optional status to filter tasks by"),
        ("priority" = Option<i32>, Query, description = "Optional priority to filter tasks by"),
        ("assignedTo" = Option<String>, Query, description = "Pass \"me\" to only list tasks assigned to the caller"),
        ("page" = Option<u64>, Query, description = "1-based page number")
    ),
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = TasksResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<TasksQuery>,
) -> Result<Json<TasksResponse>, (StatusCode, Json<ErrorResponse>)> {
    let filter = TaskFilter {
        status: query.status,
        priority: query.priority,
        assigned_to: (query.assigned_to.as_deref() == Some("me")).then_some(current_user.user_id),
    };

    let service = TaskService::new(&state.db);
    match service.list_tasks(&filter, query.page.unwrap_or(1)).await {
        Ok(page) => Ok(Json(TasksResponse::from(page))),
        Err(err) => {
            tracing::error!("Failed to list tasks: {}", err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Server error".to_string())),
            ))
        }
    }
}

/// Handler for PATCH /api/tasks/{id} - Applies a validated partial update.
#[tracing::instrument(skip(state, request))]
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}",
    params(
        ("id" = Uuid, Path, description = "Identifier of the task to update")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskJson),
        (status = 400, description = "A field failed validation or the store rejected the write", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller is neither the assignee nor an admin", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<TaskJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = TaskService::new(&state.db);
    match service.update_task(task_id, &current_user, &request).await {
        Ok(updated) => Ok(Json(TaskJson::from(updated))),
        Err(err) => Err(update_error_response(err)),
    }
}

/// Maps update-pipeline failures onto their HTTP status classes.
fn update_error_response(err: TaskServiceError) -> (StatusCode, Json<ErrorResponse>) {
    let (status_code, message) = match &err {
        TaskServiceError::TaskNotFound => (StatusCode::NOT_FOUND, err.to_string()),
        TaskServiceError::NotAuthorized => (StatusCode::FORBIDDEN, err.to_string()),
        TaskServiceError::MissingRequiredFields | TaskServiceError::Validation(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        TaskServiceError::Database(db_err) => {
            tracing::error!("Failed to update task: {}", db_err);
            let message = db_err.to_string();
            let message = if message.is_empty() {
                "Failed to update task".to_string()
            } else {
                message
            };
            (StatusCode::BAD_REQUEST, message)
        }
    };
    (status_code, Json(ErrorResponse::new(message)))
}

/// Handler for DELETE /api/tasks/{id} - Deletes a task. Admin only.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(
        ("id" = Uuid, Path, description = "Identifier of the task to delete")
    ),
    responses(
        (status = 200, description = "Task deleted", body = DeleteTaskResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<DeleteTaskResponse>, (StatusCode, Json<ErrorResponse>)> {
    if !current_user.is_admin() {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("Access denied".to_string())),
        ));
    }

    let service = TaskService::new(&state.db);
    match service.delete_task_by_id(task_id).await {
        Ok(_) => Ok(Json(DeleteTaskResponse {
            message: "Task deleted successfully".to_string(),
        })),
        Err(TaskServiceError::TaskNotFound) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Task not found".to_string())),
        )),
        Err(err) => {
            tracing::error!("Failed to delete task: {}", err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Server error".to_string())),
            ))
        }
    }
}

/// Creates the tasks API router. All routes expect an authenticated caller;
/// deletion additionally requires the admin role.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/tasks",
            post(create_task_handler).get(list_tasks_handler),
        )
        .route(
            "/tasks/{id}",
            patch(update_task_handler).delete(delete_task_handler),
        )
        .with_state(state)
}
