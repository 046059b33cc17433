use askama::Template;
use axum::{
    Form, Json, Router,
    extract::{FromRequestParts, Path, Query, State, rejection::PathRejection},
    http::{HeaderMap, StatusCode, request::Parts},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

use crate::clock::Clock;
use crate::task::{
    Task, TaskBoard, TaskFormInput, TaskFormView, TaskQuery, TaskService, TaskServiceError,
};
use crate::web::ErrorTemplate;

const REQUESTED_WITH_HEADER: &str = "x-requested-with";
const XML_HTTP_REQUEST: &str = "XMLHttpRequest";
const LIST_PATH: &str = "/";

#[derive(Clone)]
pub struct TaskState {
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub clock: Arc<dyn Clock>,
}

impl TaskState {
    fn service(&self) -> TaskService<'_> {
        TaskService::new(&self.db, self.clock.as_ref())
    }
}

/// Whether the request came from page navigation or from client-side script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    /// Script request expecting JSON with an optional HTML fragment.
    Partial,
    /// Regular browser navigation expecting pages and redirects.
    Navigation,
}

impl RequestOrigin {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match headers.get(REQUESTED_WITH_HEADER) {
            Some(value) if value == XML_HTTP_REQUEST => RequestOrigin::Partial,
            _ => RequestOrigin::Navigation,
        }
    }
}

impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestOrigin::from_headers(&parts.headers))
    }
}

/// Task id taken from the path. Ids that do not parse refer to no task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(pub u32);

impl<S> FromRequestParts<S> for TaskId
where
    S: Send + Sync,
{
    type Rejection = TaskError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<u32>::from_request_parts(parts, state).await?;
        Ok(TaskId(id))
    }
}

/// JSON body returned to script requests.
#[derive(Debug, Serialize)]
pub struct PartialResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<String>,
}

impl PartialResponse {
    pub fn success() -> Self {
        Self {
            status: "success",
            html: None,
        }
    }

    pub fn error(html: String) -> Self {
        Self {
            status: "error",
            html: Some(html),
        }
    }
}

/// Result of handling a submitted task form.
#[derive(Debug)]
enum Submission {
    Saved,
    Rejected(TaskFormView),
}

/// Custom error type for task handler operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Represents an error during template rendering.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    /// Represents a task service error.
    #[error("Task service error: {0}")]
    Service(#[from] TaskServiceError),
    /// Represents a task id in the path that is not a number in range.
    #[error("Invalid task id: {0}")]
    InvalidId(#[from] PathRejection),
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let (status_code, user_facing_error_message) = match &self {
            TaskError::Service(TaskServiceError::TaskNotFound(_)) | TaskError::InvalidId(_) => (
                StatusCode::NOT_FOUND,
                "The task you are looking for does not exist.",
            ),
            _ => {
                tracing::error!("Task request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred while processing your request. Please try again later.",
                )
            }
        };

        ErrorTemplate::response(status_code, user_facing_error_message)
    }
}

#[derive(Template)]
#[template(path = "tasks/list.html")]
struct TaskListTemplate {
    board: TaskBoard,
    search: String,
    filter: &'static str,
    form: TaskFormView,
}

#[derive(Template)]
#[template(path = "tasks/form.html")]
struct TaskFormTemplate {
    form: TaskFormView,
}

impl TaskFormTemplate {
    pub fn new(form: TaskFormView) -> Self {
        Self { form }
    }
}

#[derive(Template)]
#[template(path = "tasks/form_page.html")]
struct TaskFormPageTemplate {
    form: TaskFormView,
}

impl TaskFormPageTemplate {
    pub fn new(form: TaskFormView) -> Self {
        Self { form }
    }
}

#[derive(Template)]
#[template(path = "tasks/confirm_delete.html")]
struct ConfirmDeleteTemplate {
    task: Task,
}

/// Renders a form as a fragment for script requests or as a full page otherwise.
fn render_form(origin: RequestOrigin, form: TaskFormView) -> Result<Html<String>, TaskError> {
    let rendered = match origin {
        RequestOrigin::Partial => TaskFormTemplate::new(form).render()?,
        RequestOrigin::Navigation => TaskFormPageTemplate::new(form).render()?,
    };
    Ok(Html(rendered))
}

/// Acknowledges a successful mutation.
fn respond_success(origin: RequestOrigin) -> Response {
    match origin {
        RequestOrigin::Partial => Json(PartialResponse::success()).into_response(),
        RequestOrigin::Navigation => Redirect::to(LIST_PATH).into_response(),
    }
}

fn respond_to_submission(
    origin: RequestOrigin,
    submission: Submission,
) -> Result<Response, TaskError> {
    match (origin, submission) {
        (_, Submission::Saved) => Ok(respond_success(origin)),
        (RequestOrigin::Partial, Submission::Rejected(form)) => {
            let html = TaskFormTemplate::new(form).render()?;
            Ok((StatusCode::BAD_REQUEST, Json(PartialResponse::error(html))).into_response())
        }
        (RequestOrigin::Navigation, Submission::Rejected(form)) => {
            let html = TaskFormPageTemplate::new(form).render()?;
            Ok(Html(html).into_response())
        }
    }
}

/// Handler for GET / that renders the grouped task list.
#[tracing::instrument(skip(state))]
async fn list_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<TaskQuery>,
) -> Result<Html<String>, TaskError> {
    let now = state.clock.now();
    let tasks = state.service().get_all_tasks().await?;
    let template = TaskListTemplate {
        search: query.search.clone().unwrap_or_default(),
        filter: query.task_filter().keyword(),
        board: TaskBoard::build(tasks, &query, now),
        form: TaskFormView::for_create(now),
    };
    template.render().map(Html).map_err(TaskError::from)
}

/// Handler for serving the empty task form.
#[tracing::instrument(skip(state))]
async fn create_form_handler(
    State(state): State<Arc<TaskState>>,
    origin: RequestOrigin,
) -> Result<Html<String>, TaskError> {
    render_form(origin, TaskFormView::for_create(state.clock.now()))
}

/// Handler for creating a task via POST request.
#[tracing::instrument(skip(state))]
async fn create_handler(
    State(state): State<Arc<TaskState>>,
    origin: RequestOrigin,
    Form(input): Form<TaskFormInput>,
) -> Result<Response, TaskError> {
    let submission = match input.validate(state.clock.now()) {
        Ok(valid) => {
            state.service().create_task(valid).await?;
            Submission::Saved
        }
        Err(errors) => {
            tracing::info!(
                "Rejected new task: invalid {:?}",
                errors.fields().collect::<Vec<_>>()
            );
            let form = TaskFormView::rejected("/create".to_string(), &input, &errors);
            Submission::Rejected(form)
        }
    };
    respond_to_submission(origin, submission)
}

/// Handler for serving the edit form of an existing task.
#[tracing::instrument(skip(state))]
async fn edit_form_handler(
    State(state): State<Arc<TaskState>>,
    origin: RequestOrigin,
    TaskId(id): TaskId,
) -> Result<Html<String>, TaskError> {
    let task = state.service().get_task_by_id(id).await?;
    render_form(origin, TaskFormView::for_edit(&task))
}

/// Handler for updating a task via POST request.
#[tracing::instrument(skip(state))]
async fn update_handler(
    State(state): State<Arc<TaskState>>,
    origin: RequestOrigin,
    TaskId(id): TaskId,
    Form(input): Form<TaskFormInput>,
) -> Result<Response, TaskError> {
    let service = state.service();
    let task = service.get_task_by_id(id).await?;

    let submission = match input.validate(state.clock.now()) {
        Ok(valid) => {
            service.update_task_by_id(task.id(), valid).await?;
            Submission::Saved
        }
        Err(errors) => {
            tracing::info!(
                "Rejected edit of task {}: invalid {:?}",
                id,
                errors.fields().collect::<Vec<_>>()
            );
            let form = TaskFormView::rejected(format!("/update/{}", id), &input, &errors);
            Submission::Rejected(form)
        }
    };
    respond_to_submission(origin, submission)
}

/// Handler for GET /delete/{id} that asks for confirmation.
#[tracing::instrument(skip(state))]
async fn delete_confirm_handler(
    State(state): State<Arc<TaskState>>,
    TaskId(id): TaskId,
) -> Result<Html<String>, TaskError> {
    let task = state.service().get_task_by_id(id).await?;
    let template = ConfirmDeleteTemplate { task };
    template.render().map(Html).map_err(TaskError::from)
}

/// Handler for deleting a task via POST request.
#[tracing::instrument(skip(state))]
async fn delete_handler(
    State(state): State<Arc<TaskState>>,
    origin: RequestOrigin,
    TaskId(id): TaskId,
) -> Result<Response, TaskError> {
    state.service().delete_task_by_id(id).await?;
    Ok(respond_success(origin))
}

/// Handler for flipping a task between pending and resolved.
#[tracing::instrument(skip(state))]
async fn toggle_handler(
    State(state): State<Arc<TaskState>>,
    TaskId(id): TaskId,
) -> Result<Redirect, TaskError> {
    state.service().toggle_task_by_id(id).await?;
    Ok(Redirect::to(LIST_PATH))
}

/// Creates and returns the task router with all task-related routes.
pub fn create_task_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route(LIST_PATH, get(list_handler))
        .route("/create", get(create_form_handler).post(create_handler))
        .route("/update/{id}", get(edit_form_handler).post(update_handler))
        .route(
            "/delete/{id}",
            get(delete_confirm_handler).post(delete_handler),
        )
        .route("/toggle/{id}", get(toggle_handler).post(toggle_handler))
        .with_state(state)
}
