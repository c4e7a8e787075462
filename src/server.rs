use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Local;
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;

use crate::error::{TaskError, TaskResult};
use crate::export;
use crate::task::{parse_due, Priority};
use crate::tracker::Tracker;
use crate::view::{self, View};

#[derive(Clone)]
pub struct AppState {
    tracker: Arc<Mutex<Tracker>>,
    export_path: PathBuf,
}

impl AppState {
    pub fn new(tracker: Tracker, export_path: PathBuf) -> Self {
        info!("Serving tasks from {:?}", tracker.store().path);
        Self {
            tracker: Arc::new(Mutex::new(tracker)),
            export_path,
        }
    }
}

#[derive(Deserialize)]
struct AddTaskRequest {
    description: String,
    due: String,
    #[serde(default)]
    priority: Option<String>,
}

enum ApiError {
    Task(TaskError),
    Internal(String),
}

impl From<TaskError> for ApiError {
    fn from(e: TaskError) -> Self {
        Self::Task(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Task(e) if e.is_user_error() => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Task(e) if e.is_not_found() => (StatusCode::NOT_FOUND, e.to_string()),
            Self::Task(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        warn!("Request failed: {}", message);
        let body = json!({"status": "error", "message": message});
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

pub fn router(state: AppState, ui_dir: PathBuf) -> Router {
    Router::new()
        .route("/api/view", get(get_view))
        .route("/api/tasks", post(add_task))
        .route("/api/tasks/{task_id}/toggle", post(toggle_task))
        .route("/api/tasks/{task_id}", delete(delete_task))
        .route("/api/positions/{position}", delete(delete_position))
        .route("/api/export", post(export_tasks))
        .with_state(state)
        .fallback_service(ServeDir::new(ui_dir))
}

pub async fn start_server(state: AppState, port: u16, ui_dir: PathBuf) -> Result<()> {
    let app = router(state, ui_dir);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("FocusFlow web UI listening on {}", addr);
    println!("🧠 FocusFlow is running at: http://localhost:{}", port);
    axum::serve(listener, app).await.context("Server stopped")?;
    Ok(())
}

async fn get_view(State(state): State<AppState>, Query(query): Query<view::Query>) -> Json<View> {
    let tracker = state.tracker.lock().await;
    Json(view::render(tracker.tasks(), &query, Local::now().date_naive()))
}

/// Runs `f` on the blocking pool, since every mutation writes the store file.
async fn with_tracker<T, F>(state: &AppState, f: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut Tracker) -> TaskResult<T> + Send + 'static,
{
    let mut tracker = state.tracker.clone().lock_owned().await;
    tokio::task::spawn_blocking(move || f(&mut tracker))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

async fn add_task(
    State(state): State<AppState>,
    Json(req): Json<AddTaskRequest>,
) -> ApiResult<Value> {
    let due = parse_due(&req.due)?;
    let priority = match req.priority.as_deref() {
        Some(p) => p.parse::<Priority>()?,
        None => Priority::default(),
    };
    let task = with_tracker(&state, move |t| t.add(&req.description, due, priority)).await?;
    Ok(Json(json!({"status": "success", "task": task})))
}

async fn toggle_task(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<Value> {
    let done = with_tracker(&state, move |t| t.toggle_done(&task_id).map(|task| task.done)).await?;
    Ok(Json(json!({"status": "success", "done": done})))
}

async fn delete_task(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<Value> {
    let removed = with_tracker(&state, move |t| t.delete(&task_id)).await?;
    Ok(Json(json!({"status": "success", "deleted": removed.description})))
}

/// `position` is 1-based, as shown in the delete selector.
async fn delete_position(
    State(state): State<AppState>,
    Path(position): Path<usize>,
) -> ApiResult<Value> {
    let index = position
        .checked_sub(1)
        .ok_or_else(|| TaskError::Validation("task positions start at 1".to_string()))?;
    let removed = with_tracker(&state, move |t| t.delete_at(index)).await?;
    Ok(Json(json!({"status": "success", "deleted": removed.description})))
}

async fn export_tasks(State(state): State<AppState>) -> ApiResult<Value> {
    let export_path = state.export_path.clone();
    let path = with_tracker(&state, move |t| export::export_to(t.tasks(), &export_path)).await?;
    Ok(Json(json!({"status": "success", "path": path.to_string_lossy()})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    fn app(dir: &tempfile::TempDir) -> Router {
        let tracker = Tracker::open(Store::new(dir.path().join("tasks.json"))).unwrap();
        let state = AppState::new(tracker, dir.path().join("exported_tasks.csv"));
        router(state, dir.path().join("ui"))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn add(app: &Router, description: &str, due: &str, priority: &str) -> Value {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/tasks",
            Some(json!({"description": description, "due": due, "priority": priority})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["task"].clone()
    }

    #[tokio::test]
    async fn add_then_view_sorted_by_priority() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        add(&app, "low one", "2099-01-01", "Low").await;
        add(&app, "high one", "2099-01-01", "High").await;

        let (status, view) = call(&app, Method::GET, "/api/view?sort=Priority", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["rows"][0]["description"], "high one");
        assert_eq!(view["rows"][0]["index"], 1);
        assert_eq!(view["rows"][0]["due_status"], "Upcoming");
        assert_eq!(view["delete_options"][0]["label"], "1. low one");
    }

    #[tokio::test]
    async fn blank_description_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/tasks",
            Some(json!({"description": "  ", "due": "2099-01-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(!dir.path().join("tasks.json").exists());
    }

    #[tokio::test]
    async fn bad_due_date_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/tasks",
            Some(json!({"description": "x", "due": "tomorrow"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn toggle_and_progress() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let task = add(&app, "a", "2099-01-01", "Medium").await;
        add(&app, "b", "2099-01-01", "Medium").await;
        let id = task["id"].as_str().unwrap();

        let (status, body) = call(&app, Method::POST, &format!("/api/tasks/{}/toggle", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["done"], true);

        let (_, view) = call(&app, Method::GET, "/api/view?pending=true", None).await;
        assert_eq!(view["progress"], 50.0);
        assert_eq!(view["rows"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_task_and_position_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        add(&app, "a", "2099-01-01", "Low").await;

        let (status, _) = call(&app, Method::POST, "/api/tasks/missing/toggle", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, Method::DELETE, "/api/positions/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, Method::DELETE, "/api/positions/0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_by_position_and_id() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        add(&app, "a", "2099-01-01", "Low").await;
        let b = add(&app, "b", "2099-01-01", "Low").await;
        add(&app, "c", "2099-01-01", "Low").await;

        let (status, body) = call(&app, Method::DELETE, "/api/positions/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], "a");

        let uri = format!("/api/tasks/{}", b["id"].as_str().unwrap());
        let (_, body) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(body["deleted"], "b");

        let (_, view) = call(&app, Method::GET, "/api/view", None).await;
        assert_eq!(view["total"], 1);
        assert_eq!(view["rows"][0]["index"], 0);
    }

    #[tokio::test]
    async fn failed_export_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("exported_tasks.csv")).unwrap();
        let app = app(&dir);
        add(&app, "a", "2099-01-01", "Low").await;

        let (status, body) = call(&app, Method::POST, "/api/export", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert!(!dir.path().join("exported_tasks.csv.tmp").exists());
        let (_, view) = call(&app, Method::GET, "/api/view", None).await;
        assert_eq!(view["total"], 1);
    }

    #[tokio::test]
    async fn export_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        add(&app, "a", "2099-01-01", "Low").await;
        let (status, body) = call(&app, Method::POST, "/api/export", None).await;
        assert_eq!(status, StatusCode::OK);
        let path = dir.path().join("exported_tasks.csv");
        assert_eq!(body["path"], path.to_string_lossy().as_ref());
        assert!(path.exists());
    }
}
