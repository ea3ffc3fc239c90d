//! Local web interface: JSON API over the library, course tree and progress
//! store, plus raw lesson-file serving for the browser player.
//!
//! The server owns the single "current course" slot. Core scanning, caching
//! and reconciliation functions never read ambient state; this layer passes
//! the course explicitly and serializes access through one async mutex.

use axum::{
    body::Body,
    extract::{Path as AxumPath, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::cache;
use crate::config::Config;
use crate::db::Db;
use crate::error::{CoursetrackError, Result};
use crate::library;
use crate::model::Course;
use crate::progress;
use crate::scanner::{completion_stats, CompletionStats};

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Db>,
    config: Arc<Config>,
    current: Arc<Mutex<Option<Course>>>,
}

/// HTTP API server wrapper
pub struct ApiServer {
    state: AppState,
    allowed_origins: Vec<String>,
}

impl ApiServer {
    pub fn new(db: Db, config: Config) -> Self {
        let allowed_origins = config.http_server.allowed_origins.clone();
        Self {
            state: AppState {
                db: Arc::new(db),
                config: Arc::new(config),
                current: Arc::new(Mutex::new(None)),
            },
            allowed_origins,
        }
    }

    /// Run the HTTP server
    pub async fn run(&self, port: u16) -> Result<()> {
        let app = self.create_router();

        let addr = format!("127.0.0.1:{}", port);
        log::info!("Starting coursetrack HTTP server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            CoursetrackError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                format!("Failed to bind to {}: {}", addr, e),
            ))
        })?;

        axum::serve(listener, app).await.map_err(|e| {
            CoursetrackError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP server error: {}", e),
            ))
        })?;

        Ok(())
    }

    /// Create the axum router
    pub fn create_router(&self) -> Router {
        // Local single-user tool: allow any origin unless explicitly restricted
        let cors = if self.allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/api/library", get(list_library))
            .route("/api/tags", get(list_tags))
            .route("/api/courses/load", post(load_course))
            .route("/api/courses/current", get(current_course))
            .route("/api/progress", post(update_progress))
            .route("/api/cache/invalidate", post(invalidate_cache))
            .route("/files/*path", get(serve_file))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }
}

impl IntoResponse for CoursetrackError {
    fn into_response(self) -> Response {
        let status = match &self {
            CoursetrackError::InvalidPath(_) | CoursetrackError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            CoursetrackError::CourseNotLoaded => StatusCode::NOT_FOUND,
            CoursetrackError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("Request failed: {}", self);
        }

        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct LoadCourseRequest {
    path: String,
    #[serde(default)]
    force_rescan: bool,
}

#[derive(Debug, Deserialize)]
struct UpdateProgressRequest {
    lesson_path: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    progress_seconds: i64,
}

#[derive(Debug, Deserialize)]
struct InvalidateCacheRequest {
    path: String,
}

#[derive(Debug, Serialize)]
struct CourseResponse {
    course: Course,
    stats: CompletionStats,
}

async fn list_library(State(state): State<AppState>) -> Result<Json<Vec<library::LibraryItem>>> {
    let items = library::list(&state.db).await?;
    Ok(Json(items))
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let tags = library::all_tags(&state.db).await?;
    Ok(Json(tags))
}

async fn load_course(
    State(state): State<AppState>,
    Json(req): Json<LoadCourseRequest>,
) -> Result<Json<CourseResponse>> {
    let course_path = PathBuf::from(&req.path);
    let max_age = state.config.max_cache_age_hours();

    let course = cache::load_course_cached(&state.db, &course_path, req.force_rescan, max_age)
        .await?
        .ok_or_else(|| CoursetrackError::InvalidPath(req.path.clone()))?;

    library::update_last_accessed(&state.db, course.path.clone()).await?;

    let stats = completion_stats(&course.root_node);
    let response = CourseResponse { course: course.clone(), stats };

    *state.current.lock().await = Some(course);

    Ok(Json(response))
}

async fn current_course(State(state): State<AppState>) -> Result<Json<CourseResponse>> {
    let current = state.current.lock().await;
    let course = current.as_ref().ok_or(CoursetrackError::CourseNotLoaded)?;
    let stats = completion_stats(&course.root_node);
    Ok(Json(CourseResponse { course: course.clone(), stats }))
}

async fn update_progress(
    State(state): State<AppState>,
    Json(req): Json<UpdateProgressRequest>,
) -> Result<Json<CourseResponse>> {
    let mut current = state.current.lock().await;
    let course = current.as_mut().ok_or(CoursetrackError::CourseNotLoaded)?;

    let item = library::get_by_path(&state.db, course.path.clone())
        .await?
        .ok_or_else(|| CoursetrackError::InvalidInput(format!(
            "Course not registered in library: {}",
            course.path
        )))?;

    progress::update_lesson_progress(
        &state.db,
        item.id,
        course.path.clone(),
        req.lesson_path.clone(),
        req.completed,
        req.progress_seconds,
    )
    .await?;

    // Re-apply the full overlay so the in-memory tree matches the store
    let saved = progress::load_progress(&state.db, item.id).await?;
    progress::apply_progress_to_tree(course, &saved);
    let stats = completion_stats(&course.root_node);
    course.completion_percentage = stats.completion_percentage;

    Ok(Json(CourseResponse { course: course.clone(), stats }))
}

async fn invalidate_cache(
    State(state): State<AppState>,
    Json(req): Json<InvalidateCacheRequest>,
) -> Result<Json<serde_json::Value>> {
    let invalidated = cache::invalidate_for_path(&state.db, Path::new(&req.path)).await?;
    Ok(Json(serde_json::json!({ "invalidated": invalidated })))
}

async fn serve_file(
    State(state): State<AppState>,
    AxumPath(relative): AxumPath<String>,
    request: Request,
) -> Result<Response> {
    let root = {
        let current = state.current.lock().await;
        let course = current.as_ref().ok_or(CoursetrackError::CourseNotLoaded)?;
        PathBuf::from(&course.path)
    };

    let full_path = resolve_within_root(&root, &relative)?;

    let meta = tokio::fs::metadata(&full_path).await?;
    if !meta.is_file() {
        return Err(CoursetrackError::InvalidInput(format!(
            "Not a file: {}",
            relative
        )));
    }

    // Lesson files can be multi-gigabyte videos; ServeFile streams the body
    // and handles Range and conditional requests so players can seek.
    match ServeFile::new(&full_path).oneshot(request).await {
        Ok(response) => Ok(response.map(Body::new)),
        Err(err) => Err(CoursetrackError::Internal(format!(
            "Failed to serve {}: {}",
            relative, err
        ))),
    }
}

/// Join a client-supplied relative path onto the course root, rejecting
/// absolute paths and parent-directory components.
fn resolve_within_root(root: &Path, relative: &str) -> Result<PathBuf> {
    let rel = Path::new(relative);
    let escapes = rel.is_absolute()
        || rel
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(CoursetrackError::InvalidInput(format!(
            "Path escapes course root: {}",
            relative
        )));
    }
    Ok(root.join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use axum::http::{header, Request};
    use std::fs;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        let toml_str = format!(
            "[coursetrack]\ndb_path = \"{}\"\n",
            temp_dir.path().join("test.db").to_str().unwrap().replace('\\', "\\\\")
        );
        toml::from_str(&toml_str).unwrap()
    }

    async fn test_server(temp_dir: &TempDir) -> ApiServer {
        let config = test_config(temp_dir);
        let db = Db::new(config.db_path());
        db.with_connection(|conn| migrate::run_migrations(conn)).await.unwrap();
        ApiServer::new(db, config)
    }

    #[test]
    fn test_resolve_within_root_guards_traversal() {
        let root = Path::new("/course");
        assert!(resolve_within_root(root, "Module1/intro.mp4").is_ok());
        assert!(resolve_within_root(root, "../etc/passwd").is_err());
        assert!(resolve_within_root(root, "Module1/../../etc/passwd").is_err());
        assert!(resolve_within_root(root, "/etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_serve_file_streams_with_range_support() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(&temp_dir).await;

        let course_root = temp_dir.path().join("Course");
        fs::create_dir_all(course_root.join("Module1")).unwrap();
        fs::write(course_root.join("Module1/01-intro.mp4"), b"0123456789").unwrap();

        let body = serde_json::json!({ "path": course_root.to_str().unwrap() }).to_string();
        let response = server
            .create_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/courses/load")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Full fetch advertises range support and carries the guessed mime type
        let response = server
            .create_router()
            .oneshot(
                Request::builder()
                    .uri("/files/Module1/01-intro.mp4")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCEPT_RANGES).map(|v| v.as_bytes()),
            Some(&b"bytes"[..])
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"video/mp4"[..])
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"0123456789");

        // A bounded range comes back as 206 with just the requested slice
        let response = server
            .create_router()
            .oneshot(
                Request::builder()
                    .uri("/files/Module1/01-intro.mp4")
                    .header(header::RANGE, "bytes=2-5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE).map(|v| v.as_bytes()),
            Some(&b"bytes 2-5/10"[..])
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"2345");
    }

    #[tokio::test]
    async fn test_serve_file_missing_lesson_is_404() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(&temp_dir).await;

        let course_root = temp_dir.path().join("Course");
        fs::create_dir_all(course_root.join("Module1")).unwrap();
        fs::write(course_root.join("Module1/01-intro.mp4"), b"video").unwrap();

        let body = serde_json::json!({ "path": course_root.to_str().unwrap() }).to_string();
        server
            .create_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/courses/load")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = server
            .create_router()
            .oneshot(
                Request::builder()
                    .uri("/files/Module1/no-such-lesson.mp4")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_current_course_empty_slot_is_404() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(&temp_dir).await;
        let app = server.create_router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/courses/current")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_load_then_fetch_current_course() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(&temp_dir).await;

        let course_root = temp_dir.path().join("Course");
        fs::create_dir_all(course_root.join("Module1")).unwrap();
        fs::write(course_root.join("Module1/01-intro.mp4"), b"video").unwrap();

        let body = serde_json::json!({ "path": course_root.to_str().unwrap() }).to_string();
        let response = server
            .create_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/courses/load")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["course"]["name"], "Course");
        assert_eq!(parsed["stats"]["total_lessons"], 1);

        // The slot was set, so the follow-up read succeeds on the same router state
        let response = server
            .create_router()
            .oneshot(
                Request::builder()
                    .uri("/api/courses/current")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_load_missing_course_is_400() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(&temp_dir).await;

        let body = serde_json::json!({ "path": "/no/such/dir" }).to_string();
        let response = server
            .create_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/courses/load")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
