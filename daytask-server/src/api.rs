//! HTTP API: task routes, static bundle fallback, and server startup.
//!
//! Reads answer with JSON. Writes answer with `303 See Other` to `/` so that
//! plain HTML form posts land back on the page. Any storage failure is
//! returned as `500` with the raw error text as the body.
//!
//! Anything that is not a task route with the right method, including
//! `GET /addTask`, is looked up in the static bundle and gets `404` when
//! no such file exists.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::extract::{FromRequest, Query, Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use daytask_store::day::Clock;
use daytask_store::{StoreError, Task, TaskStore};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde::de::value::MapDeserializer;
use tower_http::services::ServeDir;
use tower_service::Service;

/// Shared state handed to every request handler.
pub struct AppState {
    /// Persistent task storage.
    pub store: TaskStore,
    /// Source of "today" for `GET /tasks`, read on every request.
    clock: Box<dyn Clock>,
}

impl AppState {
    /// Creates handler state over `store`, answering reads for the day that
    /// `clock` reports at request time.
    #[must_use]
    pub fn new(store: TaskStore, clock: impl Clock + 'static) -> Self {
        Self {
            store,
            clock: Box::new(clock),
        }
    }

    /// Day bucket served by `GET /tasks` right now.
    #[must_use]
    pub fn today(&self) -> String {
        self.clock.today()
    }
}

/// Errors surfaced to HTTP clients as `500 Internal Server Error`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking task running the store call panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Form body for add, toggle, and remove. Missing fields read as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TaskForm {
    /// Task text to create or match.
    pub description: String,
    /// Day bucket.
    pub day: String,
}

/// Form body for `POST /editTask`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditTaskForm {
    /// Current text to match.
    pub old_description: String,
    /// Replacement text.
    pub new_description: String,
    /// Day bucket.
    pub day: String,
}

/// Form fields read from both the URL query and a url-encoded body.
///
/// Body values win over query values with the same name. A missing or
/// non-form body is not an error: its fields simply read as absent, and
/// absent fields fall back to the target type's defaults.
#[derive(Debug)]
pub struct FormValues<T>(pub T);

impl<S, T> FromRequest<S> for FormValues<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = (StatusCode, String);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut values: HashMap<String, String> = Query::try_from_uri(req.uri())
            .map(|Query(query)| query)
            .unwrap_or_default();

        match Form::<HashMap<String, String>>::from_request(req, state).await {
            Ok(Form(body)) => values.extend(body),
            Err(rejection) => {
                tracing::debug!(reason = %rejection, "no form body, using query parameters only");
            }
        }

        let deserializer =
            MapDeserializer::<_, serde::de::value::Error>::new(values.into_iter());
        T::deserialize(deserializer)
            .map(Self)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
    }
}

/// Runs a synchronous store call on the blocking pool.
async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&TaskStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || op(&store)).await?;
    Ok(result?)
}

/// `GET /tasks`: every task in today's bucket.
async fn list_tasks(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Task>>, ApiError> {
    let day = state.today();
    tracing::debug!(day = %day, "listing tasks");
    let tasks = with_store(&state, move |store| store.list_by_day(&day)).await?;
    Ok(Json(tasks))
}

/// `POST /addTask`
async fn add_task(
    State(state): State<Arc<AppState>>,
    FormValues(form): FormValues<TaskForm>,
) -> Result<Redirect, ApiError> {
    let id = with_store(&state, move |store| store.add(&form.description, &form.day)).await?;
    tracing::info!(id, "task added");
    Ok(Redirect::to("/"))
}

/// `POST /toggleTask`
async fn toggle_task(
    State(state): State<Arc<AppState>>,
    FormValues(form): FormValues<TaskForm>,
) -> Result<Redirect, ApiError> {
    let affected = with_store(&state, move |store| {
        store.toggle_by_description_and_day(&form.description, &form.day)
    })
    .await?;
    tracing::info!(affected, "tasks toggled");
    Ok(Redirect::to("/"))
}

/// `POST /editTask`
async fn edit_task(
    State(state): State<Arc<AppState>>,
    FormValues(form): FormValues<EditTaskForm>,
) -> Result<Redirect, ApiError> {
    let affected = with_store(&state, move |store| {
        store.edit_by_description_and_day(&form.old_description, &form.new_description, &form.day)
    })
    .await?;
    tracing::info!(affected, "tasks edited");
    Ok(Redirect::to("/"))
}

/// `POST /removeTask`
async fn remove_task(
    State(state): State<Arc<AppState>>,
    FormValues(form): FormValues<TaskForm>,
) -> Result<Redirect, ApiError> {
    let affected = with_store(&state, move |store| {
        store.remove_by_description_and_day(&form.description, &form.day)
    })
    .await?;
    tracing::info!(affected, "tasks removed");
    Ok(Redirect::to("/"))
}

/// Serves `req` from the static bundle whatever its method. `HEAD` is kept
/// so no body is sent; every other method is looked up as a `GET`.
async fn serve_static(mut assets: ServeDir, mut req: Request) -> Response {
    if req.method() != Method::HEAD {
        *req.method_mut() = Method::GET;
    }
    match assets.call(req).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Builds the application router. Requests that match no task route, or
/// match one with the wrong method, are served from `static_dir`, with
/// `404` for anything missing.
pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    let assets = ServeDir::new(static_dir);
    let fallback = move |req: Request| serve_static(assets.clone(), req);

    Router::new()
        .route("/tasks", get(list_tasks))
        .route("/addTask", post(add_task))
        .route("/toggleTask", post(toggle_task))
        .route("/editTask", post(edit_task))
        .route("/removeTask", post(remove_task))
        .method_not_allowed_fallback(fallback.clone())
        .fallback(fallback)
        .with_state(state)
}

/// Starts the server on `addr` and returns the bound address and a join
/// handle. The server runs until the handle is aborted.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
    state: Arc<AppState>,
    static_dir: &Path,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), Box<dyn std::error::Error + Send + Sync>>
{
    start_server_with_shutdown(addr, state, static_dir, std::future::pending()).await
}

/// Starts the server and stops accepting connections once `shutdown`
/// resolves, letting in-flight requests finish.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_shutdown<F>(
    addr: &str,
    state: Arc<AppState>,
    static_dir: &Path,
    shutdown: F,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), Box<dyn std::error::Error + Send + Sync>>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = router(state, static_dir);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            tracing::error!(error = %e, "http server error");
        }
    });

    Ok((bound_addr, handle))
}
