//! Integration tests for the HTTP API.
//!
//! Starts the server in-process on an OS-assigned port with a temp
//! database and static directory, then drives it with `reqwest`.
//! Redirects are not followed so the `303` responses can be checked.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;

use daytask_server::api::{self, AppState};
use daytask_store::TaskStore;
use daytask_store::day::FixedClock;
use reqwest::StatusCode;
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

struct TestServer {
    addr: SocketAddr,
    store: TaskStore,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
    _dir: tempfile::TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("send form")
    }

    async fn get_tasks(&self) -> Value {
        let response = self
            .client
            .get(self.url("/tasks"))
            .send()
            .await
            .expect("send get");
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.expect("json body")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Starts a server whose `GET /tasks` always answers for `today`.
async fn start(today: &str) -> TestServer {
    let dir = tempfile::tempdir().expect("temp dir");
    let static_dir = dir.path().join("build");
    std::fs::create_dir_all(static_dir.join("static")).unwrap();
    std::fs::write(static_dir.join("index.html"), "<h1>Todo List</h1>").unwrap();
    std::fs::write(static_dir.join("static").join("app.js"), "console.log(1)").unwrap();

    let store = TaskStore::open(dir.path().join("tasks.db")).expect("open store");
    let state = Arc::new(AppState::new(store.clone(), FixedClock::new(today)));
    let (addr, handle) = api::start_server("127.0.0.1:0", state, &static_dir)
        .await
        .expect("start server");

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestServer {
        addr,
        store,
        client,
        handle,
        _dir: dir,
    }
}

fn assert_redirect_home(response: &reqwest::Response) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/")
    );
}

// --- GET /tasks ---

#[tokio::test]
async fn empty_day_returns_empty_array() {
    let server = start("Sunday").await;
    assert_eq!(server.get_tasks().await, json!([]));
}

#[tokio::test]
async fn tasks_are_listed_without_day_field() {
    let server = start("Monday").await;
    let id = server.store.add("Buy milk", "Monday").unwrap();
    server.store.add("Other day", "Tuesday").unwrap();

    assert_eq!(
        server.get_tasks().await,
        json!([{ "id": id, "description": "Buy milk", "done": false }])
    );
}

#[tokio::test]
async fn query_parameters_do_not_pick_the_day() {
    let server = start("Monday").await;
    server.store.add("Tuesday only", "Tuesday").unwrap();

    let response = server
        .client
        .get(server.url("/tasks?day=Tuesday"))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!([]));
}

// --- Writes ---

#[tokio::test]
async fn add_task_redirects_and_persists() {
    let server = start("Monday").await;
    let response = server
        .post_form("/addTask", &[("description", "Water plants"), ("day", "Monday")])
        .await;
    assert_redirect_home(&response);

    let tasks = server.get_tasks().await;
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["description"], "Water plants");
    assert_eq!(tasks[0]["done"], false);
    assert!(tasks[0]["id"].as_i64().is_some());
}

#[tokio::test]
async fn add_task_for_another_day_is_not_listed_today() {
    let server = start("Monday").await;
    let response = server
        .post_form("/addTask", &[("description", "Later"), ("day", "Friday")])
        .await;
    assert_redirect_home(&response);

    assert_eq!(server.get_tasks().await, json!([]));
    assert_eq!(server.store.list_by_day("Friday").unwrap().len(), 1);
}

#[tokio::test]
async fn toggle_flips_every_duplicate() {
    let server = start("Monday").await;
    for _ in 0..2 {
        server
            .post_form("/addTask", &[("description", "Buy milk"), ("day", "Monday")])
            .await;
    }

    let response = server
        .post_form("/toggleTask", &[("description", "Buy milk"), ("day", "Monday")])
        .await;
    assert_redirect_home(&response);

    let tasks = server.get_tasks().await;
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t["done"] == true && t["description"] == "Buy milk"));
}

#[tokio::test]
async fn toggle_unknown_task_still_redirects() {
    let server = start("Monday").await;
    let response = server
        .post_form("/toggleTask", &[("description", "ghost"), ("day", "Monday")])
        .await;
    assert_redirect_home(&response);
}

#[tokio::test]
async fn edit_renames_by_old_description() {
    let server = start("Monday").await;
    server.store.add("Gym", "Monday").unwrap();
    server.store.add("Gym", "Tuesday").unwrap();

    let response = server
        .post_form(
            "/editTask",
            &[
                ("oldDescription", "Gym"),
                ("newDescription", "Swim"),
                ("day", "Monday"),
            ],
        )
        .await;
    assert_redirect_home(&response);

    let tasks = server.get_tasks().await;
    assert_eq!(tasks[0]["description"], "Swim");
    assert_eq!(server.store.list_by_day("Tuesday").unwrap()[0].description, "Gym");
}

#[tokio::test]
async fn remove_deletes_matching_tasks() {
    let server = start("Monday").await;
    server.store.add("Trash", "Monday").unwrap();
    server.store.add("Keep", "Monday").unwrap();

    let response = server
        .post_form("/removeTask", &[("description", "Trash"), ("day", "Monday")])
        .await;
    assert_redirect_home(&response);

    let tasks = server.get_tasks().await;
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["description"], "Keep");
}

#[tokio::test]
async fn missing_form_fields_are_empty_strings() {
    let server = start("Monday").await;
    let response = server.post_form("/addTask", &[("description", "No day")]).await;
    assert_redirect_home(&response);

    let tasks = server.store.list_by_day("").unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].description, "No day");
}

#[tokio::test]
async fn add_task_from_query_without_body() {
    let server = start("Monday").await;
    let response = server
        .client
        .post(server.url("/addTask?description=q&day=Monday"))
        .send()
        .await
        .unwrap();
    assert_redirect_home(&response);

    let tasks = server.get_tasks().await;
    assert_eq!(tasks[0]["description"], "q");
}

#[tokio::test]
async fn json_body_is_not_rejected() {
    let server = start("Monday").await;
    let response = server
        .client
        .post(server.url("/addTask?description=q&day=Monday"))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(r#"{"description":"from json","day":"Monday"}"#)
        .send()
        .await
        .unwrap();
    assert_redirect_home(&response);

    let tasks = server.get_tasks().await;
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["description"], "q");
}

#[tokio::test]
async fn bodyless_post_uses_empty_fields() {
    let server = start("Monday").await;
    let response = server
        .client
        .post(server.url("/removeTask"))
        .send()
        .await
        .unwrap();
    assert_redirect_home(&response);
}

// --- Failures ---

#[tokio::test]
async fn storage_failure_returns_500_with_raw_text() {
    let server = start("Monday").await;
    rusqlite::Connection::open(server.store.path())
        .unwrap()
        .execute_batch("DROP TABLE tasks;")
        .unwrap();

    let response = server.client.get(server.url("/tasks")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await.unwrap().contains("no such table: tasks"));

    let response = server
        .post_form("/addTask", &[("description", "x"), ("day", "Monday")])
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await.unwrap().contains("no such table: tasks"));
}

// --- Static bundle ---

#[tokio::test]
async fn root_serves_index_html() {
    let server = start("Monday").await;
    let response = server.client.get(server.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "<h1>Todo List</h1>");
}

#[tokio::test]
async fn nested_static_file_is_served() {
    let server = start("Monday").await;
    let response = server
        .client
        .get(server.url("/static/app.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "console.log(1)");
}

#[tokio::test]
async fn missing_static_file_is_404() {
    let server = start("Monday").await;
    let response = server
        .client
        .get(server.url("/nope.css"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn task_route_with_wrong_method_falls_through_to_static() {
    let server = start("Monday").await;

    let response = server.client.get(server.url("/addTask")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server.client.post(server.url("/tasks")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn static_file_is_served_for_any_method() {
    let server = start("Monday").await;
    let response = server
        .client
        .post(server.url("/index.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "<h1>Todo List</h1>");
}

#[tokio::test]
async fn head_on_static_file_has_no_body() {
    let server = start("Monday").await;
    let response = server
        .client
        .head(server.url("/static/app.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().is_empty());
}

// --- Shutdown ---

#[tokio::test]
async fn graceful_shutdown_stops_server() {
    let dir = tempfile::tempdir().unwrap();
    let store = TaskStore::open(dir.path().join("tasks.db")).unwrap();
    let state = Arc::new(AppState::new(store, FixedClock::new("Monday")));
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let (addr, handle) = api::start_server_with_shutdown("127.0.0.1:0", state, dir.path(), async move {
        let _ = rx.await;
    })
    .await
    .unwrap();

    let response = reqwest::get(format!("http://{addr}/tasks")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "[]");

    tx.send(()).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
}
