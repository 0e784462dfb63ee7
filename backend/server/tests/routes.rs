use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use server::{
    auth::{SessionIdentity, session_key},
    build_router,
    config::Config,
    database::KvStore,
    memory::MemoryStore,
    state::State,
};
use tokio::net::TcpListener;

struct TestApp {
    base: String,
    client: Client,
    store: Arc<MemoryStore>,
    sessions: Arc<MemoryStore>,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn save(&self, token: Option<&str>, body: &Value) -> reqwest::Response {
        let mut request = self.client.post(self.url("/api/projects/save")).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap()
    }

    async fn get(&self, token: Option<&str>, path: &str) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap()
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(Config::local()).await
}

async fn spawn_app_with(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::default());
    let sessions = Arc::new(MemoryStore::default());
    sessions
        .insert(session_key("alice-token"), json!({ "uuid": "alice" }))
        .await;
    sessions
        .insert(session_key("bob-token"), json!({ "uuid": "bob" }))
        .await;

    let state = State::from_parts(
        config,
        store.clone(),
        Arc::new(SessionIdentity::new(sessions.clone())),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    TestApp {
        base: format!("http://{address}"),
        client: Client::new(),
        store,
        sessions,
    }
}

fn project(id: &str) -> Value {
    json!({
        "project": {
            "id": id,
            "sourceImage": "data:image/png;base64,iVBORw0KGgo=",
            "name": "Ground floor",
        }
    })
}

fn allow_origin(response: &reqwest::Response) -> Option<&str> {
    response
        .headers()
        .get("access-control-allow-origin")
        .and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn save_then_get_returns_stored_project() {
    let app = spawn_app().await;
    let before = Utc::now();

    let response = app.save(Some("alice-token"), &project("p1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let saved: Value = response.json().await.unwrap();
    assert_eq!(saved["saved"], json!(true));
    assert_eq!(saved["id"], json!("p1"));
    assert_eq!(saved["project"]["name"], json!("Ground floor"));

    let response = app.get(Some("alice-token"), "/api/projects/get?id=p1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: Value = response.json().await.unwrap();

    assert_eq!(
        fetched["project"]["sourceImage"],
        json!("data:image/png;base64,iVBORw0KGgo=")
    );
    assert!(fetched["project"].get("isPublic").is_none());

    let updated_at = fetched["project"]["updatedAt"].as_str().unwrap();
    let updated_at: DateTime<Utc> = updated_at.parse().unwrap();
    assert!(updated_at.timestamp_millis() >= before.timestamp_millis());
    assert_eq!(saved["project"], fetched["project"]);
}

#[tokio::test]
async fn save_overwrites_existing_project() {
    let app = spawn_app().await;

    app.save(Some("alice-token"), &project("p1")).await;
    let mut renamed = project("p1");
    renamed["project"]["name"] = json!("First floor");
    app.save(Some("alice-token"), &renamed).await;

    let fetched: Value = app
        .get(Some("alice-token"), "/api/projects/get?id=p1")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["project"]["name"], json!("First floor"));
}

#[tokio::test]
async fn save_without_source_image_is_rejected_before_writing() {
    let app = spawn_app().await;

    let response = app
        .save(Some("alice-token"), &json!({ "project": { "id": "p1" } }))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(allow_origin(&response), Some("*"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "error": "Project not found or missing source image" })
    );
    assert_eq!(app.store.writes(), 0);
}

#[tokio::test]
async fn save_with_malformed_body_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/projects/save"))
        .bearer_auth("alice-token")
        .header("content-type", "application/json")
        .body("{\"project\":")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("Malformed payload"));
    assert_eq!(app.store.writes(), 0);
}

#[tokio::test]
async fn save_accepts_large_images() {
    let app = spawn_app().await;
    let mut body = project("big");
    body["project"]["sourceImage"] = json!(format!("data:image/png;base64,{}", "A".repeat(3 << 20)));

    let response = app.save(Some("alice-token"), &body).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn get_unknown_project_is_not_found() {
    let app = spawn_app().await;

    let response = app.get(Some("alice-token"), "/api/projects/get?id=nope").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(allow_origin(&response), Some("*"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Project not found" }));
}

#[tokio::test]
async fn get_without_id_is_bad_request() {
    let app = spawn_app().await;

    for path in ["/api/projects/get", "/api/projects/get?id="] {
        let response = app.get(Some("alice-token"), path).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "error": "Missing project id" }));
    }
}

#[tokio::test]
async fn get_uses_first_of_repeated_ids() {
    let app = spawn_app().await;

    app.save(Some("alice-token"), &project("a")).await;

    let response = app
        .get(Some("alice-token"), "/api/projects/get?id=a&id=b")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["project"]["id"], json!("a"));

    let response = app
        .get(Some("alice-token"), "/api/projects/get?id=b&id=a")
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Project not found" }));
}

#[tokio::test]
async fn oversized_save_is_a_json_error() {
    let mut config = Config::local();
    config.max_body_bytes = 1024;
    let app = spawn_app_with(config).await;

    let mut body = project("big");
    body["project"]["sourceImage"] = json!("A".repeat(4096));

    let response = app.save(None, &body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(allow_origin(&response), Some("*"));
    let error: Value = response.json().await.unwrap();
    assert_eq!(error, json!({ "error": "Unauthorized: Authentication Failed" }));

    let response = app.save(Some("alice-token"), &body).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(allow_origin(&response), Some("*"));
    let error: Value = response.json().await.unwrap();
    assert_eq!(error, json!({ "error": "Payload too large" }));

    assert_eq!(app.store.writes(), 0);
}

#[tokio::test]
async fn list_returns_only_projects_marked_public() {
    let app = spawn_app().await;

    app.save(Some("alice-token"), &project("p1")).await;
    app.save(Some("alice-token"), &project("p2")).await;
    app.save(Some("bob-token"), &project("b1")).await;
    app.store
        .insert("roomify:alice:roomify_settings", json!({ "theme": "dark" }))
        .await;
    app.store
        .insert("roomify:alice:roomify_project_broken", json!("not an object"))
        .await;

    let response = app.get(Some("alice-token"), "/api/projects/list").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    let projects = body["projects"].as_array().unwrap();
    let mut ids: Vec<&str> = projects
        .iter()
        .map(|project| project["id"].as_str().unwrap())
        .collect();
    ids.sort();

    assert_eq!(ids, vec!["p1", "p2"]);
    assert!(projects.iter().all(|project| project["isPublic"] == json!(true)));
}

#[tokio::test]
async fn list_is_empty_for_new_user() {
    let app = spawn_app().await;

    let body: Value = app
        .get(Some("bob-token"), "/api/projects/list")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body, json!({ "projects": [] }));
}

#[tokio::test]
async fn projects_are_scoped_to_their_owner() {
    let app = spawn_app().await;

    app.save(Some("alice-token"), &project("p1")).await;

    let response = app.get(Some("bob-token"), "/api/projects/get?id=p1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_credentials_are_rejected_before_storage() {
    let app = spawn_app().await;

    let responses = [
        app.save(None, &project("p1")).await,
        app.get(None, "/api/projects/list").await,
        app.get(None, "/api/projects/get?id=p1").await,
        app.get(None, "/api/projects/get?id=a&id=b").await,
    ];

    for response in responses {
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(allow_origin(&response), Some("*"));
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "error": "Unauthorized: Authentication Failed" }));
    }

    assert_eq!(app.store.reads(), 0);
    assert_eq!(app.store.writes(), 0);
}

#[tokio::test]
async fn unknown_token_is_rejected_before_storage() {
    let app = spawn_app().await;

    let responses = [
        app.save(Some("stolen"), &project("p1")).await,
        app.get(Some("stolen"), "/api/projects/list").await,
        app.get(Some("stolen"), "/api/projects/get").await,
    ];

    for response in responses {
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "error": "Unauthorized: User Not Found" }));
    }

    assert_eq!(app.store.reads(), 0);
    assert_eq!(app.store.writes(), 0);
}

#[tokio::test]
async fn failed_identity_lookup_is_unauthorized() {
    let app = spawn_app().await;
    app.sessions.set_failing(true);

    let responses = [
        app.save(Some("alice-token"), &project("p1")).await,
        app.get(Some("alice-token"), "/api/projects/list").await,
        app.get(Some("alice-token"), "/api/projects/get?id=p1").await,
    ];

    for response in responses {
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(allow_origin(&response), Some("*"));
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "error": "Unauthorized: User Not Found" }));
    }

    assert_eq!(app.store.reads(), 0);
    assert_eq!(app.store.writes(), 0);
}

#[tokio::test]
async fn storage_failures_are_internal_errors() {
    let app = spawn_app().await;
    app.store.set_failing(true);

    let cases = [
        (app.save(Some("alice-token"), &project("p1")).await, "Failed to save project"),
        (app.get(Some("alice-token"), "/api/projects/list").await, "Failed to list projects"),
        (app.get(Some("alice-token"), "/api/projects/get?id=p1").await, "Failed to fetch project"),
    ];

    for (response, error) in cases {
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(allow_origin(&response), Some("*"));
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], json!(error));
        assert_eq!(body["message"], json!("Store unavailable: memory store set to fail"));
    }

    app.store.set_failing(false);
    assert!(app.store.get("roomify:alice:roomify_project_p1").await.unwrap().is_none());
}

#[tokio::test]
async fn success_responses_allow_any_origin() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/api/projects/list"))
        .bearer_auth("alice-token")
        .header("origin", "https://roomify.example")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(allow_origin(&response), Some("*"));
}
