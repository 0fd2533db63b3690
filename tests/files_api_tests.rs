//! Tests for the /files workspace store endpoints.
//!
//! These cover:
//! - Save/list/load/delete/mkdir round trips
//! - The membership gate (403 for non-members, 404 for unknown teams)
//! - Path sanitization and required-field validation

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use std::sync::Arc;
use teamspace::teams::{Team, TeamRegistry};
use teamspace::{create_router, RouterConfig};
use tower::util::ServiceExt;

/// Helper to get response body as string.
async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_to_json(body: Body) -> serde_json::Value {
    serde_json::from_str(&body_to_string(body).await).unwrap()
}

/// Helper to create an app with a seeded registry and a temp data dir.
async fn create_app() -> (axum::Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let registry = TeamRegistry::new();
    registry
        .add_team(Team {
            id: "team-1".to_string(),
            name: "Code Warriors".to_string(),
            members: ["user-1".to_string(), "user-2".to_string()]
                .into_iter()
                .collect(),
        })
        .await;
    registry.add_token("tok-alice", "user-1").await;
    registry.add_token("tok-bob", "user-2").await;
    registry.add_token("tok-mallory", "user-9").await;

    let app = create_router(RouterConfig::new(dir.path(), Arc::new(registry)));
    (app, dir)
}

fn save_request(token: &str, team_id: &str, file_name: &str, content: &str) -> Request<Body> {
    let body = serde_json::json!({
        "teamId": team_id,
        "fileName": file_name,
        "content": content,
    });
    Request::builder()
        .method("POST")
        .uri("/files/save")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(token: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn delete_request(token: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn mkdir_request(token: &str, team_id: &str, dir_name: &str) -> Request<Body> {
    let body = serde_json::json!({ "teamId": team_id, "dirName": dir_name });
    Request::builder()
        .method("POST")
        .uri("/files/directory")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_check_works() {
    let (app, _dir) = create_app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "OK");
}

#[tokio::test]
async fn team_with_no_files_lists_empty() {
    let (app, _dir) = create_app().await;
    let response = app
        .oneshot(get_request("tok-alice", "/files/team/team-1/files"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["files"], serde_json::json!([]));
    assert_eq!(json["teamName"], "Code Warriors");
}

#[tokio::test]
async fn save_then_list_contains_the_file() {
    let (app, _dir) = create_app().await;

    let response = app
        .clone()
        .oneshot(save_request("tok-alice", "team-1", "src/app.js", "// app"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["fileName"], "src/app.js");
    assert_eq!(json["teamName"], "Code Warriors");

    let response = app
        .oneshot(get_request("tok-alice", "/files/team/team-1/files"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    let files = json["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "src/app.js");
    assert_eq!(files[0]["size"], 6);
}

#[tokio::test]
async fn save_then_load_round_trips() {
    let (app, _dir) = create_app().await;
    let content = "function main() {\n  return 42;\n}\n";

    app.clone()
        .oneshot(save_request("tok-alice", "team-1", "src/main.js", content))
        .await
        .unwrap();

    let response = app
        .oneshot(get_request("tok-bob", "/files/team/team-1/file/src/main.js"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["content"], content);
    assert_eq!(json["fileName"], "src/main.js");
    assert!(json["lastModified"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn list_reflects_exactly_the_saved_files() {
    let (app, _dir) = create_app().await;
    let paths = ["a.txt", "src/b.js", "src/deep/c.md"];
    for path in &paths {
        app.clone()
            .oneshot(save_request("tok-alice", "team-1", path, "x"))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(get_request("tok-alice", "/files/team/team-1/files"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    let mut names: Vec<String> = json["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    let mut expected: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
    expected.sort();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn load_missing_file_is_not_found() {
    let (app, _dir) = create_app().await;
    let response = app
        .oneshot(get_request("tok-alice", "/files/team/team-1/file/missing.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_the_file() {
    let (app, _dir) = create_app().await;
    app.clone()
        .oneshot(save_request("tok-alice", "team-1", "doomed.txt", "bye"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(delete_request("tok-alice", "/files/team/team-1/file/doomed.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("tok-alice", "/files/team/team-1/file/doomed.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Deleting again is a 404, not an error masking
    let response = app
        .oneshot(delete_request("tok-alice", "/files/team/team-1/file/doomed.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mkdir_is_idempotent_and_files_nest_under_it() {
    let (app, _dir) = create_app().await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(mkdir_request("tok-alice", "team-1", "src/lib"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    app.clone()
        .oneshot(save_request("tok-alice", "team-1", "src/lib/util.js", "// util"))
        .await
        .unwrap();

    let response = app
        .oneshot(get_request("tok-alice", "/files/team/team-1/files"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    let files = json["files"].as_array().unwrap();
    // Empty directories are not listed; only the file shows up
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "src/lib/util.js");
}

#[tokio::test]
async fn non_member_is_forbidden_for_every_operation() {
    let (app, _dir) = create_app().await;
    app.clone()
        .oneshot(save_request("tok-alice", "team-1", "a.txt", "x"))
        .await
        .unwrap();

    let requests = vec![
        save_request("tok-mallory", "team-1", "b.txt", "y"),
        get_request("tok-mallory", "/files/team/team-1/files"),
        get_request("tok-mallory", "/files/team/team-1/file/a.txt"),
        delete_request("tok-mallory", "/files/team/team-1/file/a.txt"),
        mkdir_request("tok-mallory", "team-1", "dir"),
    ];
    for request in requests {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    // The member's file is untouched
    let response = app
        .oneshot(get_request("tok-alice", "/files/team/team-1/file/a.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_token_is_forbidden() {
    let (app, _dir) = create_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/files/team/team-1/files")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_team_is_not_found() {
    let (app, _dir) = create_app().await;
    let response = app
        .clone()
        .oneshot(get_request("tok-alice", "/files/team/team-404/files"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(save_request("tok-alice", "team-404", "a.txt", "x"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_paths_are_rejected(){
    let (app, dir) = create_app().await;

    let response = app
        .clone()
        .oneshot(save_request("tok-alice", "team-1", "../escape.txt", "x"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get_request(
            "tok-alice",
            "/files/team/team-1/file/src/../../escape.txt",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(!dir.path().join("escape.txt").exists());
}

#[tokio::test]
async fn missing_required_fields_are_rejected() {
    let (app, _dir) = create_app().await;

    let body = serde_json::json!({ "teamId": "team-1", "content": "x" });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/files/save")
                .header("content-type", "application/json")
                .header("authorization", "Bearer tok-alice")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(mkdir_request("tok-alice", "", "dir"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
