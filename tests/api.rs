//! HTTP tests driving the full router over an in-memory database

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use taskly::api::{build_router, AppState};
use taskly::cache::{Cache, MemoryCache};
use taskly::config::Config;
use taskly::db::{create_test_pool, migrations};

async fn server() -> TestServer {
    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();
    let cache = Arc::new(Cache::Memory(MemoryCache::new()));
    let state = AppState::new(pool, cache, Config::default());
    TestServer::new(build_router(state)).unwrap()
}

/// Register an account and return its bearer token
async fn register(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret123",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()["data"]["token"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn create_task(server: &TestServer, token: &str, body: Value) -> Value {
    let response = server
        .post("/api/tasks")
        .authorization_bearer(token)
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()["data"].clone()
}

#[tokio::test]
async fn test_register_login_and_me() {
    let server = server().await;
    register(&server, "alice").await;

    let login = server
        .post("/api/auth/login")
        .json(&json!({ "username": "alice", "password": "secret123" }))
        .await;
    assert_eq!(login.status_code(), StatusCode::OK);
    let body = login.json::<Value>();
    assert_eq!(body["success"], true);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let me = server.get("/api/auth/me").authorization_bearer(&token).await;
    assert_eq!(me.status_code(), StatusCode::OK);
    let me = me.json::<Value>();
    assert_eq!(me["data"]["username"], "alice");
    assert_eq!(me["data"]["role"], "admin");
    assert!(me["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let server = server().await;
    register(&server, "alice").await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "username": "alice", "password": "nope-nope" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_login_by_mixed_case_email() {
    let server = server().await;
    let registered = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "Alice@Example.com",
            "password": "secret123",
        }))
        .await;
    assert_eq!(registered.status_code(), StatusCode::CREATED);

    for email in ["Alice@Example.com", "alice@example.com"] {
        let login = server
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": "secret123" }))
            .await;
        assert_eq!(login.status_code(), StatusCode::OK, "login as {}", email);
        assert_eq!(login.json::<Value>()["data"]["user"]["email"], "alice@example.com");
    }
}

#[tokio::test]
async fn test_repeated_failed_logins_are_rate_limited() {
    let server = server().await;
    register(&server, "alice").await;

    for _ in 0..Config::default().auth.max_login_attempts {
        let response = server
            .post("/api/auth/login")
            .json(&json!({ "username": "alice", "password": "wrong-pass" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    // Locked even with the right password, and under any spelling
    for identifier in ["alice", "ALICE"] {
        let locked = server
            .post("/api/auth/login")
            .json(&json!({ "username": identifier, "password": "secret123" }))
            .await;
        assert_eq!(locked.status_code(), StatusCode::TOO_MANY_REQUESTS);
        let body = locked.json::<Value>();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "RATE_LIMITED");
    }
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let server = server().await;
    register(&server, "alice").await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "other@example.com",
            "password": "secret123",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let server = server().await;
    let token = register(&server, "alice").await;

    let logout = server.post("/api/auth/logout").authorization_bearer(&token).await;
    assert_eq!(logout.status_code(), StatusCode::NO_CONTENT);

    let me = server.get("/api/auth/me").authorization_bearer(&token).await;
    assert_eq!(me.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tasks_require_auth() {
    let server = server().await;
    let response = server.get("/api/tasks").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["success"], false);
}

#[tokio::test]
async fn test_task_crud() {
    let server = server().await;
    let token = register(&server, "alice").await;

    let task = create_task(
        &server,
        &token,
        json!({
            "title": "Write report",
            "mood": "focused",
            "priority": "high",
            "subtasks": [{ "title": "outline" }, { "title": "draft" }],
        }),
    )
    .await;
    let id = task["id"].as_i64().unwrap();
    assert_eq!(task["mood"], "focused");
    assert_eq!(task["category"], "personal");
    assert_eq!(task["status"], "pending");
    assert_eq!(task["completion_percentage"], 0);

    let fetched = server
        .get(&format!("/api/tasks/{}", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(fetched.status_code(), StatusCode::OK);
    assert_eq!(fetched.json::<Value>()["data"]["title"], "Write report");

    let updated = server
        .put(&format!("/api/tasks/{}", id))
        .authorization_bearer(&token)
        .json(&json!({ "status": "completed" }))
        .await;
    assert_eq!(updated.status_code(), StatusCode::OK);
    let updated = updated.json::<Value>();
    assert_eq!(updated["data"]["status"], "completed");
    assert_eq!(updated["data"]["completion_percentage"], 100);

    let deleted = server
        .delete(&format!("/api/tasks/{}", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(deleted.status_code(), StatusCode::OK);

    let missing = server
        .get(&format!("/api/tasks/{}", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(missing.json::<Value>()["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_other_users_task_is_forbidden() {
    let server = server().await;
    let _admin = register(&server, "admin").await;
    let alice = register(&server, "alice").await;
    let bob = register(&server, "bob").await;

    let task = create_task(&server, &alice, json!({ "title": "Private" })).await;
    let path = format!("/api/tasks/{}", task["id"]);

    let read = server.get(&path).authorization_bearer(&bob).await;
    assert_eq!(read.status_code(), StatusCode::FORBIDDEN);

    let delete = server.delete(&path).authorization_bearer(&bob).await;
    assert_eq!(delete.status_code(), StatusCode::FORBIDDEN);

    let listed = server.get("/api/tasks").authorization_bearer(&bob).await;
    assert_eq!(listed.json::<Value>()["data"]["total"], 0);
}

#[tokio::test]
async fn test_create_task_without_title_is_rejected() {
    let server = server().await;
    let token = register(&server, "alice").await;

    let response = server
        .post("/api/tasks")
        .authorization_bearer(&token)
        .json(&json!({ "mood": "happy" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let server = server().await;
    let token = register(&server, "alice").await;

    let response = server
        .post("/api/tasks")
        .authorization_bearer(&token)
        .content_type("application/json")
        .bytes("{\"title\": ".into())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_invalid_filter_value_is_rejected() {
    let server = server().await;
    let token = register(&server, "alice").await;

    let response = server
        .get("/api/tasks?mood=grumpy")
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_filters_and_mood_route() {
    let server = server().await;
    let token = register(&server, "alice").await;
    create_task(&server, &token, json!({ "title": "Run", "mood": "energetic" })).await;
    create_task(&server, &token, json!({ "title": "Nap", "mood": "tired" })).await;
    create_task(&server, &token, json!({ "title": "Jog", "mood": "energetic" })).await;

    let filtered = server
        .get("/api/tasks?mood=energetic&sort=title")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(filtered["data"]["total"], 2);
    assert_eq!(filtered["data"]["items"][0]["title"], "Jog");

    let paged = server
        .get("/api/tasks?per_page=2&page=2")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(paged["data"]["total"], 3);
    assert_eq!(paged["data"]["total_pages"], 2);
    assert_eq!(paged["data"]["items"].as_array().unwrap().len(), 1);

    let by_mood = server
        .get("/api/tasks/mood/tired")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(by_mood["data"]["total"], 1);
    assert_eq!(by_mood["data"]["items"][0]["title"], "Nap");

    let stats = server
        .get("/api/tasks/stats")
        .authorization_bearer(&token)
        .await;
    assert_eq!(stats.status_code(), StatusCode::OK);
    assert_eq!(stats.json::<Value>()["data"]["total"], 3);
}

#[tokio::test]
async fn test_subtasks() {
    let server = server().await;
    let token = register(&server, "alice").await;
    let task = create_task(&server, &token, json!({ "title": "Move" })).await;
    let id = task["id"].as_i64().unwrap();

    let added = server
        .post(&format!("/api/tasks/{}/subtasks", id))
        .authorization_bearer(&token)
        .json(&json!({ "title": "Boxes" }))
        .await;
    assert_eq!(added.status_code(), StatusCode::CREATED);

    let toggled = server
        .patch(&format!("/api/tasks/{}/subtasks/0", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(toggled.status_code(), StatusCode::OK);
    let toggled = toggled.json::<Value>();
    assert_eq!(toggled["data"]["subtasks"][0]["completed"], true);
    assert_eq!(toggled["data"]["completion_percentage"], 100);

    let out_of_range = server
        .patch(&format!("/api/tasks/{}/subtasks/5", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(out_of_range.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_task_list_is_cached_until_a_write() {
    let server = server().await;
    let token = register(&server, "alice").await;
    create_task(&server, &token, json!({ "title": "First" })).await;

    let first = server.get("/api/tasks").authorization_bearer(&token).await;
    assert_eq!(first.headers().get("x-cache").unwrap(), "MISS");

    let second = server.get("/api/tasks").authorization_bearer(&token).await;
    assert_eq!(second.headers().get("x-cache").unwrap(), "HIT");
    assert_eq!(second.json::<Value>()["data"]["total"], 1);

    create_task(&server, &token, json!({ "title": "Second" })).await;

    let third = server.get("/api/tasks").authorization_bearer(&token).await;
    assert_eq!(third.headers().get("x-cache").unwrap(), "MISS");
    assert_eq!(third.json::<Value>()["data"]["total"], 2);
}

#[tokio::test]
async fn test_cache_is_per_user() {
    let server = server().await;
    let alice = register(&server, "alice").await;
    let bob = register(&server, "bob").await;
    create_task(&server, &alice, json!({ "title": "Alice only" })).await;

    let alice_list = server.get("/api/tasks").authorization_bearer(&alice).await;
    assert_eq!(alice_list.json::<Value>()["data"]["total"], 1);

    let bob_list = server.get("/api/tasks").authorization_bearer(&bob).await;
    assert_eq!(bob_list.headers().get("x-cache").unwrap(), "MISS");
    assert_eq!(bob_list.json::<Value>()["data"]["total"], 0);
}

#[tokio::test]
async fn test_blog_drafts_are_hidden_from_others() {
    let server = server().await;
    let alice = register(&server, "alice").await;
    let bob = register(&server, "bob").await;

    let published = server
        .post("/api/blogs")
        .authorization_bearer(&alice)
        .json(&json!({ "title": "Hello", "content": "World" }))
        .await;
    assert_eq!(published.status_code(), StatusCode::CREATED);

    let draft = server
        .post("/api/blogs")
        .authorization_bearer(&alice)
        .json(&json!({ "title": "Secret", "content": "Soon", "published": false }))
        .await
        .json::<Value>();
    let draft_path = format!("/api/blogs/{}", draft["data"]["id"]);

    let public = server.get("/api/blogs").await.json::<Value>();
    assert_eq!(public["data"]["total"], 1);
    assert_eq!(public["data"]["items"][0]["author_name"], "alice");

    assert_eq!(server.get(&draft_path).await.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        server.get(&draft_path).authorization_bearer(&bob).await.status_code(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        server.get(&draft_path).authorization_bearer(&alice).await.status_code(),
        StatusCode::OK
    );

    let mine = server
        .get("/api/blogs?mine=true")
        .authorization_bearer(&alice)
        .await
        .json::<Value>();
    assert_eq!(mine["data"]["total"], 2);

    let edit = server
        .put(&draft_path)
        .authorization_bearer(&bob)
        .json(&json!({ "title": "Mine now" }))
        .await;
    assert_eq!(edit.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_blog_write_requires_auth() {
    let server = server().await;
    let response = server
        .post("/api/blogs")
        .json(&json!({ "title": "Anon", "content": "Nope" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_moods() {
    let server = server().await;

    let moods = server.get("/api/moods").await;
    assert_eq!(moods.status_code(), StatusCode::OK);
    assert!(!moods.json::<Value>()["data"].as_array().unwrap().is_empty());

    let suggestions = server.get("/api/moods/happy/suggestions").await;
    assert_eq!(suggestions.status_code(), StatusCode::OK);
    assert_eq!(suggestions.json::<Value>()["data"]["mood"], "happy");

    let weather = server.get("/api/moods/weather/Rainy").await;
    assert_eq!(weather.status_code(), StatusCode::OK);

    let unknown = server.get("/api/moods/weather/foggy").await;
    assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);

    let bad_mood = server.get("/api/moods/grumpy/suggestions").await;
    assert_eq!(bad_mood.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_routes() {
    let server = server().await;
    let admin = register(&server, "admin").await;
    let alice = register(&server, "alice").await;

    let forbidden = server.get("/api/admin/users").authorization_bearer(&alice).await;
    assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

    let users = server.get("/api/admin/users").authorization_bearer(&admin).await;
    assert_eq!(users.status_code(), StatusCode::OK);
    assert_eq!(users.json::<Value>()["data"]["total"], 2);

    server.get("/api/tasks").authorization_bearer(&alice).await;
    let cleared = server
        .post("/api/admin/cache/clear")
        .authorization_bearer(&admin)
        .json(&json!({ "pattern": "/api/tasks" }))
        .await;
    assert_eq!(cleared.status_code(), StatusCode::OK);
    assert_eq!(cleared.json::<Value>()["data"]["removed"], 1);

    let again = server.get("/api/tasks").authorization_bearer(&alice).await;
    assert_eq!(again.headers().get("x-cache").unwrap(), "MISS");
}

#[tokio::test]
async fn test_deleting_user_clears_cached_lists() {
    let server = server().await;
    let admin = register(&server, "admin").await;
    let bob = register(&server, "bob").await;
    let me = server.get("/api/auth/me").authorization_bearer(&bob).await.json::<Value>();
    let bob_id = me["data"]["id"].as_i64().unwrap();

    server
        .post("/api/blogs")
        .authorization_bearer(&bob)
        .json(&json!({ "title": "Bye", "content": "Soon gone" }))
        .await;
    let task = create_task(&server, &bob, json!({ "title": "Bob's task" })).await;
    let task_path = format!("/api/tasks/{}", task["id"]);

    assert_eq!(server.get("/api/blogs").await.json::<Value>()["data"]["total"], 1);
    let cached = server.get("/api/blogs").await;
    assert_eq!(cached.headers().get("x-cache").unwrap(), "HIT");
    let seen = server.get(&task_path).authorization_bearer(&admin).await;
    assert_eq!(seen.status_code(), StatusCode::OK);

    let deleted = server
        .delete(&format!("/api/admin/users/{}", bob_id))
        .authorization_bearer(&admin)
        .await;
    assert_eq!(deleted.status_code(), StatusCode::OK);

    let blogs = server.get("/api/blogs").await;
    assert_eq!(blogs.headers().get("x-cache").unwrap(), "MISS");
    assert_eq!(blogs.json::<Value>()["data"]["total"], 0);

    let gone = server.get(&task_path).authorization_bearer(&admin).await;
    assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clearing_due_date_with_null() {
    let server = server().await;
    let token = register(&server, "alice").await;
    let task = create_task(
        &server,
        &token,
        json!({
            "title": "Renew passport",
            "due_date": "2030-01-01T00:00:00Z",
            "reminder": { "remind_at": "2029-12-25T09:00:00Z" },
        }),
    )
    .await;
    let path = format!("/api/tasks/{}", task["id"]);
    assert!(task["due_date"].is_string());

    let retitled = server
        .put(&path)
        .authorization_bearer(&token)
        .json(&json!({ "title": "Renew passport soon" }))
        .await
        .json::<Value>();
    assert!(retitled["data"]["due_date"].is_string());

    let cleared = server
        .put(&path)
        .authorization_bearer(&token)
        .json(&json!({ "due_date": null, "reminder": null }))
        .await;
    assert_eq!(cleared.status_code(), StatusCode::OK);
    let cleared = cleared.json::<Value>();
    assert!(cleared["data"]["due_date"].is_null());
    assert!(cleared["data"]["reminder"].is_null());
}

#[tokio::test]
async fn test_unmatched_routes_answer_with_envelope() {
    let server = server().await;

    let missing = server.get("/api/nothing-here").await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    let body = missing.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");

    let outside = server.get("/elsewhere").await;
    assert_eq!(outside.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(outside.json::<Value>()["code"], "NOT_FOUND");

    let wrong_method = server.delete("/api/moods").await;
    assert_eq!(wrong_method.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    let body = wrong_method.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "METHOD_NOT_ALLOWED");
}

#[tokio::test]
async fn test_health() {
    let server = server().await;
    server.get("/api/moods").await;

    let response = server.get("/api/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["data"]["database"]["driver"], "sqlite");
    assert_eq!(body["data"]["database"]["reachable"], true);
    assert_eq!(body["data"]["cache_driver"], "memory");
    assert!(body["data"]["requests"]["total"].as_u64().unwrap() >= 1);
}
