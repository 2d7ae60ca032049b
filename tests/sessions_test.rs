mod common;

use axum::Router;
use axum::http::StatusCode;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::json;
use uuid::Uuid;

use quizlive_api::auth::password;
use quizlive_api::config::{Config, Environment};
use quizlive_api::entities::{quiz_template, user};
use quizlive_api::state::AppState;
use quizlive_api::template::Slide;

async fn test_app() -> (Router, DatabaseConnection) {
    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .unwrap_or_default();
    Migrator::up(&db, None).await.unwrap_or_default();

    let config = Config {
        database_url: String::new(),
        server_host: std::net::IpAddr::from([127, 0, 0, 1]),
        server_port: 0,
        environment: Environment::Development,
        log_level: "warn".to_string(),
        frontend_url: "http://localhost:3001".to_string(),
        session_token_ttl_secs: 86_400,
    };

    let app = quizlive_api::routes::router().with_state(AppState::new(db.clone(), config));
    (app, db)
}

async fn seed_user(db: &DatabaseConnection, username: &str, pass: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now().fixed_offset();
    let record = user::ActiveModel {
        id: Set(id),
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        display_name: Set(username.to_string()),
        password_hash: Set(password::hash_password(pass).unwrap_or_default()),
        email_verified: Set(true),
        role: Set("user".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    record.insert(db).await.ok();
    id
}

async fn seed_template(db: &DatabaseConnection, author: Uuid, name: &str, slides: &[Slide]) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now().fixed_offset();
    let record = quiz_template::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        author_id: Set(author),
        slides: Set(serde_json::to_value(slides).unwrap_or_default()),
        is_public: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    record.insert(db).await.ok();
    id
}

fn sample_slides() -> Vec<Slide> {
    vec![
        Slide {
            duration_secs: 20,
            prompt: "Largest planet?".to_string(),
            options: vec!["Mars".to_string(), "Jupiter".to_string()],
            correct: vec![1],
            multiple_answer: false,
        },
        Slide {
            duration_secs: 30,
            prompt: "Primary colors?".to_string(),
            options: vec![
                "Red".to_string(),
                "Green".to_string(),
                "Blue".to_string(),
                "Yellow".to_string(),
            ],
            correct: vec![0, 2, 3],
            multiple_answer: true,
        },
    ]
}

async fn login(app: &Router, username: &str, pass: &str) -> String {
    let (_, body) = common::post_json(
        app,
        "/api/v1/auth/login",
        &json!({"username": username, "password": pass}),
    )
    .await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    json["token"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_create_session_freezes_template_and_issues_code() {
    let (app, db) = test_app().await;
    let host = seed_user(&db, "host", "host-pass-123").await;
    let template = seed_template(&db, host, "Planets", &sample_slides()).await;
    let token = login(&app, "host", "host-pass-123").await;

    let (status, body) = common::post_json_with_auth(
        &app,
        "/api/v1/sessions",
        &json!({"templateId": template}),
        &token,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(json["hostId"], host.to_string());
    assert_eq!(json["state"], "created");
    assert_eq!(json["templateId"], template.to_string());
    assert_eq!(json["slideCount"], 2);
    assert_eq!(json["players"].as_array().map(Vec::len), Some(0));

    let code = json["code"].as_u64().unwrap_or_default();
    assert!((10_000..=99_999).contains(&code), "code out of range: {code}");

    // The issued code resolves back to the same session.
    let (status, body) = common::get(&app, &format!("/api/v1/sessions/{code}")).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(fetched["id"], json["id"]);
}

#[tokio::test]
async fn test_create_session_requires_registered_principal() {
    let (app, db) = test_app().await;
    let host = seed_user(&db, "owner", "owner-pass-123").await;
    let template = seed_template(&db, host, "Planets", &sample_slides()).await;

    // Anonymous: no token at all.
    let (status, _) =
        common::post_json(&app, "/api/v1/sessions", &json!({"templateId": template})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Guest token: authenticated, but not registered.
    let (_, body) = common::post_json(&app, "/api/v1/auth/guest", &json!({})).await;
    let guest: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    let guest_token = guest["guestToken"].as_str().unwrap_or_default();

    let (status, _) = common::post_json_with_auth(
        &app,
        "/api/v1/sessions",
        &json!({"templateId": template}),
        guest_token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_session_validates_template() {
    let (app, db) = test_app().await;
    let host = seed_user(&db, "maker", "maker-pass-123").await;
    let empty = seed_template(&db, host, "Empty", &[]).await;
    let token = login(&app, "maker", "maker-pass-123").await;

    let (status, _) = common::post_json_with_auth(
        &app,
        "/api/v1/sessions",
        &json!({"templateId": Uuid::new_v4()}),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::post_json_with_auth(
        &app,
        "/api/v1/sessions",
        &json!({"templateId": empty}),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lookup_misses_are_not_found() {
    let (app, _db) = test_app().await;

    let (status, _) = common::get(&app, "/api/v1/sessions/54321").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Non-numeric codes are indistinguishable from absent sessions.
    let (status, _) = common::get(&app, "/api/v1/sessions/abcde").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lifecycle_start_then_finish_evicts_session() {
    let (app, db) = test_app().await;
    let host = seed_user(&db, "quizmaster", "qm-pass-12345").await;
    let template = seed_template(&db, host, "Planets", &sample_slides()).await;
    let token = login(&app, "quizmaster", "qm-pass-12345").await;

    let (_, body) = common::post_json_with_auth(
        &app,
        "/api/v1/sessions",
        &json!({"templateId": template}),
        &token,
    )
    .await;
    let created: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    let session_id = created["id"].as_str().unwrap_or_default().to_string();
    let code = created["code"].as_u64().unwrap_or_default();

    let (status, body) =
        common::post_with_auth(&app, &format!("/api/v1/sessions/{session_id}/start"), &token).await;
    assert_eq!(status, StatusCode::OK);
    let started: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(started["state"], "started");

    // Repeating the same transition is a conflict.
    let (status, _) =
        common::post_with_auth(&app, &format!("/api/v1/sessions/{session_id}/start"), &token).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = common::post_with_auth(
        &app,
        &format!("/api/v1/sessions/{session_id}/finish"),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Evicted: neither the id nor the code resolves any longer.
    let (status, _) = common::get(&app, &format!("/api/v1/sessions/{code}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_skipping_start_is_an_invalid_transition() {
    let (app, db) = test_app().await;
    let host = seed_user(&db, "skipper", "skipper-pass-1").await;
    let template = seed_template(&db, host, "Planets", &sample_slides()).await;
    let token = login(&app, "skipper", "skipper-pass-1").await;

    let (_, body) = common::post_json_with_auth(
        &app,
        "/api/v1/sessions",
        &json!({"templateId": template}),
        &token,
    )
    .await;
    let created: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    let session_id = created["id"].as_str().unwrap_or_default().to_string();

    let (status, _) = common::post_with_auth(
        &app,
        &format!("/api/v1/sessions/{session_id}/finish"),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_non_host_cannot_drive_the_lifecycle() {
    let (app, db) = test_app().await;
    let host = seed_user(&db, "realhost", "realhost-pass1").await;
    seed_user(&db, "rando", "rando-pass-123").await;
    let template = seed_template(&db, host, "Planets", &sample_slides()).await;
    let host_token = login(&app, "realhost", "realhost-pass1").await;
    let rando_token = login(&app, "rando", "rando-pass-123").await;

    let (_, body) = common::post_json_with_auth(
        &app,
        "/api/v1/sessions",
        &json!({"templateId": template}),
        &host_token,
    )
    .await;
    let created: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    let session_id = created["id"].as_str().unwrap_or_default().to_string();

    // Indistinguishable from a session that does not exist.
    let (status, _) = common::post_with_auth(
        &app,
        &format!("/api/v1/sessions/{session_id}/start"),
        &rando_token,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_template_listing_omits_answers() {
    let (app, db) = test_app().await;
    let author = seed_user(&db, "author", "author-pass-12").await;
    seed_template(&db, author, "Planets", &sample_slides()).await;
    seed_template(&db, author, "Chemistry", &sample_slides()).await;

    let (status, body) = common::get(&app, "/api/v1/templates").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(json.as_array().map(Vec::len), Some(2));
    assert!(!body.contains("correct"), "listing leaked slide contents");

    let (status, body) = common::get(&app, "/api/v1/templates?search=Chem").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(json.as_array().map(Vec::len), Some(1));
    assert_eq!(json[0]["name"], "Chemistry");
    assert_eq!(json[0]["slideCount"], 2);
}
