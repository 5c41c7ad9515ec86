// tests/common/mod.rs
#![allow(dead_code)]

use chrono::{Duration, Utc};
use school_backend::{
    config::Config, routes, state::AppState, utils::blacklist::TokenBlacklist,
    utils::hash::hash_password,
};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::OnceLock;

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
}

/// Spawns the app on a random port backed by an in-memory SQLite database.
///
/// The pool is capped at one connection so the in-memory database survives
/// for the lifetime of the test; the same pool is handed back for seeding.
pub async fn spawn_app() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<std::time::Duration>)
        .max_lifetime(None::<std::time::Duration>)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        upload_dir: std::env::temp_dir()
            .join("school-backend-test-uploads")
            .to_string_lossy()
            .into_owned(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        blacklist: TokenBlacklist::default(),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, pool }
}

/// All seeded users share one password so the Argon2 hash is computed once
/// per test binary.
fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).expect("Failed to hash test password"))
        .clone()
}

pub async fn seed_user(pool: &SqlitePool, username: &str, role: &str) -> i64 {
    sqlx::query("INSERT INTO users (username, password, role) VALUES (?, ?, ?)")
        .bind(username)
        .bind(password_hash())
        .bind(role)
        .execute(pool)
        .await
        .expect("Failed to seed user")
        .last_insert_rowid()
}

pub async fn login(client: &reqwest::Client, address: &str, username: &str) -> String {
    let resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": PASSWORD,
        }))
        .send()
        .await
        .expect("Login request failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    resp["token"]
        .as_str()
        .expect("Token not found in login response")
        .to_string()
}

/// Seeds an exam whose window is [now + start_offset_min, now + end_offset_min].
pub async fn seed_exam(
    pool: &SqlitePool,
    participants: &[i64],
    start_offset_min: i64,
    end_offset_min: i64,
) -> i64 {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO exams (class_term_id, kind, participants, start_at, end_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(1_i64)
    .bind("UTS")
    .bind(serde_json::to_string(participants).unwrap())
    .bind(now + Duration::minutes(start_offset_min))
    .bind(now + Duration::minutes(end_offset_min))
    .execute(pool)
    .await
    .expect("Failed to seed exam")
    .last_insert_rowid()
}

pub async fn seed_question(
    pool: &SqlitePool,
    exam_id: i64,
    kind: &str,
    choices: Option<&str>,
    answer_key: Option<&str>,
    points: i64,
) -> i64 {
    sqlx::query(
        "INSERT INTO questions (exam_id, kind, prompt, choices, answer_key, points)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(exam_id)
    .bind(kind)
    .bind(format!("Seeded {} question", kind))
    .bind(choices)
    .bind(answer_key)
    .bind(points)
    .execute(pool)
    .await
    .expect("Failed to seed question")
    .last_insert_rowid()
}

pub async fn count_answers(pool: &SqlitePool, question_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM answers WHERE question_id = ?")
        .bind(question_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count answers")
}
