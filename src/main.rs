//! # Notekeep 웹 서버 진입점
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 데이터베이스 연결 풀 생성
//! 4. 데이터베이스 마이그레이션 실행
//! 5. API 라우터 설정
//! 6. HTTP 서버 시작

mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use config::Config;
use routes::*;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `/api/v1` 아래에 들어갈 라우트를 구성합니다.
///
/// 경로 변수는 axum 0.8 문법(`{id}`)을 씁니다.
fn api_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me));

    Router::new()
        .merge(auth_routes)
        // 노트 CRUD (쓰기 시 태그 동기화)
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/{id}", get(get_note).patch(update_note).delete(delete_note))
        .route("/notes/{id}/tags", get(get_note_tags))
        // 정규 태그 CRUD
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{id}", get(get_tag).patch(update_tag).delete(delete_tag))
        .route("/health", get(health_check))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env 파일이 없어도 넘어갑니다.
    dotenvy::dotenv().ok();

    // RUST_LOG가 없으면 notekeep, tower_http, axum 모듈을 debug 레벨로 설정
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notekeep=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting Notekeep server on {}:{}", config.host, config.port);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    // 동기화기는 같은 풀을 가리키는 저장소 핸들을 들고 AppState에 실립니다.
    let state = AppState::new(pool, config.jwt_secret.clone());

    // 개발 환경 기준으로 모든 출처를 허용합니다.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/v1", api_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
