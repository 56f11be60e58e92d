use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gatepass_common::Config;
use gatepass_engine::ApprovalEngine;
use gatepass_notify::{HttpMailer, Mailer, NoopMailer};

mod auth;
mod rest;

pub struct AppState {
    pub engine: ApprovalEngine,
    pub config: Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gatepass=info".parse()?))
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let mailer: Arc<dyn Mailer> = match &config.mail_api_url {
        Some(url) => Arc::new(HttpMailer::new(
            url.clone(),
            config.mail_api_token.clone(),
            config.mail_from.clone(),
        )),
        None => {
            info!("MAIL_API_URL not set — notifications disabled");
            Arc::new(NoopMailer)
        }
    };

    let engine = ApprovalEngine::new(pool, mailer, config.public_base_url.clone());
    engine.migrate().await?;

    let state = Arc::new(AppState {
        engine,
        config: config.clone(),
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Identity adapter edge
        .route("/auth/session", post(auth::start_session))
        .route("/auth/logout", post(auth::end_session))
        // Caller profile and catalog
        .route("/api/user/me", get(rest::me))
        .route("/api/request-types", get(rest::request_types))
        // Workflow
        .route("/api/requests", post(rest::requests::create_request))
        .route("/api/requests/mine", get(rest::requests::my_requests))
        .route(
            "/api/requests/mine/counts",
            get(rest::requests::my_request_counts),
        )
        .route("/api/requests/{id}", get(rest::requests::request_detail))
        .route("/api/requests/{id}/decision", post(rest::requests::decide))
        .route(
            "/api/approvals/pending",
            get(rest::requests::pending_approvals),
        )
        // Chain administration
        .route("/api/chains/{request_type_id}", get(rest::chains::get_chain))
        .route("/api/chains/{request_type_id}", put(rest::chains::set_chain))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("GatePass API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
