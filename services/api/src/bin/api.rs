//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{Argon2Credential, OpenAiChatAdapter, OpenAiChatFactory, SqliteStorage},
    config::Config,
    error::ApiError,
    web::{
        clinic_handler, delete_appointment_handler, list_appointments_handler, login_handler,
        logout_handler, pending_count_handler, require_admin, rest::ApiDoc, state::AppState,
        toggle_status_handler, ws_handler,
    },
};
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let storage = Arc::new(SqliteStorage::new(db_pool));
    info!("Running database migrations...");
    storage.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let verifier = Arc::new(Argon2Credential::from_password(&config.admin_password)?);
    let chat_client = OpenAiChatAdapter::client(&config.gemini_api_key, &config.chat_api_base);
    let chat_sessions = Arc::new(OpenAiChatFactory::new(
        chat_client,
        config.chat_model.clone(),
    ));
    info!(model = %config.chat_model, "Chat assistant ready.");

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        storage,
        verifier,
        chat_sessions,
    ));

    // --- 5. CORS ---
    let origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!(
            "Invalid ALLOWED_ORIGIN '{}': {}",
            config.allowed_origin, e
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no admin session required)
    let public_routes = Router::new()
        .route("/clinic", get(clinic_handler))
        .route("/appointments/pending-count", get(pending_count_handler))
        .route("/admin/login", post(login_handler))
        .route("/ws", get(ws_handler));

    // Admin routes (admin session required)
    let admin_routes = Router::new()
        .route("/admin/logout", post(logout_handler))
        .route("/admin/appointments", get(list_appointments_handler))
        .route("/admin/appointments/{id}/toggle", post(toggle_status_handler))
        .route(
            "/admin/appointments/{id}",
            axum::routing::delete(delete_appointment_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_admin,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
