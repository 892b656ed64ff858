use std::net::SocketAddr;

use axum::Router;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::StartupError;

mod error;
mod extract;
mod middleware;
mod routes;
mod state;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "wodparse API",
        version = "0.1.0",
        description = "Turns free-text workouts into structured data with a confidence score and actionable issues."
    ),
    paths(
        routes::health::health_check,
        routes::workouts::parse_workout,
        routes::workouts::validate_workout,
        routes::movements::search_movements,
        routes::movements::suggest_movements,
    ),
    components(schemas(
        HealthResponse,
        wodparse_core::error::ApiError,
        wodparse_core::ParseResult,
        wodparse_core::ParsedWorkout,
        wodparse_core::ParsedMovement,
        wodparse_core::ParsingIssue,
        wodparse_core::IssueCode,
        wodparse_core::Severity,
        wodparse_core::WorkoutType,
        wodparse_core::model::MovementIdentity,
        wodparse_core::model::ConfidenceBreakdown,
        routes::workouts::WorkoutTextRequest,
        routes::workouts::ParseMeta,
        routes::workouts::ParseWorkoutResponse,
        routes::workouts::ValidateWorkoutResponse,
        routes::movements::MovementSearchResponse,
        routes::movements::MovementSuggestResponse,
    )),
    tags(
        (name = "workouts", description = "Workout text parsing"),
        (name = "movements", description = "Movement dictionary lookups"),
        (name = "system", description = "Service status")
    )
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "wodparse_api=debug,wodparse_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "wodparse API stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let app_state = state::AppState::from_env()?;
    tracing::info!(
        parse_timeout_ms = app_state.parse_timeout.as_millis() as u64,
        config = ?app_state.parser.config(),
        "parser configured"
    );

    let cors_layer = middleware::cors::build_cors_layer();

    // Rate limits sit on the route routers so /health and the docs stay unthrottled.
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::workouts::router().layer(middleware::rate_limit::parse_layer()))
        .merge(routes::movements::router().layer(middleware::rate_limit::read_layer()))
        .layer(axum::middleware::from_fn(middleware::security_headers::apply))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors_layer),
        )
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("wodparse API listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
