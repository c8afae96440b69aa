use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sdr_api::config::Config;
use sdr_api::db::Database;
use sdr_api::grok_client::GrokClient;
use sdr_api::handlers::{self, AppState};
use sdr_api::{evaluation_handler, scoring_handler, search_handler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sdr_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool and bootstrap the schema
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    // Initialize Grok client
    let grok = GrokClient::new(&config).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    tracing::info!("Grok client initialized: {}", config.grok_base_url);

    // Build application state
    let app_state = Arc::new(AppState {
        db: db.pool.clone(),
        config: config.clone(),
        grok,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build API routes with security layers
    let api_routes = Router::new()
        // Lead endpoints
        .route(
            "/api/leads",
            post(handlers::create_lead).get(handlers::get_leads),
        )
        .route("/api/leads/stats/pipeline", get(handlers::get_pipeline_stats))
        .route(
            "/api/leads/:id",
            get(handlers::get_lead)
                .put(handlers::update_lead)
                .delete(handlers::delete_lead),
        )
        .route("/api/leads/:id/qualify", post(handlers::qualify_lead))
        .route("/api/leads/:id/score", post(handlers::score_lead))
        .route(
            "/api/leads/:id/interactions",
            post(handlers::add_interaction).get(handlers::get_lead_interactions),
        )
        .route(
            "/api/leads/:id/messages/generate",
            post(handlers::generate_message),
        )
        .route("/api/leads/:id/messages", get(handlers::get_lead_messages))
        // Scoring criteria endpoints
        .route(
            "/api/scoring/criteria",
            post(scoring_handler::create_criteria).get(scoring_handler::get_criteria),
        )
        .route(
            "/api/scoring/criteria/defaults",
            post(scoring_handler::create_default_criteria),
        )
        .route(
            "/api/scoring/criteria/:id",
            get(scoring_handler::get_criteria_by_id)
                .put(scoring_handler::update_criteria)
                .delete(scoring_handler::deactivate_criteria),
        )
        // Evaluation endpoints
        .route(
            "/api/evaluations/run",
            post(evaluation_handler::run_evaluations),
        )
        .route(
            "/api/evaluations/run-defaults",
            post(evaluation_handler::run_default_evaluations),
        )
        .route("/api/evaluations", get(evaluation_handler::get_evaluations))
        .route(
            "/api/evaluations/summary",
            get(evaluation_handler::get_evaluation_summary),
        )
        .route(
            "/api/evaluations/:id",
            delete(evaluation_handler::delete_evaluation),
        )
        // Search endpoints
        .route(
            "/api/search",
            get(search_handler::search).post(search_handler::search_advanced),
        )
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload (prevents memory exhaustion)
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app; health check bypasses rate limiting
    let app = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
