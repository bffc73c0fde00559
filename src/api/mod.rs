pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use state::AppState;

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        // Auth routes
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route(
            "/api/auth/logout",
            post(handlers::auth::logout).route_layer(axum::middleware::from_fn_with_state(
                app_state.clone(),
                middleware::auth::require_auth,
            )),
        )
        // Checkout and donations
        .route("/api/checkout/create", post(handlers::checkout::create))
        .route("/api/checkout/:ticket_type", get(handlers::checkout::page_data))
        .route("/api/donations/create", post(handlers::donations::create))
        // Webhook endpoint (no auth; authenticated by signature)
        .route("/api/stripe/webhook", post(handlers::webhook::stripe_webhook))
        // Online access redemption (session required)
        .route(
            "/online-access",
            get(handlers::access::status)
                .post(handlers::access::redeem)
                .route_layer(axum::middleware::from_fn_with_state(
                    app_state.clone(),
                    middleware::auth::require_auth,
                )),
        )
        // Admin routes
        .nest("/api/admin", admin_routes(app_state.clone()))
        .with_state(app_state)
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/tickets/:ticket_type/pricing", put(handlers::admin::update_pricing))
        .route("/access-codes", post(handlers::admin::issue_access_code))
        .route("/orders", get(handlers::admin::list_orders))
        .route("/outbox", get(handlers::admin::list_outbox))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_admin,
        ))
}
