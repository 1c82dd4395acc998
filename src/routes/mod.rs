// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: Main router assembly and middleware
// - health.rs: Health check and metrics endpoints
// - auth.rs: Signup, login, logout, password reset
// - account.rs: Profile management
// - listings.rs: Food listing lifecycle (post, browse, claim)
// - deliveries.rs: Volunteer pickup queue
// - stats.rs: Public impact statistics
// - tips.rs: Generated food storage tips
// - extractors.rs: Custom Axum extractors (JWT, current user)
// - middleware.rs: Request logging
//
// ============================================================================

mod account;
mod auth;
mod deliveries;
mod extractors;
mod health;
mod listings;
mod middleware;
mod stats;
mod tips;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::{MAX_PHOTO_SIZE, MAX_REQUEST_BODY_SIZE};
use crate::context::AppContext;

/// Create the main application router with all routes
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    Router::new()
        // Health and monitoring
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics_handler))
        // Public impact statistics
        .route("/stats", get(stats::impact_stats))
        // Authentication
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/password-reset", post(auth::request_password_reset))
        .route(
            "/auth/password-reset/confirm",
            post(auth::confirm_password_reset),
        )
        // Account management
        .route(
            "/account",
            get(account::get_account)
                .patch(account::update_account)
                .delete(account::delete_account),
        )
        .route(
            "/account/photo",
            put(account::upload_photo).layer(DefaultBodyLimit::max(MAX_PHOTO_SIZE)),
        )
        // Food listings
        .route("/listings", post(listings::create_listing))
        .route("/listings", get(listings::browse_listings))
        .route("/listings/mine", get(listings::my_listings))
        .route("/listings/:id/claim", post(listings::claim_listing))
        .route(
            "/listings/:id/request-delivery",
            post(listings::request_delivery),
        )
        // Volunteer deliveries
        .route("/deliveries/pending", get(deliveries::pending_deliveries))
        .route("/deliveries/:id/accept", post(deliveries::accept_delivery))
        // Generated food tips
        .route("/tips/generate", post(tips::generate_tip))
        // Stored objects (profile photos) served straight from disk
        .nest_service(
            "/media",
            ServeDir::new(app_context.config.storage_dir.clone()),
        )
        // Apply middleware (order matters - last added runs first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
                .into_inner(),
        )
        .with_state(app_context)
}
