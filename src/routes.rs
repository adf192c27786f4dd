// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, favorite, leaderboard, profile, quiz},
    state::AppState,
    utils::jwt::{auth_middleware, optional_auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (quizzes, leaderboard, profile, dashboard).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store, per-user locks, config).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/tags", get(quiz::list_tags))
        .route("/{id}/leaderboard", get(attempt::quiz_leaderboard))
        .route("/{id}/analytics", get(attempt::quiz_analytics))
        // Anonymous readers see published quizzes; the creator also sees drafts and keys
        .merge(
            Router::new()
                .route("/{id}", get(quiz::get_quiz))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    optional_auth_middleware,
                )),
        )
        // Protected quiz routes
        .merge(
            Router::new()
                .route("/", post(quiz::create_quiz))
                .route("/mine", get(quiz::list_my_quizzes))
                .route("/{id}", axum::routing::delete(quiz::delete_quiz))
                .route("/{id}/publish", post(quiz::publish_quiz))
                .route("/{id}/attempts", post(attempt::submit_attempt))
                .route("/{id}/favorite", post(favorite::toggle_favorite))
                .route_layer(auth.clone()),
        );

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .route("/attempts", get(profile::list_my_attempts))
        .route("/favorites", get(profile::list_my_favorites))
        .route_layer(auth.clone());

    let dashboard_routes = Router::new()
        .route("/", get(profile::get_dashboard))
        .route_layer(auth);

    Router::new()
        .nest("/api/quizzes", quiz_routes)
        .route("/api/leaderboard", get(leaderboard::global_leaderboard))
        .nest("/api/profile", profile_routes)
        .nest("/api/dashboard", dashboard_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
