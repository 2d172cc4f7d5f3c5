mod health;
mod invites;
mod payload;
mod roles;
mod services;
mod users;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health::health))
        .route("/version", get(health::version))
        .nest("/v1/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Roles
        .route("/roles", get(roles::list_roles))
        // Services
        .route(
            "/services",
            get(services::find_services).post(services::create_service),
        )
        .route(
            "/services/{service_id}",
            get(services::get_service)
                .patch(services::update_service)
                .delete(services::delete_service),
        )
        .route(
            "/services/{service_id}/merchant-details",
            put(services::update_merchant_details),
        )
        .route("/services/{service_id}/users", get(services::list_members))
        .route(
            "/services/{service_id}/users/{user_id}",
            delete(services::remove_member),
        )
        .route(
            "/services/{service_id}/users/{user_id}/removable",
            get(services::can_remove_member),
        )
        // Users
        .route("/users", post(users::create_user))
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/services", post(users::assign_service_role))
        .route(
            "/users/{user_id}/services/{service_id}",
            put(users::update_service_role),
        )
        // Invites
        .route("/invites/service", post(invites::create_self_signup_invite))
        .route("/invites/user", post(invites::create_service_invite))
        .route("/invites/otp/generate", post(invites::generate_otp))
        .route("/invites/otp/validate", post(invites::validate_otp))
        .route("/invites/{code}", get(invites::get_invite))
        .route("/invites/{code}/complete", post(invites::complete_invite))
}
