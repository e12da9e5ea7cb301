mod admin_auth;
mod admin_orders;
mod admin_products;
mod auth;
mod orders;
mod products;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::auth::middleware::{require_admin, require_customer};
use crate::config::Config;
use crate::db::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
}

async fn health() -> &'static str {
    "ok"
}

pub fn create_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(health));

    // Public catalog
    let catalog = Router::new()
        .route("/products", get(products::list))
        .route("/products/{id}", get(products::get))
        .route("/categories", get(products::categories));

    // Credential endpoints, rate limited per IP when enabled
    let mut credential_routes = Router::new()
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/auth/password-reset", post(auth::request_password_reset))
        .route(
            "/auth/password-reset/confirm",
            post(auth::confirm_password_reset),
        )
        .route("/admin-auth/login", post(admin_auth::login))
        .route("/admin-auth/register", post(admin_auth::register))
        .route("/admin-auth/logout", post(admin_auth::logout));

    if state.config.rate_limit {
        // 10 requests burst, one token back every 6 seconds
        if let Some(governor) = GovernorConfigBuilder::default()
            .per_second(6)
            .burst_size(10)
            .finish()
        {
            credential_routes = credential_routes.layer(GovernorLayer::new(Arc::new(governor)));
        }
    }

    let customer = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/orders", get(orders::list).post(orders::checkout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_customer,
        ));

    let admin = Router::new()
        .route("/admin-auth/verify", get(admin_auth::verify))
        .route(
            "/admin-products",
            get(admin_products::get)
                .post(admin_products::create)
                .put(admin_products::update)
                .delete(admin_products::delete),
        )
        .route(
            "/admin-orders",
            get(admin_orders::list).put(admin_orders::update_status),
        )
        .route("/admin-dashboard", get(admin_orders::dashboard))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(health_routes)
        .merge(catalog)
        .merge(credential_routes)
        .merge(customer)
        .merge(admin)
        .with_state(state)
}
