use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{Order, Profile};
use crate::routes::AppState;
use crate::services::email;
use crate::services::orders::{self, CheckoutLine};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CheckoutLine>,
    pub shipping_address: Option<String>,
}

/// POST /orders
pub async fn checkout(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
    Json(body): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let mut conn = state.db.get()?;
    let cart = orders::build_cart(&conn, &body.items)?;
    let shipping_address = body
        .shipping_address
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());
    let order = orders::place_order(&mut conn, &profile.id, &cart, shipping_address)?;
    drop(conn);

    tracing::info!(
        order_id = %order.id,
        user_id = %profile.id,
        total = order.total_amount,
        units = cart.count(),
        "Order placed"
    );

    let config = state.config.clone();
    let (order_id, total) = (order.id.clone(), order.total_amount);
    tokio::spawn(async move {
        if let Err(e) =
            email::send_order_confirmation(&config, &profile.email, &profile.full_name, &order_id, total).await
        {
            tracing::error!("Failed to send order confirmation: {e}");
        }
    });

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders
pub async fn list(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
) -> AppResult<Json<Vec<Order>>> {
    let conn = state.db.get()?;
    Ok(Json(orders::list_orders_for_user(&conn, &profile.id)?))
}
