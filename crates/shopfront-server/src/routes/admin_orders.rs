use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{Admin, Order, OrderStatus};
use crate::routes::AppState;
use crate::services::dashboard::{self, DashboardStats};
use crate::services::orders::{self, AdminOrderView};

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderIdQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

fn parse_status(raw: &str) -> AppResult<OrderStatus> {
    raw.trim().parse().map_err(AppError::BadRequest)
}

/// GET /admin-orders
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<Vec<AdminOrderView>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty() && *s != "all")
        .map(parse_status)
        .transpose()?;
    let conn = state.db.get()?;
    Ok(Json(orders::list_all_orders(&conn, status)?))
}

/// PUT /admin-orders?id=
pub async fn update_status(
    State(state): State<AppState>,
    Extension(admin): Extension<Admin>,
    Query(query): Query<OrderIdQuery>,
    Json(body): Json<UpdateStatusRequest>,
) -> AppResult<Json<Order>> {
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Order id is required".into()))?;
    let status = parse_status(&body.status)?;

    let conn = state.db.get()?;
    let order = orders::update_status(&conn, &id, status)?;
    tracing::info!(order_id = %id, %status, admin_id = %admin.id, "Order status changed");
    Ok(Json(order))
}

/// GET /admin-dashboard
pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardStats>> {
    let conn = state.db.get()?;
    Ok(Json(dashboard::compute(&conn)?))
}
