use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::error::AppResult;
use crate::models::Product;
use crate::routes::AppState;
use crate::services::catalog::{self, CategoryCount, ProductFilter};

/// GET /products?search=&category=
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> AppResult<Json<Vec<Product>>> {
    let conn = state.db.get()?;
    Ok(Json(catalog::list_products(&conn, &filter)?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Product>> {
    let conn = state.db.get()?;
    Ok(Json(catalog::get_product(&conn, id)?))
}

pub async fn categories(State(state): State<AppState>) -> AppResult<Json<Vec<CategoryCount>>> {
    let conn = state.db.get()?;
    Ok(Json(catalog::category_counts(&conn)?))
}
