use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{Admin, Product};
use crate::routes::AppState;
use crate::services::catalog::{self, NewProduct, ProductChanges, ProductFilter};

#[derive(Debug, Deserialize)]
pub struct ProductIdQuery {
    pub id: Option<i64>,
}

impl ProductIdQuery {
    fn required(&self) -> AppResult<i64> {
        self.id
            .ok_or_else(|| AppError::BadRequest("Product id is required".into()))
    }
}

/// GET /admin-products, or a single product with `?id=`.
pub async fn get(
    State(state): State<AppState>,
    Query(query): Query<ProductIdQuery>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    match query.id {
        Some(id) => Ok(Json(catalog::get_product(&conn, id)?).into_response()),
        None => {
            let products = catalog::list_products(&conn, &ProductFilter::default())?;
            Ok(Json(products).into_response())
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    Extension(admin): Extension<Admin>,
    Json(body): Json<NewProduct>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let conn = state.db.get()?;
    let product = catalog::create_product(&conn, body, Some(&admin.id))?;
    tracing::info!(product_id = product.id, admin_id = %admin.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(admin): Extension<Admin>,
    Query(query): Query<ProductIdQuery>,
    Json(body): Json<ProductChanges>,
) -> AppResult<Json<Product>> {
    let id = query.required()?;
    let conn = state.db.get()?;
    let product = catalog::update_product(&conn, id, body)?;
    tracing::info!(product_id = id, admin_id = %admin.id, "Product updated");
    Ok(Json(product))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(admin): Extension<Admin>,
    Query(query): Query<ProductIdQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let id = query.required()?;
    let conn = state.db.get()?;
    catalog::delete_product(&conn, id)?;
    tracing::info!(product_id = id, admin_id = %admin.id, "Product deleted");
    Ok(Json(serde_json::json!({ "message": "Product deleted" })))
}
