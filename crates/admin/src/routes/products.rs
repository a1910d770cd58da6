//! Product and category administration.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};
use modern_shop_core::ProductId;
use modern_shop_core::catalog::{Category, NewProduct, Product, ProductPatch, ProductQuery};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{ApiJson, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Build the catalog router (mounted under `/admin/api`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(index).post(create))
        .route(
            "/products/{id}",
            get(show).patch(update).delete(destroy),
        )
        .route("/categories", get(categories).post(create_category))
        .route("/categories/{name}", delete(destroy_category))
}

/// Body of `POST /categories`.
#[derive(Debug, Deserialize)]
pub struct NewCategoryRequest {
    pub name: String,
}

/// GET /admin/api/products
#[instrument(skip(state))]
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().list_products(&query).await?))
}

/// GET /admin/api/products/{id}
async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog().get_product(&ProductId::new(id)).await?))
}

/// POST /admin/api/products
#[instrument(skip_all, fields(admin = %admin.email))]
async fn create(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    ApiJson(new): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.catalog().create_product(new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PATCH /admin/api/products/{id}
#[instrument(skip(state, admin, patch), fields(admin = %admin.email))]
async fn update(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ProductPatch>,
) -> Result<Json<Product>> {
    let product = state
        .catalog()
        .update_product(&ProductId::new(id), &patch)
        .await?;
    Ok(Json(product))
}

/// DELETE /admin/api/products/{id}
#[instrument(skip(state, admin), fields(admin = %admin.email))]
async fn destroy(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.catalog().delete_product(&ProductId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/api/categories
async fn categories(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog().categories().await?))
}

/// POST /admin/api/categories
#[instrument(skip(state, admin), fields(admin = %admin.email))]
async fn create_category(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    ApiJson(request): ApiJson<NewCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = state.catalog().add_category(&request.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// DELETE /admin/api/categories/{name}
///
/// Refused with 409 while any product is still filed under the category.
#[instrument(skip(state, admin), fields(admin = %admin.email))]
async fn destroy_category(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(name): Path<String>,
) -> Result<StatusCode> {
    state.catalog().delete_category(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
