use super::{JsonBody, PathParam, QueryParams, path_id, query_id, store_failure};
use crate::error::ApiError;
use crate::model::{
    CreateProductRequest, DeletedProductResponse, Product, UpdateProductRequest, fields,
};
use crate::state::AppState;
use crate::store::{Collection, Filter};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// `GET /api/products?stockId=`
#[instrument(name = "list_products", skip_all)]
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams,
) -> Result<Json<Vec<Product>>, ApiError> {
    let stock_id = query_id(&query, "stockId").map_err(|e| e.operation("list_products"))?;

    let products = state
        .store()
        .find::<Product>(Collection::Products, Filter::eq(fields::STOCK_ID, stock_id))
        .await
        .map_err(|e| store_failure(e, "list_products", "failed to fetch products"))?;

    Ok(Json(products))
}

/// `POST /api/products`
#[instrument(name = "create_product", skip_all)]
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    body: Result<JsonBody<CreateProductRequest>, ApiError>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let JsonBody(request) = body.map_err(|e| e.operation("create_product"))?;
    let product = request.into_product().map_err(|e| {
        warn!(error = %e, "product rejected");
        ApiError::from(e).operation("create_product")
    })?;

    state
        .store()
        .insert_one(Collection::Products, &product)
        .await
        .map_err(|e| store_failure(e, "create_product", "failed to create product"))?;

    info!(product_id = %product.product_id, stock_id = %product.stock_id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/products/{product_id}`
#[instrument(name = "update_product", skip_all)]
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    PathParam(raw_id): PathParam,
    body: Result<JsonBody<UpdateProductRequest>, ApiError>,
) -> Result<Json<Product>, ApiError> {
    let product_id = path_id(&raw_id, "productId").map_err(|e| e.operation("update_product"))?;
    let JsonBody(request) = body.map_err(|e| e.operation("update_product"))?;
    let changes = request.into_changes().map_err(|e| {
        warn!(error = %e, "update rejected");
        ApiError::from(e).operation("update_product")
    })?;

    let updated = state
        .store()
        .find_one_and_set::<Product>(
            Collection::Products,
            Filter::eq(fields::PRODUCT_ID, product_id),
            changes.to_document(),
        )
        .await
        .map_err(|e| store_failure(e, "update_product", "failed to update product"))?;

    match updated {
        Some(product) => {
            info!(%product_id, "product updated");
            Ok(Json(product))
        }
        None => Err(ApiError::not_found("product not found").operation("update_product")),
    }
}

/// `DELETE /api/products/{product_id}`
///
/// Deleting an unknown id succeeds with a zero count.
#[instrument(name = "delete_product", skip_all)]
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    PathParam(raw_id): PathParam,
) -> Result<Json<DeletedProductResponse>, ApiError> {
    let product_id = path_id(&raw_id, "productId").map_err(|e| e.operation("delete_product"))?;

    let deleted_product = state
        .store()
        .delete_one(
            Collection::Products,
            Filter::eq(fields::PRODUCT_ID, product_id),
        )
        .await
        .map_err(|e| store_failure(e, "delete_product", "failed to delete product"))?;

    info!(%product_id, deleted_product, "product delete processed");
    Ok(Json(DeletedProductResponse { deleted_product }))
}
