use super::{JsonBody, PathParam, QueryParams, path_id, query_id, store_failure};
use crate::error::ApiError;
use crate::model::{
    Category, CategoryRequest, DeletedCategoryResponse, categories_from_requests, fields,
};
use crate::state::AppState;
use crate::store::{Collection, Filter};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// `GET /api/categories?stockId=`
#[instrument(name = "list_categories", skip_all)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams,
) -> Result<Json<Vec<Category>>, ApiError> {
    let stock_id = query_id(&query, "stockId").map_err(|e| e.operation("list_categories"))?;

    let categories = state
        .store()
        .find::<Category>(
            Collection::Categories,
            Filter::eq(fields::STOCK_ID, stock_id),
        )
        .await
        .map_err(|e| store_failure(e, "list_categories", "failed to fetch categories"))?;

    Ok(Json(categories))
}

/// `POST /api/categories`
///
/// Every element is validated before the single batch insert, so a bad
/// element means nothing is written.
#[instrument(name = "create_categories", skip_all)]
pub async fn create_categories(
    State(state): State<Arc<AppState>>,
    body: Result<JsonBody<Vec<CategoryRequest>>, ApiError>,
) -> Result<(StatusCode, Json<Vec<Category>>), ApiError> {
    let JsonBody(requests) = body.map_err(|e| e.operation("create_categories"))?;
    let categories = categories_from_requests(requests).map_err(|e| {
        warn!(error = %e, "category batch rejected");
        ApiError::from(e).operation("create_categories")
    })?;

    state
        .store()
        .insert_many(Collection::Categories, &categories)
        .await
        .map_err(|e| store_failure(e, "create_categories", "failed to create categories"))?;

    info!(count = categories.len(), "categories created");
    Ok((StatusCode::CREATED, Json(categories)))
}

/// `DELETE /api/categories/{category_id}`
#[instrument(name = "delete_category", skip_all)]
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    PathParam(raw_id): PathParam,
) -> Result<Json<DeletedCategoryResponse>, ApiError> {
    let category_id =
        path_id(&raw_id, "categoryId").map_err(|e| e.operation("delete_category"))?;

    let deleted_category = state
        .store()
        .delete_one(
            Collection::Categories,
            Filter::eq(fields::CATEGORY_ID, category_id),
        )
        .await
        .map_err(|e| store_failure(e, "delete_category", "failed to delete category"))?;

    info!(%category_id, deleted_category, "category delete processed");
    Ok(Json(DeletedCategoryResponse { deleted_category }))
}
