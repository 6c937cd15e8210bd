use super::{JsonBody, PathParam, QueryParams, path_id, query_id, store_failure};
use crate::error::ApiError;
use crate::model::{CreateStockRequest, DeletedStockResponse, Warehouse, fields};
use crate::state::AppState;
use crate::store::{Collection, Filter};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// `GET /api/warehouse?userId=`
#[instrument(name = "list_warehouse", skip_all)]
pub async fn list_warehouse(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams,
) -> Result<Json<Vec<Warehouse>>, ApiError> {
    let user_id = query_id(&query, "userId").map_err(|e| e.operation("list_warehouse"))?;

    let stocks = state
        .store()
        .find::<Warehouse>(Collection::Warehouse, Filter::eq(fields::USER_ID, user_id))
        .await
        .map_err(|e| store_failure(e, "list_warehouse", "failed to fetch warehouse"))?;

    Ok(Json(stocks))
}

/// `POST /api/warehouse`
#[instrument(name = "create_stock", skip_all)]
pub async fn create_stock(
    State(state): State<Arc<AppState>>,
    body: Result<JsonBody<CreateStockRequest>, ApiError>,
) -> Result<(StatusCode, Json<Warehouse>), ApiError> {
    let JsonBody(request) = body.map_err(|e| e.operation("create_stock"))?;
    let stock = request.into_warehouse().map_err(|e| {
        warn!(error = %e, "stock rejected");
        ApiError::from(e).operation("create_stock")
    })?;

    state
        .store()
        .insert_one(Collection::Warehouse, &stock)
        .await
        .map_err(|e| store_failure(e, "create_stock", "failed to create stock"))?;

    info!(stock_id = %stock.stock_id, user_id = %stock.user_id, "stock created");
    Ok((StatusCode::CREATED, Json(stock)))
}

/// `DELETE /api/warehouse/{stock_id}`
///
/// Two independent deletes: the stock record, then every product whose
/// `StockID` matches. There is no transaction around them. If the second
/// call fails the stock is already gone and its products remain; the
/// client sees a server error in that case. Categories are left untouched.
#[instrument(name = "delete_stock", skip_all)]
pub async fn delete_stock(
    State(state): State<Arc<AppState>>,
    PathParam(raw_id): PathParam,
) -> Result<Json<DeletedStockResponse>, ApiError> {
    let stock_id = path_id(&raw_id, "stockId").map_err(|e| e.operation("delete_stock"))?;
    let filter = Filter::eq(fields::STOCK_ID, stock_id);

    let deleted_stock = state
        .store()
        .delete_one(Collection::Warehouse, filter)
        .await
        .map_err(|e| store_failure(e, "delete_stock", "failed to delete stock"))?;

    let deleted_related_products = state
        .store()
        .delete_many(Collection::Products, filter)
        .await
        .map_err(|e| {
            warn!(%stock_id, deleted_stock, "stock removed but related products were not");
            store_failure(e, "delete_stock", "failed to delete related products")
        })?;

    info!(
        %stock_id,
        deleted_stock,
        deleted_related_products,
        "stock delete processed"
    );
    Ok(Json(DeletedStockResponse {
        deleted_stock,
        deleted_related_products,
    }))
}
