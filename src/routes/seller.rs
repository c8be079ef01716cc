use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::{analytics::SellerAnalytics, orders::OrderList},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::Pagination,
    services::{order_query, seller_analytics},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_seller_orders))
        .route("/analytics", get(get_seller_analytics))
}

#[utoipa::path(
    get,
    path = "/api/seller/orders",
    params(Pagination),
    responses(
        (status = 200, description = "Orders containing the seller's products", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn list_seller_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_query::list_seller_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/seller/analytics",
    responses(
        (status = 200, description = "Revenue summary", body = ApiResponse<SellerAnalytics>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn get_seller_analytics(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SellerAnalytics>>> {
    let resp = seller_analytics::seller_analytics(&state, &user).await?;
    Ok(Json(resp))
}
