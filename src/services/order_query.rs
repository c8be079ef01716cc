use uuid::Uuid;

use crate::{
    dto::orders::{OrderList, OrderResponse},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_seller},
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Buyers see their own orders, sellers see orders holding one of their
/// products, admins see everything.
pub(crate) fn can_view(user: &AuthUser, order: &Order) -> bool {
    user.is_admin()
        || order.buyer_id == user.user_id
        || (user.is_seller() && order.involves_seller(user.user_id))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderResponse>> {
    let order = state.orders.get_by_id(id).await?;
    // Same answer as a missing order, so ids of other tenants do not leak.
    if !can_view(user, &order) {
        return Err(AppError::NotFound(format!("order {id}")));
    }

    Ok(ApiResponse::success(
        "Order retrieved",
        OrderResponse::from(order),
        Some(Meta::empty()),
    ))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (limit, offset) = query.normalize();
    let (orders, total) = state
        .orders
        .get_by_buyer(user.user_id, query.page_request())
        .await?;

    let orders = orders.into_iter().map(OrderResponse::from).collect();
    let meta = Meta::new(limit, offset, total as i64);
    Ok(ApiResponse::success(
        "Orders retrieved",
        OrderList { orders },
        Some(meta),
    ))
}

/// Full orders (every line item, not only the seller's) that contain at
/// least one of the caller's products.
pub async fn list_seller_orders(
    state: &AppState,
    user: &AuthUser,
    query: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_seller(user)?;
    let (limit, offset) = query.normalize();
    let (orders, total) = state
        .orders
        .get_by_seller(user.user_id, query.page_request())
        .await?;

    let orders = orders.into_iter().map(OrderResponse::from).collect();
    let meta = Meta::new(limit, offset, total as i64);
    Ok(ApiResponse::success(
        "Seller orders retrieved",
        OrderList { orders },
        Some(meta),
    ))
}
