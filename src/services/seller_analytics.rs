use uuid::Uuid;

use crate::{
    dto::analytics::SellerAnalytics,
    error::AppResult,
    middleware::auth::{AuthUser, ensure_seller},
    models::Order,
    response::{ApiResponse, Meta},
    state::AppState,
    store::PageRequest,
};

/// Analytics read the seller's most recent orders through one large page.
pub const ANALYTICS_WINDOW: u64 = 1000;

pub async fn seller_analytics(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SellerAnalytics>> {
    ensure_seller(user)?;

    let (summary, _) = windowed_summary(state, user.user_id, ANALYTICS_WINDOW).await?;

    Ok(ApiResponse::success(
        "Analytics retrieved",
        summary,
        Some(Meta::empty()),
    ))
}

/// Summary over the `window` newest orders of the seller. The flag is true
/// when older orders fell outside the window.
async fn windowed_summary(
    state: &AppState,
    seller_id: Uuid,
    window: u64,
) -> AppResult<(SellerAnalytics, bool)> {
    let (orders, total) = state
        .orders
        .get_by_seller(seller_id, PageRequest::new(window, 0))
        .await?;

    let truncated = total > orders.len() as u64;
    if truncated {
        tracing::warn!(
            seller_id = %seller_id,
            total,
            window,
            "seller analytics computed over a truncated order window"
        );
    }

    Ok((summarize(&orders), truncated))
}

pub fn summarize(orders: &[Order]) -> SellerAnalytics {
    let total_orders = orders.len() as i64;
    let total_revenue = orders
        .iter()
        .fold(0i64, |acc, order| acc.saturating_add(order.total_amount));
    let average_order_value = if total_orders > 0 {
        total_revenue as f64 / total_orders as f64
    } else {
        0.0
    };

    SellerAnalytics {
        total_orders,
        total_revenue,
        average_order_value,
        total_products: 0,
        total_views: 0,
        conversion_rate: 0.0,
    }
}
