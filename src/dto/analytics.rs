use serde::Serialize;
use utoipa::ToSchema;

/// Revenue summary for one seller. Money fields are in minor units.
///
/// `total_products`, `total_views` and `conversion_rate` stay at zero until
/// view tracking and catalog counts are wired in.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SellerAnalytics {
    pub total_orders: i64,
    pub total_revenue: i64,
    pub average_order_value: f64,
    pub total_products: i64,
    pub total_views: i64,
    pub conversion_rate: f64,
}
