use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        analytics::SellerAnalytics,
        orders::{
            CreateOrderRequest, OrderItemInput, OrderItemResponse, OrderList, OrderResponse,
            UpdateOrderStatusRequest, UpdateTrackingRequest,
        },
    },
    models::{OrderStatus, ShippingAddress},
    response::{ApiResponse, Meta},
    routes::{health, orders, params, seller},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        orders::create_order,
        orders::list_my_orders,
        orders::get_order,
        orders::update_order_status,
        orders::update_tracking_number,
        seller::list_seller_orders,
        seller::get_seller_analytics
    ),
    components(
        schemas(
            OrderStatus,
            ShippingAddress,
            CreateOrderRequest,
            OrderItemInput,
            UpdateOrderStatusRequest,
            UpdateTrackingRequest,
            OrderResponse,
            OrderItemResponse,
            OrderList,
            SellerAnalytics,
            params::Pagination,
            Meta,
            ApiResponse<OrderResponse>,
            ApiResponse<OrderList>,
            ApiResponse<SellerAnalytics>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Order placement and buyer views"),
        (name = "Seller", description = "Seller order views and analytics"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
