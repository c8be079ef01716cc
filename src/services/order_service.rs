use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CreateOrderRequest, OrderResponse, UpdateOrderStatusRequest, UpdateTrackingRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{NewOrder, NewOrderItem, OrderStatus, ShippingAddress},
    response::{ApiResponse, Meta},
    services::order_query::can_view,
    state::AppState,
};

const MAX_TRACKING_NUMBER_LEN: usize = 100;

/// Turns a cart into a pending order.
///
/// Prices come from the catalog at this moment and are frozen into each line
/// item. Every item is checked before anything is written; the store then
/// re-checks stock while committing, so a failure leaves no order behind.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderResponse>> {
    validate_order_request(&payload)?;

    let CreateOrderRequest {
        items,
        shipping_address,
        payment_method,
        notes,
    } = payload;

    let mut requested: HashMap<Uuid, i32> = HashMap::new();
    let mut total_amount: i64 = 0;
    let mut order_items = Vec::with_capacity(items.len());

    for item in items {
        let product = state
            .catalog
            .find_product(item.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {}", item.product_id)))?;

        if !product.is_active {
            tracing::debug!(product_id = %product.id, "order rejected: product inactive");
            return Err(AppError::BusinessRule(format!(
                "Product is not available: {}",
                product.name
            )));
        }

        let wanted = requested.entry(product.id).or_insert(0);
        *wanted = wanted.saturating_add(item.quantity);
        if *wanted > product.stock {
            tracing::debug!(
                product_id = %product.id,
                requested = *wanted,
                stock = product.stock,
                "order rejected: insufficient stock"
            );
            return Err(AppError::BusinessRule(format!(
                "Insufficient stock for: {}",
                product.name
            )));
        }

        total_amount = product
            .price
            .checked_mul(i64::from(item.quantity))
            .and_then(|line| total_amount.checked_add(line))
            .ok_or_else(|| AppError::Validation("order total is too large".into()))?;

        order_items.push(NewOrderItem {
            product_id: product.id,
            quantity: item.quantity,
            price_at_time: product.price,
            color: item.color,
            size: item.size,
        });
    }

    let item_count = order_items.len();
    let order = NewOrder {
        buyer_id: user.user_id,
        status: OrderStatus::Pending,
        total_amount,
        shipping_fee: 0,
        discount_amount: 0,
        payment_method: Some(payment_method),
        shipping_address: Some(shipping_address),
        notes,
    };

    let order_id = state.orders.create_with_items(order, order_items).await?;
    let created = state.orders.get_by_id(order_id).await?;

    tracing::info!(
        order_id = %created.id,
        order_number = %created.order_number,
        buyer_id = %user.user_id,
        total = created.total_amount,
        items = item_count,
        "order placed"
    );

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "order_placed",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": created.id,
            "order_number": created.order_number,
            "total": created.total_amount,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order created successfully",
        OrderResponse::from(created),
        Some(Meta::empty()),
    ))
}

/// Moves an order along its lifecycle.
///
/// Admins and sellers of the order may make any legal transition; the buyer
/// may only cancel.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderResponse>> {
    let next: OrderStatus = payload.status.parse()?;

    let order = state.orders.get_by_id(id).await?;
    if !can_view(user, &order) {
        return Err(AppError::NotFound(format!("order {id}")));
    }

    let manages_order = user.is_admin() || (user.is_seller() && order.involves_seller(user.user_id));
    let buyer_cancel = order.buyer_id == user.user_id && next == OrderStatus::Cancelled;
    if !manages_order && !buyer_cancel {
        return Err(AppError::Forbidden);
    }

    if !order.status.can_transition_to(next) {
        return Err(AppError::BusinessRule(format!(
            "Order {} cannot move from {} to {}",
            order.order_number, order.status, next
        )));
    }

    state.orders.update_status(id, next).await?;

    tracing::info!(
        order_id = %id,
        from = %order.status,
        to = %next,
        actor_id = %user.user_id,
        "order status updated"
    );

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": id,
            "from": order.status,
            "to": next,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let updated = state.orders.get_by_id(id).await?;
    Ok(ApiResponse::success(
        "Order status updated",
        OrderResponse::from(updated),
        Some(Meta::empty()),
    ))
}

pub async fn update_tracking_number(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateTrackingRequest,
) -> AppResult<ApiResponse<OrderResponse>> {
    let tracking_number = payload.tracking_number.trim();
    if tracking_number.is_empty() {
        return Err(AppError::Validation("trackingNumber is required".into()));
    }
    if tracking_number.len() > MAX_TRACKING_NUMBER_LEN {
        return Err(AppError::Validation(format!(
            "trackingNumber must be at most {MAX_TRACKING_NUMBER_LEN} characters"
        )));
    }

    let order = state.orders.get_by_id(id).await?;
    if !can_view(user, &order) {
        return Err(AppError::NotFound(format!("order {id}")));
    }
    if !(user.is_admin() || (user.is_seller() && order.involves_seller(user.user_id))) {
        return Err(AppError::Forbidden);
    }
    if order.status == OrderStatus::Cancelled {
        return Err(AppError::BusinessRule(format!(
            "Order {} is cancelled",
            order.order_number
        )));
    }

    state
        .orders
        .update_tracking_number(id, tracking_number.to_string())
        .await?;

    tracing::info!(order_id = %id, actor_id = %user.user_id, "tracking number updated");

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "order_tracking_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": id, "tracking_number": tracking_number })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let updated = state.orders.get_by_id(id).await?;
    Ok(ApiResponse::success(
        "Tracking number updated",
        OrderResponse::from(updated),
        Some(Meta::empty()),
    ))
}

fn validate_order_request(payload: &CreateOrderRequest) -> AppResult<()> {
    if payload.items.is_empty() {
        return Err(AppError::Validation("order must have at least one item".into()));
    }
    if let Some(item) = payload.items.iter().find(|item| item.quantity < 1) {
        return Err(AppError::Validation(format!(
            "quantity for product {} must be at least 1",
            item.product_id
        )));
    }
    if payload.payment_method.trim().is_empty() {
        return Err(AppError::Validation("paymentMethod is required".into()));
    }
    validate_address(&payload.shipping_address)
}

fn validate_address(address: &ShippingAddress) -> AppResult<()> {
    let required = [
        ("street", &address.street),
        ("city", &address.city),
        ("postalCode", &address.postal_code),
        ("recipient", &address.recipient),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "shippingAddress.{field} is required"
            )));
        }
    }
    Ok(())
}
