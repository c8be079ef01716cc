use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entity::{
        audit_logs::ActiveModel as AuditActive,
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    models::{
        NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, Product, ProductSummary,
        ShippingAddress, build_order_number,
    },
    store::{AuditEntry, AuditLog, OrderStore, PageRequest, ProductCatalog},
};

/// Postgres-backed catalog, order store and audit log.
#[derive(Clone)]
pub struct PgStore {
    conn: DatabaseConnection,
}

impl PgStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    async fn attach_items(&self, orders: Vec<OrderModel>) -> AppResult<Vec<Order>> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let rows = OrderItems::find()
            .find_also_related(Products)
            .filter(OrderItemCol::OrderId.is_in(ids))
            .order_by_asc(OrderItemCol::OrderId)
            .order_by_asc(OrderItemCol::Position)
            .all(&self.conn)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for (item, product) in rows {
            grouped
                .entry(item.order_id)
                .or_default()
                .push(order_item_from_entity(item, product));
        }

        orders
            .into_iter()
            .map(|order| {
                let items = grouped.remove(&order.id).unwrap_or_default();
                order_from_entity(order, items)
            })
            .collect()
    }
}

#[async_trait]
impl ProductCatalog for PgStore {
    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        let product = Products::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(product_from_entity);
        Ok(product)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create_with_items(&self, order: NewOrder, items: Vec<NewOrderItem>) -> AppResult<Uuid> {
        if items.is_empty() {
            return Err(AppError::Validation("order must have at least one item".into()));
        }

        // BTreeMap so product rows are always locked in the same order.
        let mut requested: BTreeMap<Uuid, i32> = BTreeMap::new();
        for item in &items {
            let qty = requested.entry(item.product_id).or_insert(0);
            *qty = qty.checked_add(item.quantity).ok_or_else(|| {
                AppError::Validation(format!("quantity too large for product {}", item.product_id))
            })?;
        }

        let txn = self.conn.begin().await?;
        let now = Utc::now();

        for (product_id, quantity) in &requested {
            let product = Products::find_by_id(*product_id)
                .lock(LockType::Update)
                .one(&txn)
                .await?;
            let product = match product {
                Some(p) => p,
                None => return Err(AppError::NotFound(format!("product {product_id}"))),
            };
            if !product.is_active {
                return Err(AppError::BusinessRule(format!(
                    "Product is not available: {}",
                    product.name
                )));
            }
            if product.stock < *quantity {
                return Err(AppError::BusinessRule(format!(
                    "Insufficient stock for: {}",
                    product.name
                )));
            }

            let new_stock = product.stock - quantity;
            let mut active: ProductActive = product.into();
            active.stock = Set(new_stock);
            active.updated_at = Set(now.into());
            active.update(&txn).await?;
        }

        let order_id = Uuid::new_v4();
        let shipping_address = order
            .shipping_address
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(anyhow::Error::from)?;

        OrderActive {
            id: Set(order_id),
            order_number: Set(build_order_number(order_id)),
            buyer_id: Set(order.buyer_id),
            status: Set(order.status.as_str().to_string()),
            total_amount: Set(order.total_amount),
            shipping_fee: Set(order.shipping_fee),
            discount_amount: Set(order.discount_amount),
            payment_method: Set(order.payment_method),
            shipping_address: Set(shipping_address),
            tracking_number: Set(None),
            notes: Set(order.notes),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?;

        let rows = items
            .into_iter()
            .enumerate()
            .map(|(position, item)| OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                position: Set(position as i32),
                quantity: Set(item.quantity),
                price_at_time: Set(item.price_at_time),
                color: Set(item.color),
                size: Set(item.size),
                created_at: NotSet,
            })
            .collect::<Vec<_>>();
        OrderItems::insert_many(rows).exec(&txn).await?;

        txn.commit().await?;
        Ok(order_id)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Order> {
        let order = Orders::find_by_id(id).one(&self.conn).await?;
        let order = match order {
            Some(o) => o,
            None => return Err(AppError::NotFound(format!("order {id}"))),
        };

        self.attach_items(vec![order])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))
    }

    async fn get_by_buyer(&self, buyer_id: Uuid, page: PageRequest) -> AppResult<(Vec<Order>, u64)> {
        let finder = Orders::find()
            .filter(OrderCol::BuyerId.eq(buyer_id))
            .order_by_desc(OrderCol::CreatedAt)
            .order_by_desc(OrderCol::Id);

        let total = finder.clone().count(&self.conn).await?;

        let orders = finder
            .limit(page.limit)
            .offset(page.offset)
            .all(&self.conn)
            .await?;

        Ok((self.attach_items(orders).await?, total))
    }

    async fn get_by_seller(
        &self,
        seller_id: Uuid,
        page: PageRequest,
    ) -> AppResult<(Vec<Order>, u64)> {
        // Filtering through an IN subquery lists every matching order once,
        // however many of its items belong to the seller.
        let seller_order_ids = Query::select()
            .column((OrderItems, OrderItemCol::OrderId))
            .from(OrderItems)
            .inner_join(
                Products,
                Expr::col((Products, ProdCol::Id)).equals((OrderItems, OrderItemCol::ProductId)),
            )
            .and_where(Expr::col((Products, ProdCol::SellerId)).eq(seller_id))
            .to_owned();

        let finder = Orders::find()
            .filter(OrderCol::Id.in_subquery(seller_order_ids))
            .order_by_desc(OrderCol::CreatedAt)
            .order_by_desc(OrderCol::Id);

        let total = finder.clone().count(&self.conn).await?;

        let orders = finder
            .limit(page.limit)
            .offset(page.offset)
            .all(&self.conn)
            .await?;

        Ok((self.attach_items(orders).await?, total))
    }

    async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> AppResult<()> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        let result = Orders::update_many()
            .col_expr(OrderCol::Status, Expr::value(status.as_str()))
            .col_expr(OrderCol::UpdatedAt, Expr::value(now))
            .filter(OrderCol::Id.eq(order_id))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("order {order_id}")));
        }
        Ok(())
    }

    async fn update_tracking_number(
        &self,
        order_id: Uuid,
        tracking_number: String,
    ) -> AppResult<()> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        let result = Orders::update_many()
            .col_expr(OrderCol::TrackingNumber, Expr::value(tracking_number))
            .col_expr(OrderCol::UpdatedAt, Expr::value(now))
            .filter(OrderCol::Id.eq(order_id))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("order {order_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl AuditLog for PgStore {
    async fn record(&self, entry: AuditEntry) -> AppResult<()> {
        AuditActive {
            id: Set(Uuid::new_v4()),
            actor_id: Set(entry.actor_id),
            action: Set(entry.action),
            resource: Set(entry.resource),
            metadata: Set(entry.metadata),
            created_at: NotSet,
        }
        .insert(&self.conn)
        .await?;
        Ok(())
    }
}

fn order_from_entity(model: OrderModel, items: Vec<OrderItem>) -> AppResult<Order> {
    let status = model.status.parse::<OrderStatus>().map_err(|_| {
        AppError::Internal(anyhow::anyhow!(
            "order {} has unknown status {}",
            model.id,
            model.status
        ))
    })?;
    let shipping_address = model
        .shipping_address
        .map(serde_json::from_value::<ShippingAddress>)
        .transpose()
        .map_err(anyhow::Error::from)?;

    Ok(Order {
        id: model.id,
        order_number: model.order_number,
        buyer_id: model.buyer_id,
        status,
        total_amount: model.total_amount,
        shipping_fee: model.shipping_fee,
        discount_amount: model.discount_amount,
        payment_method: model.payment_method,
        shipping_address,
        tracking_number: model.tracking_number,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        items,
    })
}

fn order_item_from_entity(model: OrderItemModel, product: Option<ProductModel>) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        price_at_time: model.price_at_time,
        color: model.color,
        size: model.size,
        created_at: model.created_at.with_timezone(&Utc),
        product: product.map(|p| ProductSummary {
            name: p.name,
            seller_id: p.seller_id,
        }),
    }
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        seller_id: model.seller_id,
        name: model.name,
        price: model.price,
        stock: model.stock,
        is_active: model.is_active,
    }
}
