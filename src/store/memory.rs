use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, Product, ProductSummary,
        build_order_number,
    },
    store::{AuditEntry, AuditLog, OrderStore, PageRequest, ProductCatalog},
};

#[derive(Debug, Default)]
struct InMemoryState {
    products: HashMap<Uuid, Product>,
    // Insertion order, oldest first.
    orders: Vec<Order>,
    audit: Vec<AuditEntry>,
    fail_on_commit: bool,
}

impl InMemoryState {
    fn hydrate(&self, order: &Order) -> Order {
        let mut order = order.clone();
        for item in &mut order.items {
            item.product = self.products.get(&item.product_id).map(|p| ProductSummary {
                name: p.name.clone(),
                seller_id: p.seller_id,
            });
        }
        order
    }

    fn page<'a>(
        &self,
        matching: impl Iterator<Item = &'a Order>,
        page: PageRequest,
    ) -> (Vec<Order>, u64) {
        let matching: Vec<&Order> = matching.collect();
        let total = matching.len() as u64;
        let orders = matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .map(|o| self.hydrate(o))
            .collect();
        (orders, total)
    }
}

/// Catalog, order store and audit log kept in process memory.
///
/// Every write happens under one lock, which gives the same all-or-nothing
/// behaviour as the Postgres transaction.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.state.write().await.products.insert(product.id, product);
    }

    pub async fn product(&self, id: Uuid) -> Option<Product> {
        self.state.read().await.products.get(&id).cloned()
    }

    /// Changes a catalog price. Returns false when the product is unknown.
    pub async fn set_price(&self, id: Uuid, price: i64) -> bool {
        match self.state.write().await.products.get_mut(&id) {
            Some(product) => {
                product.price = price;
                true
            }
            None => false,
        }
    }

    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    pub async fn item_count(&self) -> usize {
        self.state
            .read()
            .await
            .orders
            .iter()
            .map(|o| o.items.len())
            .sum()
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.read().await.audit.clone()
    }

    /// Makes every following `create_with_items` fail after validation, as a
    /// storage fault would.
    pub async fn set_fail_on_commit(&self, fail: bool) {
        self.state.write().await.fail_on_commit = fail;
    }
}

#[async_trait]
impl ProductCatalog for InMemoryStore {
    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.product(id).await)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create_with_items(&self, order: NewOrder, items: Vec<NewOrderItem>) -> AppResult<Uuid> {
        if items.is_empty() {
            return Err(AppError::Validation("order must have at least one item".into()));
        }

        let mut requested: BTreeMap<Uuid, i32> = BTreeMap::new();
        for item in &items {
            let qty = requested.entry(item.product_id).or_insert(0);
            *qty = qty.checked_add(item.quantity).ok_or_else(|| {
                AppError::Validation(format!("quantity too large for product {}", item.product_id))
            })?;
        }

        let mut state = self.state.write().await;

        for (product_id, quantity) in &requested {
            let product = state
                .products
                .get(product_id)
                .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;
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
        }

        if state.fail_on_commit {
            return Err(AppError::Internal(anyhow::anyhow!("simulated storage failure")));
        }

        for (product_id, quantity) in &requested {
            if let Some(product) = state.products.get_mut(product_id) {
                product.stock -= quantity;
            }
        }

        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let items = items
            .into_iter()
            .map(|item| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                price_at_time: item.price_at_time,
                color: item.color,
                size: item.size,
                created_at: now,
                product: None,
            })
            .collect();

        state.orders.push(Order {
            id: order_id,
            order_number: build_order_number(order_id),
            buyer_id: order.buyer_id,
            status: order.status,
            total_amount: order.total_amount,
            shipping_fee: order.shipping_fee,
            discount_amount: order.discount_amount,
            payment_method: order.payment_method,
            shipping_address: order.shipping_address,
            tracking_number: None,
            notes: order.notes,
            created_at: now,
            updated_at: now,
            items,
        });

        Ok(order_id)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Order> {
        let state = self.state.read().await;
        state
            .orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| state.hydrate(o))
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))
    }

    async fn get_by_buyer(&self, buyer_id: Uuid, page: PageRequest) -> AppResult<(Vec<Order>, u64)> {
        let state = self.state.read().await;
        let matching = state.orders.iter().rev().filter(|o| o.buyer_id == buyer_id);
        Ok(state.page(matching, page))
    }

    async fn get_by_seller(
        &self,
        seller_id: Uuid,
        page: PageRequest,
    ) -> AppResult<(Vec<Order>, u64)> {
        let state = self.state.read().await;
        let matching = state.orders.iter().rev().filter(|o| {
            o.items.iter().any(|item| {
                state
                    .products
                    .get(&item.product_id)
                    .is_some_and(|p| p.seller_id == seller_id)
            })
        });
        Ok(state.page(matching, page))
    }

    async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> AppResult<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn update_tracking_number(
        &self,
        order_id: Uuid,
        tracking_number: String,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
        order.tracking_number = Some(tracking_number);
        order.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl AuditLog for InMemoryStore {
    async fn record(&self, entry: AuditEntry) -> AppResult<()> {
        self.state.write().await.audit.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            name: "Ferris Mug".into(),
            price: 1500,
            stock,
            is_active: true,
        }
    }

    fn new_order() -> NewOrder {
        NewOrder {
            buyer_id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            total_amount: 3000,
            shipping_fee: 0,
            discount_amount: 0,
            payment_method: Some("card".into()),
            shipping_address: None,
            notes: None,
        }
    }

    fn line(product_id: Uuid, quantity: i32) -> NewOrderItem {
        NewOrderItem {
            product_id,
            quantity,
            price_at_time: 1500,
            color: None,
            size: None,
        }
    }

    #[tokio::test]
    async fn create_decrements_stock_and_keeps_item_order() {
        let store = InMemoryStore::new();
        let a = product(5);
        let b = product(5);
        store.insert_product(a.clone()).await;
        store.insert_product(b.clone()).await;

        let id = store
            .create_with_items(new_order(), vec![line(b.id, 1), line(a.id, 2)])
            .await
            .unwrap();

        let order = store.get_by_id(id).await.unwrap();
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].product_id, b.id);
        assert_eq!(order.items[1].product_id, a.id);
        assert!(order.items.iter().all(|i| i.order_id == id));
        assert_eq!(store.product(a.id).await.unwrap().stock, 3);
        assert_eq!(store.product(b.id).await.unwrap().stock, 4);
    }

    #[tokio::test]
    async fn duplicate_lines_count_against_stock_together() {
        let store = InMemoryStore::new();
        let p = product(3);
        store.insert_product(p.clone()).await;

        let err = store
            .create_with_items(new_order(), vec![line(p.id, 2), line(p.id, 2)])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BusinessRule(_)));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.product(p.id).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn storage_failure_leaves_nothing_behind() {
        let store = InMemoryStore::new();
        let p = product(3);
        store.insert_product(p.clone()).await;
        store.set_fail_on_commit(true).await;

        let err = store
            .create_with_items(new_order(), vec![line(p.id, 1)])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.item_count().await, 0);
        assert_eq!(store.product(p.id).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn update_status_on_missing_order_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .update_status(Uuid::new_v4(), OrderStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
