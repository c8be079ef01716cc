#![allow(dead_code)]

use jsonwebtoken::{EncodingKey, Header, encode};
use storefront_api::{
    config::AppConfig,
    dto::orders::{CreateOrderRequest, OrderItemInput},
    middleware::auth::{AuthUser, Claims},
    models::{Product, ROLE_ADMIN, ROLE_CUSTOMER, ROLE_SELLER, ShippingAddress},
    state::AppState,
    store::InMemoryStore,
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        database_max_connections: 1,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: JWT_SECRET.into(),
    }
}

pub fn setup() -> (AppState, InMemoryStore) {
    let store = InMemoryStore::new();
    let state = AppState::with_store(test_config(), store.clone());
    (state, store)
}

pub fn user_with_role(role: &str) -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: role.into(),
    }
}

pub fn customer() -> AuthUser {
    user_with_role(ROLE_CUSTOMER)
}

pub fn seller() -> AuthUser {
    user_with_role(ROLE_SELLER)
}

pub fn admin() -> AuthUser {
    user_with_role(ROLE_ADMIN)
}

pub async fn add_product(
    store: &InMemoryStore,
    seller_id: Uuid,
    name: &str,
    price: i64,
    stock: i32,
) -> Product {
    let product = Product {
        id: Uuid::new_v4(),
        seller_id,
        name: name.into(),
        price,
        stock,
        is_active: true,
    };
    store.insert_product(product.clone()).await;
    product
}

pub async fn add_inactive_product(store: &InMemoryStore, seller_id: Uuid, name: &str) -> Product {
    let product = Product {
        id: Uuid::new_v4(),
        seller_id,
        name: name.into(),
        price: 999,
        stock: 50,
        is_active: false,
    };
    store.insert_product(product.clone()).await;
    product
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        street: "Rua das Flores".into(),
        number: "42".into(),
        complement: None,
        neighborhood: "Centro".into(),
        city: "Curitiba".into(),
        state: "PR".into(),
        postal_code: "80010-000".into(),
        country: Some("BR".into()),
        recipient: "Ana Souza".into(),
        phone: None,
    }
}

pub fn cart(lines: &[(Uuid, i32)]) -> CreateOrderRequest {
    CreateOrderRequest {
        items: lines
            .iter()
            .map(|(product_id, quantity)| OrderItemInput {
                product_id: *product_id,
                quantity: *quantity,
                color: None,
                size: None,
            })
            .collect(),
        shipping_address: address(),
        payment_method: "card".into(),
        notes: None,
    }
}

pub fn bearer(user: &AuthUser) -> String {
    let claims = Claims {
        sub: user.user_id.to_string(),
        role: user.role.clone(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token");
    format!("Bearer {token}")
}
