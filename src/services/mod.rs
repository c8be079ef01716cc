pub mod order_query;
pub mod order_service;
pub mod seller_analytics;
