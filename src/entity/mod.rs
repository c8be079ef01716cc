pub mod audit_logs;
pub mod order_items;
pub mod orders;
pub mod products;
