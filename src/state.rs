use std::sync::Arc;

use crate::{
    config::AppConfig,
    store::{AuditLog, OrderStore, ProductCatalog},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub orders: Arc<dyn OrderStore>,
    pub audit: Arc<dyn AuditLog>,
}

impl AppState {
    /// Builds state where one backend serves the catalog, the order store and
    /// the audit trail.
    pub fn with_store<S>(config: AppConfig, store: S) -> Self
    where
        S: ProductCatalog + OrderStore + AuditLog + 'static,
    {
        let store = Arc::new(store);
        Self {
            config: Arc::new(config),
            catalog: store.clone(),
            orders: store.clone(),
            audit: store,
        }
    }
}
