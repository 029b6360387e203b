use std::sync::Arc;

use deck_store::TaskStore;

/// Shared handle the router threads through every handler. The store is
/// the single writer; the bridge only forwards.
#[derive(Clone)]
pub struct BridgeState {
    store: Arc<TaskStore>,
}

impl BridgeState {
    pub fn new(store: TaskStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }
}
