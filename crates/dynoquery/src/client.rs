//! High-level client handle.

use std::sync::Arc;

use crate::backend::StoreBackend;
use crate::table::Table;

/// A high-level client for a DynamoDB-style document store.
///
/// `Client` wraps a [`StoreBackend`] implementation and mints [`Table`]
/// handles. It is cheaply clonable.
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn StoreBackend>,
}

impl Client {
    /// Create a new client from a backend implementation.
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Create a handle for `table`.
    ///
    /// This only records metadata for subsequent requests and is
    /// guaranteed to succeed; the table's index metadata is fetched lazily
    /// on first query.
    pub fn table(&self, table: impl Into<String>) -> Table {
        Table::new(self.backend.clone(), table.into())
    }
}
