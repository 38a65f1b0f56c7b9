//! The backing-store boundary: wire types and the async client trait.
//!
//! Everything the core needs from the store goes through [`StoreBackend`]:
//! one metadata fetch, one paginated query call, and the write path. Wire
//! shapes are plain serde types so transports can ship them as-is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BackendError;
use crate::expression::{ConditionExpr, KeyConditionExpr};

/// Raw description of a table's key schema and secondary indexes, as
/// reported by the store's metadata call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDescription {
    pub name: String,
    pub partition_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    #[serde(default)]
    pub item_count: u64,
    #[serde(default)]
    pub secondary_indexes: Vec<SecondaryIndexDescription>,
}

/// Raw description of one secondary index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryIndexDescription {
    pub name: String,
    pub kind: SecondaryIndexKind,
    pub partition_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    pub projection: ProjectionDescription,
    #[serde(default)]
    pub item_count: u64,
}

/// Replication class of a secondary index. Local secondary indexes share
/// the table's partitions and support consistent reads; global ones are
/// replicated asynchronously and do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryIndexKind {
    Global,
    Local,
}

/// The attribute subset a secondary index stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProjectionDescription {
    /// Every item attribute.
    All,
    /// Key attributes of the index and of the table's primary index.
    KeysOnly,
    /// Key attributes plus an explicit list.
    Include { attributes: Vec<String> },
}

/// A compiled, backend-shaped query request.
///
/// The continuation token is not part of the request; the parser supplies
/// it per page as a separate argument to [`StoreBackend::query`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub table_name: String,
    /// Absent for the primary index: the backend then uses the table's own
    /// key schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    pub key_condition: KeyConditionExpr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<ConditionExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_forward: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// One page of raw query results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryPage {
    /// Ordered raw items; each is a JSON object of attribute values.
    pub items: Vec<Value>,
    /// Continuation token for the next page. Absent (or an empty object)
    /// when this is the final page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<Value>,
}

/// Low-level, asynchronous access to the backing store.
///
/// Implementations must be cancel-safe: dropping an in-flight `query`
/// future, or returning an error, must leave the connection in a state
/// where the same call can simply be retried. The core issues at most one
/// call at a time per parser.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Fetch the table's key schema and secondary index metadata.
    async fn describe_table(&self, table: &str) -> Result<TableDescription, BackendError>;

    /// Execute one page of a compiled query, starting after
    /// `exclusive_start_key` when present.
    async fn query(
        &self,
        request: &QueryRequest,
        exclusive_start_key: Option<&Value>,
    ) -> Result<QueryPage, BackendError>;

    /// Put an item into a table, replacing any existing item with the same
    /// key.
    async fn put_item(&self, table: &str, item: Value) -> Result<(), BackendError>;
}
