//! Table handles and the per-table index metadata cache.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::backend::{
    ProjectionDescription, SecondaryIndexDescription, SecondaryIndexKind, StoreBackend,
    TableDescription,
};
use crate::compile;
use crate::error::{Error, Result};
use crate::parser::QueryParser;
use crate::query::QueryExpr;
use crate::select;

/// Name under which the table's own key schema is tracked alongside the
/// secondary indexes. Not a legal store-side index name, so it can never
/// collide with a real one.
pub const PRIMARY_INDEX_NAME: &str = "#primary";

/// Metadata for one index (primary or secondary) of a table.
#[derive(Debug, Clone)]
pub struct TableIndex {
    pub name: String,
    pub table_name: String,
    pub partition_key: String,
    /// Present only for composite indexes.
    pub sort_key: Option<String>,
    /// Explicit projected-attribute set; `None` when the index projects
    /// every attribute.
    pub attribute_set: Option<BTreeSet<String>>,
    pub item_count: u64,
    pub consistent_readable: bool,
}

impl TableIndex {
    /// Whether the index has both a partition key and a sort key.
    pub fn is_composite(&self) -> bool {
        self.sort_key.is_some()
    }

    /// Whether the index projects every item attribute.
    pub fn includes_all_attributes(&self) -> bool {
        self.attribute_set.is_none()
    }

    /// Whether the index projects `attribute`.
    pub fn projects(&self, attribute: &str) -> bool {
        match &self.attribute_set {
            None => true,
            Some(set) => set.contains(attribute),
        }
    }

    fn key_attributes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.as_str()).chain(self.sort_key.as_deref())
    }

    fn from_secondary(
        desc: &SecondaryIndexDescription,
        table_name: &str,
        primary_keys: &[&str],
    ) -> Self {
        let mut index = Self {
            name: desc.name.clone(),
            table_name: table_name.to_string(),
            partition_key: desc.partition_key.clone(),
            sort_key: desc.sort_key.clone(),
            attribute_set: None,
            item_count: desc.item_count,
            // Only local secondary indexes share the table's partitions and
            // can serve consistent reads.
            consistent_readable: matches!(desc.kind, SecondaryIndexKind::Local),
        };

        index.attribute_set = match &desc.projection {
            ProjectionDescription::All => None,
            ProjectionDescription::KeysOnly => Some(key_projection(&index, primary_keys)),
            ProjectionDescription::Include { attributes } => {
                let mut set = key_projection(&index, primary_keys);
                set.extend(attributes.iter().cloned());
                Some(set)
            }
        };

        index
    }
}

/// The key attributes every non-all projection includes: the index's own
/// keys plus the primary index's keys.
fn key_projection(index: &TableIndex, primary_keys: &[&str]) -> BTreeSet<String> {
    index
        .key_attributes()
        .chain(primary_keys.iter().copied())
        .map(str::to_string)
        .collect()
}

/// A handle to one table of the backing store.
///
/// The handle lazily caches the table's index metadata on first query and
/// reuses it for the handle's lifetime;
/// [`invalidate_indexes`](Table::invalidate_indexes) drops the cache so the
/// next query rebuilds it wholesale from a fresh metadata fetch.
pub struct Table {
    name: String,
    backend: Arc<dyn StoreBackend>,
    indexes: RwLock<Option<BTreeMap<String, TableIndex>>>,
}

impl Table {
    pub(crate) fn new(backend: Arc<dyn StoreBackend>, name: String) -> Self {
        Self {
            name,
            backend,
            indexes: RwLock::new(None),
        }
    }

    /// The table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute `expr` against this table, returning a parser that pulls
    /// matching records one at a time.
    ///
    /// Fails up front with any conflict recorded while `expr` was built,
    /// or when no index can satisfy the specification.
    pub async fn query(&self, expr: &QueryExpr) -> Result<QueryParser> {
        if let Some(conflict) = &expr.conflict {
            return Err(conflict.clone().into());
        }

        let indexes = self.indexes().await?;
        let chosen = select::choose_index(&self.name, expr, &indexes)?;
        let request = compile::compile(expr, chosen)?;

        Ok(QueryParser::new(self.backend.clone(), request, expr))
    }

    /// Put an item into the table, replacing any existing item with the
    /// same key. The item must serialize to a JSON object.
    pub async fn put<T: Serialize>(&self, item: &T) -> Result<()> {
        let value = serde_json::to_value(item).map_err(Error::Encode)?;
        if !value.is_object() {
            return Err(Error::NotAnObject);
        }
        self.backend.put_item(&self.name, value).await?;
        Ok(())
    }

    /// Drop cached index metadata; the next query rebuilds it wholesale.
    pub fn invalidate_indexes(&self) {
        *self.indexes.write() = None;
    }

    /// All known indexes of this table, fetching metadata on first use.
    ///
    /// A failed fetch leaves the cache empty, so the next query retries.
    async fn indexes(&self) -> Result<BTreeMap<String, TableIndex>> {
        if let Some(cached) = self.indexes.read().as_ref() {
            return Ok(cached.clone());
        }

        let description = self.backend.describe_table(&self.name).await?;
        let built = build_indexes(&self.name, &description);
        debug!(
            table = %self.name,
            indexes = built.len(),
            "index metadata loaded"
        );
        *self.indexes.write() = Some(built.clone());
        Ok(built)
    }
}

/// Build the full descriptor map from one metadata fetch, replacing any
/// prior contents wholesale.
fn build_indexes(
    table_name: &str,
    description: &TableDescription,
) -> BTreeMap<String, TableIndex> {
    let primary = TableIndex {
        name: PRIMARY_INDEX_NAME.to_string(),
        table_name: table_name.to_string(),
        partition_key: description.partition_key.clone(),
        sort_key: description.sort_key.clone(),
        attribute_set: None,
        item_count: description.item_count,
        consistent_readable: true,
    };
    let primary_keys: Vec<&str> = primary.key_attributes().collect();

    let mut indexes = BTreeMap::new();
    for desc in &description.secondary_indexes {
        let index = TableIndex::from_secondary(desc, table_name, &primary_keys);
        indexes.insert(index.name.clone(), index);
    }
    indexes.insert(primary.name.clone(), primary);
    indexes
}
