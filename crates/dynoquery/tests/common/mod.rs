//! Shared scripted backend for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use dynoquery::{
    BackendError, ProjectionDescription, QueryPage, QueryRequest, SecondaryIndexDescription,
    SecondaryIndexKind, StoreBackend, TableDescription,
};

/// One scripted response to a `query` call.
pub enum QueryStep {
    Page(QueryPage),
    Fail(BackendError),
    /// Never resolves; used to exercise cancellation.
    Hang,
}

/// A scripted in-memory backend: canned table metadata, a queue of query
/// responses, and call counters.
pub struct MockBackend {
    description: TableDescription,
    describe_failures: AtomicUsize,
    steps: Mutex<VecDeque<QueryStep>>,
    pub describe_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    /// Every query call's request and exclusive start key, in order.
    pub requests: Mutex<Vec<(QueryRequest, Option<Value>)>>,
    pub puts: Mutex<Vec<(String, Value)>>,
}

impl MockBackend {
    pub fn new(description: TableDescription, steps: Vec<QueryStep>) -> Arc<Self> {
        Self::with_describe_failures(description, steps, 0)
    }

    /// Like [`new`](Self::new), but the first `failures` metadata fetches
    /// fail before one succeeds.
    pub fn with_describe_failures(
        description: TableDescription,
        steps: Vec<QueryStep>,
        failures: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            description,
            describe_failures: AtomicUsize::new(failures),
            steps: Mutex::new(steps.into()),
            describe_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            puts: Mutex::new(Vec::new()),
        })
    }

    pub fn describe_count(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// The exclusive start key passed to the nth query call.
    pub fn start_key(&self, call: usize) -> Option<Value> {
        self.requests.lock()[call].1.clone()
    }
}

#[async_trait]
impl StoreBackend for MockBackend {
    async fn describe_table(&self, _table: &str) -> Result<TableDescription, BackendError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.describe_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.describe_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(BackendError::Store {
                code: "Unavailable".to_string(),
                message: "metadata fetch failed".to_string(),
            });
        }
        Ok(self.description.clone())
    }

    async fn query(
        &self,
        request: &QueryRequest,
        exclusive_start_key: Option<&Value>,
    ) -> Result<QueryPage, BackendError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .push((request.clone(), exclusive_start_key.cloned()));

        let step = self.steps.lock().pop_front();
        match step {
            Some(QueryStep::Page(page)) => Ok(page),
            Some(QueryStep::Fail(err)) => Err(err),
            Some(QueryStep::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Ok(QueryPage::default()),
        }
    }

    async fn put_item(&self, table: &str, item: Value) -> Result<(), BackendError> {
        self.puts.lock().push((table.to_string(), item));
        Ok(())
    }
}

/// A table description with no secondary indexes.
pub fn simple_table(name: &str, partition_key: &str, sort_key: Option<&str>) -> TableDescription {
    TableDescription {
        name: name.to_string(),
        partition_key: partition_key.to_string(),
        sort_key: sort_key.map(str::to_string),
        item_count: 0,
        secondary_indexes: Vec::new(),
    }
}

/// A global secondary index with an all-attributes projection.
pub fn gsi(name: &str, partition_key: &str, sort_key: Option<&str>) -> SecondaryIndexDescription {
    SecondaryIndexDescription {
        name: name.to_string(),
        kind: SecondaryIndexKind::Global,
        partition_key: partition_key.to_string(),
        sort_key: sort_key.map(str::to_string),
        projection: ProjectionDescription::All,
        item_count: 0,
    }
}

/// A scripted page of items with an optional continuation token.
pub fn page(items: Vec<Value>, last_evaluated_key: Option<Value>) -> QueryStep {
    QueryStep::Page(QueryPage {
        items,
        last_evaluated_key,
    })
}

pub fn transient_failure() -> QueryStep {
    QueryStep::Fail(BackendError::Store {
        code: "Throttled".to_string(),
        message: "try again".to_string(),
    })
}
