//! # dynoquery
//!
//! A lazily-paginated, index-aware query layer for DynamoDB-style document
//! stores.
//!
//! dynoquery sits between application code and a partitioned document
//! store: callers describe what they want with a fluent chain of
//! per-attribute conditions, and the crate figures out which of the
//! table's indexes can legally serve the query, compiles the conditions
//! into a backend-shaped request (key condition, filter condition,
//! projection, scan direction), and exposes the results as a pull-based
//! parser that fetches one page at a time, on demand.
//!
//! The store itself stays behind the [`StoreBackend`] trait: one metadata
//! call, one paginated query call, and the write path.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dynoquery::{Client, QueryExpr};
//!
//! # fn connect() -> std::sync::Arc<dyn dynoquery::StoreBackend> { unimplemented!() }
//! # async fn example() -> Result<(), dynoquery::Error> {
//! let client = Client::new(connect());
//! let table = client.table("orders");
//!
//! let expr = QueryExpr::key("tenant")
//!     .equals("t1")
//!     .and("ts")
//!     .between(100, 200)
//!     .limit(50);
//!
//! let mut parser = table.query(&expr).await?;
//! loop {
//!     match parser.next::<serde_json::Value>().await {
//!         Ok(order) => println!("{order}"),
//!         Err(err) if err.parsing_complete().is_some() => break,
//!         Err(err) => return Err(err),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod client;
pub mod error;
pub mod expression;
pub mod filter;
pub mod parser;
pub mod query;
pub mod table;

mod compile;
mod select;

pub use backend::{
    ProjectionDescription, QueryPage, QueryRequest, SecondaryIndexDescription, SecondaryIndexKind,
    StoreBackend, TableDescription,
};
pub use client::Client;
pub use error::{BackendError, BuildError, Error, ParsingComplete, Result, SelectError};
pub use expression::{ConditionExpr, KeyConditionExpr, KeyMatch, SortKeyCondition, SortKeyMatch};
pub use filter::{Filter, FilterKind};
pub use parser::QueryParser;
pub use query::{QueryExpr, QueryKey};
pub use table::{PRIMARY_INDEX_NAME, Table, TableIndex};
