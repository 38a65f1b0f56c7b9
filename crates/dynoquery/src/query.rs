//! Fluent query specification builder.
//!
//! A specification starts from [`QueryExpr::key`] and grows through
//! chained `.and(key).comparator(..)` calls plus auxiliary setters. The
//! chain itself never fails: the first duplicate-key conflict is recorded
//! and surfaced when the query is executed.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::BuildError;
use crate::expression::ConditionExpr;
use crate::filter::{Filter, FilterKind};

/// Requested result ordering over a sort key attribute.
#[derive(Debug, Clone)]
pub(crate) struct SortDirective {
    pub(crate) key: String,
    pub(crate) descending: bool,
}

/// A fully-formed query specification.
///
/// Accumulated through the fluent builder; immutable once handed to
/// [`Table::query`](crate::Table::query).
#[derive(Debug, Clone)]
pub struct QueryExpr {
    pub(crate) filters: BTreeMap<String, Filter>,
    pub(crate) limit: Option<usize>,
    pub(crate) attributes: Option<Vec<String>>,
    pub(crate) order: Option<SortDirective>,
    pub(crate) max_pagination: Option<usize>,
    pub(crate) consistent_read: bool,
    pub(crate) extra_conditions: Vec<ConditionExpr>,
    /// First duplicate-key conflict, set once and never cleared.
    pub(crate) conflict: Option<BuildError>,
}

/// A partially-formed query specification: a key waiting for its
/// comparator.
#[derive(Debug, Clone)]
pub struct QueryKey {
    expr: QueryExpr,
    key: String,
}

impl QueryExpr {
    /// Begin a new query specification with a condition on `key`.
    pub fn key(key: impl Into<String>) -> QueryKey {
        QueryKey {
            expr: QueryExpr {
                filters: BTreeMap::new(),
                limit: None,
                attributes: None,
                order: None,
                max_pagination: None,
                consistent_read: false,
                extra_conditions: Vec::new(),
                conflict: None,
            },
            key: key.into(),
        }
    }

    /// Extend the query with an additional condition.
    pub fn and(self, key: impl Into<String>) -> QueryKey {
        QueryKey {
            expr: self,
            key: key.into(),
        }
    }

    /// Restrict the number of items returnable by the query.
    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        debug!(count, "query limit set");
        self
    }

    /// Restrict the attributes returned by the query.
    ///
    /// Only indexes projecting every selected attribute remain viable.
    pub fn select<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attributes: Vec<String> = attributes.into_iter().map(Into::into).collect();
        debug!(
            ?attributes,
            "query requires index projecting selected attributes"
        );
        self.attributes = Some(attributes);
        self
    }

    /// Order returned items by `sort_key`, lowest value first.
    ///
    /// Only indexes sorting on `sort_key` remain viable.
    pub fn order_ascending(mut self, sort_key: impl Into<String>) -> Self {
        let key = sort_key.into();
        debug!(sort_key = %key, "query requires index sorting ascending on attribute");
        self.order = Some(SortDirective {
            key,
            descending: false,
        });
        self
    }

    /// Order returned items by `sort_key`, highest value first.
    pub fn order_descending(mut self, sort_key: impl Into<String>) -> Self {
        let key = sort_key.into();
        debug!(sort_key = %key, "query requires index sorting descending on attribute");
        self.order = Some(SortDirective {
            key,
            descending: true,
        });
        self
    }

    /// Restrict the number of paginated backend requests the parser may
    /// issue. Once the cap is reached the parser reports
    /// [`MaxPaginationReached`](crate::ParsingComplete::MaxPaginationReached).
    pub fn max_pagination(mut self, count: usize) -> Self {
        self.max_pagination = Some(count);
        debug!(count, "max pagination of query set");
        self
    }

    /// Set the read consistency.
    ///
    /// Requesting a consistent read also forces max pagination to 1: a
    /// multi-page read is not itself consistent across pages. This holds
    /// regardless of call order relative to [`max_pagination`](Self::max_pagination).
    pub fn consistent_read(mut self, val: bool) -> Self {
        self.consistent_read = val;
        if val {
            self.max_pagination = Some(1);
            debug!("query requires consistent-readable index; max pagination forced to 1");
        }
        self
    }

    /// Attach a condition that per-attribute filters cannot express, such
    /// as an `Or` disjunction. Applied in addition to all other filters.
    pub fn with_condition(mut self, condition: ConditionExpr) -> Self {
        debug!("additional filter condition attached");
        self.extra_conditions.push(condition);
        self
    }

    fn add_filter(&mut self, key: String, filter: Filter) {
        let condition = filter.kind().condition_name();
        if self.filters.contains_key(&key) {
            let err = BuildError::KeyConflict { key, condition };
            warn!(error = %err, "query build conflict");
            // Keep the first conflict and the first-inserted filter.
            if self.conflict.is_none() {
                self.conflict = Some(err);
            }
        } else {
            debug!(key = %key, condition, "query filter added");
            self.filters.insert(key, filter);
        }
    }

    /// Keys of every filter of the given kind.
    pub(crate) fn keys_of_filter_kind(&self, kind: FilterKind) -> BTreeSet<&str> {
        self.filters
            .iter()
            .filter(|(_, filter)| filter.kind() == kind)
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

impl QueryKey {
    /// The value associated with the key must equal `val`.
    pub fn equals(self, val: impl Into<Value>) -> QueryExpr {
        self.apply(Filter::Equals(val.into()))
    }

    /// The value associated with the key must be less than `val`.
    pub fn less_than(self, val: impl Into<Value>) -> QueryExpr {
        self.apply(Filter::LessThan(val.into()))
    }

    /// The value associated with the key must be greater than `val`.
    pub fn greater_than(self, val: impl Into<Value>) -> QueryExpr {
        self.apply(Filter::GreaterThan(val.into()))
    }

    /// The value associated with the key must be less than or equal to
    /// `val`.
    pub fn less_or_equal(self, val: impl Into<Value>) -> QueryExpr {
        self.apply(Filter::LessOrEqual(val.into()))
    }

    /// The value associated with the key must be greater than or equal to
    /// `val`.
    pub fn greater_or_equal(self, val: impl Into<Value>) -> QueryExpr {
        self.apply(Filter::GreaterOrEqual(val.into()))
    }

    /// The value associated with the key must be between `low` and `high`,
    /// inclusive.
    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> QueryExpr {
        self.apply(Filter::Between(low.into(), high.into()))
    }

    /// The value associated with the key must begin with `prefix`.
    pub fn begins_with(self, prefix: impl Into<String>) -> QueryExpr {
        self.apply(Filter::BeginsWith(prefix.into()))
    }

    fn apply(mut self, filter: Filter) -> QueryExpr {
        self.expr.add_filter(self.key, filter);
        self.expr
    }
}
