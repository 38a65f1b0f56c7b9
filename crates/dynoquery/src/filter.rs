//! Per-attribute query filters.
//!
//! A filter is one condition on one attribute. The attribute name is the
//! key of the owning specification's filter map, which also enforces the
//! at-most-one-filter-per-attribute invariant.

use serde_json::Value;

/// A single condition on one attribute within a query specification.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals(Value),
    LessThan(Value),
    GreaterThan(Value),
    LessOrEqual(Value),
    GreaterOrEqual(Value),
    Between(Value, Value),
    BeginsWith(String),
}

/// Discriminant of [`Filter`], used for kind-based key lookups during
/// index selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Equals,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
    Between,
    BeginsWith,
}

impl Filter {
    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::Equals(_) => FilterKind::Equals,
            Filter::LessThan(_) => FilterKind::LessThan,
            Filter::GreaterThan(_) => FilterKind::GreaterThan,
            Filter::LessOrEqual(_) => FilterKind::LessOrEqual,
            Filter::GreaterOrEqual(_) => FilterKind::GreaterOrEqual,
            Filter::Between(_, _) => FilterKind::Between,
            Filter::BeginsWith(_) => FilterKind::BeginsWith,
        }
    }
}

impl FilterKind {
    /// The condition name used in builder log lines and conflict errors.
    pub(crate) fn condition_name(self) -> &'static str {
        match self {
            FilterKind::Equals => "equals",
            FilterKind::LessThan => "less than",
            FilterKind::GreaterThan => "greater than",
            FilterKind::LessOrEqual => "less than or equal",
            FilterKind::GreaterOrEqual => "greater than or equal",
            FilterKind::Between => "between",
            FilterKind::BeginsWith => "begins with",
        }
    }
}
