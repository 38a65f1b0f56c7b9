//! Store-side expression trees carried by compiled query requests.
//!
//! dynoquery never evaluates these; it only constructs them. Both the key
//! condition and the filter condition are serde-serializable so a backend
//! can ship them on the wire verbatim (JSON / MessagePack).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A condition expression evaluated by the backing store against each
/// candidate item.
///
/// Compiled filter conditions are built from per-attribute filters; callers
/// may also attach hand-built trees for conditions a single filter cannot
/// express, such as `Or` disjunctions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ConditionExpr {
    // Leaf nodes
    /// Reference to an item attribute. Supports dot-separated nested paths.
    Attr(String),
    /// A literal JSON value.
    Literal(Value),

    // Comparisons
    Eq(Box<ConditionExpr>, Box<ConditionExpr>),
    Ne(Box<ConditionExpr>, Box<ConditionExpr>),
    Lt(Box<ConditionExpr>, Box<ConditionExpr>),
    Le(Box<ConditionExpr>, Box<ConditionExpr>),
    Gt(Box<ConditionExpr>, Box<ConditionExpr>),
    Ge(Box<ConditionExpr>, Box<ConditionExpr>),
    Between(Box<ConditionExpr>, Box<ConditionExpr>, Box<ConditionExpr>),

    // String operations
    BeginsWith(Box<ConditionExpr>, String),

    // Existence checks
    AttributeExists(String),
    AttributeNotExists(String),

    // Boolean logic
    And(Vec<ConditionExpr>),
    Or(Vec<ConditionExpr>),
    Not(Box<ConditionExpr>),
}

impl ConditionExpr {
    /// Create an attribute reference.
    pub fn attr(name: impl Into<String>) -> Self {
        ConditionExpr::Attr(name.into())
    }

    /// Create a literal value.
    pub fn literal(val: impl Into<Value>) -> Self {
        ConditionExpr::Literal(val.into())
    }

    /// `left == right`
    pub fn eq(left: ConditionExpr, right: ConditionExpr) -> Self {
        ConditionExpr::Eq(Box::new(left), Box::new(right))
    }

    /// `left != right`
    pub fn ne(left: ConditionExpr, right: ConditionExpr) -> Self {
        ConditionExpr::Ne(Box::new(left), Box::new(right))
    }

    /// `left < right`
    pub fn lt(left: ConditionExpr, right: ConditionExpr) -> Self {
        ConditionExpr::Lt(Box::new(left), Box::new(right))
    }

    /// `left <= right`
    pub fn le(left: ConditionExpr, right: ConditionExpr) -> Self {
        ConditionExpr::Le(Box::new(left), Box::new(right))
    }

    /// `left > right`
    pub fn gt(left: ConditionExpr, right: ConditionExpr) -> Self {
        ConditionExpr::Gt(Box::new(left), Box::new(right))
    }

    /// `left >= right`
    pub fn ge(left: ConditionExpr, right: ConditionExpr) -> Self {
        ConditionExpr::Ge(Box::new(left), Box::new(right))
    }

    /// `val BETWEEN low AND high`
    pub fn between(val: ConditionExpr, low: ConditionExpr, high: ConditionExpr) -> Self {
        ConditionExpr::Between(Box::new(val), Box::new(low), Box::new(high))
    }

    /// `begins_with(expr, prefix)`
    pub fn begins_with(expr: ConditionExpr, prefix: impl Into<String>) -> Self {
        ConditionExpr::BeginsWith(Box::new(expr), prefix.into())
    }

    /// `attribute_exists(path)`
    pub fn attribute_exists(path: impl Into<String>) -> Self {
        ConditionExpr::AttributeExists(path.into())
    }

    /// `attribute_not_exists(path)`
    pub fn attribute_not_exists(path: impl Into<String>) -> Self {
        ConditionExpr::AttributeNotExists(path.into())
    }

    /// `expr1 AND expr2 AND ...`
    pub fn and(exprs: Vec<ConditionExpr>) -> Self {
        ConditionExpr::And(exprs)
    }

    /// `expr1 OR expr2 OR ...`
    pub fn or(exprs: Vec<ConditionExpr>) -> Self {
        ConditionExpr::Or(exprs)
    }

    /// `NOT expr`
    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: ConditionExpr) -> Self {
        ConditionExpr::Not(Box::new(expr))
    }
}

/// The key condition of a compiled query: partition-key equality plus an
/// optional sort-key comparator, joined with logical AND.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyConditionExpr {
    pub partition: KeyMatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortKeyMatch>,
}

/// Equality match on a key attribute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyMatch {
    pub key: String,
    pub value: Value,
}

/// A comparator applied to a composite index's sort key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortKeyMatch {
    pub key: String,
    pub condition: SortKeyCondition,
}

/// Sort key condition of a key condition expression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SortKeyCondition {
    Eq { value: Value },
    Lt { value: Value },
    Le { value: Value },
    Gt { value: Value },
    Ge { value: Value },
    Between { low: Value, high: Value },
    BeginsWith { prefix: String },
}
