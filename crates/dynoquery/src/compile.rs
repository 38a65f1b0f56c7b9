//! Compilation of query specifications into backend-shaped requests.

use std::collections::BTreeMap;

use crate::backend::QueryRequest;
use crate::error::SelectError;
use crate::expression::{ConditionExpr, KeyConditionExpr, KeyMatch, SortKeyCondition, SortKeyMatch};
use crate::filter::Filter;
use crate::query::QueryExpr;
use crate::table::{PRIMARY_INDEX_NAME, TableIndex};

/// Build the backend request for `expr` running against `index`.
///
/// Selection has already guaranteed an equals filter on the index's
/// partition key. A sort-key filter folds into the key condition; every
/// other filter, plus any caller-attached conditions, becomes the filter
/// condition.
pub(crate) fn compile(expr: &QueryExpr, index: &TableIndex) -> Result<QueryRequest, SelectError> {
    let mut remaining: BTreeMap<&str, &Filter> = expr
        .filters
        .iter()
        .map(|(key, filter)| (key.as_str(), filter))
        .collect();

    let partition_value = match remaining.remove(index.partition_key.as_str()) {
        Some(Filter::Equals(value)) => value.clone(),
        _ => {
            return Err(SelectError::MissingPartitionEquals {
                key: index.partition_key.clone(),
            });
        }
    };

    let sort = if let Some(sort_key) = &index.sort_key
        && let Some(filter) = remaining.remove(sort_key.as_str())
    {
        Some(SortKeyMatch {
            key: sort_key.clone(),
            condition: sort_condition(filter),
        })
    } else {
        None
    };

    let mut terms: Vec<ConditionExpr> = remaining
        .iter()
        .map(|(key, filter)| condition_term(key, filter))
        .collect();
    terms.extend(expr.extra_conditions.iter().cloned());

    let filter = match terms.len() {
        0 => None,
        1 => terms.pop(),
        _ => Some(ConditionExpr::And(terms)),
    };

    Ok(QueryRequest {
        table_name: index.table_name.clone(),
        // Omitting the index name tells the backend to use the table's own
        // key schema.
        index_name: (index.name != PRIMARY_INDEX_NAME).then(|| index.name.clone()),
        key_condition: KeyConditionExpr {
            partition: KeyMatch {
                key: index.partition_key.clone(),
                value: partition_value,
            },
            sort,
        },
        filter,
        projection: expr.attributes.clone(),
        scan_forward: expr.order.as_ref().map(|order| !order.descending),
        consistent_read: expr.consistent_read.then_some(true),
        limit: expr.limit,
    })
}

fn sort_condition(filter: &Filter) -> SortKeyCondition {
    match filter {
        Filter::Equals(value) => SortKeyCondition::Eq {
            value: value.clone(),
        },
        Filter::LessThan(value) => SortKeyCondition::Lt {
            value: value.clone(),
        },
        Filter::GreaterThan(value) => SortKeyCondition::Gt {
            value: value.clone(),
        },
        Filter::LessOrEqual(value) => SortKeyCondition::Le {
            value: value.clone(),
        },
        Filter::GreaterOrEqual(value) => SortKeyCondition::Ge {
            value: value.clone(),
        },
        Filter::Between(low, high) => SortKeyCondition::Between {
            low: low.clone(),
            high: high.clone(),
        },
        Filter::BeginsWith(prefix) => SortKeyCondition::BeginsWith {
            prefix: prefix.clone(),
        },
    }
}

fn condition_term(key: &str, filter: &Filter) -> ConditionExpr {
    let attr = ConditionExpr::attr(key);
    match filter {
        Filter::Equals(value) => ConditionExpr::eq(attr, ConditionExpr::literal(value.clone())),
        Filter::LessThan(value) => ConditionExpr::lt(attr, ConditionExpr::literal(value.clone())),
        Filter::GreaterThan(value) => ConditionExpr::gt(attr, ConditionExpr::literal(value.clone())),
        Filter::LessOrEqual(value) => ConditionExpr::le(attr, ConditionExpr::literal(value.clone())),
        Filter::GreaterOrEqual(value) => {
            ConditionExpr::ge(attr, ConditionExpr::literal(value.clone()))
        }
        Filter::Between(low, high) => ConditionExpr::between(
            attr,
            ConditionExpr::literal(low.clone()),
            ConditionExpr::literal(high.clone()),
        ),
        Filter::BeginsWith(prefix) => ConditionExpr::begins_with(attr, prefix.clone()),
    }
}
