//! Index viability filtering and selection.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::SelectError;
use crate::filter::FilterKind;
use crate::query::QueryExpr;
use crate::table::TableIndex;

/// Choose the index a query specification will run against.
///
/// Non-viable indexes are discarded first. Among the survivors, an index
/// whose sort key carries an equals filter wins over begins-with, which
/// wins over between, which wins over any remaining survivor. When several
/// indexes qualify equally, which one is returned is
/// implementation-defined; callers must not rely on it.
pub(crate) fn choose_index<'a>(
    table: &str,
    expr: &QueryExpr,
    indexes: &'a BTreeMap<String, TableIndex>,
) -> Result<&'a TableIndex, SelectError> {
    let viable = viable_indexes(expr, indexes);
    if viable.is_empty() {
        warn!(table, "no viable indexes found");
        return Err(SelectError::NoViableIndexes {
            table: table.to_string(),
        });
    }
    debug!(
        table,
        indexes = ?viable.iter().map(|index| index.name.as_str()).collect::<Vec<_>>(),
        "found viable indexes"
    );

    // Prioritize indexes whose sort key can be folded into the key
    // condition, in decreasing order of selectivity.
    for kind in [FilterKind::Equals, FilterKind::BeginsWith, FilterKind::Between] {
        let filter_keys = expr.keys_of_filter_kind(kind);
        let chosen = viable.iter().copied().find(|index| {
            index
                .sort_key
                .as_deref()
                .is_some_and(|sort_key| filter_keys.contains(sort_key))
        });
        if let Some(chosen) = chosen {
            debug!(index = %chosen.name, ?kind, "choosing index with sort key filter");
            return Ok(chosen);
        }
    }

    let chosen = viable[0];
    debug!(index = %chosen.name, "choosing index for query");
    Ok(chosen)
}

/// Apply the viability predicates in fixed order, logging each removal.
fn viable_indexes<'a>(
    expr: &QueryExpr,
    indexes: &'a BTreeMap<String, TableIndex>,
) -> Vec<&'a TableIndex> {
    let mut viable: Vec<&TableIndex> = indexes.values().collect();

    // Partition equality is mandatory: these stores never support
    // partition-key range queries.
    let equals_keys = expr.keys_of_filter_kind(FilterKind::Equals);
    retain_viable(&mut viable, "partition key not in equals filters", |index| {
        equals_keys.contains(index.partition_key.as_str())
    });

    if expr.consistent_read {
        retain_viable(&mut viable, "index does not support consistent read", |index| {
            index.consistent_readable
        });
    }

    if let Some(order) = &expr.order {
        retain_viable(
            &mut viable,
            "index does not sort on the requested attribute",
            |index| index.sort_key.as_deref() == Some(order.key.as_str()),
        );
    }

    match &expr.attributes {
        Some(attributes) => retain_viable(
            &mut viable,
            "index does not include all selected attributes",
            |index| attributes.iter().all(|attribute| index.projects(attribute)),
        ),
        // An unprojected query implicitly asks for everything.
        None => retain_viable(&mut viable, "index does not project all attributes", |index| {
            index.includes_all_attributes()
        }),
    }

    viable
}

fn retain_viable<'a>(
    viable: &mut Vec<&'a TableIndex>,
    failed: &str,
    valid: impl Fn(&TableIndex) -> bool,
) {
    viable.retain(|index| {
        let keep = valid(index);
        if !keep {
            debug!(
                index = %index.name,
                partition_key = %index.partition_key,
                sort_key = index.sort_key.as_deref().unwrap_or(""),
                reason = failed,
                "index not viable"
            );
        }
        keep
    });
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::table::PRIMARY_INDEX_NAME;

    fn index(
        name: &str,
        partition_key: &str,
        sort_key: Option<&str>,
        consistent: bool,
        attributes: Option<&[&str]>,
    ) -> TableIndex {
        TableIndex {
            name: name.to_string(),
            table_name: "orders".to_string(),
            partition_key: partition_key.to_string(),
            sort_key: sort_key.map(str::to_string),
            attribute_set: attributes
                .map(|attrs| attrs.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>()),
            item_count: 0,
            consistent_readable: consistent,
        }
    }

    fn index_map(indexes: Vec<TableIndex>) -> BTreeMap<String, TableIndex> {
        indexes
            .into_iter()
            .map(|index| (index.name.clone(), index))
            .collect()
    }

    #[test]
    fn test_partition_equality_is_mandatory() {
        let indexes = index_map(vec![index(PRIMARY_INDEX_NAME, "id", None, true, None)]);

        // Range filter on the partition key does not qualify.
        let expr = QueryExpr::key("id").greater_than(5);
        let err = choose_index("orders", &expr, &indexes).unwrap_err();
        assert!(matches!(err, SelectError::NoViableIndexes { table } if table == "orders"));

        let expr = QueryExpr::key("id").equals(5);
        let chosen = choose_index("orders", &expr, &indexes).unwrap();
        assert_eq!(chosen.name, PRIMARY_INDEX_NAME);
    }

    #[test]
    fn test_consistent_read_excludes_inconsistent_indexes() {
        let indexes = index_map(vec![
            index(PRIMARY_INDEX_NAME, "id", None, true, None),
            index("gsi", "status", None, false, None),
        ]);

        let expr = QueryExpr::key("status").equals("active").consistent_read(true);
        let err = choose_index("orders", &expr, &indexes).unwrap_err();
        assert!(matches!(err, SelectError::NoViableIndexes { .. }));

        // Without the consistency requirement the GSI qualifies.
        let expr = QueryExpr::key("status").equals("active");
        assert_eq!(choose_index("orders", &expr, &indexes).unwrap().name, "gsi");
    }

    #[test]
    fn test_order_requires_matching_sort_key() {
        let indexes = index_map(vec![
            index(PRIMARY_INDEX_NAME, "id", Some("ts"), true, None),
            index("by-seq", "id", Some("seq"), false, None),
        ]);

        let expr = QueryExpr::key("id").equals(1).order_descending("seq");
        assert_eq!(
            choose_index("orders", &expr, &indexes).unwrap().name,
            "by-seq"
        );

        let expr = QueryExpr::key("id").equals(1).order_ascending("other");
        assert!(choose_index("orders", &expr, &indexes).is_err());
    }

    #[test]
    fn test_projection_coverage() {
        let indexes = index_map(vec![
            index("narrow", "id", None, false, Some(&["id", "name"])),
            index("wide", "id", None, false, None),
        ]);

        // Explicit selection within the narrow projection: both qualify,
        // and "narrow" wins on map order.
        let expr = QueryExpr::key("id").equals(1).select(["name"]);
        assert_eq!(
            choose_index("orders", &expr, &indexes).unwrap().name,
            "narrow"
        );

        // Selection outside the narrow projection: only "wide" qualifies.
        let expr = QueryExpr::key("id").equals(1).select(["name", "email"]);
        assert_eq!(choose_index("orders", &expr, &indexes).unwrap().name, "wide");

        // No selection means everything, which only "wide" projects.
        let expr = QueryExpr::key("id").equals(1);
        assert_eq!(choose_index("orders", &expr, &indexes).unwrap().name, "wide");
    }

    #[test]
    fn test_sort_key_filter_priority() {
        let indexes = index_map(vec![
            index("a-by-ts", "id", Some("ts"), false, None),
            index("b-by-seq", "id", Some("seq"), false, None),
        ]);

        // Equals on "seq" beats between on "ts".
        let expr = QueryExpr::key("id")
            .equals(1)
            .and("ts")
            .between(100, 200)
            .and("seq")
            .equals(7);
        assert_eq!(
            choose_index("orders", &expr, &indexes).unwrap().name,
            "b-by-seq"
        );

        // Begins-with beats between.
        let indexes = index_map(vec![
            index("a-by-ts", "id", Some("ts"), false, None),
            index("b-by-name", "id", Some("name"), false, None),
        ]);
        let expr = QueryExpr::key("id")
            .equals(1)
            .and("ts")
            .between(100, 200)
            .and("name")
            .begins_with("al");
        assert_eq!(
            choose_index("orders", &expr, &indexes).unwrap().name,
            "b-by-name"
        );
    }

    #[test]
    fn test_falls_back_to_viable_set_without_sort_key_filters() {
        let indexes = index_map(vec![
            index("by-ts", "id", Some("ts"), false, None),
            index("plain", "id", None, false, None),
        ]);

        let expr = QueryExpr::key("id").equals(1);
        // No sort-key filter anywhere: first viable index in map order.
        assert_eq!(choose_index("orders", &expr, &indexes).unwrap().name, "by-ts");
    }
}
