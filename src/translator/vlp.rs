//! Variable-length relationship patterns compile to a `WITH RECURSIVE` CTE
//! (spec.md §4.3.6). `*min..max` with no `max` falls back to
//! `EngineConfig::default_max_hops`; `max_cte_depth` is a separate hard safety
//! bound applied regardless of what the query asks for.

use crate::parser::ast::Direction;
use crate::translator::label;
use crate::value::PropertyValue;

pub struct VlpPlan {
    pub cte_name: String,
    pub cte_sql: String,
    pub params: Vec<PropertyValue>,
    pub min_hops: u32,
    pub max_hops: u32,
}

/// Build the recursive CTE for one variable-length hop. `start_alias` and
/// `end_alias` are the already-bound node table aliases on either side of the
/// pattern; the CTE threads `current_id` from `start_alias.id` out to
/// `end_alias.id` through zero or more `edges` rows.
pub fn build_vlp_cte(
    cte_name: String,
    start_alias: &str,
    edge_type: Option<&str>,
    direction: Direction,
    min_hops: Option<u32>,
    max_hops: Option<u32>,
    default_max_hops: u32,
    max_cte_depth: u32,
) -> VlpPlan {
    let min_hops = min_hops.unwrap_or(1);
    let max_hops = max_hops.unwrap_or(default_max_hops).min(max_cte_depth);

    let (join_cond, next_col) = match direction {
        Direction::Right => ("e.source_id = p.current_id".to_string(), "e.target_id".to_string()),
        Direction::Left => ("e.target_id = p.current_id".to_string(), "e.source_id".to_string()),
        Direction::Either => {
            return build_either_direction_vlp(
                cte_name,
                start_alias,
                edge_type,
                min_hops,
                max_hops,
                max_cte_depth,
            )
        }
    };

    let mut params = Vec::new();
    let mut type_filter = String::new();
    if let Some(t) = edge_type {
        type_filter = " AND e.type = ?".to_string();
        params.push(PropertyValue::String(t.to_string()));
    }

    let cte_sql = format!(
        "{name}(start_id, current_id, depth, edge_ids) AS ( \
           SELECT {start}.id, {start}.id, 0, json_array() \
           UNION ALL \
           SELECT p.start_id, {next_col}, p.depth + 1, json_insert(p.edge_ids, '$[#]', e.id) \
           FROM {name} p JOIN edges e ON {join_cond} \
           WHERE p.depth < {max_hops}{type_filter} \
         )",
        name = cte_name,
        start = start_alias,
        next_col = next_col,
        join_cond = join_cond,
        max_hops = max_hops,
        type_filter = type_filter,
    );

    VlpPlan {
        cte_name,
        cte_sql,
        params,
        min_hops,
        max_hops,
    }
}

fn build_either_direction_vlp(
    cte_name: String,
    start_alias: &str,
    edge_type: Option<&str>,
    min_hops: u32,
    max_hops: u32,
    _max_cte_depth: u32,
) -> VlpPlan {
    let mut params = Vec::new();
    let mut type_filter = String::new();
    if let Some(t) = edge_type {
        type_filter = " AND e.type = ?".to_string();
        params.push(PropertyValue::String(t.to_string()));
        // The recursive step references the edge table twice (outgoing and
        // incoming), so the type parameter is bound twice too.
        params.push(PropertyValue::String(t.to_string()));
    }
    let cte_sql = format!(
        "{name}(start_id, current_id, depth, edge_ids) AS ( \
           SELECT {start}.id, {start}.id, 0, json_array() \
           UNION ALL \
           SELECT p.start_id, e.target_id, p.depth + 1, json_insert(p.edge_ids, '$[#]', e.id) \
           FROM {name} p JOIN edges e ON e.source_id = p.current_id \
           WHERE p.depth < {max_hops}{type_filter} \
           UNION ALL \
           SELECT p.start_id, e.source_id, p.depth + 1, json_insert(p.edge_ids, '$[#]', e.id) \
           FROM {name} p JOIN edges e ON e.target_id = p.current_id \
           WHERE p.depth < {max_hops}{type_filter} \
         )",
        name = cte_name,
        start = start_alias,
        max_hops = max_hops,
        type_filter = type_filter,
    );
    VlpPlan {
        cte_name,
        cte_sql,
        params,
        min_hops,
        max_hops,
    }
}

/// The WHERE-clause filter that restricts a recursive CTE's rows to the
/// requested hop range, plus an `EXISTS` against the end node's labels so
/// the path only reports matches that actually reach a labeled target.
pub fn terminal_filter(cte_name: &str, min_hops: u32, max_hops: u32) -> String {
    format!(
        "{name}.depth >= {min} AND {name}.depth <= {max}",
        name = cte_name,
        min = min_hops,
        max = max_hops,
    )
}

pub fn end_label_filter(end_alias: &str, labels: &[String]) -> Vec<(String, String)> {
    label::label_exists_fragments(end_alias, labels)
}
