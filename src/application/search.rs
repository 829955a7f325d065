use crate::domain::{ItemType, JoinType};

/// Build the select listing every credit column of `item_type` for one item.
///
/// Joins are taken from each column's join path and emitted once per table,
/// in first-use order. The single bind parameter is the item id.
pub fn compose_search_query(item_type: ItemType) -> String {
    let root = item_type.root_table();
    let options = item_type.search_options();

    let mut joined: Vec<&str> = vec![root];
    let mut joins = String::new();

    for option in options {
        let mut previous = root;
        for step in option.join_path() {
            if !joined.contains(&step.table) {
                let on = match step.join_type {
                    JoinType::Child => {
                        format!("{}.{} = {}.id", step.table, step.link_field, previous)
                    }
                    JoinType::Standard => {
                        format!("{}.{} = {}.id", previous, step.link_field, step.table)
                    }
                };
                joins.push_str(&format!(" JOIN {} ON {}", step.table, on));
                joined.push(step.table);
            }
            previous = step.table;
        }
    }

    let columns = options
        .iter()
        .map(|option| {
            format!(
                "{}.{} AS {}",
                option.table,
                option.field,
                option.column_alias()
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    let order = joined[1..]
        .iter()
        .map(|table| format!("{}.id", table))
        .collect::<Vec<_>>()
        .join(", ");

    let mut query = format!(
        "SELECT {} FROM {}{} WHERE {}.id = ?",
        columns, root, joins, root
    );
    if !order.is_empty() {
        query.push_str(" ORDER BY ");
        query.push_str(&order);
    }
    query
}
