//! Parameterized SQL compilation.
//!
//! Column identifiers are always double-quoted with embedded quotes doubled;
//! values never appear in the SQL text, only `?` placeholders whose positions
//! follow the attribute map's insertion order.

use crate::attributes::AttributeMap;

/// Double-quote an identifier, doubling any embedded quote characters.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build a single-row insert statement for the given values.
pub fn compile_insert(table: &str, values: &AttributeMap) -> String {
    let columns: Vec<String> = values.keys().map(quote_identifier).collect();
    let parameters: Vec<&str> = values.keys().map(|_| "?").collect();

    format!(
        "insert into {} ({}) values ({})",
        table,
        columns.join(", "),
        parameters.join(", ")
    )
}

/// Build an update statement setting the given columns, keyed by `key`.
///
/// Bind the column values in insertion order, then the key value last.
pub fn compile_update(table: &str, values: &AttributeMap, key: &str) -> String {
    let assignments: Vec<String> = values
        .keys()
        .map(|column| format!("{} = ?", quote_identifier(column)))
        .collect();

    format!(
        "update {} set {} where {} = ?",
        table,
        assignments.join(", "),
        quote_identifier(key)
    )
}
