//! Inner join of multiple tables on a common key

use super::{OpContext, OpOutcome, Operation};
use crate::engine::{Table, TableSet, Value};
use std::collections::HashMap;

pub const OUTPUT_NAME: &str = "merged_result.csv";

pub struct MergeDataframes;

impl Operation for MergeDataframes {
    fn name(&self) -> &'static str {
        "merge_dataframes"
    }

    fn description(&self) -> &'static str {
        "Merge multiple DataFrames on a common key"
    }

    fn output_name(&self) -> Option<&'static str> {
        Some(OUTPUT_NAME)
    }

    fn execute(&self, ctx: &OpContext, tables: &TableSet, args: &[String]) -> OpOutcome {
        if tables.len() < 2 {
            return OpOutcome::fail("Merge requires at least 2 files");
        }
        let join_key = args.first().map(String::as_str).unwrap_or("id");

        for (file, table) in tables.iter() {
            if table.column_index(join_key).is_none() {
                return OpOutcome::fail(format!("Join key '{join_key}' not found in {file}"));
            }
        }

        let mut result: Option<Table> = None;
        for (_, table) in tables.iter() {
            result = Some(match result {
                None => (**table).clone(),
                Some(acc) => inner_join(&acc, table, join_key),
            });
        }
        let merged = result.unwrap();

        if let Err(e) = ctx.write_artifact(OUTPUT_NAME, &merged) {
            return OpOutcome::fail(format!("Merge failed: {e}"));
        }

        OpOutcome::ok(format!(
            "Merged {} files -> {} rows saved to {OUTPUT_NAME}",
            tables.len(),
            merged.row_count()
        ))
    }
}

/// Inner join keyed on the rendered value of `key` in both tables.
/// The right table contributes all of its columns except the key.
fn inner_join(left: &Table, right: &Table, key: &str) -> Table {
    let left_key = left.column_index(key).unwrap();
    let right_key = right.column_index(key).unwrap();

    let mut right_rows: HashMap<String, Vec<&Vec<Value>>> = HashMap::new();
    for row in right.rows() {
        right_rows
            .entry(row[right_key].render())
            .or_default()
            .push(row);
    }

    let mut columns: Vec<String> = left.columns().to_vec();
    for (i, col) in right.columns().iter().enumerate() {
        if i != right_key {
            columns.push(col.clone());
        }
    }

    let mut rows = Vec::new();
    for row in left.rows() {
        if let Some(matches) = right_rows.get(&row[left_key].render()) {
            for matched in matches {
                let mut joined = row.clone();
                for (i, cell) in matched.iter().enumerate() {
                    if i != right_key {
                        joined.push(cell.clone());
                    }
                }
                rows.push(joined);
            }
        }
    }

    Table::from_parts(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn set(files: &[(&str, &str)]) -> TableSet {
        let mut tables = TableSet::default();
        for (name, csv) in files {
            tables.push(
                name.to_string(),
                Arc::new(Table::from_csv_bytes(csv.as_bytes()).unwrap()),
            );
        }
        tables
    }

    #[test]
    fn test_requires_two_files() {
        let dir = TempDir::new().unwrap();
        let tables = set(&[("a.csv", "id\n1\n")]);
        let out = MergeDataframes.execute(&OpContext::new(dir.path()), &tables, &[]);
        assert!(!out.success);
        assert!(out.message.contains("at least 2 files"));
    }

    #[test]
    fn test_missing_join_key() {
        let dir = TempDir::new().unwrap();
        let tables = set(&[("a.csv", "id,v\n1,2\n"), ("b.csv", "key,w\n1,3\n")]);
        let out = MergeDataframes.execute(&OpContext::new(dir.path()), &tables, &[]);
        assert!(!out.success);
        assert!(out.message.contains("Join key 'id' not found in b.csv"));
    }

    #[test]
    fn test_inner_join_two_files() {
        let dir = TempDir::new().unwrap();
        let tables = set(&[
            ("a.csv", "id,v\n1,10\n2,20\n3,30\n"),
            ("b.csv", "id,w\n1,100\n3,300\n"),
        ]);
        let out = MergeDataframes.execute(&OpContext::new(dir.path()), &tables, &[]);
        assert!(out.success, "{}", out.message);
        assert!(out.message.contains("2 rows"));

        let written = std::fs::read_to_string(dir.path().join(OUTPUT_NAME)).unwrap();
        assert!(written.starts_with("id,v,w\n"));
        assert!(written.contains("1,10,100"));
        assert!(written.contains("3,30,300"));
        assert!(!written.contains("2,20"));
    }

    #[test]
    fn test_custom_join_key() {
        let dir = TempDir::new().unwrap();
        let tables = set(&[
            ("a.csv", "sku,qty\nA,1\nB,2\n"),
            ("b.csv", "sku,price\nA,9.5\nB,3.25\n"),
        ]);
        let args = vec!["sku".to_string()];
        let out = MergeDataframes.execute(&OpContext::new(dir.path()), &tables, &args);
        assert!(out.success, "{}", out.message);
        assert!(out.message.contains("2 rows"));
    }
}
