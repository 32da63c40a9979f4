//! Pivot a single table: index rows, pivot columns, summed values

use super::{OpContext, OpOutcome, Operation};
use crate::engine::{Table, TableSet, Value};
use std::collections::HashMap;

pub const OUTPUT_NAME: &str = "pivot_result.csv";

pub struct PivotDataframe;

impl Operation for PivotDataframe {
    fn name(&self) -> &'static str {
        "pivot_dataframe"
    }

    fn description(&self) -> &'static str {
        "Pivot DataFrames on specified columns"
    }

    fn output_name(&self) -> Option<&'static str> {
        Some(OUTPUT_NAME)
    }

    fn execute(&self, ctx: &OpContext, tables: &TableSet, args: &[String]) -> OpOutcome {
        let Some((file, table)) = tables.single() else {
            return OpOutcome::fail("Pivot works on exactly 1 file");
        };
        if args.len() < 3 {
            return OpOutcome::fail("Usage: pivot requires <index_col> <pivot_col> <value_col>");
        }
        let (index_col, pivot_col, value_col) = (&args[0], &args[1], &args[2]);

        let mut indices = Vec::with_capacity(3);
        for col in [index_col, pivot_col, value_col] {
            match table.column_index(col) {
                Some(i) => indices.push(i),
                None => return OpOutcome::fail(format!("Column '{col}' not found in {file}")),
            }
        }
        let (index_idx, pivot_idx, value_idx) = (indices[0], indices[1], indices[2]);

        // Pivot headers are the sorted distinct values of the pivot column
        let mut pivot_values: Vec<String> = table
            .rows()
            .iter()
            .map(|r| r[pivot_idx].render())
            .collect();
        pivot_values.sort();
        pivot_values.dedup();

        let mut order: Vec<String> = Vec::new();
        let mut cells: HashMap<(String, String), f64> = HashMap::new();
        for row in table.rows() {
            let index_key = row[index_idx].render();
            if !order.contains(&index_key) {
                order.push(index_key.clone());
            }
            if let Some(v) = row[value_idx].as_f64() {
                *cells
                    .entry((index_key, row[pivot_idx].render()))
                    .or_insert(0.0) += v;
            }
        }

        let mut columns = vec![index_col.to_string()];
        columns.extend(pivot_values.iter().cloned());

        let rows: Vec<Vec<Value>> = order
            .iter()
            .map(|index_key| {
                let mut row = vec![Value::Str(index_key.clone())];
                for pv in &pivot_values {
                    row.push(
                        cells
                            .get(&(index_key.clone(), pv.clone()))
                            .map(|v| Value::Float(*v))
                            .unwrap_or(Value::Null),
                    );
                }
                row
            })
            .collect();

        let result = Table::from_parts(columns, rows);
        let (row_count, col_count) = (result.row_count(), result.column_count());

        if let Err(e) = ctx.write_artifact(OUTPUT_NAME, &result) {
            return OpOutcome::fail(format!("Pivot failed: {e}"));
        }

        OpOutcome::ok(format!(
            "Pivoted {file} -> {row_count} rows x {col_count} cols saved to {OUTPUT_NAME}"
        ))
    }
}
