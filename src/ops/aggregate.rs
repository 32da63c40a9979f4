//! Grouped aggregation over a single table

use super::{OpContext, OpOutcome, Operation};
use crate::engine::{Table, TableSet, Value};
use std::collections::HashMap;

pub const OUTPUT_NAME: &str = "aggregated_result.csv";

const SUPPORTED_FUNCS: &[&str] = &["sum", "avg", "count", "max", "min"];

pub struct AggregateDataframe;

impl Operation for AggregateDataframe {
    fn name(&self) -> &'static str {
        "aggregate_dataframe"
    }

    fn description(&self) -> &'static str {
        "Aggregate DataFrames with grouping and aggregation functions"
    }

    fn output_name(&self) -> Option<&'static str> {
        Some(OUTPUT_NAME)
    }

    fn execute(&self, ctx: &OpContext, tables: &TableSet, args: &[String]) -> OpOutcome {
        let Some((file, table)) = tables.single() else {
            return OpOutcome::fail("Aggregation works on exactly 1 file");
        };
        if args.len() < 2 {
            return OpOutcome::fail(
                "Usage: aggregate requires <group_col> <agg_col> [agg_func]",
            );
        }
        let group_col = args[0].as_str();
        let agg_col = args[1].as_str();
        let agg_func = args.get(2).map(String::as_str).unwrap_or("sum");

        if !SUPPORTED_FUNCS.contains(&agg_func) {
            return OpOutcome::fail(format!("Unsupported aggregation function: {agg_func}"));
        }
        let Some(group_idx) = table.column_index(group_col) else {
            return OpOutcome::fail(format!("Column '{group_col}' not found in {file}"));
        };
        let Some(agg_idx) = table.column_index(agg_col) else {
            return OpOutcome::fail(format!("Column '{agg_col}' not found in {file}"));
        };

        // Groups keep first-seen order so output is deterministic
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for row in table.rows() {
            let key = row[group_idx].render();
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            let entry = groups.entry(key.clone()).or_default();
            if let Some(v) = row[agg_idx].as_f64() {
                entry.push(v);
            }
            *counts.entry(key).or_insert(0) += 1;
        }

        let value_col = if agg_func == "count" {
            "count".to_string()
        } else {
            format!("{agg_func}_{agg_col}")
        };
        let columns = vec![group_col.to_string(), value_col];

        let mut rows = Vec::new();
        for key in &order {
            let values = &groups[key];
            let cell = match agg_func {
                "count" => Value::Int(counts[key] as i64),
                "sum" => Value::Float(values.iter().sum()),
                "avg" => {
                    if values.is_empty() {
                        Value::Null
                    } else {
                        Value::Float(values.iter().sum::<f64>() / values.len() as f64)
                    }
                }
                "max" => values
                    .iter()
                    .copied()
                    .fold(None::<f64>, |acc, v| Some(acc.map_or(v, |a| a.max(v))))
                    .map(Value::Float)
                    .unwrap_or(Value::Null),
                "min" => values
                    .iter()
                    .copied()
                    .fold(None::<f64>, |acc, v| Some(acc.map_or(v, |a| a.min(v))))
                    .map(Value::Float)
                    .unwrap_or(Value::Null),
                _ => unreachable!(),
            };
            rows.push(vec![Value::Str(key.clone()), cell]);
        }

        let result = Table::from_parts(columns, rows);
        let group_count = result.row_count();

        if let Err(e) = ctx.write_artifact(OUTPUT_NAME, &result) {
            return OpOutcome::fail(format!("Aggregation failed: {e}"));
        }

        OpOutcome::ok(format!(
            "Aggregated {file} -> {group_count} groups saved to {OUTPUT_NAME}"
        ))
    }
}
