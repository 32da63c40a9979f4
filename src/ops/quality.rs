//! Data quality assessment

use super::{OpContext, OpOutcome, Operation};
use crate::engine::{Table, TableSet, Value};

pub const OUTPUT_NAME: &str = "quality_report.csv";

pub struct DataQualityCheck;

impl Operation for DataQualityCheck {
    fn name(&self) -> &'static str {
        "data_quality_check"
    }

    fn description(&self) -> &'static str {
        "Perform comprehensive data quality checks"
    }

    fn output_name(&self) -> Option<&'static str> {
        Some(OUTPUT_NAME)
    }

    fn execute(&self, ctx: &OpContext, tables: &TableSet, _args: &[String]) -> OpOutcome {
        if tables.is_empty() {
            return OpOutcome::fail("Quality check requires at least 1 file");
        }

        let mut summaries = Vec::new();
        let mut report_rows = Vec::new();

        for (file, table) in tables.iter() {
            let total_rows = table.row_count();
            let total_cols = table.column_count();
            let mut issues = Vec::new();

            // Null cells per column; empty cells in string columns count as
            // empty-string issues
            let mut null_cells = 0usize;
            let mut null_cols = 0usize;
            let mut empty_strings = Vec::new();
            for (i, col) in table.columns().iter().enumerate() {
                let nulls = table.rows().iter().filter(|r| r[i].is_null()).count();
                if nulls > 0 {
                    null_cols += 1;
                    null_cells += nulls;
                    if !table.column_type(i).is_numeric() {
                        empty_strings.push(format!("{col}: {nulls}"));
                    }
                }
            }
            if null_cols > 0 {
                issues.push(format!("Null values in {null_cols} columns"));
            }

            let duplicates = total_rows - table.distinct_row_count();
            if duplicates > 0 {
                issues.push(format!("{duplicates} duplicate rows"));
            }

            if !empty_strings.is_empty() {
                issues.push(format!("Empty strings: {}", empty_strings.join(", ")));
            }

            let total_cells = total_rows * total_cols;
            let score = if total_cells > 0 {
                ((total_cells - null_cells) as f64 / total_cells as f64) * 100.0
            } else {
                0.0
            };

            let mut summary = format!("{file}: {score:.1}% quality");
            if issues.is_empty() {
                summary.push_str(" (No issues found)");
            } else {
                summary.push_str(&format!(" (Issues: {})", issues.join("; ")));
            }
            summaries.push(summary);

            report_rows.push(vec![
                Value::Str(file.to_string()),
                Value::Int(total_rows as i64),
                Value::Int(total_cols as i64),
                Value::Int(null_cells as i64),
                Value::Int(duplicates as i64),
                Value::Str(format!("{score:.1}")),
            ]);
        }

        let report = Table::from_parts(
            vec![
                "file".to_string(),
                "rows".to_string(),
                "columns".to_string(),
                "null_cells".to_string(),
                "duplicate_rows".to_string(),
                "quality_score".to_string(),
            ],
            report_rows,
        );
        if let Err(e) = ctx.write_artifact(OUTPUT_NAME, &report) {
            return OpOutcome::fail(format!("Quality check failed: {e}"));
        }

        OpOutcome::ok(summaries.join(" | "))
    }
}
