//! Summary profile of one or more tables

use super::{OpContext, OpOutcome, Operation};
use crate::engine::TableSet;

pub struct ProfileDataframe;

impl Operation for ProfileDataframe {
    fn name(&self) -> &'static str {
        "profile_dataframe"
    }

    fn description(&self) -> &'static str {
        "Generate profile/summary statistics for DataFrames"
    }

    fn execute(&self, _ctx: &OpContext, tables: &TableSet, _args: &[String]) -> OpOutcome {
        if tables.is_empty() {
            return OpOutcome::fail("Profiling requires at least 1 file");
        }

        let mut summaries = Vec::new();
        for (file, table) in tables.iter() {
            let mut summary = format!(
                "{file}: {} rows x {} cols",
                table.row_count(),
                table.column_count()
            );
            let numeric = table.numeric_columns();
            if !numeric.is_empty() {
                summary.push_str(&format!(" (numeric: {})", numeric.join(", ")));
            }
            summaries.push(summary);
        }

        OpOutcome::ok(format!(
            "Profiled {} files: {}",
            tables.len(),
            summaries.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Table;
    use std::sync::Arc;

    #[test]
    fn test_profiles_each_file() {
        let mut tables = TableSet::default();
        tables.push(
            "a.csv".to_string(),
            Arc::new(Table::from_csv_bytes(b"name,age\nbob,30\nsue,40\n").unwrap()),
        );
        let out = ProfileDataframe.execute(&OpContext::new("/tmp"), &tables, &[]);
        assert!(out.success);
        assert!(out.message.contains("a.csv: 2 rows x 2 cols"));
        assert!(out.message.contains("numeric: age"));
    }
}
