//! Equality comparison between two tables

use super::{OpContext, OpOutcome, Operation};
use crate::engine::TableSet;

pub struct CompareDataframes;

impl Operation for CompareDataframes {
    fn name(&self) -> &'static str {
        "compare_dataframes"
    }

    fn description(&self) -> &'static str {
        "Compare two DataFrames for equality"
    }

    fn execute(&self, _ctx: &OpContext, tables: &TableSet, _args: &[String]) -> OpOutcome {
        if tables.len() != 2 {
            return OpOutcome::fail("Comparison requires exactly 2 files");
        }
        let names = tables.names();
        let left = tables.get(names[0]).unwrap();
        let right = tables.get(names[1]).unwrap();

        if !left.schema_matches(right) {
            return OpOutcome::fail("Schemas differ");
        }

        let (count_left, count_right) = (left.row_count(), right.row_count());
        if count_left != count_right {
            return OpOutcome::fail(format!(
                "Row counts differ: {count_left} vs {count_right}"
            ));
        }

        let diff = left.symmetric_difference_count(right);
        if diff > 0 {
            return OpOutcome::fail(format!("Data differs: {diff} differences found"));
        }

        OpOutcome::ok("DataFrames are identical!")
    }
}
