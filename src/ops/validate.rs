//! Schema consistency check across tables

use super::{OpContext, OpOutcome, Operation};
use crate::engine::TableSet;

pub struct ValidateSchema;

impl Operation for ValidateSchema {
    fn name(&self) -> &'static str {
        "validate_schema"
    }

    fn description(&self) -> &'static str {
        "Validate that all DataFrames have the same schema"
    }

    fn execute(&self, _ctx: &OpContext, tables: &TableSet, _args: &[String]) -> OpOutcome {
        if tables.len() < 2 {
            return OpOutcome::fail("Schema validation requires at least 2 files");
        }

        let names = tables.names();
        let base_file = names[0];
        let base = tables.get(base_file).unwrap();

        for file in &names[1..] {
            let table = tables.get(file).unwrap();
            if !base.schema_matches(table) {
                return OpOutcome::fail(format!(
                    "Schema validation failed: {base_file} vs {file}"
                ));
            }
        }

        OpOutcome::ok(format!(
            "All {} files have identical schemas",
            tables.len()
        ))
    }
}
