//! Statistical outlier detection on a numeric column

use super::{OpContext, OpOutcome, Operation};
use crate::engine::{Table, TableSet};

pub const OUTPUT_NAME: &str = "anomalies_result.csv";

/// Values beyond this many sample standard deviations from the mean
/// are flagged
const THRESHOLD_SIGMA: f64 = 2.0;

pub struct DetectAnomalies;

impl Operation for DetectAnomalies {
    fn name(&self) -> &'static str {
        "detect_anomalies"
    }

    fn description(&self) -> &'static str {
        "Detect anomalies in numeric columns"
    }

    fn output_name(&self) -> Option<&'static str> {
        Some(OUTPUT_NAME)
    }

    fn execute(&self, ctx: &OpContext, tables: &TableSet, args: &[String]) -> OpOutcome {
        let Some((_file, table)) = tables.single() else {
            return OpOutcome::fail("Anomaly detection works on exactly 1 file");
        };

        let numeric = table.numeric_columns();
        if numeric.is_empty() {
            return OpOutcome::fail("No numeric columns found for anomaly detection");
        }
        // Requested column if it is numeric, otherwise first numeric column
        let target = args
            .first()
            .map(String::as_str)
            .filter(|c| numeric.contains(c))
            .unwrap_or(numeric[0]);
        let target_idx = table.column_index(target).unwrap();

        let values = table.numeric_values(target_idx);
        if values.len() < 2 {
            return OpOutcome::fail(format!(
                "Anomaly detection failed: not enough values in '{target}'"
            ));
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (values.len() - 1) as f64;
        let stddev = variance.sqrt();
        let lower = mean - THRESHOLD_SIGMA * stddev;
        let upper = mean + THRESHOLD_SIGMA * stddev;

        let anomaly_rows: Vec<_> = table
            .rows()
            .iter()
            .filter(|row| {
                row[target_idx]
                    .as_f64()
                    .map(|v| v < lower || v > upper)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        let anomaly_count = anomaly_rows.len();
        let total = table.row_count();

        if anomaly_count > 0 {
            let result = Table::from_parts(table.columns().to_vec(), anomaly_rows);
            if let Err(e) = ctx.write_artifact(OUTPUT_NAME, &result) {
                return OpOutcome::fail(format!("Anomaly detection failed: {e}"));
            }
        }

        let percentage = if total > 0 {
            (anomaly_count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        OpOutcome::ok(format!(
            "Found {anomaly_count}/{total} anomalies ({percentage:.1}%) in '{target}'"
        ))
    }
}
