//! Pairwise Pearson correlation over numeric columns

use super::{OpContext, OpOutcome, Operation};
use crate::engine::{Table, TableSet, Value};

pub const OUTPUT_NAME: &str = "correlation_result.csv";

pub struct CalculateCorrelation;

impl Operation for CalculateCorrelation {
    fn name(&self) -> &'static str {
        "calculate_correlation"
    }

    fn description(&self) -> &'static str {
        "Calculate correlation matrix for numeric columns"
    }

    fn output_name(&self) -> Option<&'static str> {
        Some(OUTPUT_NAME)
    }

    fn execute(&self, ctx: &OpContext, tables: &TableSet, _args: &[String]) -> OpOutcome {
        let Some((_file, table)) = tables.single() else {
            return OpOutcome::fail("Correlation calculation works on exactly 1 file");
        };

        let numeric: Vec<String> = table
            .numeric_columns()
            .iter()
            .map(|c| c.to_string())
            .collect();
        if numeric.len() < 2 {
            return OpOutcome::fail("Need at least 2 numeric columns for correlation");
        }

        let indices: Vec<usize> = numeric
            .iter()
            .map(|c| table.column_index(c).unwrap())
            .collect();

        // n x n matrix, diagonal 1
        let n = numeric.len();
        let mut matrix = vec![vec![1.0f64; n]; n];
        let mut pairs = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let r = pearson(table, indices[i], indices[j]);
                matrix[i][j] = r;
                matrix[j][i] = r;
                pairs.push(format!("{}-{}: {r:.3}", numeric[i], numeric[j]));
            }
        }

        let mut columns = vec!["column".to_string()];
        columns.extend(numeric.iter().cloned());
        let rows: Vec<Vec<Value>> = numeric
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut row = vec![Value::Str(name.clone())];
                row.extend(matrix[i].iter().map(|r| Value::Str(format!("{r:.3}"))));
                row
            })
            .collect();

        if let Err(e) = ctx.write_artifact(OUTPUT_NAME, &Table::from_parts(columns, rows)) {
            return OpOutcome::fail(format!("Correlation calculation failed: {e}"));
        }

        OpOutcome::ok(format!("Correlations calculated: {}", pairs.join("; ")))
    }
}

/// Pearson r over rows where both cells are non-null; 0 when either
/// column has no variance
fn pearson(table: &Table, a: usize, b: usize) -> f64 {
    let pairs: Vec<(f64, f64)> = table
        .rows()
        .iter()
        .filter_map(|row| Some((row[a].as_f64()?, row[b].as_f64()?)))
        .collect();
    if pairs.len() < 2 {
        return 0.0;
    }
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in &pairs {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        cov / denom
    }
}
