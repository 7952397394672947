//! Evaluate subcommand - word error rate from an evaluation dump.

use crate::cli::ModelArgs;
use crate::config::ModelConfig;
use eyre::{Result, WrapErr, ensure};
use ndarray::Array2;
use serde::Deserialize;
use std::path::PathBuf;
use whisper_finetune::metrics::{EvalPrediction, WerMetric};

/// CLI arguments for evaluation.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// JSON file with `predictions` and `label_ids` as nested id lists
    #[arg(long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Resolved configuration for evaluation.
#[derive(Debug)]
pub struct Config {
    pub input: PathBuf,
    pub model: ModelConfig,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        Ok(Self {
            input: args.input,
            model: args.model.try_into()?,
        })
    }
}

/// Evaluation dump as written by the trainer.
#[derive(Debug, Deserialize)]
pub struct EvalDump {
    pub predictions: Vec<Vec<i64>>,
    pub label_ids: Vec<Vec<i64>>,
}

impl EvalDump {
    /// Convert the nested lists to matrices; every row must have the same length.
    pub fn into_prediction(self) -> Result<EvalPrediction> {
        Ok(EvalPrediction {
            predictions: to_matrix("predictions", self.predictions)?,
            label_ids: to_matrix("label_ids", self.label_ids)?,
        })
    }
}

fn to_matrix(name: &str, rows: Vec<Vec<i64>>) -> Result<Array2<i64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    ensure!(
        rows.iter().all(|row| row.len() == n_cols),
        "{name} rows must all have length {n_cols}"
    );

    let data = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((n_rows, n_cols), data)?)
}

pub fn execute(config: Config) -> Result<()> {
    let text = std::fs::read_to_string(&config.input)
        .wrap_err_with(|| format!("failed to read {:?}", config.input.display()))?;
    let dump: EvalDump = serde_json::from_str(&text)
        .wrap_err_with(|| format!("invalid evaluation dump: {:?}", config.input.display()))?;
    let eval = dump.into_prediction()?;

    let processor = config.model.load_processor()?;
    let result = WerMetric::new(&processor.tokenizer).compute(&eval)?;

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_matrices_from_nested_lists() {
        let dump: EvalDump = serde_json::from_str(
            r#"{"predictions": [[1, 2, 3], [4, 5, 6]], "label_ids": [[1, -100], [4, 5]]}"#,
        )
        .unwrap();

        let eval = dump.into_prediction().unwrap();

        assert_eq!(eval.predictions.dim(), (2, 3));
        assert_eq!(eval.label_ids[[0, 1]], -100);
    }

    #[test]
    fn rejects_ragged_rows() {
        let dump = EvalDump {
            predictions: vec![vec![1, 2], vec![3]],
            label_ids: vec![vec![1], vec![2]],
        };

        assert!(dump.into_prediction().is_err());
    }
}
