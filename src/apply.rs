//! Applying validated filters and functions to rows.
//!
//! Both entry points map over rows independently and keep their order. With
//! the `parallel` feature they run on rayon's indexed parallel iterators.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    ast::{Filter, FunctionSet},
    evaluator::{Evaluator, Truth},
    value::{Record, Value},
};

/// Combined verdict of all filters on one row; filters are ANDed.
fn row_truth(evaluator: &Evaluator, filters: &[Filter], row: &Record) -> Truth {
    let mut truth = Truth::True;
    for filter in filters {
        let verdict = match evaluator.eval_filter(&filter.tree, row) {
            Ok(verdict) => verdict,
            Err(error) => {
                tracing::warn!(%error, filter = %filter.tree, "filter evaluation failed, row excluded");
                Truth::Indeterminate
            }
        };
        truth = truth.and(verdict);
        if truth == Truth::False {
            break;
        }
    }
    truth
}

/// Per-row verdicts, in row order; only `Truth::True` keeps a row.
pub fn filter_mask(filters: &[Filter], rows: &[Record]) -> Vec<Truth> {
    let evaluator = Evaluator::new();

    #[cfg(feature = "parallel")]
    let mask = rows
        .par_iter()
        .map(|row| row_truth(&evaluator, filters, row))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let mask = rows
        .iter()
        .map(|row| row_truth(&evaluator, filters, row))
        .collect();

    mask
}

/// Keep the rows every filter holds for.
///
/// A row where any filter is indeterminate (typically because a channel it
/// reads is missing) is excluded. An empty filter list keeps every row.
///
/// Filters read user function columns like any other channel, so rows must
/// already carry them: run [`apply_functions`] with the same [`FunctionSet`]
/// the filters were validated against first. Otherwise those reads are
/// missing and the rows are dropped.
///
/// ```
/// use opgw_expr::{ChannelCatalogue, ChannelInfo, FunctionSet, Record, Value};
/// use opgw_expr::apply::apply_filters;
/// use opgw_expr::validate::validate_filters;
///
/// let channels = ChannelCatalogue::new().with("temperature", ChannelInfo::scalar("Temperature"));
/// let filters = validate_filters(&["temperature > 21"], &channels, &FunctionSet::default()).unwrap();
///
/// let rows = vec![
///     Record::new().with("temperature", Value::Number(21.98)),
///     Record::new().with("temperature", Value::Number(20.0)),
///     Record::new(),
/// ];
/// assert_eq!(apply_filters(&filters, rows).len(), 1);
/// ```
pub fn apply_filters(filters: &[Filter], rows: Vec<Record>) -> Vec<Record> {
    if filters.is_empty() {
        return rows;
    }
    let mask = filter_mask(filters, &rows);
    let kept: Vec<Record> = rows
        .into_iter()
        .zip(mask)
        .filter_map(|(row, truth)| truth.is_true().then_some(row))
        .collect();
    tracing::debug!(filters = filters.len(), kept = kept.len(), "filters applied");
    kept
}

fn derive_columns(evaluator: &Evaluator, functions: &FunctionSet, mut record: Record) -> Record {
    for def in functions.iter() {
        let value = match evaluator.eval_value(&def.tree, &record) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, function = %def.name, "function evaluation failed, value missing");
                Value::Missing
            }
        };
        record.insert(def.name.clone(), value);
    }
    record
}

/// Add one column per function, computed in declaration order so later
/// functions see the values of earlier ones.
///
/// ```
/// use opgw_expr::{ChannelCatalogue, Record, Value};
/// use opgw_expr::apply::apply_functions;
/// use opgw_expr::validate::{FunctionForm, validate_functions};
///
/// let forms = [FunctionForm::new("a", "1"), FunctionForm::new("b", "a + 1")];
/// let functions = validate_functions(&forms, &ChannelCatalogue::new()).unwrap();
///
/// let records = apply_functions(&functions, vec![Record::new()]);
/// assert_eq!(records[0].get("b"), Some(&Value::Number(2.0)));
/// ```
pub fn apply_functions(functions: &FunctionSet, records: Vec<Record>) -> Vec<Record> {
    let evaluator = Evaluator::new();

    #[cfg(feature = "parallel")]
    let records: Vec<Record> = records
        .into_par_iter()
        .map(|record| derive_columns(&evaluator, functions, record))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let records: Vec<Record> = records
        .into_iter()
        .map(|record| derive_columns(&evaluator, functions, record))
        .collect();

    tracing::debug!(functions = functions.len(), records = records.len(), "functions applied");
    records
}
