use std::collections::HashSet;

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::schema::decisions;

/// Decision types picked in the multi-select. Empty means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecisionSelection(Vec<String>);

impl DecisionSelection {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }
}

/// Keep the rows whose `Decisão` is selected. An empty selection returns the
/// frame unchanged rather than an empty one.
pub fn filter_by_decision(df: &DataFrame, selection: &DecisionSelection) -> Result<DataFrame> {
    if selection.is_empty() {
        return Ok(df.clone());
    }

    let selected = Series::new("selected".into(), selection.values());
    let filtered = df
        .clone()
        .lazy()
        .filter(col(decisions::DECISION).is_in(lit(selected), false))
        .collect()?;

    debug!(
        selected = selection.values().len(),
        before = df.height(),
        after = filtered.height(),
        "applied decision filter"
    );
    Ok(filtered)
}

/// Distinct decision types in first-seen order; the options for the filter.
pub fn decision_options(df: &DataFrame) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    Ok(df
        .column(decisions::DECISION)?
        .str()?
        .into_iter()
        .flatten()
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df! {
            decisions::DECISION => [Some("Aceitou"), Some("Reconciliou"), Some("Aceitou"), None, Some("Batismo")],
            "row" => [1i64, 2, 3, 4, 5],
        }
        .unwrap()
    }

    #[test]
    fn empty_selection_is_identity() {
        let df = frame();
        let out = filter_by_decision(&df, &DecisionSelection::default()).unwrap();
        assert!(out.equals_missing(&df));
    }

    #[test]
    fn selection_keeps_only_matching_rows() {
        let df = frame();
        let out =
            filter_by_decision(&df, &DecisionSelection::new(["Aceitou", "Batismo"])).unwrap();
        let rows: Vec<Option<i64>> = out.column("row").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(rows, vec![Some(1), Some(3), Some(5)]);
    }

    #[test]
    fn selection_without_matches_is_empty() {
        let df = frame();
        let out = filter_by_decision(&df, &DecisionSelection::new(["Outro"])).unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(out.width(), df.width());
    }

    #[test]
    fn options_keep_first_seen_order() {
        let options = decision_options(&frame()).unwrap();
        assert_eq!(options, vec!["Aceitou", "Reconciliou", "Batismo"]);
    }
}
