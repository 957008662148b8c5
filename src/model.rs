use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::config::{DatePolicy, ReportConfig, ReportOptions, SourceConfig, SourcesConfig};
use crate::error::ReportError;
use crate::filter::DecisionSelection;
use crate::loader::prepare_decisions;
use crate::session::ReportSession;

/// Python handle on a [`ReportSession`].
///
/// A dashboard keeps one per user session and calls `report_json` (or the
/// frame accessors) whenever the filter selection changes.
#[pyclass(name = "ReportSession", unsendable)]
pub struct PyReportSession {
    inner: ReportSession,
}

#[pymethods]
impl PyReportSession {
    #[new]
    #[pyo3(signature = (
        decisions_path,
        decisions_sheet = None,
        participants_path = None,
        participants_sheet = None,
        table_top_n = 5,
        chart_top_n = 10,
        drop_undated = false,
    ))]
    fn new(
        decisions_path: String,
        decisions_sheet: Option<String>,
        participants_path: Option<String>,
        participants_sheet: Option<String>,
        table_top_n: usize,
        chart_top_n: usize,
        drop_undated: bool,
    ) -> Self {
        let decisions = SourceConfig {
            sheet: decisions_sheet,
            ..SourceConfig::new(PathBuf::from(decisions_path))
        };
        let participants = participants_path.map(|p| SourceConfig {
            sheet: participants_sheet,
            ..SourceConfig::new(PathBuf::from(p))
        });
        let config = ReportConfig {
            sources: SourcesConfig {
                decisions,
                participants,
            },
            report: ReportOptions {
                table_top_n,
                chart_top_n,
                date_policy: if drop_undated {
                    DatePolicy::Drop
                } else {
                    DatePolicy::Retain
                },
            },
        };
        Self {
            inner: ReportSession::new(config),
        }
    }

    /// Build a session from in-memory frames (all-string decisions columns).
    #[staticmethod]
    #[pyo3(signature = (decisions, participants = None, table_top_n = 5, chart_top_n = 10))]
    fn from_frames(
        decisions: PyDataFrame,
        participants: Option<PyDataFrame>,
        table_top_n: usize,
        chart_top_n: usize,
    ) -> PyResult<Self> {
        let options = ReportOptions {
            table_top_n,
            chart_top_n,
            ..ReportOptions::default()
        };
        let prepared = prepare_decisions(decisions.0, options.date_policy)?;
        Ok(Self {
            inner: ReportSession::from_frames(prepared, participants.map(|p| p.0), options),
        })
    }

    #[getter]
    fn decisions_df(&mut self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.decisions()?))
    }

    #[getter]
    fn participants_df(&mut self) -> Option<PyDataFrame> {
        self.inner.participants().map(PyDataFrame)
    }

    fn decision_options(&mut self) -> PyResult<Vec<String>> {
        Ok(self.inner.decision_options()?)
    }

    #[pyo3(signature = (selection = None))]
    fn filtered(&mut self, selection: Option<Vec<String>>) -> PyResult<PyDataFrame> {
        let selection = DecisionSelection::new(selection.unwrap_or_default());
        Ok(PyDataFrame(self.inner.filtered(&selection)?))
    }

    #[pyo3(signature = (selection = None))]
    fn matched_participants(&mut self, selection: Option<Vec<String>>) -> PyResult<Option<PyDataFrame>> {
        let selection = DecisionSelection::new(selection.unwrap_or_default());
        Ok(self.inner.matched(&selection)?.map(PyDataFrame))
    }

    /// Full report as a JSON string.
    #[pyo3(signature = (selection = None))]
    fn report_json(&mut self, selection: Option<Vec<String>>) -> PyResult<String> {
        let selection = DecisionSelection::new(selection.unwrap_or_default());
        let report = self.inner.report(&selection)?;
        serde_json::to_string(&report)
            .map_err(|e| ReportError::General(format!("serialize report: {e}")).into())
    }

    fn clear_cache(&mut self) {
        self.inner.clear_cache();
    }
}
