pub mod aggregation;
pub mod config;
pub mod error;
pub mod filter;
pub mod funnel;
pub mod loader;
pub mod normalize;
pub mod report;
pub mod schema;
pub mod session;

#[cfg(feature = "python")]
mod model;

pub use config::{DatePolicy, ReportConfig, ReportOptions, SourceConfig};
pub use error::{ReportError, Result};
pub use filter::DecisionSelection;
pub use normalize::ContactOutcome;
pub use report::Report;
pub use session::ReportSession;

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;
    use pyo3::types::PyModule;

    use crate::model::PyReportSession;
    use crate::schema;

    /// Export column names and labels as Python submodules
    fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Decisions log
        let decisions = PyModule::new(m.py(), "decisions")?;
        decisions.add("WHEN", schema::decisions::WHEN)?;
        decisions.add("DECISION", schema::decisions::DECISION)?;
        decisions.add("CONTACT_OUTCOME", schema::decisions::CONTACT_OUTCOME)?;
        decisions.add("AGE", schema::decisions::AGE)?;
        decisions.add("NEIGHBORHOOD", schema::decisions::NEIGHBORHOOD)?;
        decisions.add("KEY", schema::decisions::KEY)?;
        m.add_submodule(&decisions)?;

        // Participants
        let participants = PyModule::new(m.py(), "participants")?;
        participants.add("KEY", schema::participants::KEY)?;
        m.add_submodule(&participants)?;

        // Outcome labels
        let outcome = PyModule::new(m.py(), "outcome")?;
        outcome.add("YES", schema::outcome::YES)?;
        outcome.add("NO", schema::outcome::NO)?;
        outcome.add("UNKNOWN", schema::outcome::UNKNOWN)?;
        m.add_submodule(&outcome)?;

        // Funnel legend, keyed like the serialized stage ids
        let funnel_stages = PyModule::new(m.py(), "funnel_stages")?;
        funnel_stages.add("ALL_SUCCESSES", schema::funnel_stages::ALL_SUCCESSES)?;
        funnel_stages.add("PARTICIPANT_SUCCESSES", schema::funnel_stages::PARTICIPANT_SUCCESSES)?;
        m.add_submodule(&funnel_stages)?;

        // Age buckets
        let age_buckets = PyModule::new(m.py(), "age_buckets")?;
        let labels: Vec<&str> = schema::age_buckets::BUCKETS
            .iter()
            .map(|(_, _, label)| *label)
            .collect();
        age_buckets.add("LABELS", labels)?;
        m.add_submodule(&age_buckets)?;

        m.add("NOT_INFORMED", schema::sentinel::NOT_INFORMED)?;
        Ok(())
    }

    #[pymodule]
    #[pyo3(name = "_core")]
    fn core_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<PyReportSession>()?;
        add_schema_exports(m)?;
        Ok(())
    }
}
