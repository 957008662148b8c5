//! Assembles every aggregate the dashboard shows into one serializable value.

use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::aggregation::{
    age_distribution, average_age, contact_summary, daily_series, decision_breakdown,
    monthly_series, outcome_by_decision, report_period, top_n, AgeDistribution, ContactSummary,
    GroupCount, OutcomeBreakdown, ReportPeriod, SeriesPoint,
};
use crate::config::ReportOptions;
use crate::error::Result;
use crate::filter::{filter_by_decision, DecisionSelection};
use crate::funnel::{funnel_summary, FunnelSummary};
use crate::schema::decisions;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub selection: DecisionSelection,
    /// Period covered by the whole log, independent of the filter.
    pub period: Option<ReportPeriod>,
    pub contacts: ContactSummary,
    pub average_age: Option<i64>,
    pub top_neighborhoods: Vec<GroupCount>,
    pub neighborhood_chart: Vec<GroupCount>,
    pub decision_breakdown: Vec<GroupCount>,
    pub outcome_by_decision: Vec<OutcomeBreakdown>,
    pub daily_series: Vec<SeriesPoint>,
    pub monthly_series: Vec<SeriesPoint>,
    pub age_distribution: AgeDistribution,
    /// Present only when a participants list was loaded.
    pub funnel: Option<FunnelSummary>,
}

impl Report {
    /// Filter the decisions frame and compute every section from the result.
    #[instrument(skip_all, fields(selected = selection.values().len()))]
    pub fn build(
        decisions_df: &DataFrame,
        participants_df: Option<&DataFrame>,
        selection: &DecisionSelection,
        options: &ReportOptions,
    ) -> Result<Self> {
        let filtered = filter_by_decision(decisions_df, selection)?;

        let funnel = match participants_df {
            Some(_) if filtered.column(decisions::KEY).is_err() => {
                warn!(
                    column = decisions::KEY,
                    "decisions log has no join key, funnel disabled"
                );
                None
            }
            Some(p) => Some(funnel_summary(&filtered, p, options.table_top_n)?),
            None => None,
        };

        let report = Self {
            selection: selection.clone(),
            period: report_period(decisions_df)?,
            contacts: contact_summary(&filtered)?,
            average_age: average_age(&filtered)?,
            top_neighborhoods: top_n(&filtered, decisions::NEIGHBORHOOD, options.table_top_n)?,
            neighborhood_chart: top_n(&filtered, decisions::NEIGHBORHOOD, options.chart_top_n)?,
            decision_breakdown: decision_breakdown(&filtered)?,
            outcome_by_decision: outcome_by_decision(&filtered)?,
            daily_series: daily_series(&filtered)?,
            monthly_series: monthly_series(&filtered)?,
            age_distribution: age_distribution(&filtered)?,
            funnel,
        };

        debug!(rows = report.contacts.total, "built report");
        Ok(report)
    }
}
