//! Cross-source comparison between the decisions log and the participants list.
//!
//! The join is a left join on `Chave` = `Telefone` with both keys taken
//! verbatim. No trimming or phone-format normalization is applied, so keys
//! that differ only in formatting do not match.

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::aggregation::{contact_summary, percentage, top_n, GroupCount};
use crate::error::Result;
use crate::loader::require_columns;
use crate::schema::{decisions, funnel_stages, internal, participants};

/// Stable identifier of a funnel stage; display text lives in
/// [`funnel_stages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStageId {
    /// Successful contacts in the filtered decisions log.
    AllSuccesses,
    /// Successful contacts whose key is in the participants list.
    ParticipantSuccesses,
}

impl FunnelStageId {
    pub fn label(self) -> &'static str {
        match self {
            Self::AllSuccesses => funnel_stages::ALL_SUCCESSES,
            Self::ParticipantSuccesses => funnel_stages::PARTICIPANT_SUCCESSES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunnelStage {
    pub id: FunnelStageId,
    pub label: &'static str,
    pub count: usize,
}

impl FunnelStage {
    fn new(id: FunnelStageId, count: usize) -> Self {
        Self {
            id,
            label: id.label(),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelSummary {
    /// Rows in the participants list.
    pub participants_total: usize,
    /// Decision rows whose key appears in the participants list.
    pub matched: usize,
    /// Matched rows with a successful contact.
    pub matched_successes: usize,
    /// `matched_successes` over `matched`.
    pub contacted_rate_pct: u32,
    /// `matched_successes` over `participants_total`.
    pub participant_coverage_pct: u32,
    pub top_neighborhoods: Vec<GroupCount>,
    /// Successful contacts overall vs. successful contacts among participants.
    pub stages: [FunnelStage; 2],
}

/// Decision rows that have at least one participant with the same key.
/// A key repeated in the participants list repeats the decision row.
pub fn matched_participants(decisions_df: &DataFrame, participants_df: &DataFrame) -> Result<DataFrame> {
    require_columns(decisions_df, &[decisions::KEY])?;
    require_columns(participants_df, &[participants::KEY])?;

    let right = participants_df
        .clone()
        .lazy()
        .select([col(participants::KEY), lit(true).alias(internal::MATCHED)]);

    let joined = decisions_df
        .clone()
        .lazy()
        .join(
            right,
            [col(decisions::KEY)],
            [col(participants::KEY)],
            JoinArgs::new(JoinType::Left),
        )
        .filter(col(internal::MATCHED).is_not_null())
        .collect()?;

    Ok(joined.drop(internal::MATCHED)?)
}

pub fn funnel_summary(
    decisions_df: &DataFrame,
    participants_df: &DataFrame,
    top: usize,
) -> Result<FunnelSummary> {
    let matched_df = matched_participants(decisions_df, participants_df)?;
    let overall = contact_summary(decisions_df)?;
    let matched = contact_summary(&matched_df)?;
    let participants_total = participants_df.height();

    debug!(
        participants = participants_total,
        matched = matched.total,
        "computed participant funnel"
    );

    Ok(FunnelSummary {
        participants_total,
        matched: matched.total,
        matched_successes: matched.successes,
        contacted_rate_pct: matched.success_pct,
        participant_coverage_pct: percentage(matched.successes, participants_total),
        top_neighborhoods: top_n(&matched_df, decisions::NEIGHBORHOOD, top)?,
        stages: [
            FunnelStage::new(FunnelStageId::AllSuccesses, overall.successes),
            FunnelStage::new(FunnelStageId::ParticipantSuccesses, matched.successes),
        ],
    })
}
