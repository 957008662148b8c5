use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use polars::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::schema::{age_buckets, date_formats, decisions, internal, outcome, sentinel};

// ── Output structures ───────────────────────────────────────────────────────

/// Headline counters: total decisions and successful contacts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactSummary {
    pub total: usize,
    pub successes: usize,
    pub success_pct: u32,
}

/// One row of a ranked grouping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    /// 1-based display position.
    pub rank: usize,
    pub label: String,
    pub count: usize,
    /// Share of the rows returned in the same grouping.
    pub share_pct: f64,
}

/// One point of a time series keyed by a sortable date string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeBucketCount {
    pub label: &'static str,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeDistribution {
    /// Always the eight buckets, in age order.
    pub buckets: Vec<AgeBucketCount>,
    /// Records with a usable age.
    pub total: usize,
}

/// Contact outcomes for one decision type (stacked chart data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeBreakdown {
    pub decision: String,
    pub yes: usize,
    pub no: usize,
    pub unknown: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

// ── Rates ───────────────────────────────────────────────────────────────────

/// Whole-number percentage, 0 when `total` is 0. Ties round to even.
pub fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * part as f64 / total as f64).round_ties_even() as u32
}

fn share(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

pub fn contact_summary(df: &DataFrame) -> Result<ContactSummary> {
    let total = df.height();
    let successes = df
        .column(decisions::CONTACT_OUTCOME)?
        .str()?
        .into_iter()
        .filter(|v| *v == Some(outcome::YES))
        .count();

    Ok(ContactSummary {
        total,
        successes,
        success_pct: percentage(successes, total),
    })
}

// ── Groupings ───────────────────────────────────────────────────────────────

/// Count non-null values of `column`, groups in first-seen order.
fn count_groups(lf: LazyFrame, column: &str) -> Result<Vec<(String, usize)>> {
    let grouped = lf
        .filter(col(column).is_not_null())
        .group_by_stable([col(column)])
        .agg([len().cast(DataType::UInt64).alias(internal::COUNT)])
        .collect()?;

    let labels = grouped.column(column)?.str()?;
    let counts = counts_of(&grouped, internal::COUNT)?;
    Ok(labels
        .into_iter()
        .zip(counts)
        .filter_map(|(label, count)| Some((label?.to_string(), count)))
        .collect())
}

fn counts_of(df: &DataFrame, column: &str) -> Result<Vec<usize>> {
    Ok(df
        .column(column)?
        .u64()?
        .into_iter()
        .map(|v| v.unwrap_or(0) as usize)
        .collect())
}

fn ranked(mut counts: Vec<(String, usize)>, limit: Option<usize>) -> Vec<GroupCount> {
    // stable: equal counts keep first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    if let Some(n) = limit {
        counts.truncate(n);
    }
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    counts
        .into_iter()
        .enumerate()
        .map(|(i, (label, count))| GroupCount {
            rank: i + 1,
            label,
            count,
            share_pct: share(count, total),
        })
        .collect()
}

/// Largest `n` groups of `column`, excluding the "Não informado" sentinel.
pub fn top_n(df: &DataFrame, column: &str, n: usize) -> Result<Vec<GroupCount>> {
    let lf = df
        .clone()
        .lazy()
        .filter(col(column).neq(lit(sentinel::NOT_INFORMED)));
    Ok(ranked(count_groups(lf, column)?, Some(n)))
}

/// Every decision type with its count, largest first.
pub fn decision_breakdown(df: &DataFrame) -> Result<Vec<GroupCount>> {
    let counts = count_groups(df.clone().lazy(), decisions::DECISION)?;
    Ok(ranked(counts, None))
}

/// Decision × contact-outcome cross-tabulation, decisions in first-seen order.
/// Expects the outcome column in canonical form; anything else is unknown.
pub fn outcome_by_decision(df: &DataFrame) -> Result<Vec<OutcomeBreakdown>> {
    let is_outcome = |label: &str| {
        col(decisions::CONTACT_OUTCOME)
            .eq(lit(label))
            .cast(DataType::UInt64)
            .sum()
    };

    let grouped = df
        .clone()
        .lazy()
        .filter(col(decisions::DECISION).is_not_null())
        .group_by_stable([col(decisions::DECISION)])
        .agg([
            len().cast(DataType::UInt64).alias(internal::COUNT),
            is_outcome(outcome::YES).alias(internal::YES_COUNT),
            is_outcome(outcome::NO).alias(internal::NO_COUNT),
        ])
        .collect()?;

    let labels = grouped.column(decisions::DECISION)?.str()?;
    let totals = counts_of(&grouped, internal::COUNT)?;
    let yes = counts_of(&grouped, internal::YES_COUNT)?;
    let no = counts_of(&grouped, internal::NO_COUNT)?;

    Ok(labels
        .into_iter()
        .zip(totals.into_iter().zip(yes.into_iter().zip(no)))
        .filter_map(|(decision, (total, (yes, no)))| {
            Some(OutcomeBreakdown {
                decision: decision?.to_string(),
                yes,
                no,
                unknown: total - yes - no,
            })
        })
        .collect())
}

// ── Time series ─────────────────────────────────────────────────────────────

/// Parsed `Quando` values as UTC timestamps; null where the date was unparseable.
fn timestamps(df: &DataFrame) -> Result<Vec<Option<DateTime<Utc>>>> {
    let micros = df.column(decisions::WHEN)?.cast(&DataType::Int64)?;
    Ok(micros
        .i64()?
        .into_iter()
        .map(|v| v.and_then(DateTime::from_timestamp_micros))
        .collect())
}

fn series_by(df: &DataFrame, key_format: &str) -> Result<Vec<SeriesPoint>> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for ts in timestamps(df)?.into_iter().flatten() {
        *counts.entry(ts.format(key_format).to_string()).or_default() += 1;
    }
    Ok(counts
        .into_iter()
        .map(|(key, count)| SeriesPoint { key, count })
        .collect())
}

/// Records per `YYYY-MM`, chronological. Months without records are absent.
pub fn monthly_series(df: &DataFrame) -> Result<Vec<SeriesPoint>> {
    series_by(df, date_formats::MONTH_KEY)
}

/// Records per calendar day (`YYYY-MM-DD`), chronological.
pub fn daily_series(df: &DataFrame) -> Result<Vec<SeriesPoint>> {
    series_by(df, date_formats::DAY_KEY)
}

/// First and last dated record.
pub fn report_period(df: &DataFrame) -> Result<Option<ReportPeriod>> {
    let dates: Vec<NaiveDate> = timestamps(df)?
        .into_iter()
        .flatten()
        .map(|ts| ts.date_naive())
        .collect();
    Ok(dates
        .iter()
        .min()
        .zip(dates.iter().max())
        .map(|(start, end)| ReportPeriod {
            start: *start,
            end: *end,
        }))
}

// ── Ages ────────────────────────────────────────────────────────────────────

/// Index of the bucket `age` falls in, or `None` when outside `[0, 100]`.
pub fn classify_age(age: f64) -> Option<usize> {
    if !(age_buckets::MIN_AGE..=age_buckets::MAX_AGE).contains(&age) {
        return None;
    }
    age_buckets::BUCKETS
        .iter()
        .position(|&(lower, upper, _)| (age > lower || age == age_buckets::MIN_AGE) && age <= upper)
}

pub fn age_distribution(df: &DataFrame) -> Result<AgeDistribution> {
    let mut counts = [0usize; age_buckets::BUCKETS.len()];
    for age in df.column(decisions::AGE)?.f64()?.into_iter().flatten() {
        if let Some(i) = classify_age(age) {
            counts[i] += 1;
        }
    }

    let total: usize = counts.iter().sum();
    let buckets = age_buckets::BUCKETS
        .iter()
        .zip(counts)
        .map(|(&(lower, upper, label), count)| AgeBucketCount {
            label,
            lower,
            upper,
            count,
            pct: share(count, total),
        })
        .collect();

    Ok(AgeDistribution { buckets, total })
}

/// Mean of all non-null ages, rounded; `None` when no age is present.
pub fn average_age(df: &DataFrame) -> Result<Option<i64>> {
    let ages = df.column(decisions::AGE)?.f64()?;
    let (sum, n) = ages
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), age| (sum + age, n + 1));
    if n == 0 {
        return Ok(None);
    }
    Ok(Some((sum / n as f64).round_ties_even() as i64))
}
