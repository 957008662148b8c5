//! Report session: owns the loaded frames and recomputes reports on demand.
//!
//! Loaded frames are cached per source, keyed by path, sheet, and file
//! modification time. A changed file is reloaded on next access; nothing is
//! shared between sessions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

use polars::prelude::DataFrame;
use tracing::{debug, info, warn};

use crate::config::{ReportConfig, ReportOptions, SourceConfig};
use crate::error::{ReportError, Result};
use crate::filter::{decision_options, filter_by_decision, DecisionSelection};
use crate::funnel::matched_participants;
use crate::loader::{load_decisions, load_participants};
use crate::report::Report;

/// Where a frame comes from.
#[derive(Debug, Clone)]
pub enum FrameSource {
    File(SourceConfig),
    /// Already loaded and prepared; used as-is.
    Preloaded(DataFrame),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    sheet: Option<String>,
    modified: Option<SystemTime>,
}

impl CacheKey {
    fn for_source(source: &SourceConfig) -> Result<Self> {
        let modified = std::fs::metadata(&source.path)?.modified().ok();
        Ok(Self {
            path: source.path.clone(),
            sheet: source.sheet.clone(),
            modified,
        })
    }

    fn same_source(&self, other: &CacheKey) -> bool {
        self.path == other.path && self.sheet == other.sheet
    }
}

/// Loaded-frame cache keyed by path + sheet + modification time.
#[derive(Debug, Default)]
pub struct SourceCache {
    entries: HashMap<CacheKey, DataFrame>,
    loads: usize,
}

impl SourceCache {
    /// Return the cached frame for `source`, loading it when absent or stale.
    pub fn get_or_load<F>(&mut self, source: &SourceConfig, load: F) -> Result<DataFrame>
    where
        F: FnOnce(&SourceConfig) -> Result<DataFrame>,
    {
        let key = CacheKey::for_source(source)?;
        if let Some(df) = self.entries.get(&key) {
            debug!(path = %source.path.display(), "source cache hit");
            return Ok(df.clone());
        }

        let df = load(source)?;
        self.entries.retain(|k, _| !k.same_source(&key));
        self.entries.insert(key, df.clone());
        self.loads += 1;
        Ok(df)
    }

    /// Number of loads performed (cache misses).
    pub fn loads(&self) -> usize {
        self.loads
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub struct ReportSession {
    decisions: FrameSource,
    participants: Option<FrameSource>,
    options: ReportOptions,
    cache: SourceCache,
}

impl ReportSession {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            decisions: FrameSource::File(config.sources.decisions),
            participants: config.sources.participants.map(FrameSource::File),
            options: config.report,
            cache: SourceCache::default(),
        }
    }

    /// Session over frames that are already loaded and normalized.
    pub fn from_frames(
        decisions: DataFrame,
        participants: Option<DataFrame>,
        options: ReportOptions,
    ) -> Self {
        Self {
            decisions: FrameSource::Preloaded(decisions),
            participants: participants.map(FrameSource::Preloaded),
            options,
            cache: SourceCache::default(),
        }
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// The normalized decisions frame. Any failure here is fatal to the report.
    pub fn decisions(&mut self) -> Result<DataFrame> {
        match &self.decisions {
            FrameSource::Preloaded(df) => Ok(df.clone()),
            FrameSource::File(source) => {
                if !source.path.exists() {
                    return Err(ReportError::NotLoaded(format!(
                        "decisions source {} does not exist",
                        source.path.display()
                    )));
                }
                let policy = self.options.date_policy;
                self.cache
                    .get_or_load(source, |s| load_decisions(s, policy))
            }
        }
    }

    /// The participants frame, or `None` when it is not configured or cannot
    /// be loaded. Only the funnel depends on it.
    pub fn participants(&mut self) -> Option<DataFrame> {
        let source = match self.participants.as_ref()? {
            FrameSource::Preloaded(df) => return Some(df.clone()),
            FrameSource::File(source) => source,
        };

        if !source.path.exists() {
            info!(path = %source.path.display(), "participants source missing, funnel disabled");
            return None;
        }

        match self.cache.get_or_load(source, load_participants) {
            Ok(df) => Some(df),
            Err(err) => {
                warn!(error = %err, "participants source unreadable, funnel disabled");
                None
            }
        }
    }

    pub fn decision_options(&mut self) -> Result<Vec<String>> {
        decision_options(&self.decisions()?)
    }

    pub fn filtered(&mut self, selection: &DecisionSelection) -> Result<DataFrame> {
        filter_by_decision(&self.decisions()?, selection)
    }

    /// Detail rows of the filtered log that matched a participant.
    pub fn matched(&mut self, selection: &DecisionSelection) -> Result<Option<DataFrame>> {
        let filtered = self.filtered(selection)?;
        self.participants()
            .map(|p| matched_participants(&filtered, &p))
            .transpose()
    }

    pub fn report(&mut self, selection: &DecisionSelection) -> Result<Report> {
        let decisions = self.decisions()?;
        let participants = self.participants();
        Report::build(&decisions, participants.as_ref(), selection, &self.options)
    }
}
