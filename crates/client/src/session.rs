//! State of the current comparison, as a front end renders it.

use std::collections::HashMap;
use std::fmt;
use studionavi_common::{group_by_room, FetchFailure, FetchOutcome, RoomTimeRanges, Studio, StudioId};
use tracing::debug;

use crate::aggregator::{Progress, RunEvent, RunId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardStatus {
    Pending,
    Available(Vec<RoomTimeRanges>),
    /// Looked up successfully, nothing free.
    Full,
    FetchFailed { message: String, code: String },
}

impl CardStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CardStatus::Pending => "確認中",
            CardStatus::Available(_) => "空きあり",
            CardStatus::Full => "満室",
            CardStatus::FetchFailed { .. } => "取得失敗",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioCard {
    pub studio_id: StudioId,
    pub studio_name: String,
    pub status: CardStatus,
}

/// Summary shown when at least one studio could not be checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureBanner {
    pub studio_names: Vec<String>,
}

impl fmt::Display for FailureBanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "一部のスタジオで空き状況を取得できませんでした: {}", self.studio_names.join("、"))?;
        write!(f, "時間をおいて再検索するか、ページを再読み込みしてください")
    }
}

#[derive(Debug, Default)]
pub struct SearchSession {
    run_id: Option<RunId>,
    studios: Vec<Studio>,
    outcomes: HashMap<StudioId, FetchOutcome>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `run_id`, discarding whatever the previous run left.
    pub fn begin(&mut self, run_id: RunId, studios: Vec<Studio>) {
        self.run_id = Some(run_id);
        self.studios = studios;
        self.outcomes.clear();
    }

    /// Merge an event. Returns `false` when it belongs to another run, to a
    /// studio outside this run, or repeats an outcome already recorded.
    pub fn apply(&mut self, event: RunEvent) -> bool {
        if self.run_id != Some(event.run_id) {
            debug!(run_id = %event.run_id, "discarding event from stale run");
            return false;
        }
        let studio_id = event.outcome.studio_id();
        if !self.studios.iter().any(|s| s.id == studio_id) || self.outcomes.contains_key(&studio_id) {
            return false;
        }
        self.outcomes.insert(studio_id, event.outcome);
        true
    }

    pub fn reset(&mut self) {
        self.run_id = None;
        self.studios.clear();
        self.outcomes.clear();
    }

    pub fn run_id(&self) -> Option<RunId> {
        self.run_id
    }

    pub fn progress(&self) -> Progress {
        Progress::new(self.outcomes.len(), self.studios.len())
    }

    pub fn is_complete(&self) -> bool {
        self.run_id.is_some() && self.progress().is_complete()
    }

    /// Failures in input order.
    pub fn failures(&self) -> Vec<&FetchFailure> {
        self.studios
            .iter()
            .filter_map(|s| match self.outcomes.get(&s.id) {
                Some(FetchOutcome::Failed(f)) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn cards(&self) -> Vec<StudioCard> {
        self.studios
            .iter()
            .map(|studio| match self.outcomes.get(&studio.id) {
                None => StudioCard {
                    studio_id: studio.id,
                    studio_name: studio.name.clone(),
                    status: CardStatus::Pending,
                },
                Some(FetchOutcome::Ok(availability)) => StudioCard {
                    studio_id: studio.id,
                    studio_name: availability.studio_name.clone(),
                    status: if availability.is_full() {
                        CardStatus::Full
                    } else {
                        CardStatus::Available(group_by_room(&availability.available_ranges))
                    },
                },
                Some(FetchOutcome::Failed(failure)) => StudioCard {
                    studio_id: studio.id,
                    studio_name: failure.studio_name.clone(),
                    status: CardStatus::FetchFailed {
                        message: failure.error_message.clone(),
                        code: failure.error_code.clone(),
                    },
                },
            })
            .collect()
    }

    pub fn failure_banner(&self) -> Option<FailureBanner> {
        let failures = self.failures();
        if failures.is_empty() {
            return None;
        }
        Some(FailureBanner {
            studio_names: failures.iter().map(|f| f.studio_name.clone()).collect(),
        })
    }
}
