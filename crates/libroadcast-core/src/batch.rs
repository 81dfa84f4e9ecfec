//! Sequential, best-effort application of one edit per selected round.
//!
//! # Design
//! - Rounds are selected by position, then edited strictly in fetched order.
//! - A failed edit is recorded and the batch moves on; nothing is rolled back.
//! - A fixed pause separates consecutive edits to stay under the server's rate limit.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::EditError;
use crate::model::{Round, RoundEdit};
use crate::selector::RoundSelector;

/// Pause inserted between consecutive round edits.
pub const EDIT_INTERVAL: Duration = Duration::from_millis(200);

/// Submits a partial edit for one round.
#[async_trait]
pub trait RoundEditor: Send + Sync {
    /// Apply `edit` to the round identified by `round_id`.
    async fn edit_round(&self, round_id: &str, edit: &RoundEdit) -> Result<(), EditError>;
}

/// Result of editing a single round.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The server accepted the edit.
    Updated {
        /// Edited round.
        round_id: String,
        /// 1-based position in the broadcast.
        position: u32,
        /// Body that was applied.
        edit: RoundEdit,
    },
    /// The edit was rejected or never reached the server.
    Failed {
        /// Round that could not be edited.
        round_id: String,
        /// 1-based position in the broadcast.
        position: u32,
        /// Body that was attempted.
        edit: RoundEdit,
        /// Failure reason.
        error: EditError,
    },
}

impl UpdateOutcome {
    /// `true` for [`UpdateOutcome::Updated`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }

    /// Round the outcome refers to.
    #[must_use]
    pub fn round_id(&self) -> &str {
        match self {
            Self::Updated { round_id, .. } | Self::Failed { round_id, .. } => round_id,
        }
    }

    /// 1-based position of the round.
    #[must_use]
    pub const fn position(&self) -> u32 {
        match self {
            Self::Updated { position, .. } | Self::Failed { position, .. } => *position,
        }
    }
}

/// Rounds chosen for a batch, paired with their original 1-based positions.
#[derive(Debug, Clone)]
pub struct RoundBatch<'a> {
    entries: Vec<(u32, &'a Round)>,
    fell_back: bool,
}

impl<'a> RoundBatch<'a> {
    /// Keep the rounds whose position matches `selector`.
    ///
    /// When a non-empty selector matches none of the existing positions, the
    /// batch falls back to every round and records that it did so.
    #[must_use]
    pub fn select(rounds: &'a [Round], selector: &RoundSelector) -> Self {
        let all = positioned(rounds);
        let entries: Vec<_> = all
            .iter()
            .copied()
            .filter(|(position, _)| selector.matches(*position))
            .collect();

        if entries.is_empty() && !rounds.is_empty() {
            warn!(
                selector = ?selector.positions().collect::<Vec<_>>(),
                rounds = rounds.len(),
                "round filter matched no existing round; applying to all rounds"
            );
            return Self {
                entries: all,
                fell_back: true,
            };
        }

        Self {
            entries,
            fell_back: false,
        }
    }

    /// Keep only the rounds whose position matches `selector`, never falling
    /// back. Used where editing every round on a mistyped selector would be
    /// destructive, such as shifting a schedule.
    #[must_use]
    pub fn select_exact(rounds: &'a [Round], selector: &RoundSelector) -> Self {
        let entries = positioned(rounds)
            .into_iter()
            .filter(|(position, _)| selector.matches(*position))
            .collect();
        Self {
            entries,
            fell_back: false,
        }
    }

    /// Drop rounds for which `keep` returns `false`. Positions are preserved.
    #[must_use]
    pub fn retain(mut self, mut keep: impl FnMut(&Round) -> bool) -> Self {
        self.entries.retain(|(_, round)| keep(round));
        self
    }

    /// Whether the selector matched nothing and every round was kept instead.
    #[must_use]
    pub const fn fell_back(&self) -> bool {
        self.fell_back
    }

    /// Number of rounds in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no round is left to edit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(position, round)` pairs in processing order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &'a Round)> + '_ {
        self.entries.iter().copied()
    }
}

fn positioned(rounds: &[Round]) -> Vec<(u32, &Round)> {
    rounds
        .iter()
        .enumerate()
        .map(|(index, round)| (u32::try_from(index + 1).unwrap_or(u32::MAX), round))
        .collect()
}

/// Drives a batch of round edits through a [`RoundEditor`].
pub struct BatchRoundUpdater<'e, E: RoundEditor + ?Sized> {
    editor: &'e E,
    interval: Duration,
}

impl<'e, E: RoundEditor + ?Sized> BatchRoundUpdater<'e, E> {
    /// Updater pausing [`EDIT_INTERVAL`] between edits.
    #[must_use]
    pub const fn new(editor: &'e E) -> Self {
        Self {
            editor,
            interval: EDIT_INTERVAL,
        }
    }

    /// Override the pause between edits.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Select rounds with `selector` and edit each of them.
    pub async fn apply<F, R>(
        &self,
        rounds: &[Round],
        selector: &RoundSelector,
        build: F,
        report: R,
    ) -> Vec<UpdateOutcome>
    where
        F: FnMut(&Round, u32) -> RoundEdit,
        R: FnMut(&UpdateOutcome),
    {
        let batch = RoundBatch::select(rounds, selector);
        self.run(&batch, build, report).await
    }

    /// Edit every round of `batch` in order.
    ///
    /// `build` produces the body for a round given its 1-based position and
    /// `report` sees each outcome as soon as it is known. Failures never stop
    /// the batch.
    pub async fn run<F, R>(
        &self,
        batch: &RoundBatch<'_>,
        mut build: F,
        mut report: R,
    ) -> Vec<UpdateOutcome>
    where
        F: FnMut(&Round, u32) -> RoundEdit,
        R: FnMut(&UpdateOutcome),
    {
        let mut outcomes = Vec::with_capacity(batch.len());
        let total = batch.len();

        for (index, (position, round)) in batch.iter().enumerate() {
            let edit = build(round, position);
            debug!(round_id = %round.id, position, edit = %edit, "editing round");

            let outcome = match self.editor.edit_round(&round.id, &edit).await {
                Ok(()) => UpdateOutcome::Updated {
                    round_id: round.id.clone(),
                    position,
                    edit,
                },
                Err(error) => {
                    warn!(round_id = %round.id, position, error = %error, "round edit failed");
                    UpdateOutcome::Failed {
                        round_id: round.id.clone(),
                        position,
                        edit,
                        error,
                    }
                }
            };
            report(&outcome);
            outcomes.push(outcome);

            if index + 1 < total && !self.interval.is_zero() {
                tokio::time::sleep(self.interval).await;
            }
        }

        outcomes
    }
}
