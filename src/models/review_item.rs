//! ReviewItem is a flashcard together with its SM-2 scheduling state.
use super::sm2::round_ease;
use super::{CardStatus, Flashcard};
use crate::error::SchedulerError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub id: i64,
    pub owner_id: String,
    pub content: Flashcard,
    pub interval: u32,
    pub repetitions: u32,
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Scheduling fields surfaced to whoever submitted a review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFields {
    pub interval: u32,
    pub repetitions: u32,
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewItem {
    /// A never-reviewed item, due immediately.
    pub fn new(
        id: i64,
        owner_id: impl AsRef<str>,
        content: Flashcard,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id: owner_key(owner_id.as_ref()).to_string(),
            content,
            interval: 0,
            repetitions: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            next_review_at: now,
            last_reviewed_at: None,
            created_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review_at
    }

    pub fn status(&self) -> CardStatus {
        CardStatus::of(self)
    }

    pub fn schedule(&self) -> ScheduleFields {
        ScheduleFields {
            interval: self.interval,
            repetitions: self.repetitions,
            ease_factor: self.ease_factor,
            next_review_at: self.next_review_at,
            last_reviewed_at: self.last_reviewed_at,
        }
    }

    /// Checks the scheduling invariants of a stored state.
    ///
    /// Out-of-invariant state is corrupted data and is reported rather than
    /// repaired.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if !self.ease_factor.is_finite() || self.ease_factor < MIN_EASE_FACTOR {
            return Err(self.invalid(format!(
                "ease factor {} is below the {MIN_EASE_FACTOR} floor",
                self.ease_factor
            )));
        }
        if round_ease(self.ease_factor) != self.ease_factor {
            return Err(self.invalid(format!(
                "ease factor {} is not kept at two decimals",
                self.ease_factor
            )));
        }

        match self.last_reviewed_at {
            None if self.repetitions > 0 => Err(self.invalid(format!(
                "{} repetitions recorded but the item was never reviewed",
                self.repetitions
            ))),
            Some(last)
                if last.checked_add_signed(days(self.interval)) != Some(self.next_review_at) =>
            {
                Err(self.invalid(format!(
                    "next review {} does not match last review {} plus {} days",
                    self.next_review_at, last, self.interval
                )))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn invalid(&self, reason: String) -> SchedulerError {
        SchedulerError::InvalidState {
            item_id: self.id,
            reason,
        }
    }
}

/// Canonical form of an owner id, used both when storing and when looking
/// items up.
pub fn owner_key(owner_id: &str) -> &str {
    owner_id.trim()
}

/// Whole-day offset used for every schedule computation.
pub fn days(interval: u32) -> Duration {
    Duration::days(i64::from(interval))
}
