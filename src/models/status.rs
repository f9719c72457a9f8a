//! Derived learning status of a review item. Computed on demand from the
//! scheduling fields; never stored.
use super::ReviewItem;
use serde::{Deserialize, Serialize};

/// Interval (days) from which an item counts as past the learning stage.
pub const LEARNING_INTERVAL_DAYS: u32 = 21;

/// Ease factor at or above which a long-interval item counts as mastered.
pub const MASTERED_EASE_FACTOR: f64 = 2.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    New,
    Learning,
    Mastered,
    Review,
}

impl CardStatus {
    /// First matching rule wins: new, learning, mastered, review.
    pub fn of(item: &ReviewItem) -> Self {
        if item.repetitions == 0 {
            CardStatus::New
        } else if item.interval < LEARNING_INTERVAL_DAYS {
            CardStatus::Learning
        } else if item.ease_factor >= MASTERED_EASE_FACTOR {
            CardStatus::Mastered
        } else {
            CardStatus::Review
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::New => "new",
            CardStatus::Learning => "learning",
            CardStatus::Mastered => "mastered",
            CardStatus::Review => "review",
        }
    }
}

/// Per-status counts for one learner.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub total: usize,
    pub new: usize,
    pub learning: usize,
    pub review: usize,
    pub mastered: usize,
    pub due: usize,
}

impl StatusSummary {
    pub fn record(&mut self, status: CardStatus, is_due: bool) {
        self.total += 1;
        match status {
            CardStatus::New => self.new += 1,
            CardStatus::Learning => self.learning += 1,
            CardStatus::Review => self.review += 1,
            CardStatus::Mastered => self.mastered += 1,
        }
        if is_due {
            self.due += 1;
        }
    }
}
