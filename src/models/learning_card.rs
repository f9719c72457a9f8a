//! Wrapper for review items that tracks progress within one session.
use super::ReviewItem;
use chrono::{DateTime, Utc};

#[derive(Clone, Debug)]
pub struct LearningCard {
    pub item: ReviewItem,
    pub is_learned: bool,
    pub last_learned_at: Option<DateTime<Utc>>,
}

impl LearningCard {
    pub fn new(item: ReviewItem) -> Self {
        Self {
            item,
            is_learned: false,
            last_learned_at: None,
        }
    }

    pub fn mark_as_learned(&mut self, now: DateTime<Utc>) {
        self.is_learned = true;
        self.last_learned_at = Some(now);
    }
}
