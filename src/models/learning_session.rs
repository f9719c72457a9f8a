//! Learning session management for spaced repetition practice.
//! Runs round-based passes over a learner's due items; every grade goes
//! through the item store's review transition.

use super::{LearningCard, ReviewItem, owner_key, sm2};
use crate::database::db::ItemStore;
use crate::error::StoreResult;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Manages a learning session with multiple review rounds.
/// Cards that aren't passed (grade < 3) are repeated in subsequent rounds.
pub struct LearningSession {
    pub owner_id: String,
    pub all_cards: Vec<LearningCard>,
    pub current_round_cards: Vec<usize>,
    pub current_index: usize,
    pub show_answer: bool,
    pub store: Arc<ItemStore>,
    pub round_number: usize,
}

impl LearningSession {
    /// Creates a new learning session from the owner's items due at `now`,
    /// in due order.
    pub fn new_from_due_items(
        store: Arc<ItemStore>,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Self> {
        let all_cards: Vec<LearningCard> = store
            .due_items(owner_id, now)?
            .into_iter()
            .map(LearningCard::new)
            .collect();
        let indices: Vec<usize> = (0..all_cards.len()).collect();

        debug!(owner_id, due = all_cards.len(), "started learning session");
        Ok(Self {
            owner_id: owner_key(owner_id).to_string(),
            all_cards,
            current_round_cards: indices,
            current_index: 0,
            show_answer: false,
            store,
            round_number: 1,
        })
    }

    pub fn current_card(&self) -> Option<&LearningCard> {
        self.current_round_cards
            .get(self.current_index)
            .and_then(|&idx| self.all_cards.get(idx))
    }

    pub fn toggle_answer(&mut self) {
        self.show_answer = !self.show_answer;
    }

    pub fn next_card(&mut self) {
        if self.current_index + 1 < self.current_round_cards.len() {
            self.current_index += 1;
            self.show_answer = false;
        } else {
            // End of round
            self.start_next_round();
        }
    }

    /// Starts a new round with the cards that weren't passed.
    /// If none remain, the session is complete.
    fn start_next_round(&mut self) {
        let failed_indices: Vec<usize> = self
            .current_round_cards
            .iter()
            .copied()
            .filter(|&idx| {
                self.all_cards
                    .get(idx)
                    .map(|card| !card.is_learned)
                    .unwrap_or(false)
            })
            .collect();

        if !failed_indices.is_empty() {
            self.current_round_cards = failed_indices;
            self.current_index = 0;
            self.show_answer = false;
            self.round_number += 1;
        }
    }

    /// Grades the current card and persists its SM-2 transition.
    /// Cards graded >= 3 are marked as learned for this session.
    ///
    /// Returns the updated item, or `None` when no card is current.
    pub fn grade_current_card(
        &mut self,
        quality: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ReviewItem>> {
        let Some(&idx) = self.current_round_cards.get(self.current_index) else {
            return Ok(None);
        };
        let Some(card) = self.all_cards.get_mut(idx) else {
            return Ok(None);
        };

        let updated = self.store.review_item(card.item.id, quality, now)?;

        if sm2::clamp_quality(quality) >= sm2::PASSING_QUALITY {
            card.mark_as_learned(now);
        } else {
            // Will be repeated in the next round
            card.is_learned = false;
        }
        card.item = updated.clone();

        Ok(Some(updated))
    }

    pub fn learned_count(&self) -> usize {
        self.current_round_cards
            .iter()
            .filter(|&&idx| {
                self.all_cards
                    .get(idx)
                    .map(|card| card.is_learned)
                    .unwrap_or(false)
            })
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.current_round_cards.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.learned_count()
    }

    /// Returns true when every card in the current round has been passed.
    pub fn is_completed(&self) -> bool {
        self.learned_count() == self.total_count()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} cards", self.round_number, self.total_count())
        } else {
            format!(
                "Round {} (Review): {} cards to retry",
                self.round_number,
                self.total_count()
            )
        }
    }
}
