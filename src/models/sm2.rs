//! SM-2 (SuperMemo 2) spaced repetition algorithm implementation.
//!
//! The SM-2 algorithm calculates review intervals based on recall quality:
//! - Each item has an ease factor (EF) that adjusts based on performance
//! - Quality grades 0-2: the item lapses, repetitions reset and it comes back tomorrow
//! - Quality grades 3-5: interval grows progressively (1 day → 6 days → EF multiplier)
//! - EF is adjusted after every review, floored at 1.3 and kept at two decimals
//!
//! Quality scale:
//! 0 - complete blackout, 1 - wrong but recognised on reveal,
//! 2 - wrong but the answer felt easy, 3 - correct with serious difficulty,
//! 4 - correct after hesitation, 5 - perfect recall.

use super::review_item::{MIN_EASE_FACTOR, days};
use super::ReviewItem;
use crate::error::SchedulerError;
use chrono::{DateTime, Utc};

pub const MIN_QUALITY: i64 = 0;
pub const MAX_QUALITY: i64 = 5;
const MAX_GRADE: u8 = MAX_QUALITY as u8;
/// Lowest grade that counts as a successful recall.
pub const PASSING_QUALITY: u8 = 3;

/// Clamps any learner input into the 0-5 grade range.
pub fn clamp_quality(quality: i64) -> u8 {
    quality.clamp(MIN_QUALITY, MAX_QUALITY) as u8
}

/// Applies one review to `item` and returns its new scheduling state.
///
/// Out-of-range quality is clamped, never rejected. Only the scheduling
/// fields change; identity, owner and content are carried over untouched.
pub fn reviewed(
    item: &ReviewItem,
    quality: i64,
    now: DateTime<Utc>,
) -> Result<ReviewItem, SchedulerError> {
    item.validate()?;
    let quality = clamp_quality(quality);

    let (interval, repetitions) = if quality < PASSING_QUALITY {
        // Lapse: back to short-term, whatever the previous interval was
        (1, 0)
    } else {
        let interval = match item.repetitions {
            0 => 1,
            1 => 6,
            // multiplies by the ease factor from before this review
            _ => grown_interval(item)?,
        };
        (interval, item.repetitions.saturating_add(1))
    };

    let ease_factor = next_ease_factor(item.ease_factor, quality);

    let next_review_at = now
        .checked_add_signed(days(interval))
        .ok_or(SchedulerError::ScheduleOverflow {
            item_id: item.id,
            interval_days: u64::from(interval),
        })?;

    Ok(ReviewItem {
        interval,
        repetitions,
        ease_factor,
        next_review_at,
        last_reviewed_at: Some(now),
        ..item.clone()
    })
}

/// `round(interval * EF)`, refused when it no longer fits a day count.
fn grown_interval(item: &ReviewItem) -> Result<u32, SchedulerError> {
    let grown = (f64::from(item.interval) * item.ease_factor).round();
    if grown > f64::from(u32::MAX) {
        return Err(SchedulerError::ScheduleOverflow {
            item_id: item.id,
            interval_days: grown as u64,
        });
    }
    Ok(grown as u32)
}

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3 and
/// rounded to two decimals. Shared by passing and failing grades.
pub fn next_ease_factor(ease_factor: f64, quality: u8) -> f64 {
    let delta = f64::from(MAX_GRADE - quality.min(MAX_GRADE));
    let updated = ease_factor + (0.1 - delta * (0.08 + delta * 0.02));
    round_ease(updated.max(MIN_EASE_FACTOR))
}

/// Two-decimal quantization applied before the value is stored or reused.
pub fn round_ease(ease_factor: f64) -> f64 {
    (ease_factor * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Flashcard;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    /// An item whose last review happened `interval` days before `now()`.
    fn item(interval: u32, repetitions: u32, ease_factor: f64) -> ReviewItem {
        let mut item = ReviewItem::new(1, "learner", Flashcard::new("hello", "cześć"), now());
        item.interval = interval;
        item.repetitions = repetitions;
        item.ease_factor = ease_factor;
        if repetitions > 0 || interval > 0 {
            let last = now() - Duration::days(i64::from(interval));
            item.last_reviewed_at = Some(last);
            item.next_review_at = now();
        }
        item
    }

    #[test]
    fn test_first_review() {
        let next = reviewed(&item(0, 0, 2.5), 4, now()).unwrap();
        assert_eq!(next.interval, 1);
        assert_eq!(next.repetitions, 1);
        assert_eq!(next.last_reviewed_at, Some(now()));
    }

    #[test]
    fn test_second_review() {
        let next = reviewed(&item(1, 1, 2.5), 4, now()).unwrap();
        assert_eq!(next.interval, 6);
        assert_eq!(next.repetitions, 2);
    }

    #[test]
    fn test_third_review_multiplies_by_prior_ease() {
        let next = reviewed(&item(6, 2, 2.5), 4, now()).unwrap();
        assert_eq!(next.interval, 15);
        assert_eq!(next.repetitions, 3);
        assert_eq!(next.ease_factor, 2.5);
        assert_eq!(next.next_review_at, Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap());

        // q=5 raises the ease factor, but the interval uses the old one
        let next = reviewed(&item(10, 3, 1.5), 5, now()).unwrap();
        assert_eq!(next.interval, 15);
        assert_eq!(next.ease_factor, 1.6);
    }

    #[test]
    fn test_quality_below_3_resets() {
        let next = reviewed(&item(15, 3, 2.5), 1, now()).unwrap();
        assert_eq!(next.interval, 1);
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.ease_factor, 1.96);
        assert_eq!(next.next_review_at, now() + Duration::days(1));
    }

    #[test]
    fn test_long_interval_lapse_comes_back_tomorrow() {
        let next = reviewed(&item(900, 12, 2.8), 2, now()).unwrap();
        assert_eq!(next.interval, 1);
        assert_eq!(next.repetitions, 0);
    }

    #[test]
    fn test_ef_floor() {
        let next = reviewed(&item(1, 1, 1.3), 0, now()).unwrap();
        assert_eq!(next.ease_factor, 1.3);
    }

    #[test]
    fn test_out_of_range_quality_is_clamped() {
        let high = reviewed(&item(6, 2, 2.5), 99, now()).unwrap();
        let five = reviewed(&item(6, 2, 2.5), 5, now()).unwrap();
        assert_eq!(high, five);

        let low = reviewed(&item(6, 2, 2.5), -7, now()).unwrap();
        let zero = reviewed(&item(6, 2, 2.5), 0, now()).unwrap();
        assert_eq!(low, zero);
        assert_eq!(low.ease_factor, 1.7);
    }

    #[test]
    fn test_content_and_identity_untouched() {
        let mut before = item(6, 2, 2.5);
        before.content.tags = vec!["polish".to_string()];
        let after = reviewed(&before, 3, now()).unwrap();

        assert_eq!(after.id, before.id);
        assert_eq!(after.owner_id, before.owner_id);
        assert_eq!(after.content, before.content);
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn test_invalid_state_is_rejected() {
        let corrupted = item(6, 2, 1.1);
        let err = reviewed(&corrupted, 4, now()).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidState { item_id: 1, .. }));
    }

    #[test]
    fn test_huge_interval_overflows_calendar() {
        let huge = item(40_000_000, 3, 2.5);
        assert!(huge.validate().is_ok());

        let err = reviewed(&huge, 5, now()).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::ScheduleOverflow {
                item_id: 1,
                interval_days: 100_000_000,
            }
        );

        // a lapse still comes back tomorrow
        let lapsed = reviewed(&huge, 1, now()).unwrap();
        assert_eq!(lapsed.interval, 1);
    }

    #[test]
    fn test_next_ease_factor_per_grade() {
        let expected = [1.7, 1.96, 2.18, 2.36, 2.5, 2.6];
        for (quality, want) in expected.iter().enumerate() {
            assert_eq!(next_ease_factor(2.5, quality as u8), *want, "quality {quality}");
        }
    }

    #[test]
    fn test_rounding_feeds_next_review() {
        // 2.5 -> 2.36 (q=3) -> 2.22 (q=3); rounding keeps the chain on two decimals
        let first = reviewed(&item(6, 2, 2.5), 3, now()).unwrap();
        assert_eq!(first.ease_factor, 2.36);
        assert_eq!(first.interval, 15);

        let later = first.next_review_at;
        let second = reviewed(&first, 3, later).unwrap();
        assert_eq!(second.interval, 35);
        assert_eq!(second.ease_factor, 2.22);
    }

    fn valid_item() -> impl Strategy<Value = ReviewItem> {
        (0u32..3650, 0u32..30, 130u32..400).prop_map(|(interval, repetitions, ef)| {
            item(interval, repetitions, f64::from(ef) / 100.0)
        })
    }

    proptest! {
        #[test]
        fn prop_ease_factor_never_below_floor(before in valid_item(), quality in -20i64..20) {
            let after = reviewed(&before, quality, now()).unwrap();
            prop_assert!(after.ease_factor >= MIN_EASE_FACTOR);
            prop_assert_eq!(round_ease(after.ease_factor), after.ease_factor);
        }

        #[test]
        fn prop_failure_resets(before in valid_item(), quality in 0i64..3) {
            let after = reviewed(&before, quality, now()).unwrap();
            prop_assert_eq!(after.interval, 1);
            prop_assert_eq!(after.repetitions, 0);
        }

        #[test]
        fn prop_success_grows_schedule(before in valid_item(), quality in 3i64..=5) {
            let after = reviewed(&before, quality, now()).unwrap();
            let expected = match before.repetitions {
                0 => 1,
                1 => 6,
                _ => (f64::from(before.interval) * before.ease_factor).round() as u32,
            };
            prop_assert_eq!(after.interval, expected);
            prop_assert_eq!(after.repetitions, before.repetitions + 1);
        }

        #[test]
        fn prop_next_review_is_whole_days_from_now(before in valid_item(), quality in 0i64..=5) {
            let after = reviewed(&before, quality, now()).unwrap();
            let expected = now() + Duration::days(i64::from(after.interval));
            prop_assert_eq!(after.next_review_at, expected);
            prop_assert_eq!(after.last_reviewed_at, Some(now()));
            prop_assert!(after.validate().is_ok());
        }
    }
}
