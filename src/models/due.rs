//! Due-item selection over an in-memory collection.
use super::ReviewItem;
use super::review_item::owner_key;
use chrono::{DateTime, Utc};

/// Returns the items of `owner_id` that are due at `now`, oldest-due first.
///
/// Items with the same `next_review_at` keep their collection order, so a
/// collection kept in creation order yields creation-order ties. The result
/// is rebuilt on every call.
pub fn select_due<'a>(
    items: &'a [ReviewItem],
    owner_id: &str,
    now: DateTime<Utc>,
) -> Vec<&'a ReviewItem> {
    let owner_id = owner_key(owner_id);
    let mut due: Vec<&ReviewItem> = items
        .iter()
        .filter(|item| owner_key(&item.owner_id) == owner_id && item.is_due(now))
        .collect();

    // stable sort preserves collection order on ties
    due.sort_by_key(|item| item.next_review_at);
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Flashcard;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn item(id: i64, owner: &str, due_offset_hours: i64) -> ReviewItem {
        let mut item = ReviewItem::new(id, owner, Flashcard::new(format!("q{id}"), "a"), now());
        item.next_review_at = now() + Duration::hours(due_offset_hours);
        item
    }

    #[test]
    fn test_filters_owner_and_due_date() {
        let items = vec![
            item(1, "ola", -5),
            item(2, "jan", -5),
            item(3, "ola", 1),
            item(4, "ola", 0),
        ];

        let due: Vec<i64> = select_due(&items, "ola", now()).iter().map(|i| i.id).collect();
        assert_eq!(due, vec![1, 4]);
    }

    #[test]
    fn test_oldest_due_first() {
        let items = vec![item(1, "ola", -1), item(2, "ola", -48), item(3, "ola", -3)];

        let due: Vec<i64> = select_due(&items, "ola", now()).iter().map(|i| i.id).collect();
        assert_eq!(due, vec![2, 3, 1]);
    }

    #[test]
    fn test_ties_keep_collection_order() {
        let items = vec![
            item(5, "ola", -2),
            item(2, "ola", -2),
            item(9, "ola", -4),
            item(1, "ola", -2),
        ];

        let due: Vec<i64> = select_due(&items, "ola", now()).iter().map(|i| i.id).collect();
        assert_eq!(due, vec![9, 5, 2, 1]);
    }

    #[test]
    fn test_repeated_queries_are_identical() {
        let items = vec![item(1, "ola", -2), item(2, "ola", -2), item(3, "ola", -7)];

        let first = select_due(&items, "ola", now());
        let second = select_due(&items, "ola", now());
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_owner_gets_nothing() {
        let items = vec![item(1, "ola", -2)];
        assert!(select_due(&items, "nobody", now()).is_empty());
    }

    #[test]
    fn test_owner_id_is_trimmed() {
        let mut stray = item(2, "ola", -1);
        stray.owner_id = " ola ".to_string();
        let items = vec![item(1, "ola", -2), stray];

        let due: Vec<i64> = select_due(&items, "  ola", now()).iter().map(|i| i.id).collect();
        assert_eq!(due, vec![1, 2]);
    }

    fn collection() -> impl Strategy<Value = Vec<ReviewItem>> {
        prop::collection::vec((prop::bool::ANY, -72i64..72), 0..40).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(idx, (is_ola, offset))| {
                    let owner = if is_ola { "ola" } else { "jan" };
                    item(idx as i64, owner, offset)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_selection_matches_due_items(items in collection()) {
            let due = select_due(&items, "ola", now());

            // oldest first; ties keep collection order
            for pair in due.windows(2) {
                prop_assert!(pair[0].next_review_at <= pair[1].next_review_at);
                if pair[0].next_review_at == pair[1].next_review_at {
                    prop_assert!(pair[0].id < pair[1].id);
                }
            }

            // nothing returned that is not due, nothing due left out
            prop_assert!(due.iter().all(|i| i.owner_id == "ola" && i.is_due(now())));
            let expected = items
                .iter()
                .filter(|i| i.owner_id == "ola" && i.next_review_at <= now())
                .count();
            prop_assert_eq!(due.len(), expected);
        }
    }
}
