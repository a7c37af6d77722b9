//! Auto-match: correlates identifier-free rules-engine output with library ids.
//!
//! The only available correlation is value equality under normalisation.
//! Library records sharing a key queue up in storage order and are handed
//! out first-in, first-out to auto items in rank order.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::models::library::{EntityId, LibraryEntity};
use crate::reconcile::keys::MatchKey;

/// Composite key → queue of library ids sharing it, in storage order.
#[derive(Debug, Default)]
pub struct MatchIndex {
    queues: HashMap<String, VecDeque<EntityId>>,
}

impl MatchIndex {
    pub fn build<T: MatchKey>(entities: &[LibraryEntity<T>]) -> Self {
        let mut queues: HashMap<String, VecDeque<EntityId>> = HashMap::new();
        for entity in entities {
            queues
                .entry(entity.fields.match_key())
                .or_default()
                .push_back(entity.id.clone());
        }
        Self { queues }
    }

    /// Pops the earliest unclaimed id for `key`.
    pub fn claim(&mut self, key: &str) -> Option<EntityId> {
        self.queues.get_mut(key).and_then(VecDeque::pop_front)
    }
}

/// Library ids matched by the rules engine for one section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchResult {
    /// Matched ids in rules-engine rank order. Each id appears at most once.
    pub order: Vec<EntityId>,
    /// Same ids as `order`, for membership tests.
    pub selected: HashSet<EntityId>,
    /// Auto items that found no remaining library record with their key.
    pub unmatched: usize,
}

impl MatchResult {
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }
}

/// Matches ranked auto items against the library. Items without a remaining
/// library record are skipped and only counted in `unmatched`.
pub fn resolve_auto_match<T: MatchKey>(
    auto_items: &[T],
    entities: &[LibraryEntity<T>],
) -> MatchResult {
    let mut index = MatchIndex::build(entities);
    let mut result = MatchResult::default();

    for item in auto_items {
        match index.claim(&item.match_key()) {
            Some(id) => {
                result.selected.insert(id.clone());
                result.order.push(id);
            }
            None => result.unmatched += 1,
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::library::{LanguageFields, SkillFields};

    fn go_skill() -> SkillFields {
        SkillFields {
            name: "Go".to_string(),
            level: None,
            tags: vec!["backend".to_string()],
            priority: 1,
        }
    }

    fn language(name: &str) -> LanguageFields {
        LanguageFields {
            name: name.to_string(),
            level: None,
        }
    }

    #[test]
    fn test_identical_duplicates_match_first_library_record_first() {
        let library = vec![
            LibraryEntity::new("s1", go_skill()),
            LibraryEntity::new("s2", go_skill()),
        ];

        let result = resolve_auto_match(&[go_skill()], &library);

        assert_eq!(result.order, vec!["s1".to_string()]);
        assert_eq!(result.selected, HashSet::from(["s1".to_string()]));
    }

    #[test]
    fn test_repeated_auto_items_claim_distinct_ids_fifo() {
        let library = vec![
            LibraryEntity::new("s1", go_skill()),
            LibraryEntity::new("s2", go_skill()),
        ];

        let result = resolve_auto_match(&[go_skill(), go_skill()], &library);

        assert_eq!(result.order, vec!["s1".to_string(), "s2".to_string()]);
        assert_eq!(result.selected.len(), 2);
        assert_eq!(result.unmatched, 0);
    }

    #[test]
    fn test_auto_items_beyond_library_duplicates_are_skipped() {
        let library = vec![LibraryEntity::new("s1", go_skill())];

        let result = resolve_auto_match(&[go_skill(), go_skill()], &library);

        assert_eq!(result.order, vec!["s1".to_string()]);
        assert_eq!(result.unmatched, 1);
    }

    #[test]
    fn test_unknown_auto_item_contributes_nothing() {
        let library = vec![LibraryEntity::new("l1", language("English"))];

        let result = resolve_auto_match(&[language("Klingon")], &library);

        assert!(result.order.is_empty());
        assert!(result.selected.is_empty());
        assert_eq!(result.unmatched, 1);
    }

    #[test]
    fn test_order_follows_rank_not_storage() {
        let library = vec![
            LibraryEntity::new("l1", language("English")),
            LibraryEntity::new("l2", language("German")),
            LibraryEntity::new("l3", language("French")),
        ];

        let result = resolve_auto_match(&[language("french"), language(" ENGLISH ")], &library);

        assert_eq!(result.order, vec!["l3".to_string(), "l1".to_string()]);
        assert!(!result.is_selected("l2"));
    }
}
