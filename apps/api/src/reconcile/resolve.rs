use std::collections::HashMap;

use crate::models::library::LibraryEntity;
use crate::reconcile::matching::MatchResult;
use crate::reconcile::overrides::OverrideMap;

/// Final, override-respecting list for one section.
///
/// Auto-matched records come first in rank order unless forced out. Records
/// forced in that the auto-match did not select follow in storage order.
/// Override entries for ids no longer in the library are never consulted.
pub fn resolve_section<T: Clone>(
    entities: &[LibraryEntity<T>],
    matched: &MatchResult,
    overrides: &OverrideMap,
) -> Vec<T> {
    let by_id: HashMap<&str, &LibraryEntity<T>> = entities
        .iter()
        .map(|entity| (entity.id.as_str(), entity))
        .collect();

    let auto_ordered = matched
        .order
        .iter()
        .filter(|id| overrides.get(id.as_str()) != Some(&false))
        .filter_map(|id| by_id.get(id.as_str()).copied());

    let extra = entities.iter().filter(|entity| {
        overrides.get(&entity.id) == Some(&true) && !matched.is_selected(&entity.id)
    });

    auto_ordered
        .chain(extra)
        .map(|entity| entity.fields.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::library::LanguageFields;
    use crate::reconcile::matching::resolve_auto_match;

    fn language(id: &str, name: &str) -> LibraryEntity<LanguageFields> {
        LibraryEntity::new(
            id,
            LanguageFields {
                name: name.to_string(),
                level: None,
            },
        )
    }

    fn names(items: &[LanguageFields]) -> Vec<&str> {
        items.iter().map(|item| item.name.as_str()).collect()
    }

    fn overrides(entries: &[(&str, bool)]) -> OverrideMap {
        entries
            .iter()
            .map(|(id, value)| (id.to_string(), *value))
            .collect()
    }

    fn library() -> Vec<LibraryEntity<LanguageFields>> {
        vec![
            language("l1", "English"),
            language("l2", "German"),
            language("l3", "French"),
            language("l4", "Spanish"),
        ]
    }

    #[test]
    fn test_no_overrides_yields_auto_rank_order() {
        let library = library();
        let auto = vec![library[2].fields.clone(), library[0].fields.clone()];
        let matched = resolve_auto_match(&auto, &library);

        let resolved = resolve_section(&library, &matched, &OverrideMap::new());

        assert_eq!(names(&resolved), vec!["French", "English"]);
    }

    #[test]
    fn test_false_override_removes_matched_record() {
        let library = library();
        let auto = vec![library[2].fields.clone(), library[0].fields.clone()];
        let matched = resolve_auto_match(&auto, &library);

        let resolved = resolve_section(&library, &matched, &overrides(&[("l3", false)]));

        assert_eq!(names(&resolved), vec!["English"]);
    }

    #[test]
    fn test_true_override_appends_in_storage_order_after_auto() {
        let library = library();
        let auto = vec![library[2].fields.clone()];
        let matched = resolve_auto_match(&auto, &library);

        let resolved = resolve_section(
            &library,
            &matched,
            &overrides(&[("l4", true), ("l1", true), ("l3", true)]),
        );

        assert_eq!(names(&resolved), vec!["French", "English", "Spanish"]);
    }

    #[test]
    fn test_stale_override_ids_never_surface() {
        let library = library();
        let matched = resolve_auto_match(&[], &library);

        let resolved = resolve_section(&library, &matched, &overrides(&[("gone", true)]));

        assert!(resolved.is_empty());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let library = library();
        let auto = vec![library[1].fields.clone(), library[3].fields.clone()];
        let matched = resolve_auto_match(&auto, &library);
        let choices = overrides(&[("l1", true), ("l4", false)]);

        let first = resolve_section(&library, &matched, &choices);
        for _ in 0..10 {
            assert_eq!(resolve_section(&library, &matched, &choices), first);
        }
    }
}
