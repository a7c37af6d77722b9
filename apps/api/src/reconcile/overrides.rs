//! Manual override maps: defaults synthesised from an auto-match, and the
//! directional merge with previously persisted choices.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::library::{EntityId, LibraryEntity, Section};
use crate::reconcile::keys::MATCH_KEY_VERSION;
use crate::reconcile::matching::MatchResult;

/// Entity id → forced inclusion (`true`) or exclusion (`false`).
/// A missing id defers to the automatic decision.
pub type OverrideMap = BTreeMap<EntityId, bool>;

fn current_version() -> u32 {
    MATCH_KEY_VERSION
}

/// One override map per section, persisted as a unit with a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualOverride {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub skills: OverrideMap,
    #[serde(default)]
    pub projects: OverrideMap,
    #[serde(default)]
    pub experience: OverrideMap,
    #[serde(default)]
    pub education: OverrideMap,
    #[serde(default)]
    pub languages: OverrideMap,
}

impl Default for ManualOverride {
    fn default() -> Self {
        Self {
            version: MATCH_KEY_VERSION,
            skills: OverrideMap::new(),
            projects: OverrideMap::new(),
            experience: OverrideMap::new(),
            education: OverrideMap::new(),
            languages: OverrideMap::new(),
        }
    }
}

impl ManualOverride {
    pub fn section(&self, section: Section) -> &OverrideMap {
        match section {
            Section::Skills => &self.skills,
            Section::Projects => &self.projects,
            Section::Experience => &self.experience,
            Section::Education => &self.education,
            Section::Languages => &self.languages,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut OverrideMap {
        match section {
            Section::Skills => &mut self.skills,
            Section::Projects => &mut self.projects,
            Section::Experience => &mut self.experience,
            Section::Education => &mut self.education,
            Section::Languages => &mut self.languages,
        }
    }

    /// Merges every section of `defaults` with `persisted`.
    ///
    /// A persisted override recorded under a different key contract version
    /// was matched against different keys and is ignored.
    pub fn merged(defaults: &ManualOverride, persisted: Option<&ManualOverride>) -> ManualOverride {
        let persisted = persisted.filter(|stored| stored.version == MATCH_KEY_VERSION);
        let mut merged = ManualOverride::default();
        for section in Section::ALL {
            *merged.section_mut(section) = merge_overrides(
                defaults.section(section),
                persisted.map(|stored| stored.section(section)),
            );
        }
        merged
    }
}

/// Total override map: every library record of the section gets an explicit
/// default, `true` iff the auto-match selected it.
pub fn synthesize_defaults<T>(matched: &MatchResult, entities: &[LibraryEntity<T>]) -> OverrideMap {
    entities
        .iter()
        .map(|entity| (entity.id.clone(), matched.is_selected(&entity.id)))
        .collect()
}

/// For each id in `defaults`, the persisted choice if there is one, else the
/// default. Persisted ids missing from `defaults` (deleted records) are dropped.
pub fn merge_overrides(defaults: &OverrideMap, persisted: Option<&OverrideMap>) -> OverrideMap {
    defaults
        .iter()
        .map(|(id, default)| {
            let value = persisted
                .and_then(|stored| stored.get(id))
                .copied()
                .unwrap_or(*default);
            (id.clone(), value)
        })
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

    fn map(entries: &[(&str, bool)]) -> OverrideMap {
        entries
            .iter()
            .map(|(id, value)| (id.to_string(), *value))
            .collect()
    }

    #[test]
    fn test_defaults_cover_every_library_record() {
        let library = vec![language("l1", "English"), language("l2", "German")];
        let auto = vec![library[1].fields.clone()];
        let matched = resolve_auto_match(&auto, &library);

        let defaults = synthesize_defaults(&matched, &library);

        assert_eq!(defaults, map(&[("l1", false), ("l2", true)]));
    }

    #[test]
    fn test_merge_with_nothing_persisted_is_identity() {
        let defaults = map(&[("a", true), ("b", false)]);
        assert_eq!(merge_overrides(&defaults, None), defaults);
        assert_eq!(merge_overrides(&defaults, Some(&OverrideMap::new())), defaults);
    }

    #[test]
    fn test_merge_keeps_persisted_choice_for_existing_records() {
        let defaults = map(&[("a", true), ("b", false)]);
        let persisted = map(&[("a", false), ("b", true)]);

        assert_eq!(
            merge_overrides(&defaults, Some(&persisted)),
            map(&[("a", false), ("b", true)])
        );
    }

    #[test]
    fn test_merge_drops_deleted_and_defaults_new_records() {
        let defaults = map(&[("a", true), ("new", false)]);
        let persisted = map(&[("a", false), ("deleted", true)]);

        let merged = merge_overrides(&defaults, Some(&persisted));

        assert_eq!(merged, map(&[("a", false), ("new", false)]));
    }

    #[test]
    fn test_merged_ignores_other_key_contract_version() {
        let mut defaults = ManualOverride::default();
        defaults.skills = map(&[("s1", true)]);
        let mut stale = ManualOverride::default();
        stale.version = MATCH_KEY_VERSION + 1;
        stale.skills = map(&[("s1", false)]);

        let merged = ManualOverride::merged(&defaults, Some(&stale));

        assert_eq!(merged.skills, map(&[("s1", true)]));
    }

    #[test]
    fn test_manual_override_deserialises_without_version() {
        let parsed: ManualOverride = serde_json::from_value(serde_json::json!({
            "skills": {"s1": true},
            "projects": {},
            "experience": {},
            "education": {},
            "languages": {}
        }))
        .unwrap();

        assert_eq!(parsed.version, MATCH_KEY_VERSION);
        assert_eq!(parsed.skills, map(&[("s1", true)]));
    }
}
