//! Content reconciliation engine.
//!
//! Maps rules-engine output (no identifiers) back onto identified library
//! records, synthesises the "what the engine picked" override defaults,
//! merges them with persisted manual choices and resolves the final preview.
//! Everything here is pure and total.

pub mod keys;
pub mod matching;
pub mod normalize;
pub mod overrides;
pub mod resolve;

use std::collections::BTreeMap;

use serde::Serialize;

pub use matching::{resolve_auto_match, MatchResult};
pub use overrides::{merge_overrides, synthesize_defaults, ManualOverride, OverrideMap};
pub use resolve::resolve_section;

use crate::models::library::{Library, Section};
use crate::models::preview::{CvPreview, PublicProfile};

/// Auto-match results for all five sections of one library/preview pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LibraryMatch {
    pub skills: MatchResult,
    pub projects: MatchResult,
    pub experience: MatchResult,
    pub education: MatchResult,
    pub languages: MatchResult,
}

impl LibraryMatch {
    pub fn compute(auto: &CvPreview, library: &Library) -> Self {
        Self {
            skills: resolve_auto_match(&auto.skills, &library.skills),
            projects: resolve_auto_match(&auto.projects, &library.projects),
            experience: resolve_auto_match(&auto.experience, &library.experience),
            education: resolve_auto_match(&auto.education, &library.education),
            languages: resolve_auto_match(&auto.languages, &library.languages),
        }
    }

    pub fn section(&self, section: Section) -> &MatchResult {
        match section {
            Section::Skills => &self.skills,
            Section::Projects => &self.projects,
            Section::Experience => &self.experience,
            Section::Education => &self.education,
            Section::Languages => &self.languages,
        }
    }

    /// Total default override map for every section of `library`.
    pub fn default_overrides(&self, library: &Library) -> ManualOverride {
        ManualOverride {
            skills: synthesize_defaults(&self.skills, &library.skills),
            projects: synthesize_defaults(&self.projects, &library.projects),
            experience: synthesize_defaults(&self.experience, &library.experience),
            education: synthesize_defaults(&self.education, &library.education),
            languages: synthesize_defaults(&self.languages, &library.languages),
            ..ManualOverride::default()
        }
    }

    /// Per-section count of auto items that matched no library record.
    pub fn unmatched(&self) -> BTreeMap<Section, usize> {
        Section::ALL
            .into_iter()
            .map(|section| (section, self.section(section).unmatched))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

/// Resolves every section and passes the library profile through.
pub fn resolve_preview(
    library: &Library,
    matched: &LibraryMatch,
    overrides: &ManualOverride,
) -> CvPreview {
    CvPreview {
        profile: PublicProfile::from(&library.profile),
        skills: resolve_section(&library.skills, &matched.skills, &overrides.skills),
        projects: resolve_section(&library.projects, &matched.projects, &overrides.projects),
        experience: resolve_section(
            &library.experience,
            &matched.experience,
            &overrides.experience,
        ),
        education: resolve_section(&library.education, &matched.education, &overrides.education),
        languages: resolve_section(&library.languages, &matched.languages, &overrides.languages),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_duplicate_skill_scenario_end_to_end() {
        let library = library();
        let auto = auto_preview(vec![go_skill()], vec![]);

        let matched = LibraryMatch::compute(&auto, &library);
        assert_eq!(matched.skills.order, vec!["s1".to_string()]);

        let defaults = matched.default_overrides(&library);
        assert_eq!(defaults.skills.get("s1"), Some(&true));
        assert_eq!(defaults.skills.get("s2"), Some(&false));
        assert_eq!(defaults.skills.get("s3"), Some(&false));

        let mut user = ManualOverride::default();
        user.skills.insert("s2".to_string(), true);
        let merged = ManualOverride::merged(&defaults, Some(&user));

        let preview = resolve_preview(&library, &matched, &merged);
        assert_eq!(preview.skills, vec![go_skill(), go_skill()]);
        assert!(preview.projects.is_empty());
    }

    #[test]
    fn test_defaults_reproduce_auto_selection() {
        let library = library();
        let auto = auto_preview(
            vec![skill("Rust", 5), go_skill()],
            vec![project("Scheduler")],
        );
        let matched = LibraryMatch::compute(&auto, &library);
        let defaults = matched.default_overrides(&library);

        let preview = resolve_preview(&library, &matched, &defaults);

        assert_eq!(preview.skills, auto.skills);
        assert_eq!(preview.projects, auto.projects);
        assert_eq!(preview.profile, auto.profile);
    }

    #[test]
    fn test_unmatched_counts_reported_per_section() {
        let library = library();
        let auto = auto_preview(vec![skill("Cobol", 9)], vec![project("Compiler")]);

        let matched = LibraryMatch::compute(&auto, &library);

        assert_eq!(matched.unmatched(), BTreeMap::from([(Section::Skills, 1)]));
    }

    #[test]
    fn test_preview_serialises_absent_optionals_as_null() {
        let library = library();
        let matched = LibraryMatch::compute(&auto_preview(vec![go_skill()], vec![]), &library);
        let preview = resolve_preview(&library, &matched, &ManualOverride::default());

        let json = serde_json::to_value(&preview).unwrap();

        assert!(json["skills"][0]["level"].is_null());
        assert!(json["profile"]["summary"].is_null());
        assert!(json["skills"][0].get("id").is_none());
    }
}
