//! Composite matching keys per kind.
//!
//! The field order and normalisation of each key are a persisted contract:
//! stored manual overrides were matched under them. Bump
//! [`MATCH_KEY_VERSION`] whenever any of these change.

use crate::models::library::{
    EducationFields, ExperienceFields, LanguageFields, ProjectFields, SkillFields,
};
use crate::reconcile::normalize::{
    normalize_list, normalize_optional, normalize_text, KEY_DELIMITER,
};

pub const MATCH_KEY_VERSION: u32 = 1;

/// Value-equivalence key shared by a library record and its identifier-free
/// projection returned by the rules engine.
pub trait MatchKey {
    fn match_key(&self) -> String;
}

fn join(parts: &[String]) -> String {
    parts.join(KEY_DELIMITER)
}

impl MatchKey for SkillFields {
    fn match_key(&self) -> String {
        join(&[
            normalize_text(&self.name),
            normalize_optional(self.level.as_deref()),
            normalize_list(&self.tags),
            self.priority.to_string(),
        ])
    }
}

impl MatchKey for ProjectFields {
    fn match_key(&self) -> String {
        join(&[
            normalize_text(&self.name),
            normalize_text(&self.description),
            normalize_optional(self.role.as_deref()),
            normalize_list(&self.tech),
            normalize_list(&self.tags),
            normalize_optional(self.url.as_deref()),
        ])
    }
}

impl MatchKey for ExperienceFields {
    fn match_key(&self) -> String {
        join(&[
            normalize_text(&self.company),
            normalize_text(&self.position),
            normalize_text(&self.description),
            normalize_list(&self.tags),
            normalize_text(&self.start_date),
            normalize_optional(self.end_date.as_deref()),
        ])
    }
}

impl MatchKey for EducationFields {
    fn match_key(&self) -> String {
        join(&[
            normalize_text(&self.school),
            normalize_optional(self.degree.as_deref()),
            normalize_optional(self.field.as_deref()),
            normalize_optional(self.start_date.as_deref()),
            normalize_optional(self.end_date.as_deref()),
        ])
    }
}

impl MatchKey for LanguageFields {
    fn match_key(&self) -> String {
        join(&[
            normalize_text(&self.name),
            normalize_optional(self.level.as_deref()),
        ])
    }
}
