use serde::{Deserialize, Serialize};

use crate::models::library::{
    EducationFields, ExperienceFields, LanguageFields, Profile, ProjectFields, SkillFields,
};

/// Public profile fields as they appear on a rendered CV. Absent optionals are
/// emitted as explicit `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub full_name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
}

impl From<&Profile> for PublicProfile {
    fn from(profile: &Profile) -> Self {
        Self {
            full_name: profile.full_name.clone(),
            title: profile.title.clone(),
            summary: profile.summary.clone(),
            location: profile.location.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            website: profile.website.clone(),
            github: profile.github.clone(),
            linkedin: profile.linkedin.clone(),
        }
    }
}

/// Identifier-free CV content.
///
/// This is both what the rules engine returns (its auto-selected, ranked
/// projection of the library) and what the preview resolver produces after
/// applying manual overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvPreview {
    pub profile: PublicProfile,
    #[serde(default)]
    pub skills: Vec<SkillFields>,
    #[serde(default)]
    pub projects: Vec<ProjectFields>,
    #[serde(default)]
    pub experience: Vec<ExperienceFields>,
    #[serde(default)]
    pub education: Vec<EducationFields>,
    #[serde(default)]
    pub languages: Vec<LanguageFields>,
}
