//! Library records as served by the CV backend.
//!
//! Field names follow the backend's camelCase wire format. Every kind has a
//! value-only field set (`SkillFields`, `ProjectFields`, ...) which is shared by
//! the identified library record and the rules-engine projection of it.

use serde::{Deserialize, Serialize};

/// Opaque entity identifier, unique within its kind. Assigned by the backend.
pub type EntityId = String;

/// The five kinds of library content that take part in reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Skills,
    Projects,
    Experience,
    Education,
    Languages,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Skills,
        Section::Projects,
        Section::Experience,
        Section::Education,
        Section::Languages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Skills => "skills",
            Section::Projects => "projects",
            Section::Experience => "experience",
            Section::Education => "education",
            Section::Languages => "languages",
        }
    }
}

impl std::str::FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| format!("Unknown section '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: EntityId,
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillFields {
    pub name: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFields {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub tech: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceFields {
    pub company: String,
    pub position: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationFields {
    pub school: String,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageFields {
    pub name: String,
    #[serde(default)]
    pub level: Option<String>,
}

/// An identified library record. Backend-only fields (`profileId`, timestamps)
/// are ignored on deserialisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntity<T> {
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: T,
}

impl<T> LibraryEntity<T> {
    pub fn new(id: impl Into<EntityId>, fields: T) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

pub type Skill = LibraryEntity<SkillFields>;
pub type Project = LibraryEntity<ProjectFields>;
pub type Experience = LibraryEntity<ExperienceFields>;
pub type Education = LibraryEntity<EducationFields>;
pub type Language = LibraryEntity<LanguageFields>;

/// Snapshot of a user's whole library, each list in storage order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub profile: Profile,
    pub skills: Vec<Skill>,
    pub projects: Vec<Project>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub languages: Vec<Language>,
}

impl Library {
    /// Identifiers of one section, in storage order.
    pub fn ids(&self, section: Section) -> Vec<&str> {
        fn collect<T>(items: &[LibraryEntity<T>]) -> Vec<&str> {
            items.iter().map(|item| item.id.as_str()).collect()
        }
        match section {
            Section::Skills => collect(&self.skills),
            Section::Projects => collect(&self.projects),
            Section::Experience => collect(&self.experience),
            Section::Education => collect(&self.education),
            Section::Languages => collect(&self.languages),
        }
    }

    pub fn contains(&self, section: Section, id: &str) -> bool {
        self.ids(section).contains(&id)
    }
}
