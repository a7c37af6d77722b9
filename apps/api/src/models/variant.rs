use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::reconcile::ManualOverride;

#[derive(Debug, Clone, FromRow)]
pub struct CvVariantRow {
    pub id: Uuid,
    pub name: String,
    pub job_tags: Vec<String>,
    pub template: String,
    pub manual_overrides: Option<Json<ManualOverride>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named, persisted combination of job tags, template and manual overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvVariant {
    pub id: Uuid,
    pub name: String,
    pub job_tags: Vec<String>,
    pub template: String,
    pub manual_overrides: Option<ManualOverride>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CvVariantRow> for CvVariant {
    fn from(row: CvVariantRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            job_tags: row.job_tags,
            template: row.template,
            manual_overrides: row.manual_overrides.map(|json| json.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
