use anyhow::Result;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::variant::{CvVariant, CvVariantRow};
use crate::reconcile::ManualOverride;

/// Parameters for saving a new variant.
#[derive(Debug, Clone)]
pub struct NewVariant {
    pub name: String,
    pub job_tags: Vec<String>,
    pub template: String,
    pub manual_overrides: Option<ManualOverride>,
}

/// Fields of an existing variant that may be edited.
#[derive(Debug, Clone, Default)]
pub struct VariantUpdate {
    pub name: Option<String>,
    pub job_tags: Option<Vec<String>>,
    pub template: Option<String>,
}

#[async_trait]
pub trait VariantStore: Send + Sync {
    async fn create(&self, variant: NewVariant) -> Result<CvVariant>;

    /// All variants, newest first.
    async fn list(&self) -> Result<Vec<CvVariant>>;

    async fn get(&self, id: Uuid) -> Result<Option<CvVariant>>;

    async fn update(&self, id: Uuid, update: VariantUpdate) -> Result<Option<CvVariant>>;

    /// Returns false if no variant had this id.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

pub struct PgVariantStore {
    pool: PgPool,
}

impl PgVariantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VariantStore for PgVariantStore {
    async fn create(&self, variant: NewVariant) -> Result<CvVariant> {
        let row = sqlx::query_as::<_, CvVariantRow>(
            r#"
            INSERT INTO cv_variants (id, name, job_tags, template, manual_overrides)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&variant.name)
        .bind(&variant.job_tags)
        .bind(&variant.template)
        .bind(variant.manual_overrides.map(Json))
        .fetch_one(&self.pool)
        .await?;

        info!("Saved CV variant {} '{}'", row.id, row.name);
        Ok(row.into())
    }

    async fn list(&self) -> Result<Vec<CvVariant>> {
        let rows = sqlx::query_as::<_, CvVariantRow>(
            "SELECT * FROM cv_variants ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CvVariant::from).collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<CvVariant>> {
        let row = sqlx::query_as::<_, CvVariantRow>("SELECT * FROM cv_variants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(CvVariant::from))
    }

    async fn update(&self, id: Uuid, update: VariantUpdate) -> Result<Option<CvVariant>> {
        let row = sqlx::query_as::<_, CvVariantRow>(
            r#"
            UPDATE cv_variants
            SET name = COALESCE($2, name),
                job_tags = COALESCE($3, job_tags),
                template = COALESCE($4, template),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.name)
        .bind(update.job_tags)
        .bind(update.template)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CvVariant::from))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cv_variants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    pub struct MemoryVariantStore {
        variants: Mutex<Vec<CvVariant>>,
    }

    #[async_trait]
    impl VariantStore for MemoryVariantStore {
        async fn create(&self, variant: NewVariant) -> Result<CvVariant> {
            let now = Utc::now();
            let stored = CvVariant {
                id: Uuid::new_v4(),
                name: variant.name,
                job_tags: variant.job_tags,
                template: variant.template,
                manual_overrides: variant.manual_overrides,
                created_at: now,
                updated_at: now,
            };
            self.variants.lock().unwrap().push(stored.clone());
            Ok(stored)
        }

        async fn list(&self) -> Result<Vec<CvVariant>> {
            let mut variants = self.variants.lock().unwrap().clone();
            variants.reverse();
            Ok(variants)
        }

        async fn get(&self, id: Uuid) -> Result<Option<CvVariant>> {
            Ok(self
                .variants
                .lock()
                .unwrap()
                .iter()
                .find(|v| v.id == id)
                .cloned())
        }

        async fn update(&self, id: Uuid, update: VariantUpdate) -> Result<Option<CvVariant>> {
            let mut variants = self.variants.lock().unwrap();
            let Some(variant) = variants.iter_mut().find(|v| v.id == id) else {
                return Ok(None);
            };
            if let Some(name) = update.name {
                variant.name = name;
            }
            if let Some(job_tags) = update.job_tags {
                variant.job_tags = job_tags;
            }
            if let Some(template) = update.template {
                variant.template = template;
            }
            variant.updated_at = Utc::now();
            Ok(Some(variant.clone()))
        }

        async fn delete(&self, id: Uuid) -> Result<bool> {
            let mut variants = self.variants.lock().unwrap();
            let before = variants.len();
            variants.retain(|v| v.id != id);
            Ok(variants.len() != before)
        }
    }
}
