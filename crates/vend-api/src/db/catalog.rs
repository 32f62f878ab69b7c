//! Catalog persistence over the `catalog_entries` table.
//!
//! Implements the `CatalogStore` trait with a compare-and-swap UPDATE:
//! the WHERE clause carries the revision the writer read, so a stale
//! writer affects zero rows and is answered with a conflict instead of
//! silently losing the concurrent write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vend_catalog::{
    AccessTier, CatalogEntry, CatalogStore, CatalogStoreError, EntryStatus, LicensingTerms,
    VersionHistoryEntry,
};
use vend_core::{Slug, Version};

/// Postgres-backed catalog store.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Wrap a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, seller_id, slug, title, tagline, description, features, \
     tech_stack, category, preview_image_urls, licensing, access_tier, price_usd, \
     version_number, version_history, content_hash, previous_content_hash, \
     original_file_name, file_size, status, last_processing_error, repo_owner, repo_name, \
     webhook_secret, last_synced_commit_sha, download_count, average_rating, created_at, \
     updated_at, published_at, revision";

fn backend(err: sqlx::Error) -> CatalogStoreError {
    CatalogStoreError::Backend(err.to_string())
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn insert(&self, entry: CatalogEntry) -> Result<CatalogEntry, CatalogStoreError> {
        let row = CatalogRow::from_entry(&entry)?;
        let result = sqlx::query(
            "INSERT INTO catalog_entries (id, seller_id, slug, title, tagline, description, \
             features, tech_stack, category, preview_image_urls, licensing, access_tier, \
             price_usd, version_number, version_history, content_hash, previous_content_hash, \
             original_file_name, file_size, status, last_processing_error, repo_owner, \
             repo_name, webhook_secret, last_synced_commit_sha, download_count, average_rating, \
             created_at, updated_at, published_at, revision) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31)",
        )
        .bind(row.id)
        .bind(row.seller_id)
        .bind(&row.slug)
        .bind(&row.title)
        .bind(&row.tagline)
        .bind(&row.description)
        .bind(&row.features)
        .bind(&row.tech_stack)
        .bind(&row.category)
        .bind(&row.preview_image_urls)
        .bind(&row.licensing)
        .bind(&row.access_tier)
        .bind(row.price_usd)
        .bind(&row.version_number)
        .bind(&row.version_history)
        .bind(&row.content_hash)
        .bind(&row.previous_content_hash)
        .bind(&row.original_file_name)
        .bind(row.file_size)
        .bind(&row.status)
        .bind(&row.last_processing_error)
        .bind(&row.repo_owner)
        .bind(&row.repo_name)
        .bind(&row.webhook_secret)
        .bind(&row.last_synced_commit_sha)
        .bind(row.download_count)
        .bind(row.average_rating)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(row.published_at)
        .bind(row.revision)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(entry),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(CatalogStoreError::Duplicate(entry.id))
            }
            Err(err) => Err(backend(err)),
        }
    }

    async fn get(&self, id: Uuid) -> Result<CatalogEntry, CatalogStoreError> {
        let row = sqlx::query_as::<_, CatalogRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM catalog_entries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => row
                .into_entry()
                .ok_or_else(|| CatalogStoreError::Backend(format!("entry {id} row is invalid"))),
            None => Err(CatalogStoreError::NotFound(id)),
        }
    }

    async fn update(&self, entry: &CatalogEntry) -> Result<CatalogEntry, CatalogStoreError> {
        let row = CatalogRow::from_entry(entry)?;
        let result = sqlx::query(
            "UPDATE catalog_entries SET \
             title = $1, tagline = $2, description = $3, features = $4, tech_stack = $5, \
             category = $6, preview_image_urls = $7, licensing = $8, access_tier = $9, \
             price_usd = $10, version_number = $11, version_history = $12, content_hash = $13, \
             previous_content_hash = $14, original_file_name = $15, file_size = $16, \
             status = $17, last_processing_error = $18, repo_owner = $19, repo_name = $20, \
             webhook_secret = $21, last_synced_commit_sha = $22, download_count = $23, \
             average_rating = $24, updated_at = $25, published_at = $26, \
             revision = revision + 1 \
             WHERE id = $27 AND revision = $28",
        )
        .bind(&row.title)
        .bind(&row.tagline)
        .bind(&row.description)
        .bind(&row.features)
        .bind(&row.tech_stack)
        .bind(&row.category)
        .bind(&row.preview_image_urls)
        .bind(&row.licensing)
        .bind(&row.access_tier)
        .bind(row.price_usd)
        .bind(&row.version_number)
        .bind(&row.version_history)
        .bind(&row.content_hash)
        .bind(&row.previous_content_hash)
        .bind(&row.original_file_name)
        .bind(row.file_size)
        .bind(&row.status)
        .bind(&row.last_processing_error)
        .bind(&row.repo_owner)
        .bind(&row.repo_name)
        .bind(&row.webhook_secret)
        .bind(&row.last_synced_commit_sha)
        .bind(row.download_count)
        .bind(row.average_rating)
        .bind(row.updated_at)
        .bind(row.published_at)
        .bind(row.id)
        .bind(row.revision)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            // Distinguish a missing row from a stale revision.
            let current: Option<(i64,)> =
                sqlx::query_as("SELECT revision FROM catalog_entries WHERE id = $1")
                    .bind(entry.id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(backend)?;
            return match current {
                Some((current,)) => Err(CatalogStoreError::Conflict {
                    id: entry.id,
                    stale: entry.revision,
                    current,
                }),
                None => Err(CatalogStoreError::NotFound(entry.id)),
            };
        }

        let mut stored = entry.clone();
        stored.revision += 1;
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<CatalogEntry>, CatalogStoreError> {
        let rows = sqlx::query_as::<_, CatalogRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM catalog_entries ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            match row.into_entry() {
                Some(entry) => entries.push(entry),
                None => {
                    tracing::error!("skipping catalog row with invalid fields during list");
                }
            }
        }
        Ok(entries)
    }

    async fn find_by_repo(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<CatalogEntry>, CatalogStoreError> {
        let row = sqlx::query_as::<_, CatalogRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM catalog_entries \
             WHERE repo_owner = $1 AND repo_name = $2 LIMIT 1"
        ))
        .bind(owner)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.and_then(CatalogRow::into_entry))
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct CatalogRow {
    id: Uuid,
    seller_id: Uuid,
    slug: String,
    title: String,
    tagline: Option<String>,
    description: Option<String>,
    features: serde_json::Value,
    tech_stack: serde_json::Value,
    category: Option<String>,
    preview_image_urls: serde_json::Value,
    licensing: String,
    access_tier: String,
    price_usd: Option<i32>,
    version_number: String,
    version_history: serde_json::Value,
    content_hash: Option<String>,
    previous_content_hash: Option<String>,
    original_file_name: Option<String>,
    file_size: Option<i64>,
    status: String,
    last_processing_error: Option<String>,
    repo_owner: Option<String>,
    repo_name: Option<String>,
    webhook_secret: Option<String>,
    last_synced_commit_sha: Option<String>,
    download_count: i64,
    average_rating: Option<f32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    revision: i64,
}

impl CatalogRow {
    fn from_entry(entry: &CatalogEntry) -> Result<Self, CatalogStoreError> {
        let version_history = serde_json::to_value(&entry.version_history)
            .map_err(|e| CatalogStoreError::Backend(format!("history serialization: {e}")))?;
        Ok(Self {
            id: entry.id,
            seller_id: entry.seller_id,
            slug: entry.slug.to_string(),
            title: entry.title.clone(),
            tagline: entry.tagline.clone(),
            description: entry.description.clone(),
            features: serde_json::json!(entry.features),
            tech_stack: serde_json::json!(entry.tech_stack),
            category: entry.category.clone(),
            preview_image_urls: serde_json::json!(entry.preview_image_urls),
            licensing: entry.licensing.as_str().to_string(),
            access_tier: entry.access_tier.as_str().to_string(),
            price_usd: entry.price_usd.map(|p| p as i32),
            version_number: entry.version_number.to_string(),
            version_history,
            content_hash: entry.content_hash.clone(),
            previous_content_hash: entry.previous_content_hash.clone(),
            original_file_name: entry.original_file_name.clone(),
            file_size: entry.file_size.map(|s| s as i64),
            status: entry.status.as_str().to_string(),
            last_processing_error: entry.last_processing_error.clone(),
            repo_owner: entry.repo_owner.clone(),
            repo_name: entry.repo_name.clone(),
            webhook_secret: entry.webhook_secret.clone(),
            last_synced_commit_sha: entry.last_synced_commit_sha.clone(),
            download_count: entry.download_count as i64,
            average_rating: entry.average_rating,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
            published_at: entry.published_at,
            revision: entry.revision,
        })
    }

    fn into_entry(self) -> Option<CatalogEntry> {
        let slug: Slug = match self.slug.parse() {
            Ok(slug) => slug,
            Err(_) => {
                tracing::warn!(id = %self.id, slug = %self.slug, "invalid slug in catalog row");
                return None;
            }
        };
        let version_number: Version = match self.version_number.parse() {
            Ok(version) => version,
            Err(_) => {
                tracing::warn!(
                    id = %self.id,
                    version = %self.version_number,
                    "invalid version in catalog row"
                );
                return None;
            }
        };
        let status: EntryStatus = match self.status.parse() {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!(id = %self.id, status = %self.status, "unknown status in catalog row");
                return None;
            }
        };
        let licensing: LicensingTerms = match self.licensing.parse() {
            Ok(licensing) => licensing,
            Err(_) => {
                tracing::warn!(id = %self.id, "unknown licensing terms in catalog row");
                return None;
            }
        };
        let access_tier: AccessTier = match self.access_tier.parse() {
            Ok(tier) => tier,
            Err(_) => {
                tracing::warn!(id = %self.id, "unknown access tier in catalog row");
                return None;
            }
        };
        let version_history: Vec<VersionHistoryEntry> =
            match serde_json::from_value(self.version_history) {
                Ok(history) => history,
                Err(e) => {
                    tracing::warn!(id = %self.id, error = %e, "invalid version history JSON");
                    return None;
                }
            };

        Some(CatalogEntry {
            id: self.id,
            seller_id: self.seller_id,
            slug,
            title: self.title,
            tagline: self.tagline,
            description: self.description,
            features: serde_json::from_value(self.features).unwrap_or_default(),
            tech_stack: serde_json::from_value(self.tech_stack).unwrap_or_default(),
            category: self.category,
            preview_image_urls: serde_json::from_value(self.preview_image_urls)
                .unwrap_or_default(),
            licensing,
            access_tier,
            price_usd: self.price_usd.map(|p| p.max(0) as u32),
            version_number,
            version_history,
            content_hash: self.content_hash,
            previous_content_hash: self.previous_content_hash,
            original_file_name: self.original_file_name,
            file_size: self.file_size.map(|s| s.max(0) as u64),
            status,
            last_processing_error: self.last_processing_error,
            repo_owner: self.repo_owner,
            repo_name: self.repo_name,
            webhook_secret: self.webhook_secret,
            last_synced_commit_sha: self.last_synced_commit_sha,
            download_count: self.download_count.max(0) as u64,
            average_rating: self.average_rating,
            created_at: self.created_at,
            updated_at: self.updated_at,
            published_at: self.published_at,
            revision: self.revision,
        })
    }
}
