use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgConnection, PgPool};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{check_write, DocumentStore, StoreError, StoreResult};
use crate::config::DatabaseConfig;
use crate::models::document::{parse_term_list, slugify};
use crate::models::{
    Document, DocumentId, DocumentQuery, DocumentStatus, DocumentWrite, Term, TypeRegistry,
};

#[derive(FromRow)]
struct DocumentRow {
    id: i64,
    doc_type: String,
    status: String,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MetaRow {
    meta_key: String,
    meta_value: String,
}

#[derive(FromRow)]
struct TermRow {
    id: i64,
    taxonomy: String,
    name: String,
    slug: String,
}

const DOCUMENT_COLUMNS: &str = "id, doc_type, status, title, content, created_at, updated_at";

/// Store backed by PostgreSQL. Each `save` runs in one transaction.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    registry: Arc<TypeRegistry>,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, registry: Arc<TypeRegistry>) -> Self {
        Self { pool, registry }
    }

    pub async fn connect(
        config: &DatabaseConfig,
        registry: Arc<TypeRegistry>,
    ) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.url)
            .await?;

        Ok(Self::new(pool, registry))
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations").run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }

    async fn hydrate(conn: &mut PgConnection, row: DocumentRow) -> StoreResult<Document> {
        let meta: BTreeMap<String, String> = sqlx::query_as::<_, MetaRow>(
            "SELECT meta_key, meta_value FROM document_meta WHERE document_id = $1",
        )
        .bind(row.id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(|m| (m.meta_key, m.meta_value))
        .collect();

        let term_rows = sqlx::query_as::<_, TermRow>(
            r#"
            SELECT t.id, t.taxonomy, t.name, t.slug
            FROM term_assignments a
            JOIN terms t ON t.id = a.term_id
            WHERE a.document_id = $1
            ORDER BY a.term_order, t.id
            "#,
        )
        .bind(row.id)
        .fetch_all(&mut *conn)
        .await?;

        let mut terms: BTreeMap<String, Vec<Term>> = BTreeMap::new();
        for t in term_rows {
            terms.entry(t.taxonomy.clone()).or_default().push(Term {
                id: t.id,
                taxonomy: t.taxonomy,
                name: t.name,
                slug: t.slug,
            });
        }

        // неизвестный статус в базе считаем черновиком
        let status = row.status.parse().unwrap_or(DocumentStatus::Draft);

        Ok(Document {
            id: row.id,
            doc_type: row.doc_type,
            status,
            title: row.title,
            content: row.content,
            meta,
            terms,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn resolve_term(conn: &mut PgConnection, taxonomy: &str, entry: &str) -> StoreResult<i64> {
        let slug = slugify(entry);

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM terms WHERE taxonomy = $1 AND (slug = $2 OR name = $3) ORDER BY id LIMIT 1",
        )
        .bind(taxonomy)
        .bind(&slug)
        .bind(entry)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO terms (taxonomy, name, slug)
            VALUES ($1, $2, $3)
            ON CONFLICT (taxonomy, slug) DO UPDATE SET slug = EXCLUDED.slug
            RETURNING id
            "#,
        )
        .bind(taxonomy)
        .bind(entry)
        .bind(&slug)
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    async fn assign_terms(
        conn: &mut PgConnection,
        id: DocumentId,
        taxonomy: &str,
        raw: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            DELETE FROM term_assignments
            WHERE document_id = $1
              AND term_id IN (SELECT id FROM terms WHERE taxonomy = $2)
            "#,
        )
        .bind(id)
        .bind(taxonomy)
        .execute(&mut *conn)
        .await?;

        for (order, entry) in parse_term_list(raw).iter().enumerate() {
            let term_id = Self::resolve_term(conn, taxonomy, entry).await?;
            sqlx::query(
                r#"
                INSERT INTO term_assignments (document_id, term_id, term_order)
                VALUES ($1, $2, $3)
                ON CONFLICT (document_id, term_id) DO NOTHING
                "#,
            )
            .bind(id)
            .bind(term_id)
            .bind(order as i32)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, id: DocumentId) -> StoreResult<Option<Document>> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::hydrate(&mut *conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn doc_type(&self, id: DocumentId) -> StoreResult<Option<String>> {
        let doc_type = sqlx::query_scalar::<_, String>("SELECT doc_type FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc_type)
    }

    async fn query(&self, query: &DocumentQuery) -> StoreResult<Vec<Document>> {
        let mut conn = self.pool.acquire().await?;
        let (meta_key, meta_needle) = match &query.meta_contains {
            Some((key, needle)) => (Some(key.as_str()), Some(needle.as_str())),
            None => (None, None),
        };

        // strpos вместо LIKE: подстрока сравнивается буквально
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            SELECT {DOCUMENT_COLUMNS}
            FROM documents d
            WHERE d.doc_type = $1
              AND ($2::text IS NULL OR d.status = $2)
              AND ($3::text IS NULL OR EXISTS (
                    SELECT 1 FROM document_meta m
                    WHERE m.document_id = d.id
                      AND m.meta_key = $3
                      AND strpos(m.meta_value, $4) > 0
              ))
            ORDER BY d.id DESC
            "#
        ))
        .bind(&query.doc_type)
        .bind(query.status.map(|s| s.as_str()))
        .bind(meta_key)
        .bind(meta_needle)
        .fetch_all(&mut *conn)
        .await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            documents.push(Self::hydrate(&mut *conn, row).await?);
        }
        Ok(documents)
    }

    async fn save(&self, write: DocumentWrite) -> StoreResult<DocumentId> {
        check_write(&self.registry, &write)?;

        let mut tx = self.pool.begin().await?;

        let id = match write.id {
            Some(id) => {
                let doc_type = sqlx::query_scalar::<_, String>(
                    "SELECT doc_type FROM documents WHERE id = $1 FOR UPDATE",
                )
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::InvalidPost(id))?;
                if doc_type != write.doc_type {
                    return Err(StoreError::InvalidPost(id));
                }
                sqlx::query(
                    r#"
                    UPDATE documents
                    SET title = COALESCE($2, title),
                        content = COALESCE($3, content),
                        status = COALESCE($4, status),
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(write.title.as_deref())
                .bind(write.content.as_deref())
                .bind(write.status.map(|s| s.as_str()))
                .execute(&mut *tx)
                .await?;
                id
            }
            None => {
                if !write.has_content() {
                    return Err(StoreError::EmptyContent);
                }
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO documents (doc_type, status, title, content)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id
                    "#,
                )
                .bind(&write.doc_type)
                .bind(write.status.unwrap_or_default().as_str())
                .bind(write.title.as_deref().unwrap_or_default())
                .bind(write.content.as_deref().unwrap_or_default())
                .fetch_one(&mut *tx)
                .await?
            }
        };

        for (key, value) in &write.meta {
            sqlx::query(
                r#"
                INSERT INTO document_meta (document_id, meta_key, meta_value)
                VALUES ($1, $2, $3)
                ON CONFLICT (document_id, meta_key) DO UPDATE SET meta_value = EXCLUDED.meta_value
                "#,
            )
            .bind(id)
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        for (taxonomy, raw) in &write.terms {
            Self::assign_terms(&mut *tx, id, taxonomy, raw).await?;
        }

        tx.commit().await?;
        debug!(document_id = id, doc_type = %write.doc_type, "document saved");
        Ok(id)
    }

    async fn delete(&self, id: DocumentId) -> StoreResult<bool> {
        // meta и привязки терминов удаляются каскадом
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
