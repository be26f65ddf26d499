use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::{
    CatalogEntry, MigratedPost, NewPost, PostId, PostStore, ProductCounts, ProductQuery,
    StoreError,
};
use crate::parser::blocks::Block;

const PRODUCT_TYPE: &str = "product";

/// Local `post` table. Mirrors the hosted schema closely enough to run the
/// whole pipeline offline.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    company_id: String,
}

impl SqliteStore {
    pub fn connect(path: &Path, company_id: &str) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            // Connection::open reports a missing directory as an opaque CANTOPEN.
            std::fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn, company_id)
    }

    pub fn open_in_memory(company_id: &str) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, company_id)
    }

    fn with_connection(conn: Connection, company_id: &str) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            company_id: company_id.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn raw_structured_content(&self, id: &PostId) -> Option<String> {
        self.conn
            .lock()
            .query_row(
                "SELECT structured_content FROM post WHERE id = ?1",
                params![id.as_str()],
                |r| r.get(0),
            )
            .unwrap()
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS post (
            id                 TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
            company_id         TEXT NOT NULL,
            type               TEXT NOT NULL,
            slug               TEXT NOT NULL,
            title              TEXT NOT NULL,
            content            TEXT,
            meta_description   TEXT,
            status             TEXT,
            structured_content TEXT,
            updated_at         TEXT,
            created_at         TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(company_id, slug)
        );
        CREATE INDEX IF NOT EXISTS idx_post_company_type ON post(company_id, type);
        ",
    )?;
    Ok(())
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<CatalogEntry>, StoreError> {
        let limit = query.limit.map(|n| n as i64).unwrap_or(-1);
        let sql = format!(
            "SELECT id, slug, title FROM post
             WHERE company_id = ?1 AND type = ?2{}
             ORDER BY slug
             LIMIT ?3",
            if query.slug.is_some() { " AND slug = ?4" } else { "" }
        );
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let map_row = |row: &rusqlite::Row| {
            Ok(CatalogEntry {
                id: PostId::from(row.get::<_, String>(0)?),
                slug: row.get(1)?,
                title: row.get(2)?,
            })
        };
        let rows = match &query.slug {
            Some(slug) => stmt
                .query_map(params![self.company_id, PRODUCT_TYPE, limit, slug], map_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map(params![self.company_id, PRODUCT_TYPE, limit], map_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }

    async fn update_structured_content(
        &self,
        id: &PostId,
        blocks: &[Block],
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(blocks)?;
        let changed = self.conn.lock().execute(
            "UPDATE post SET structured_content = ?1, updated_at = ?2
             WHERE id = ?3 AND company_id = ?4",
            params![json, chrono::Utc::now().to_rfc3339(), id.as_str(), self.company_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }

    async fn delete_posts(&self, ids: &[PostId]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("?{}", i + 2)).collect();
        let sql = format!(
            "DELETE FROM post WHERE company_id = ?1 AND id IN ({})",
            placeholders.join(", ")
        );
        let values = std::iter::once(self.company_id.as_str()).chain(ids.iter().map(PostId::as_str));
        let removed = self.conn.lock().execute(&sql, params_from_iter(values))?;
        Ok(removed)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostId>, StoreError> {
        let id: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT id FROM post WHERE company_id = ?1 AND slug = ?2",
                params![self.company_id, slug],
                |r| r.get(0),
            )
            .optional()?;
        Ok(id.map(PostId::from))
    }

    async fn insert_product(&self, post: &NewPost) -> Result<PostId, StoreError> {
        let id: String = self.conn.lock().query_row(
            "INSERT INTO post (company_id, type, slug, title, content, meta_description, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'published')
             RETURNING id",
            params![
                self.company_id, PRODUCT_TYPE, post.slug, post.title, post.content,
                post.meta_description,
            ],
            |r| r.get(0),
        )?;
        Ok(PostId::from(id))
    }

    async fn migrated_sample(&self) -> Result<Option<MigratedPost>, StoreError> {
        let row: Option<(String, String, String)> = self
            .conn
            .lock()
            .query_row(
                "SELECT slug, title, structured_content FROM post
                 WHERE company_id = ?1 AND type = ?2 AND structured_content IS NOT NULL
                 ORDER BY slug
                 LIMIT 1",
                params![self.company_id, PRODUCT_TYPE],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;
        match row {
            Some((slug, title, raw)) => Ok(Some(MigratedPost {
                slug,
                title,
                structured_content: serde_json::from_str(&raw)?,
            })),
            None => Ok(None),
        }
    }

    async fn counts(&self) -> Result<ProductCounts, StoreError> {
        let (total, migrated): (usize, usize) = self.conn.lock().query_row(
            "SELECT COUNT(*), COUNT(structured_content) FROM post
             WHERE company_id = ?1 AND type = ?2",
            params![self.company_id, PRODUCT_TYPE],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok(ProductCounts { total, migrated })
    }
}
