use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use async_trait::async_trait;

use super::{
    CatalogEntry, MigratedPost, NewPost, PostId, PostStore, ProductCounts, ProductQuery,
    StoreError,
};
use crate::parser::blocks::Block;

const PRODUCT_TYPE: &str = "product";
const LIST_COLUMNS: &str = "id,slug,title";
/// Matches the hosted API's default max-rows.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Deserialize)]
struct IdRow {
    id: PostId,
}

/// PostgREST-style adapter for the hosted `post` table (`/rest/v1/post`).
pub struct RestStore {
    client: Client,
    endpoint: String,
    company_id: String,
    page_size: usize,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: Option<&str>, company_id: &str) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let invalid = |_| StoreError::Api {
                status: 0,
                body: "API key contains characters not allowed in a header".into(),
            };
            headers.insert("apikey", HeaderValue::from_str(key).map_err(invalid)?);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key)).map_err(invalid)?,
            );
        }
        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/post", base_url.trim_end_matches('/')),
            company_id: company_id.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn scoped(&self, req: RequestBuilder) -> RequestBuilder {
        req.query(&[
            ("company_id", format!("eq.{}", self.company_id)),
            ("type", format!("eq.{}", PRODUCT_TYPE)),
        ])
    }

    async fn count_where(&self, extra: &[(&str, &str)]) -> Result<usize, StoreError> {
        let resp = self
            .scoped(self.client.head(&self.endpoint))
            .query(&[("select", "id")])
            .query(extra)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let resp = check(resp).await?;
        Ok(resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .unwrap_or(0))
    }
}

async fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        body,
    })
}

/// `0-24/3573` or `*/3573` → 3573.
fn parse_content_range_total(raw: &str) -> Option<usize> {
    raw.rsplit('/').next()?.trim().parse().ok()
}

fn in_filter(ids: &[PostId]) -> String {
    let joined: Vec<&str> = ids.iter().map(PostId::as_str).collect();
    format!("in.({})", joined.join(","))
}

#[async_trait]
impl PostStore for RestStore {
    /// Pages with `limit`/`offset` until an empty page comes back, so a
    /// server-side row cap smaller than the page size cannot end the listing early.
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<CatalogEntry>, StoreError> {
        let mut rows: Vec<CatalogEntry> = Vec::new();
        loop {
            let want = match query.limit {
                Some(limit) => limit.saturating_sub(rows.len()).min(self.page_size),
                None => self.page_size,
            };
            if want == 0 {
                break;
            }

            let mut req = self
                .scoped(self.client.get(&self.endpoint))
                .query(&[("select", LIST_COLUMNS), ("order", "slug.asc")])
                .query(&[("limit", want), ("offset", rows.len())]);
            if let Some(slug) = &query.slug {
                req = req.query(&[("slug", format!("eq.{}", slug))]);
            }
            let page: Vec<CatalogEntry> = check(req.send().await?).await?.json().await?;
            debug!(offset = rows.len(), count = page.len(), "Fetched product page");
            if page.is_empty() {
                break;
            }
            rows.extend(page);
        }
        debug!(count = rows.len(), "Listed products");
        Ok(rows)
    }

    async fn update_structured_content(
        &self,
        id: &PostId,
        blocks: &[Block],
    ) -> Result<(), StoreError> {
        let resp = self
            .scoped(self.client.patch(&self.endpoint))
            .query(&[("id", format!("eq.{}", id))])
            .query(&[("select", "id")])
            .header("Prefer", "return=representation")
            .json(&json!({ "structured_content": blocks }))
            .send()
            .await?;
        let updated: Vec<IdRow> = check(resp).await?.json().await?;
        if updated.is_empty() {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }

    async fn delete_posts(&self, ids: &[PostId]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let resp = self
            .scoped(self.client.delete(&self.endpoint))
            .query(&[("id", in_filter(ids))])
            .query(&[("select", "id")])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let removed: Vec<IdRow> = check(resp).await?.json().await?;
        Ok(removed.len())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostId>, StoreError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("select", "id".to_string()),
                ("company_id", format!("eq.{}", self.company_id)),
                ("slug", format!("eq.{}", slug)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<IdRow> = check(resp).await?.json().await?;
        Ok(rows.into_iter().next().map(|r| r.id))
    }

    async fn insert_product(&self, post: &NewPost) -> Result<PostId, StoreError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .query(&[("select", "id")])
            .header("Prefer", "return=representation")
            .json(&json!({
                "title": post.title,
                "slug": post.slug,
                "content": post.content,
                "meta_description": post.meta_description,
                "type": PRODUCT_TYPE,
                "company_id": self.company_id,
                "status": "published",
            }))
            .send()
            .await?;
        let rows: Vec<IdRow> = check(resp).await?.json().await?;
        rows.into_iter().next().map(|r| r.id).ok_or(StoreError::Api {
            status: 201,
            body: "insert returned no row".into(),
        })
    }

    async fn migrated_sample(&self) -> Result<Option<MigratedPost>, StoreError> {
        let resp = self
            .scoped(self.client.get(&self.endpoint))
            .query(&[
                ("select", "slug,title,structured_content"),
                ("structured_content", "not.is.null"),
                ("order", "slug.asc"),
                ("limit", "1"),
            ])
            .send()
            .await?;
        let rows: Vec<MigratedPost> = check(resp).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn counts(&self) -> Result<ProductCounts, StoreError> {
        let total = self.count_where(&[]).await?;
        let migrated = self
            .count_where(&[("structured_content", "not.is.null")])
            .await?;
        Ok(ProductCounts { total, migrated })
    }
}
