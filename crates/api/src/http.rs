//! `reqwest`-backed implementation of [`ResourceApi`].

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::{json, Value};
use std::marker::PhantomData;
use url::Url;

use crate::envelope::{adapt_item, adapt_list, check_envelope};
use crate::error::{ApiError, Result};
use crate::fetch::Fetch;
use crate::resource::{ListQuery, Page, Record, ResourceApi};

/// Query/body key carrying the scope id.
pub const SCOPE_KEY: &str = "companyId";

/// Connection details shared by every resource client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    token: Option<String>,
    http_client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, http_client: Client) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            token,
            http_client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// A typed client for one resource sharing this connection.
    pub fn resource<R: Record>(&self) -> HttpResourceApi<R> {
        HttpResourceApi {
            client: self.clone(),
            _record: PhantomData,
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// HTTP client for the endpoints of resource `R`.
#[derive(Debug, Clone)]
pub struct HttpResourceApi<R> {
    client: ApiClient,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> HttpResourceApi<R> {
    pub fn new(client: ApiClient) -> Self {
        client.resource()
    }

    fn url(&self, extra: &[&str]) -> Result<Url> {
        let mut segments = vec![R::KIND.path()];
        segments.extend_from_slice(extra);
        self.client.url(&segments)
    }

    fn token(&self) -> Option<&str> {
        self.client.token.as_deref()
    }
}

fn with_scope(mut body: Value, scope: &str) -> Value {
    if let Value::Object(map) = &mut body {
        map.insert(SCOPE_KEY.to_string(), Value::String(scope.to_string()));
    }
    body
}

#[async_trait]
impl<R: Record> ResourceApi<R> for HttpResourceApi<R> {
    async fn list(&self, scope: &str, query: &ListQuery) -> Result<Page<R>> {
        let body = Fetch::get(&self.client.http_client, self.url(&[])?)
            .bearer_auth(self.token())
            .query_pair(SCOPE_KEY, scope)
            .query(query.to_pairs())
            .execute()
            .await?;
        let page = adapt_list(body, R::SHAPE, query)?;
        debug!(
            "Fetched {} {}s (page {}/{}, total {})",
            page.items.len(),
            R::KIND,
            page.current_page,
            page.total_pages,
            page.total_count
        );
        Ok(page)
    }

    async fn get(&self, id: &str, scope: &str) -> Result<R> {
        let body = Fetch::get(&self.client.http_client, self.url(&[id])?)
            .bearer_auth(self.token())
            .query_pair(SCOPE_KEY, scope)
            .execute()
            .await?;
        adapt_item(body, R::SHAPE)
    }

    async fn create(&self, scope: &str, draft: &R::Draft) -> Result<R> {
        let payload = with_scope(serde_json::to_value(draft)?, scope);
        let body = Fetch::post(&self.client.http_client, self.url(&[])?)
            .bearer_auth(self.token())
            .json(&payload)?
            .execute()
            .await?;
        let created: R = adapt_item(body, R::SHAPE)?;
        info!("Created {} {}", R::KIND, created.id());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &R::Patch, scope: &str) -> Result<R> {
        let body = Fetch::put(&self.client.http_client, self.url(&[id])?)
            .bearer_auth(self.token())
            .query_pair(SCOPE_KEY, scope)
            .json(patch)?
            .execute()
            .await?;
        adapt_item(body, R::SHAPE)
    }

    async fn delete(&self, id: &str, scope: &str) -> Result<()> {
        let body = Fetch::delete(&self.client.http_client, self.url(&[id])?)
            .bearer_auth(self.token())
            .query_pair(SCOPE_KEY, scope)
            .execute()
            .await?;
        check_envelope(&body)?;
        info!("Deleted {} {}", R::KIND, id);
        Ok(())
    }

    async fn bulk_delete(&self, ids: &[String], scope: &str) -> Result<()> {
        let payload = json!({ "ids": ids, SCOPE_KEY: scope });
        let body = Fetch::post(&self.client.http_client, self.url(&["bulk-delete"])?)
            .bearer_auth(self.token())
            .json(&payload)?
            .execute()
            .await?;
        check_envelope(&body)?;
        info!("Bulk deleted {} {}s", ids.len(), R::KIND);
        Ok(())
    }

    async fn assign(&self, ids: &[String], owner_id: &str, scope: &str) -> Result<()> {
        let payload = json!({ "ids": ids, "assignedTo": owner_id, SCOPE_KEY: scope });
        let body = Fetch::post(&self.client.http_client, self.url(&["assign"])?)
            .bearer_auth(self.token())
            .json(&payload)?
            .execute()
            .await?;
        check_envelope(&body)?;
        info!("Assigned {} {}s to {}", ids.len(), R::KIND, owner_id);
        Ok(())
    }
}
