//! The resource abstraction shared by every CRM entity and the API seam
//! that stores are built on.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::envelope::ResponseShape;
use crate::error::Result;

/// The CRM resource types the backend exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Lead,
    Task,
    Call,
    Meeting,
    User,
    Template,
}

impl ResourceKind {
    /// URL path segment of the resource collection.
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Lead => "leads",
            ResourceKind::Task => "tasks",
            ResourceKind::Call => "calls",
            ResourceKind::Meeting => "meetings",
            ResourceKind::User => "users",
            ResourceKind::Template => "templates",
        }
    }

    /// Singular display name, used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Lead => "lead",
            ResourceKind::Task => "task",
            ResourceKind::Call => "call",
            ResourceKind::Meeting => "meeting",
            ResourceKind::User => "user",
            ResourceKind::Template => "template",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A domain record with a server-assigned identity and an owner reference.
pub trait Record: Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Create payload. The server assigns the identity.
    type Draft: Serialize + Send + Sync;
    /// Partial update payload.
    type Patch: Serialize + Send + Sync;

    const KIND: ResourceKind;

    /// Where this resource's endpoints nest their payload.
    const SHAPE: ResponseShape;

    fn id(&self) -> &str;

    /// Id of the owning/assigned user, if any.
    fn owner_id(&self) -> Option<&str>;

    fn set_owner_id(&mut self, owner_id: Option<String>);
}

/// Pagination and filters for a list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub filters: BTreeMap<String, String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            filters: BTreeMap::new(),
        }
    }
}

impl ListQuery {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
            filters: BTreeMap::new(),
        }
    }

    /// Add a resource-specific filter such as `status` or `priority`.
    pub fn filter(mut self, key: &str, value: &str) -> Self {
        self.filters.insert(key.to_string(), value.to_string());
        self
    }

    /// Query string pairs in a stable order: `page`, `limit`, then filters.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        for (key, value) in &self.filters {
            pairs.push((key.clone(), value.clone()));
        }
        pairs
    }
}

/// One page of a collection, normalized from whatever shape the endpoint uses.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub items: Vec<R>,
    pub total_count: u64,
    pub current_page: u32,
    pub total_pages: u32,
}

/// Typed request functions for one resource.
///
/// Every call takes the scope id (the tenant/company id) that partitions
/// the backend's data.
#[async_trait]
pub trait ResourceApi<R: Record>: Send + Sync {
    async fn list(&self, scope: &str, query: &ListQuery) -> Result<Page<R>>;

    async fn get(&self, id: &str, scope: &str) -> Result<R>;

    async fn create(&self, scope: &str, draft: &R::Draft) -> Result<R>;

    async fn update(&self, id: &str, patch: &R::Patch, scope: &str) -> Result<R>;

    async fn delete(&self, id: &str, scope: &str) -> Result<()>;

    async fn bulk_delete(&self, ids: &[String], scope: &str) -> Result<()>;

    async fn assign(&self, ids: &[String], owner_id: &str, scope: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_pairs_are_ordered() {
        let query = ListQuery::new(2, 25)
            .filter("status", "open")
            .filter("priority", "high");
        let pairs = query.to_pairs();
        assert_eq!(pairs[0], ("page".to_string(), "2".to_string()));
        assert_eq!(pairs[1], ("limit".to_string(), "25".to_string()));
        assert_eq!(pairs[2].0, "priority");
        assert_eq!(pairs[3].0, "status");
    }

    #[test]
    fn list_query_never_zero() {
        let query = ListQuery::new(0, 0);
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 1);
    }

    #[test]
    fn kind_paths() {
        assert_eq!(ResourceKind::Lead.path(), "leads");
        assert_eq!(ResourceKind::Template.to_string(), "template");
    }
}
