//! Lazy resolution of owner references to display labels.

use crm_rust_api::models::User;
use crm_rust_api::{Record, ResourceApi};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Maps user ids to a display label (name, else email), fetching each user
/// at most once. Lookup failures resolve to `None` and are retried on the
/// next call.
pub struct OwnerDirectory {
    api: Arc<dyn ResourceApi<User>>,
    labels: RwLock<HashMap<String, Option<String>>>,
}

impl OwnerDirectory {
    pub fn new(api: Arc<dyn ResourceApi<User>>) -> Self {
        Self {
            api,
            labels: RwLock::new(HashMap::new()),
        }
    }

    /// Seed the cache from an already fetched user list.
    pub fn prime(&self, users: &[User]) {
        let mut labels = self.labels.write().unwrap_or_else(PoisonError::into_inner);
        for user in users {
            labels.insert(user.id.clone(), user.display_name().map(str::to_string));
        }
    }

    /// Cached label, without fetching.
    pub fn label(&self, owner_id: &str) -> Option<String> {
        self.labels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(owner_id)
            .cloned()
            .flatten()
    }

    pub fn invalidate(&self, owner_id: &str) {
        self.labels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(owner_id);
    }

    pub async fn resolve(&self, owner_id: &str, scope: &str) -> Option<String> {
        let cached = self
            .labels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(owner_id)
            .cloned();
        if let Some(label) = cached {
            return label;
        }

        match self.api.get(owner_id, scope).await {
            Ok(user) => {
                let label = user.display_name().map(str::to_string);
                debug!("Resolved owner {} to {:?}", owner_id, label);
                self.labels
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(owner_id.to_string(), label.clone());
                label
            }
            Err(err) => {
                warn!("Could not resolve owner {}: {}", owner_id, err);
                None
            }
        }
    }

    /// Label of whoever `record` points at.
    pub async fn resolve_owner<R: Record>(&self, record: &R, scope: &str) -> Option<String> {
        match record.owner_id() {
            Some(owner_id) => self.resolve(owner_id, scope).await,
            None => None,
        }
    }
}
