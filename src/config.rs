//! Configuration for the CRM client

use crm_rust_store::StoreOptions;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Environment variable holding the API base URL.
pub const API_URL_VAR: &str = "CRM_API_URL";

/// Environment variable holding the bearer token.
pub const API_TOKEN_VAR: &str = "CRM_API_TOKEN";

/// Configuration options for the CRM client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Page size used before any list has been fetched
    pub page_limit: u32,

    /// Delay before a store refetches after a confirmed bulk change
    pub reconcile_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        let store = StoreOptions::default();
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            page_limit: store.page_limit,
            reconcile_delay: store.reconcile_delay,
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the default page size
    pub fn with_page_limit(mut self, value: u32) -> Self {
        self.page_limit = value.max(1);
        self
    }

    /// Set the reconcile delay
    pub fn with_reconcile_delay(mut self, value: Duration) -> Self {
        self.reconcile_delay = value;
        self
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::default()
            .with_page_limit(self.page_limit)
            .with_reconcile_delay(self.reconcile_delay)
    }
}

/// Where the CRM API lives and how to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmConfig {
    pub base_url: Url,
    pub token: Option<String>,
}

impl CrmConfig {
    /// Validate `base_url`; a blank token means requests go out unauthenticated.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "{} cannot be used as an API base URL",
                base_url
            )));
        }
        let token = token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        Ok(Self { base_url, token })
    }

    /// Load from `CRM_API_URL` and the optional `CRM_API_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var(API_URL_VAR).map_err(|_| {
            Error::config(format!("{} environment variable not found", API_URL_VAR))
        })?;
        let token = std::env::var(API_TOKEN_VAR).ok();
        Self::new(&url, token)
    }
}
