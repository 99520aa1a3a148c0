//! Sales CRM Rust Client Library
//!
//! A Rust client for the multi-tenant sales CRM REST API, providing typed
//! access to leads, tasks, calls, meetings, users and templates, and
//! resource stores that keep a paginated list, a current item and a bulk
//! selection in step with the backend.

pub mod config;
pub mod error;

pub use crm_rust_api as api;
pub use crm_rust_store as store;

use log::debug;
use reqwest::Client;
use std::sync::Arc;

use crate::config::{ClientOptions, CrmConfig};
use crate::error::Result;
use crm_rust_api::models::{Call, Lead, Meeting, Task, Template, User};
use crm_rust_api::{ApiClient, Record};
use crm_rust_store::{
    CallsStore, LeadsStore, MeetingsStore, OwnerDirectory, ResourceStore, TasksStore,
    TemplatesStore, UsersStore,
};

/// The main entry point for the CRM client
///
/// Holds one store per resource type. Stores are cheap to clone and every
/// clone shares state, so views can hold their own handle.
pub struct Crm {
    /// Validated connection settings
    pub config: CrmConfig,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Client options
    pub options: ClientOptions,
    api: ApiClient,
    leads: LeadsStore,
    tasks: TasksStore,
    calls: CallsStore,
    meetings: MeetingsStore,
    users: UsersStore,
    templates: TemplatesStore,
    directory: Arc<OwnerDirectory>,
}

impl Crm {
    /// Create a new CRM client
    ///
    /// # Arguments
    ///
    /// * `api_url` - The base URL of the CRM API
    /// * `token` - Bearer token sent with every request; empty for none
    ///
    /// # Example
    ///
    /// ```
    /// use crm_rust::Crm;
    ///
    /// let crm = Crm::new("https://crm.example.com/api", "your-token").unwrap();
    /// let leads = crm.leads();
    /// ```
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        Self::new_with_options(api_url, token, ClientOptions::default())
    }

    /// Create a new CRM client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use crm_rust::{Crm, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_page_limit(25);
    /// let crm = Crm::new_with_options(
    ///     "https://crm.example.com/api",
    ///     "your-token",
    ///     options
    /// ).unwrap();
    /// ```
    pub fn new_with_options(api_url: &str, token: &str, options: ClientOptions) -> Result<Self> {
        let config = CrmConfig::new(api_url, Some(token.to_string()))?;
        Self::from_config(config, options)
    }

    /// Create a client from `CRM_API_URL` and `CRM_API_TOKEN`
    pub fn from_env() -> Result<Self> {
        Self::from_config(CrmConfig::from_env()?, ClientOptions::default())
    }

    pub fn from_config(config: CrmConfig, options: ClientOptions) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;
        let api = ApiClient::new(
            config.base_url.as_str(),
            config.token.clone(),
            http_client.clone(),
        )?;
        debug!("CRM client configured for {}", api.base_url());

        let directory = Arc::new(OwnerDirectory::new(Arc::new(api.resource::<User>())));
        Ok(Self {
            leads: Self::build_store::<Lead>(&api, &options),
            tasks: Self::build_store::<Task>(&api, &options),
            calls: Self::build_store::<Call>(&api, &options),
            meetings: Self::build_store::<Meeting>(&api, &options),
            users: Self::build_store::<User>(&api, &options),
            templates: Self::build_store::<Template>(&api, &options),
            directory,
            config,
            http_client,
            options,
            api,
        })
    }

    fn build_store<R: Record>(api: &ApiClient, options: &ClientOptions) -> ResourceStore<R> {
        ResourceStore::with_options(Arc::new(api.resource::<R>()), options.store_options())
    }

    /// The underlying API client, for calls that bypass the stores
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn leads(&self) -> &LeadsStore {
        &self.leads
    }

    pub fn tasks(&self) -> &TasksStore {
        &self.tasks
    }

    pub fn calls(&self) -> &CallsStore {
        &self.calls
    }

    pub fn meetings(&self) -> &MeetingsStore {
        &self.meetings
    }

    pub fn users(&self) -> &UsersStore {
        &self.users
    }

    pub fn templates(&self) -> &TemplatesStore {
        &self.templates
    }

    /// Shared cache of owner display names
    pub fn directory(&self) -> Arc<OwnerDirectory> {
        self.directory.clone()
    }

    /// Start a navigation boundary on every store.
    ///
    /// Responses to requests issued before this call are discarded.
    pub fn navigate(&self) {
        self.leads.navigate();
        self.tasks.navigate();
        self.calls.navigate();
        self.meetings.navigate();
        self.users.navigate();
        self.templates.navigate();
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::{ClientOptions, CrmConfig};
    pub use crate::error::Error;
    pub use crate::Crm;
    pub use crm_rust_api::models::*;
    pub use crm_rust_api::{ListQuery, Record, ResourceApi, ResourceKind};
    pub use crm_rust_store::{ResourceStore, StoreError, StoreState};
}
