//! Client-side resource stores for the sales CRM
//!
//! A [`ResourceStore`] holds the paginated collection, the current item and
//! the bulk-action selection of one resource type, and keeps them in step
//! with the backend through an injected [`ResourceApi`](crm_rust_api::ResourceApi).
//!
//! Bulk deletes and assignments use "optimistic-apply, refetch-on-failure":
//! the change is applied locally at once, and a rejected request is undone
//! by refetching the whole collection.

pub mod collection;
pub mod directory;
pub mod error;
pub mod pipeline;
pub mod selection;
pub mod store;

pub use collection::Collection;
pub use directory::OwnerDirectory;
pub use error::{Result, StoreError};
pub use pipeline::{Pipeline, Staged};
pub use selection::SelectionSet;
pub use store::{ResourceStore, StoreOptions, StoreState};

use crm_rust_api::models::{Call, Lead, Meeting, Task, Template, User};

pub type LeadsStore = ResourceStore<Lead>;
pub type TasksStore = ResourceStore<Task>;
pub type CallsStore = ResourceStore<Call>;
pub type MeetingsStore = ResourceStore<Meeting>;
pub type UsersStore = ResourceStore<User>;
pub type TemplatesStore = ResourceStore<Template>;
