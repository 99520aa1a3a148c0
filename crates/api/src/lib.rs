//! Sales CRM REST client for Rust
//!
//! This crate provides the typed API layer of the CRM client: the domain
//! records (leads, tasks, calls, meetings, users, templates), the response
//! envelope adapters and an HTTP implementation of [`ResourceApi`].
//!
//! # Features
//!
//! - Typed records with create (`Draft`) and partial update (`Patch`) payloads
//! - Per-resource response shape adapters producing a uniform [`Page`]
//! - Pagination and filter query building
//! - Bulk delete and bulk assignment endpoints

pub mod envelope;
pub mod error;
pub mod fetch;
pub mod http;
pub mod models;
pub mod resource;

pub use envelope::ResponseShape;
pub use error::{ApiError, Result};
pub use http::{ApiClient, HttpResourceApi};
pub use resource::{ListQuery, Page, Record, ResourceApi, ResourceKind};
pub use reqwest::StatusCode;
