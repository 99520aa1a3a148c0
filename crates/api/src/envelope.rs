//! Response envelope handling.
//!
//! Every endpoint answers with `{ success, result|data|response, message }`,
//! but the backend is not consistent about where the payload sits. Each
//! resource declares a [`ResponseShape`] and the adapters here turn the raw
//! body into a typed record or [`Page`].

use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::resource::{ListQuery, Page};

/// Location of the payload inside a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `body.result`
    Result,
    /// `body.response`
    Response,
    /// `body.data`
    Data,
    /// `body.data.data`
    NestedData,
}

impl ResponseShape {
    fn path(&self) -> &'static [&'static str] {
        match self {
            ResponseShape::Result => &["result"],
            ResponseShape::Response => &["response"],
            ResponseShape::Data => &["data"],
            ResponseShape::NestedData => &["data", "data"],
        }
    }

    /// Pull the payload out of `body`.
    pub fn extract(&self, mut body: Value) -> Result<Value> {
        for key in self.path() {
            body = match body {
                Value::Object(mut map) => map
                    .remove(*key)
                    .ok_or_else(|| ApiError::shape(format!("missing `{}` in response", key)))?,
                other => {
                    return Err(ApiError::shape(format!(
                        "expected an object holding `{}`, got {}",
                        key,
                        kind_of(&other)
                    )))
                }
            };
        }
        Ok(body)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Deserialize)]
struct EnvelopeHeader {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

fn default_success() -> bool {
    true
}

/// The `message` field of an envelope, if the body is one.
pub fn envelope_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Fail with [`ApiError::Validation`] when the envelope reports `success: false`.
pub fn check_envelope(body: &Value) -> Result<()> {
    if !body.is_object() {
        return Ok(());
    }
    let header = EnvelopeHeader::deserialize(body)?;
    if header.success {
        Ok(())
    } else {
        Err(ApiError::Validation(
            header
                .message
                .unwrap_or_else(|| "Request was not successful".to_string()),
        ))
    }
}

/// Records accept either `id` or `_id`; some endpoints send both with the
/// same value. Keep `id` so deserialization sees a single identity field.
fn dedupe_ids(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.contains_key("id") {
                map.remove("_id");
            }
            map.values_mut().for_each(dedupe_ids);
        }
        Value::Array(items) => items.iter_mut().for_each(dedupe_ids),
        _ => {}
    }
}

/// Adapt a single-record response.
pub fn adapt_item<R: DeserializeOwned>(body: Value, shape: ResponseShape) -> Result<R> {
    check_envelope(&body)?;
    let mut payload = shape.extract(body)?;
    dedupe_ids(&mut payload);
    Ok(serde_json::from_value(payload)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaginationMeta {
    #[serde(default, alias = "total", alias = "totalItems")]
    total_count: Option<u64>,
    #[serde(default, alias = "page")]
    current_page: Option<u32>,
    #[serde(default)]
    total_pages: Option<u32>,
}

impl PaginationMeta {
    fn or(self, other: PaginationMeta) -> PaginationMeta {
        PaginationMeta {
            total_count: self.total_count.or(other.total_count),
            current_page: self.current_page.or(other.current_page),
            total_pages: self.total_pages.or(other.total_pages),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PagedBody<R> {
    #[serde(
        alias = "data",
        alias = "records",
        alias = "leads",
        alias = "tasks",
        alias = "calls",
        alias = "meetings",
        alias = "users",
        alias = "templates"
    )]
    items: Vec<R>,
    #[serde(default)]
    pagination: Option<PaginationMeta>,
    #[serde(flatten)]
    meta: PaginationMeta,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListBody<R> {
    Bare(Vec<R>),
    Paged(PagedBody<R>),
}

/// Adapt a list response into a [`Page`].
///
/// Pagination metadata may sit next to the items, under `pagination`, or at
/// the envelope level. Missing values are derived from the query. The page
/// is clamped so that `items.len() <= limit` and
/// `1 <= current_page <= total_pages`.
pub fn adapt_list<R: DeserializeOwned>(
    body: Value,
    shape: ResponseShape,
    query: &ListQuery,
) -> Result<Page<R>> {
    check_envelope(&body)?;

    let envelope_meta = body
        .get("pagination")
        .cloned()
        .map(serde_json::from_value::<PaginationMeta>)
        .transpose()?
        .unwrap_or_default();

    let mut payload = shape.extract(body)?;
    dedupe_ids(&mut payload);
    let (items, meta) = match serde_json::from_value::<ListBody<R>>(payload)? {
        ListBody::Bare(items) => (items, envelope_meta),
        ListBody::Paged(paged) => {
            let nested = paged.pagination.unwrap_or_default();
            (paged.items, nested.or(paged.meta).or(envelope_meta))
        }
    };

    Ok(into_page(items, meta, query))
}

fn into_page<R>(mut items: Vec<R>, meta: PaginationMeta, query: &ListQuery) -> Page<R> {
    let limit = query.limit.max(1);
    if items.len() > limit as usize {
        warn!(
            "Server returned {} items for a page of {}; truncating",
            items.len(),
            limit
        );
        items.truncate(limit as usize);
    }

    let total_count = meta
        .total_count
        .unwrap_or(items.len() as u64)
        .max(items.len() as u64);
    let derived_pages = total_count.div_ceil(limit as u64) as u32;
    let total_pages = meta.total_pages.unwrap_or(derived_pages).max(1);
    let current_page = meta.current_page.unwrap_or(query.page).clamp(1, total_pages);

    Page {
        items,
        total_count,
        current_page,
        total_pages,
    }
}
