//! CRM domain records.
//!
//! Every record carries a server-assigned id (accepted as `id` or `_id`), an
//! owner reference by user id and optional lifecycle timestamps.

mod call;
mod lead;
mod meeting;
mod task;
mod template;
mod user;

pub use call::*;
pub use lead::*;
pub use meeting::*;
pub use task::*;
pub use template::*;
pub use user::*;
