//! Domain types
//!
//! Every entity here is a view over JSON owned by the workspace API. Nothing
//! is created or persisted locally; records are fetched, inspected and dropped.

pub mod issue;
pub mod runsession;
pub mod slx;

mod serde_helpers;
