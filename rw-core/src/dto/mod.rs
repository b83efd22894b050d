//! Data Transfer Objects for the workspace API
//!
//! Request bodies sent by the client and the response envelopes that do not
//! map onto a domain entity.

pub mod runsession;
pub mod search;
pub mod slx;
