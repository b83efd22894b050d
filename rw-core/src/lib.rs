//! RunWhen Core
//!
//! Core types shared by the workspace client and the keyword library.
//!
//! This crate contains:
//! - Domain types: transient views of server-owned records (RunSession, RunRequest, Issue, SLX)
//! - DTOs: request and response bodies for the workspace API

pub mod domain;
pub mod dto;
