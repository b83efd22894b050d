//! RunWhen keyword library
//!
//! Operations used by RunWhen codebundles:
//! - `cron`: schedule matching for interval-driven triggers
//! - `helm` / `registry` / `updates`: Helm release image update detection
//! - `runsession`: reports over RunSession documents
//! - `slx` / `workspace`: SLX catalog lookups, task search, RunRequest creation
//! - `poller`: waits for a RunSession to stop growing
//!
//! Platform variables (`RW_*`) are read through [`config::PlatformConfig`].
//! Library operations return typed errors; deciding whether a failure is
//! logged and defaulted is left to the caller.

pub mod config;
pub mod cron;
pub mod helm;
pub mod poller;
pub mod registry;
pub mod runsession;
pub mod slx;
pub mod updates;
pub mod workspace;

pub use config::{PlatformConfig, PollConfig};
pub use poller::{PollError, RunSessionSource, StabilityPoller};
