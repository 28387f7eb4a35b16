//! Issue-driven intake for a third-party action allow-list.
//!
//! A request body is parsed into [`request::ActionRequest`]s, each one is
//! checked against an [`oracle::ExistenceOracle`], and accepted requests are
//! merged into the persisted [`allowlist::AllowListDocument`].
//! [`pipeline::Pipeline`] sequences the whole run.

pub mod allowlist;
pub mod config;
pub mod context;
pub mod error;
pub mod io;
pub mod oracle;
pub mod paths;
pub mod pipeline;
pub mod receipt;
pub mod request;
pub mod validator;
pub mod workspace;

pub use error::{IntakeError, Result};
