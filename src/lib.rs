//! ctxaudit - Health, reliability and regression analysis for tool-use traces
//!
//! This library reads the newline-delimited JSON session logs written by an
//! AI coding assistant's hook scripts and answers three questions: is the
//! session healthy, did a tool fail intermittently, and did behavior regress
//! between two runs.
//!
//! Pipeline: [`loader`] → [`pairing`] / [`stats`] → [`audit`], [`health`],
//! [`diff`]. Every result is plain serializable data; formatting belongs to
//! the caller.

pub mod audit;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod event;
pub mod health;
pub mod issue;
pub mod loader;
pub mod pairing;
pub mod session_index;
pub mod stats;
pub mod summary;

pub use error::{Result, TraceError};
