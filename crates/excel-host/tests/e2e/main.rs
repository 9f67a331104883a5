//! Behaviour tests for excel-host.
//!
//! Every test drives the session logic against the in-memory host and
//! process table in `common`, so no spreadsheet application is needed.
//! Tests that touch the disk build their fixtures in a temp directory.

mod connector;
mod copy;
mod resolver;
mod session;
mod teardown;

// Re-export common utilities for submodules
pub use common::*;
