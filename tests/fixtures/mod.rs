//! Test fixtures

pub mod server;

pub use server::{ServerBehavior, ServerLog, TestServer};
