//! Test helpers module
//!
//! Shared setup for the integration tests: an in-memory store, a manual
//! clock and a seeded society wired through the real service factory.

#![allow(dead_code)]

pub mod test_context;

pub use test_context::*;
