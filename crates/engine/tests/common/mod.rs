//! Shared test utilities for engine integration tests.

pub mod fixtures;
pub mod mocks;
