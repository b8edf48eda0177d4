//! Common test utilities.

pub mod metadata;

#[allow(unused_imports)]
pub use metadata::*;
