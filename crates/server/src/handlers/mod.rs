//! HTTP request handlers.

pub mod admin_data;
pub mod common;
pub mod health;
pub mod preservation;
pub mod replicas;
pub mod repair;

pub use admin_data::*;
pub use common::*;
pub use health::*;
pub use preservation::*;
pub use replicas::*;
pub use repair::*;
