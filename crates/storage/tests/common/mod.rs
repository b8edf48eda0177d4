pub mod fixtures;
pub mod mocks;

#[allow(unused_imports)]
pub use fixtures::{replica_backend, seeded_bytes};
#[allow(unused_imports)]
pub use mocks::FlakyStore;
