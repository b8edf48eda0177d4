//! Repository traits for admin data operations.

pub mod records;
pub mod replica_states;

pub use records::AdminRecordRepo;
pub use replica_states::ReplicaStateRepo;
