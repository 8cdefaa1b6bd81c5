//! Domain traits - Abstractions for infrastructure implementations

pub mod adapter;
pub mod store;

pub use adapter::Adapter;
pub use store::Store;
