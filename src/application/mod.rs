//! Application layer - The robot and its message flow
//! 
//! This layer contains:
//! - Robot: Handler registry and dispatch
//! - Response: Output routed back through the adapter
//! - Users: Roster on top of the store
//! - Messaging: Handler patterns and matching
//! - Services: Built-in handlers
//! - Errors: Domain-specific errors

pub mod errors;
pub mod messaging;
pub mod response;
pub mod robot;
pub mod services;
pub mod users;
