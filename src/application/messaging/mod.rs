//! Message handling - Handler registration and pattern matching

pub mod handler;
pub mod matcher;

pub use handler::{Handler, HandlerFn, HandlerFuture, Method};
