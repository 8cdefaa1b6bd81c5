//! Application services - Handlers shipped with the robot

pub mod builtin;

pub use builtin::register_defaults;
