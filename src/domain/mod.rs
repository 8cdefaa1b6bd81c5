//! Domain layer - Core types shared by the robot and its adapters
//! 
//! This layer contains:
//! - Entities: Core objects (User, Room, Message)
//! - Traits: Abstractions for infrastructure (Adapter, Store)

pub mod entities;
pub mod traits;
