//! Indagate Core - domain model, permission model and service contracts
//!
//! This crate defines the types shared by the storage layer and the
//! authorizing decorators: identifiers, entities, permissions, the
//! [`Authorizer`] capability, request context, generators and errors.

pub mod authorization;
pub mod config;
pub mod context;
pub mod error;
pub mod generator;
pub mod id;
pub mod logging;
pub mod mapping;
pub mod organization;
pub mod paging;
pub mod password;
pub mod permission;
pub mod session;
pub mod setup;
pub mod traits;
pub mod user;

pub use authorization::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use generator::*;
pub use id::*;
pub use logging::*;
pub use mapping::*;
pub use organization::*;
pub use paging::*;
pub use password::*;
pub use permission::*;
pub use session::*;
pub use setup::*;
pub use traits::*;
pub use user::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tracing;
