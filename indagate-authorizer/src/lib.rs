//! Indagate authorizer - permission-enforcing service decorators
//!
//! Each decorator implements the same service trait as the store it wraps.
//! The caller is the [`indagate_core::Authorizer`] carried by the
//! [`indagate_core::RequestContext`] passed to every method; a context
//! without one is rejected as `Unauthorized`.
//!
//! Single-record reads and mutations fetch the record first, since the
//! permission to check depends on the organization that owns it. Collection
//! reads drop the records the caller may not read.

pub mod authorize;
pub mod authorization;
pub mod mapping;
pub mod organization;
pub mod user;

pub use authorization::AuthorizedAuthorizationService;
pub use authorize::{filter_authorized, is_allowed, verify_permissions};
pub use mapping::AuthorizedMappingService;
pub use organization::AuthorizedOrganizationService;
pub use user::AuthorizedUserService;
