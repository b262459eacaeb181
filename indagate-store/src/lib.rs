//! Indagate entity stores
//!
//! [`KvService`] implements the user, organization, authorization, session,
//! mapping, password, onboarding and lookup services over any
//! [`indagate_kv::Store`]. Every operation runs in exactly one transaction,
//! so a multi-record change such as onboarding is applied whole or not at all.

mod authorization;
mod index;
mod lookup;
mod mapping;
mod organization;
mod password;
mod service;
mod session;
mod setup;
mod user;

pub use service::KvService;
