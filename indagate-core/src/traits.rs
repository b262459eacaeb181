//! Service contracts
//!
//! Every method takes the [`RequestContext`] of the call explicitly. Stores use
//! it for cancellation; the authorizing decorators also read the caller from it.
//! Collection reads return the page together with the number of records that
//! matched before paging.

use crate::authorization::{Authorization, AuthorizationFilter, AuthorizationUpdate};
use crate::context::RequestContext;
use crate::error::Result;
use crate::id::Id;
use crate::mapping::{UserResourceMapping, UserResourceMappingFilter};
use crate::organization::{Organization, OrganizationFilter, OrganizationUpdate};
use crate::paging::FindOptions;
use crate::permission::ResourceType;
use crate::session::Session;
use crate::setup::{SetupRequest, SetupResult};
use crate::user::{User, UserFilter, UserUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait UserService: Send + Sync {
    async fn find_user_by_id(&self, ctx: &RequestContext, id: Id) -> Result<User>;

    /// First user matching `filter`
    async fn find_user(&self, ctx: &RequestContext, filter: UserFilter) -> Result<User>;

    async fn find_users(
        &self,
        ctx: &RequestContext,
        filter: UserFilter,
        opts: FindOptions,
    ) -> Result<(Vec<User>, usize)>;

    /// Assigns the id of `user`
    async fn create_user(&self, ctx: &RequestContext, user: &mut User) -> Result<()>;

    async fn update_user(&self, ctx: &RequestContext, id: Id, update: UserUpdate) -> Result<User>;

    async fn delete_user(&self, ctx: &RequestContext, id: Id) -> Result<()>;
}

#[async_trait]
pub trait OrganizationService: Send + Sync {
    async fn find_organization_by_id(&self, ctx: &RequestContext, id: Id) -> Result<Organization>;

    async fn find_organization(
        &self,
        ctx: &RequestContext,
        filter: OrganizationFilter,
    ) -> Result<Organization>;

    async fn find_organizations(
        &self,
        ctx: &RequestContext,
        filter: OrganizationFilter,
        opts: FindOptions,
    ) -> Result<(Vec<Organization>, usize)>;

    async fn create_organization(&self, ctx: &RequestContext, org: &mut Organization)
        -> Result<()>;

    async fn update_organization(
        &self,
        ctx: &RequestContext,
        id: Id,
        update: OrganizationUpdate,
    ) -> Result<Organization>;

    async fn delete_organization(&self, ctx: &RequestContext, id: Id) -> Result<()>;
}

#[async_trait]
pub trait AuthorizationService: Send + Sync {
    async fn find_authorization_by_id(&self, ctx: &RequestContext, id: Id)
        -> Result<Authorization>;

    async fn find_authorization_by_token(
        &self,
        ctx: &RequestContext,
        token: &str,
    ) -> Result<Authorization>;

    async fn find_authorizations(
        &self,
        ctx: &RequestContext,
        filter: AuthorizationFilter,
        opts: FindOptions,
    ) -> Result<(Vec<Authorization>, usize)>;

    /// Assigns the id, and the token when it is empty
    async fn create_authorization(
        &self,
        ctx: &RequestContext,
        auth: &mut Authorization,
    ) -> Result<()>;

    async fn update_authorization(
        &self,
        ctx: &RequestContext,
        id: Id,
        update: AuthorizationUpdate,
    ) -> Result<Authorization>;

    async fn delete_authorization(&self, ctx: &RequestContext, id: Id) -> Result<()>;
}

#[async_trait]
pub trait SessionService: Send + Sync {
    /// `Unauthorized` once the session has expired by the service's clock
    async fn find_session(&self, ctx: &RequestContext, key: &str) -> Result<Session>;

    async fn expire_session(&self, ctx: &RequestContext, key: &str) -> Result<()>;

    /// New session for the named user, with permissions derived from its mappings
    async fn create_session(&self, ctx: &RequestContext, user: &str) -> Result<Session>;

    /// Moves `expires_at` forward; never backward
    async fn renew_session(
        &self,
        ctx: &RequestContext,
        session: &mut Session,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;
}

#[async_trait]
pub trait UserResourceMappingService: Send + Sync {
    async fn find_user_resource_mappings(
        &self,
        ctx: &RequestContext,
        filter: UserResourceMappingFilter,
        opts: FindOptions,
    ) -> Result<(Vec<UserResourceMapping>, usize)>;

    async fn create_user_resource_mapping(
        &self,
        ctx: &RequestContext,
        mapping: &UserResourceMapping,
    ) -> Result<()>;

    async fn delete_user_resource_mapping(
        &self,
        ctx: &RequestContext,
        resource_id: Id,
        user_id: Id,
    ) -> Result<()>;
}

#[async_trait]
pub trait PasswordsService: Send + Sync {
    async fn set_password(&self, ctx: &RequestContext, name: &str, password: &str) -> Result<()>;

    async fn compare_password(&self, ctx: &RequestContext, name: &str, password: &str)
        -> Result<()>;

    async fn compare_and_set_password(
        &self,
        ctx: &RequestContext,
        name: &str,
        old: &str,
        new: &str,
    ) -> Result<()>;
}

#[async_trait]
pub trait SetupService: Send + Sync {
    /// True until the first user exists
    async fn is_onboarding(&self, ctx: &RequestContext) -> Result<bool>;

    async fn setup(&self, ctx: &RequestContext, request: &SetupRequest) -> Result<SetupResult>;
}

/// Resolves which organization owns a resource
#[async_trait]
pub trait OrganizationLookup: Send + Sync {
    async fn find_resource_organization_id(
        &self,
        ctx: &RequestContext,
        kind: ResourceType,
        id: Id,
    ) -> Result<Id>;
}
