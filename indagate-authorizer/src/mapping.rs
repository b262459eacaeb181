use crate::authorize::is_allowed;
use async_trait::async_trait;
use indagate_core::{
    Action, FindOptions, Id, OrganizationLookup, RequestContext, ResourceType, Result,
    UserResourceMapping, UserResourceMappingFilter, UserResourceMappingService,
};
use std::sync::Arc;
use tracing::debug;

/// [`UserResourceMappingService`] that checks the caller's permissions on the
/// mapped resource before delegating
///
/// Permissions on a mapping are permissions on its resource, scoped to the
/// organization owning that resource.
pub struct AuthorizedMappingService {
    inner: Arc<dyn UserResourceMappingService>,
    lookup: Arc<dyn OrganizationLookup>,
}

impl AuthorizedMappingService {
    pub fn new(
        inner: Arc<dyn UserResourceMappingService>,
        lookup: Arc<dyn OrganizationLookup>,
    ) -> Self {
        Self { inner, lookup }
    }

    async fn owning_org(&self, ctx: &RequestContext, m: &UserResourceMapping) -> Result<Option<Id>> {
        match m.resource_type {
            ResourceType::Orgs => Ok(Some(m.resource_id)),
            ResourceType::Users => Ok(None),
            kind => self
                .lookup
                .find_resource_organization_id(ctx, kind, m.resource_id)
                .await
                .map(Some),
        }
    }

    async fn authorize(
        &self,
        ctx: &RequestContext,
        m: &UserResourceMapping,
        action: Action,
    ) -> Result<()> {
        let org = self.owning_org(ctx, m).await?;
        is_allowed(ctx, &m.permission(action, org))
    }
}

#[async_trait]
impl UserResourceMappingService for AuthorizedMappingService {
    async fn find_user_resource_mappings(
        &self,
        ctx: &RequestContext,
        filter: UserResourceMappingFilter,
        opts: FindOptions,
    ) -> Result<(Vec<UserResourceMapping>, usize)> {
        ctx.authorizer()?;
        let (mappings, _) = self
            .inner
            .find_user_resource_mappings(ctx, filter, FindOptions::default())
            .await?;

        let total = mappings.len();
        let mut kept = Vec::with_capacity(total);
        for m in mappings {
            let org = self.owning_org(ctx, &m).await?;
            if ctx.authorizer()?.allowed(&m.permission(Action::Read, org)) {
                kept.push(m);
            }
        }
        debug!(total, kept = kept.len(), "filtered mappings by read permission");

        let count = kept.len();
        Ok((opts.apply(kept), count))
    }

    async fn create_user_resource_mapping(
        &self,
        ctx: &RequestContext,
        mapping: &UserResourceMapping,
    ) -> Result<()> {
        self.authorize(ctx, mapping, Action::Write).await?;
        self.inner.create_user_resource_mapping(ctx, mapping).await
    }

    async fn delete_user_resource_mapping(
        &self,
        ctx: &RequestContext,
        resource_id: Id,
        user_id: Id,
    ) -> Result<()> {
        ctx.authorizer()?;
        let filter = UserResourceMappingFilter {
            resource_id: Some(resource_id),
            user_id: Some(user_id),
            ..Default::default()
        };
        let (mappings, _) = self
            .inner
            .find_user_resource_mappings(ctx, filter, FindOptions::default())
            .await?;
        for m in &mappings {
            self.authorize(ctx, m, Action::Write).await?;
        }
        self.inner
            .delete_user_resource_mapping(ctx, resource_id, user_id)
            .await
    }
}
