use crate::authorize::{filter_authorized, is_allowed};
use async_trait::async_trait;
use indagate_core::{
    Action, FindOptions, Id, Organization, OrganizationFilter, OrganizationService,
    OrganizationUpdate, Permission, RequestContext, ResourceType, Result,
};
use std::sync::Arc;

/// An organization is its own owning org
fn org_permission(action: Action, id: Id) -> Permission {
    Permission::at_id(id, action, ResourceType::Orgs, Some(id))
}

/// [`OrganizationService`] that checks the caller's permissions before delegating
pub struct AuthorizedOrganizationService {
    inner: Arc<dyn OrganizationService>,
}

impl AuthorizedOrganizationService {
    pub fn new(inner: Arc<dyn OrganizationService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl OrganizationService for AuthorizedOrganizationService {
    async fn find_organization_by_id(&self, ctx: &RequestContext, id: Id) -> Result<Organization> {
        let org = self.inner.find_organization_by_id(ctx, id).await?;
        is_allowed(ctx, &org_permission(Action::Read, org.id))?;
        Ok(org)
    }

    async fn find_organization(
        &self,
        ctx: &RequestContext,
        filter: OrganizationFilter,
    ) -> Result<Organization> {
        let org = self.inner.find_organization(ctx, filter).await?;
        is_allowed(ctx, &org_permission(Action::Read, org.id))?;
        Ok(org)
    }

    async fn find_organizations(
        &self,
        ctx: &RequestContext,
        filter: OrganizationFilter,
        opts: FindOptions,
    ) -> Result<(Vec<Organization>, usize)> {
        let (orgs, _) = self
            .inner
            .find_organizations(ctx, filter, FindOptions::default())
            .await?;
        let orgs = filter_authorized(ctx, orgs, |o| org_permission(Action::Read, o.id))?;
        let total = orgs.len();
        Ok((opts.apply(orgs), total))
    }

    async fn create_organization(
        &self,
        ctx: &RequestContext,
        org: &mut Organization,
    ) -> Result<()> {
        is_allowed(ctx, &Permission::global(Action::Write, ResourceType::Orgs))?;
        self.inner.create_organization(ctx, org).await
    }

    async fn update_organization(
        &self,
        ctx: &RequestContext,
        id: Id,
        update: OrganizationUpdate,
    ) -> Result<Organization> {
        let org = self.inner.find_organization_by_id(ctx, id).await?;
        is_allowed(ctx, &org_permission(Action::Write, org.id))?;
        self.inner.update_organization(ctx, id, update).await
    }

    async fn delete_organization(&self, ctx: &RequestContext, id: Id) -> Result<()> {
        let org = self.inner.find_organization_by_id(ctx, id).await?;
        is_allowed(ctx, &org_permission(Action::Write, org.id))?;
        self.inner.delete_organization(ctx, id).await
    }
}
