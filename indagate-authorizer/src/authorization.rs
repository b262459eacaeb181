use crate::authorize::{filter_authorized, is_allowed, verify_permissions};
use async_trait::async_trait;
use indagate_core::{
    Action, Authorization, AuthorizationFilter, AuthorizationService, AuthorizationUpdate,
    FindOptions, Id, Permission, RequestContext, ResourceType, Result,
};
use std::sync::Arc;

fn auth_permission(action: Action, auth: &Authorization) -> Permission {
    Permission::at_id(auth.id, action, ResourceType::Authorizations, Some(auth.org_id))
}

/// [`AuthorizationService`] that checks the caller's permissions before delegating
///
/// Creating a token additionally requires the caller to hold every permission
/// the new token would grant.
pub struct AuthorizedAuthorizationService {
    inner: Arc<dyn AuthorizationService>,
}

impl AuthorizedAuthorizationService {
    pub fn new(inner: Arc<dyn AuthorizationService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl AuthorizationService for AuthorizedAuthorizationService {
    async fn find_authorization_by_id(
        &self,
        ctx: &RequestContext,
        id: Id,
    ) -> Result<Authorization> {
        let auth = self.inner.find_authorization_by_id(ctx, id).await?;
        is_allowed(ctx, &auth_permission(Action::Read, &auth))?;
        Ok(auth)
    }

    async fn find_authorization_by_token(
        &self,
        ctx: &RequestContext,
        token: &str,
    ) -> Result<Authorization> {
        let auth = self.inner.find_authorization_by_token(ctx, token).await?;
        is_allowed(ctx, &auth_permission(Action::Read, &auth))?;
        Ok(auth)
    }

    async fn find_authorizations(
        &self,
        ctx: &RequestContext,
        filter: AuthorizationFilter,
        opts: FindOptions,
    ) -> Result<(Vec<Authorization>, usize)> {
        let (auths, _) = self
            .inner
            .find_authorizations(ctx, filter, FindOptions::default())
            .await?;
        let auths = filter_authorized(ctx, auths, |a| auth_permission(Action::Read, a))?;
        let total = auths.len();
        Ok((opts.apply(auths), total))
    }

    async fn create_authorization(
        &self,
        ctx: &RequestContext,
        auth: &mut Authorization,
    ) -> Result<()> {
        is_allowed(
            ctx,
            &Permission::new(Action::Write, ResourceType::Authorizations, Some(auth.org_id)),
        )?;
        verify_permissions(ctx, &auth.permissions)?;
        self.inner.create_authorization(ctx, auth).await
    }

    async fn update_authorization(
        &self,
        ctx: &RequestContext,
        id: Id,
        update: AuthorizationUpdate,
    ) -> Result<Authorization> {
        let auth = self.inner.find_authorization_by_id(ctx, id).await?;
        is_allowed(ctx, &auth_permission(Action::Write, &auth))?;
        self.inner.update_authorization(ctx, id, update).await
    }

    async fn delete_authorization(&self, ctx: &RequestContext, id: Id) -> Result<()> {
        let auth = self.inner.find_authorization_by_id(ctx, id).await?;
        is_allowed(ctx, &auth_permission(Action::Write, &auth))?;
        self.inner.delete_authorization(ctx, id).await
    }
}
