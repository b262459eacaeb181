use crate::authorize::{filter_authorized, is_allowed};
use async_trait::async_trait;
use indagate_core::{
    Action, FindOptions, Id, Permission, RequestContext, ResourceType, Result, User, UserFilter,
    UserService, UserUpdate,
};
use std::sync::Arc;

fn user_permission(action: Action, id: Id) -> Permission {
    Permission::at_id(id, action, ResourceType::Users, None)
}

/// [`UserService`] that checks the caller's permissions before delegating
pub struct AuthorizedUserService {
    inner: Arc<dyn UserService>,
}

impl AuthorizedUserService {
    pub fn new(inner: Arc<dyn UserService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl UserService for AuthorizedUserService {
    async fn find_user_by_id(&self, ctx: &RequestContext, id: Id) -> Result<User> {
        let user = self.inner.find_user_by_id(ctx, id).await?;
        is_allowed(ctx, &user_permission(Action::Read, user.id))?;
        Ok(user)
    }

    async fn find_user(&self, ctx: &RequestContext, filter: UserFilter) -> Result<User> {
        let user = self.inner.find_user(ctx, filter).await?;
        is_allowed(ctx, &user_permission(Action::Read, user.id))?;
        Ok(user)
    }

    async fn find_users(
        &self,
        ctx: &RequestContext,
        filter: UserFilter,
        opts: FindOptions,
    ) -> Result<(Vec<User>, usize)> {
        let (users, _) = self
            .inner
            .find_users(ctx, filter, FindOptions::default())
            .await?;
        let users = filter_authorized(ctx, users, |u| user_permission(Action::Read, u.id))?;
        let total = users.len();
        Ok((opts.apply(users), total))
    }

    async fn create_user(&self, ctx: &RequestContext, user: &mut User) -> Result<()> {
        is_allowed(ctx, &Permission::global(Action::Write, ResourceType::Users))?;
        self.inner.create_user(ctx, user).await
    }

    async fn update_user(&self, ctx: &RequestContext, id: Id, update: UserUpdate) -> Result<User> {
        let user = self.inner.find_user_by_id(ctx, id).await?;
        is_allowed(ctx, &user_permission(Action::Write, user.id))?;
        self.inner.update_user(ctx, id, update).await
    }

    async fn delete_user(&self, ctx: &RequestContext, id: Id) -> Result<()> {
        let user = self.inner.find_user_by_id(ctx, id).await?;
        is_allowed(ctx, &user_permission(Action::Write, user.id))?;
        self.inner.delete_user(ctx, id).await
    }
}
