use crate::index::{
    decode, delete_indexed, encode, ensure_unique, filter, for_each, get_record, page,
    put_indexed, resolve_index,
};
use crate::service::KvService;
use async_trait::async_trait;
use indagate_core::{
    Error, FindOptions, Id, RequestContext, Result, User, UserFilter, UserService, UserUpdate,
};
use indagate_kv::Transaction;
use tracing::debug;

pub(crate) const USER_BUCKET: &str = "usersv1";
pub(crate) const USER_INDEX: &str = "userindexv1";

impl KvService {
    pub(crate) fn find_user_by_id_tx(&self, tx: &dyn Transaction, id: Id) -> Result<User> {
        decode(&get_record(tx, USER_BUCKET, id, "user")?)
    }

    pub(crate) fn find_user_by_name_tx(&self, tx: &dyn Transaction, name: &str) -> Result<User> {
        let id = resolve_index(tx, USER_INDEX, name.as_bytes(), "user")?;
        self.find_user_by_id_tx(tx, id)
    }

    fn find_users_tx(
        &self,
        ctx: &RequestContext,
        tx: &dyn Transaction,
        f: &UserFilter,
    ) -> Result<Vec<User>> {
        if let Some(id) = f.id {
            let user = self.find_user_by_id_tx(tx, id)?;
            if f.name.as_ref().is_some_and(|name| *name != user.name) {
                return Ok(Vec::new());
            }
            return Ok(vec![user]);
        }
        if let Some(name) = &f.name {
            return Ok(vec![self.find_user_by_name_tx(tx, name)?]);
        }
        filter(ctx, tx, USER_BUCKET, |_: &User| true)
    }

    fn put_user_tx(&self, tx: &dyn Transaction, user: &User) -> Result<()> {
        put_indexed(tx, USER_BUCKET, USER_INDEX, user.id, user.name.as_bytes(), &encode(user)?)
    }

    pub(crate) fn create_user_tx(&self, tx: &dyn Transaction, user: &mut User) -> Result<()> {
        if user.name.is_empty() {
            return Err(Error::invalid("user name must not be empty"));
        }
        ensure_unique(tx, USER_INDEX, user.name.as_bytes(), "user name")?;
        if !user.id.valid() {
            user.id = self.id_generator.id();
        }
        self.put_user_tx(tx, user)?;
        debug!(user_id = %user.id, "created user");
        Ok(())
    }

    fn update_user_tx(&self, tx: &dyn Transaction, id: Id, update: &UserUpdate) -> Result<User> {
        update.valid()?;
        let mut user = self.find_user_by_id_tx(tx, id)?;
        if let Some(name) = &update.name {
            if *name != user.name {
                ensure_unique(tx, USER_INDEX, name.as_bytes(), "user name")?;
                tx.bucket(USER_INDEX)?.delete(user.name.as_bytes())?;
            }
        }
        update.apply(&mut user);
        self.put_user_tx(tx, &user)?;
        Ok(user)
    }

    fn delete_user_tx(&self, ctx: &RequestContext, tx: &dyn Transaction, id: Id) -> Result<()> {
        let user = self.find_user_by_id_tx(tx, id)?;
        delete_indexed(tx, USER_BUCKET, USER_INDEX, id, user.name.as_bytes())?;
        self.delete_password_tx(tx, id)?;
        let tokens = self.delete_authorizations_tx(ctx, tx, |a| a.user_id == id)?;
        self.delete_mappings_tx(ctx, tx, None, |m| m.user_id == id || m.resource_id == id)?;
        debug!(user_id = %id, tokens, "deleted user");
        Ok(())
    }
}

#[async_trait]
impl UserService for KvService {
    async fn find_user_by_id(&self, _ctx: &RequestContext, id: Id) -> Result<User> {
        self.read_op("kv/FindUserByID", |tx| self.find_user_by_id_tx(tx, id))
    }

    async fn find_user(&self, ctx: &RequestContext, f: UserFilter) -> Result<User> {
        let found = self.read_op("kv/FindUser", |tx| {
            if f.id.is_some() || f.name.is_some() {
                return Ok(self.find_users_tx(ctx, tx, &f)?.into_iter().next());
            }
            let mut first = None;
            for_each(ctx, tx, USER_BUCKET, |user: User| {
                first = Some(user);
                Ok(false)
            })?;
            Ok(first)
        })?;
        found.ok_or_else(|| Error::wrap("kv/FindUser", Error::not_found("user not found")))
    }

    async fn find_users(
        &self,
        ctx: &RequestContext,
        f: UserFilter,
        opts: FindOptions,
    ) -> Result<(Vec<User>, usize)> {
        let users = self.read_op("kv/FindUsers", |tx| self.find_users_tx(ctx, tx, &f))?;
        Ok(page(users, opts))
    }

    async fn create_user(&self, ctx: &RequestContext, user: &mut User) -> Result<()> {
        let created = self.write_op(ctx, "kv/CreateUser", |tx| {
            let mut candidate = user.clone();
            self.create_user_tx(tx, &mut candidate)?;
            Ok(candidate)
        })?;
        *user = created;
        Ok(())
    }

    async fn update_user(&self, ctx: &RequestContext, id: Id, update: UserUpdate) -> Result<User> {
        self.write_op(ctx, "kv/UpdateUser", |tx| self.update_user_tx(tx, id, &update))
    }

    async fn delete_user(&self, ctx: &RequestContext, id: Id) -> Result<()> {
        self.write_op(ctx, "kv/DeleteUser", |tx| self.delete_user_tx(ctx, tx, id))
    }
}
