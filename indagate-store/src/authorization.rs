use crate::index::{
    decode, delete_indexed, encode, ensure_unique, filter, get_record, page, put_indexed,
    resolve_index,
};
use crate::service::KvService;
use async_trait::async_trait;
use indagate_core::{
    Authorization, AuthorizationFilter, AuthorizationService, AuthorizationUpdate, FindOptions,
    Id, RequestContext, Result,
};
use indagate_kv::Transaction;
use tracing::debug;

pub(crate) const AUTHORIZATION_BUCKET: &str = "authorizationsv1";
pub(crate) const AUTHORIZATION_INDEX: &str = "authorizationindexv1";

impl KvService {
    pub(crate) fn find_authorization_by_id_tx(
        &self,
        tx: &dyn Transaction,
        id: Id,
    ) -> Result<Authorization> {
        decode(&get_record(tx, AUTHORIZATION_BUCKET, id, "authorization")?)
    }

    fn find_authorization_by_token_tx(
        &self,
        tx: &dyn Transaction,
        token: &str,
    ) -> Result<Authorization> {
        let id = resolve_index(tx, AUTHORIZATION_INDEX, token.as_bytes(), "authorization")?;
        self.find_authorization_by_id_tx(tx, id)
    }

    fn find_authorizations_tx(
        &self,
        ctx: &RequestContext,
        tx: &dyn Transaction,
        f: &AuthorizationFilter,
    ) -> Result<Vec<Authorization>> {
        if let Some(id) = f.id {
            return Ok(vec![self.find_authorization_by_id_tx(tx, id)?]);
        }
        if let Some(token) = &f.token {
            return Ok(vec![self.find_authorization_by_token_tx(tx, token)?]);
        }

        let user_id = match (f.user_id, &f.user) {
            (Some(id), _) => Some(id),
            (None, Some(name)) => Some(self.find_user_by_name_tx(tx, name)?.id),
            (None, None) => None,
        };
        let org_id = match (f.org_id, &f.org) {
            (Some(id), _) => Some(id),
            (None, Some(name)) => Some(self.find_organization_by_name_tx(tx, name)?.id),
            (None, None) => None,
        };

        filter(ctx, tx, AUTHORIZATION_BUCKET, |a: &Authorization| {
            user_id.map_or(true, |id| a.user_id == id) && org_id.map_or(true, |id| a.org_id == id)
        })
    }

    pub(crate) fn create_authorization_tx(
        &self,
        tx: &dyn Transaction,
        auth: &mut Authorization,
    ) -> Result<()> {
        auth.valid()?;
        if auth.token.is_empty() {
            auth.token = self.token_generator.token()?;
        }

        self.find_user_by_id_tx(tx, auth.user_id)?;
        self.find_organization_by_id_tx(tx, auth.org_id)?;
        ensure_unique(
            tx,
            AUTHORIZATION_INDEX,
            auth.token.as_bytes(),
            "authorization token",
        )?;

        if !auth.id.valid() {
            auth.id = self.id_generator.id();
        }
        put_indexed(
            tx,
            AUTHORIZATION_BUCKET,
            AUTHORIZATION_INDEX,
            auth.id,
            auth.token.as_bytes(),
            &encode(auth)?,
        )?;
        debug!(auth_id = %auth.id, org_id = %auth.org_id, "created authorization");
        Ok(())
    }

    fn update_authorization_tx(
        &self,
        tx: &dyn Transaction,
        id: Id,
        update: &AuthorizationUpdate,
    ) -> Result<Authorization> {
        let mut auth = self.find_authorization_by_id_tx(tx, id)?;
        update.apply(&mut auth);
        tx.bucket(AUTHORIZATION_BUCKET)?
            .put(&id.encode()?, &encode(&auth)?)?;
        Ok(auth)
    }

    fn remove_authorization_tx(
        &self,
        ctx: &RequestContext,
        tx: &dyn Transaction,
        auth: &Authorization,
    ) -> Result<()> {
        delete_indexed(
            tx,
            AUTHORIZATION_BUCKET,
            AUTHORIZATION_INDEX,
            auth.id,
            auth.token.as_bytes(),
        )?;
        self.delete_mappings_tx(ctx, tx, Some(auth.id), |_| true)?;
        debug!(auth_id = %auth.id, "deleted authorization");
        Ok(())
    }

    fn delete_authorization_tx(
        &self,
        ctx: &RequestContext,
        tx: &dyn Transaction,
        id: Id,
    ) -> Result<()> {
        let auth = self.find_authorization_by_id_tx(tx, id)?;
        self.remove_authorization_tx(ctx, tx, &auth)
    }

    /// Remove every authorization `doomed` accepts, returning how many went
    pub(crate) fn delete_authorizations_tx<P>(
        &self,
        ctx: &RequestContext,
        tx: &dyn Transaction,
        doomed: P,
    ) -> Result<usize>
    where
        P: Fn(&Authorization) -> bool,
    {
        let auths: Vec<Authorization> = filter(ctx, tx, AUTHORIZATION_BUCKET, doomed)?;
        for auth in &auths {
            self.remove_authorization_tx(ctx, tx, auth)?;
        }
        Ok(auths.len())
    }
}

#[async_trait]
impl AuthorizationService for KvService {
    async fn find_authorization_by_id(
        &self,
        _ctx: &RequestContext,
        id: Id,
    ) -> Result<Authorization> {
        self.read_op("kv/FindAuthorizationByID", |tx| {
            self.find_authorization_by_id_tx(tx, id)
        })
    }

    async fn find_authorization_by_token(
        &self,
        _ctx: &RequestContext,
        token: &str,
    ) -> Result<Authorization> {
        self.read_op("kv/FindAuthorizationByToken", |tx| {
            self.find_authorization_by_token_tx(tx, token)
        })
    }

    async fn find_authorizations(
        &self,
        ctx: &RequestContext,
        f: AuthorizationFilter,
        opts: FindOptions,
    ) -> Result<(Vec<Authorization>, usize)> {
        let auths = self.read_op("kv/FindAuthorizations", |tx| {
            self.find_authorizations_tx(ctx, tx, &f)
        })?;
        Ok(page(auths, opts))
    }

    async fn create_authorization(
        &self,
        ctx: &RequestContext,
        auth: &mut Authorization,
    ) -> Result<()> {
        let created = self.write_op(ctx, "kv/CreateAuthorization", |tx| {
            let mut candidate = auth.clone();
            self.create_authorization_tx(tx, &mut candidate)?;
            Ok(candidate)
        })?;
        *auth = created;
        Ok(())
    }

    async fn update_authorization(
        &self,
        ctx: &RequestContext,
        id: Id,
        update: AuthorizationUpdate,
    ) -> Result<Authorization> {
        self.write_op(ctx, "kv/UpdateAuthorization", |tx| {
            self.update_authorization_tx(tx, id, &update)
        })
    }

    async fn delete_authorization(&self, ctx: &RequestContext, id: Id) -> Result<()> {
        self.write_op(ctx, "kv/DeleteAuthorization", |tx| {
            self.delete_authorization_tx(ctx, tx, id)
        })
    }
}
