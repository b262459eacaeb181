use crate::index::{decode, encode};
use crate::service::KvService;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use indagate_core::{
    me_permissions, member_permissions, owner_permissions, Error, Id, Permission, RequestContext,
    ResourceType, Result, Session, SessionService, UserResourceMappingFilter, UserType,
};
use indagate_kv::{KvError, Transaction};
use tracing::debug;

pub(crate) const SESSION_BUCKET: &str = "sessionsv1";

impl KvService {
    fn get_session_tx(&self, tx: &dyn Transaction, key: &str) -> Result<Session> {
        match tx.bucket(SESSION_BUCKET)?.get(key.as_bytes()) {
            Ok(value) => decode(&value),
            Err(KvError::KeyNotFound) => Err(Error::not_found("session not found")),
            Err(e) => Err(e.into()),
        }
    }

    fn put_session_tx(&self, tx: &dyn Transaction, session: &Session) -> Result<()> {
        tx.bucket(SESSION_BUCKET)?
            .put(session.key.as_bytes(), &encode(session)?)?;
        Ok(())
    }

    /// Everything a session for `user_id` may do, from its mappings
    fn session_permissions_tx(
        &self,
        ctx: &RequestContext,
        tx: &dyn Transaction,
        user_id: Id,
    ) -> Result<Vec<Permission>> {
        let mut permissions = me_permissions(user_id);
        let mappings = self.find_mappings_tx(
            ctx,
            tx,
            &UserResourceMappingFilter {
                user_id: Some(user_id),
                ..Default::default()
            },
        )?;
        for m in mappings {
            if m.resource_type == ResourceType::Orgs {
                let org_id = m.resource_id;
                permissions.extend(m.to_permissions(Some(org_id)));
                permissions.extend(match m.user_type {
                    UserType::Owner => owner_permissions(org_id),
                    UserType::Member => member_permissions(org_id),
                });
            } else {
                permissions.extend(m.to_permissions(None));
            }
        }
        Ok(permissions)
    }

    fn create_session_tx(
        &self,
        ctx: &RequestContext,
        tx: &dyn Transaction,
        name: &str,
    ) -> Result<Session> {
        let user = self.find_user_by_name_tx(tx, name)?;
        let permissions = self.session_permissions_tx(ctx, tx, user.id)?;
        let now = self.time_generator.now();
        let expires_at = Duration::try_minutes(self.config.session_length_minutes)
            .and_then(|length| now.checked_add_signed(length))
            .ok_or_else(|| {
                Error::invalid(format!(
                    "session length of {} minutes is out of range",
                    self.config.session_length_minutes
                ))
            })?;
        let session = Session {
            id: self.id_generator.id(),
            key: self.token_generator.token()?,
            created_at: now,
            expires_at,
            user_id: user.id,
            permissions,
        };
        self.put_session_tx(tx, &session)?;
        debug!(session_id = %session.id, user_id = %user.id, "created session");
        Ok(session)
    }

    fn renew_session_tx(
        &self,
        tx: &dyn Transaction,
        session: &Session,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        if expires_at < session.expires_at {
            return Err(Error::invalid("session expiration cannot be moved earlier"));
        }
        let mut stored = self.get_session_tx(tx, &session.key)?;
        stored.expires_at = expires_at;
        self.put_session_tx(tx, &stored)?;
        Ok(stored)
    }
}

#[async_trait]
impl SessionService for KvService {
    async fn find_session(&self, _ctx: &RequestContext, key: &str) -> Result<Session> {
        let session = self.read_op("kv/FindSession", |tx| self.get_session_tx(tx, key))?;
        session
            .expired_at(self.time_generator.now())
            .map_err(|e| Error::wrap("kv/FindSession", e))?;
        Ok(session)
    }

    async fn expire_session(&self, ctx: &RequestContext, key: &str) -> Result<()> {
        self.write_op(ctx, "kv/ExpireSession", |tx| {
            let mut session = self.get_session_tx(tx, key)?;
            session.expires_at = self.time_generator.now();
            self.put_session_tx(tx, &session)
        })
    }

    async fn create_session(&self, ctx: &RequestContext, user: &str) -> Result<Session> {
        self.write_op(ctx, "kv/CreateSession", |tx| {
            self.create_session_tx(ctx, tx, user)
        })
    }

    async fn renew_session(
        &self,
        ctx: &RequestContext,
        session: &mut Session,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let renewed = self.write_op(ctx, "kv/RenewSession", |tx| {
            self.renew_session_tx(tx, session, expires_at)
        })?;
        *session = renewed;
        Ok(())
    }
}
