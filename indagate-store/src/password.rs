//! Password hashes, one per user
//!
//! Hashing and verification are slow by construction, so both run outside
//! the transaction that reads or writes the stored hash.

use crate::service::KvService;
use async_trait::async_trait;
use indagate_core::{Error, ErrorCode, Id, PasswordsService, RequestContext, Result};
use indagate_kv::{KvError, Transaction};
use tracing::debug;

pub(crate) const PASSWORD_BUCKET: &str = "userpasswordv1";

impl KvService {
    pub(crate) fn check_password_length(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.config.min_password_length {
            return Err(Error::invalid(format!(
                "passwords must be at least {} characters long",
                self.config.min_password_length
            )));
        }
        Ok(())
    }

    pub(crate) fn hash_password(&self, password: &str) -> Result<String> {
        self.check_password_length(password)?;
        self.crypt
            .generate_from_password(password.as_bytes(), self.config.password_cost)
    }

    pub(crate) fn put_password_tx(&self, tx: &dyn Transaction, user_id: Id, hash: &str) -> Result<()> {
        tx.bucket(PASSWORD_BUCKET)?
            .put(&user_id.encode()?, hash.as_bytes())?;
        Ok(())
    }

    /// Drop the stored hash; users without one are fine
    pub(crate) fn delete_password_tx(&self, tx: &dyn Transaction, user_id: Id) -> Result<()> {
        tx.bucket(PASSWORD_BUCKET)?.delete(&user_id.encode()?)?;
        Ok(())
    }

    fn get_password_tx(&self, tx: &dyn Transaction, name: &str) -> Result<String> {
        let user = self.find_user_by_name_tx(tx, name).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                Error::unauthorized("your username or password is incorrect")
            } else {
                e
            }
        })?;
        let hash = match tx.bucket(PASSWORD_BUCKET)?.get(&user.id.encode()?) {
            Ok(value) => value,
            Err(KvError::KeyNotFound) => {
                return Err(Error::unauthorized("your username or password is incorrect"))
            }
            Err(e) => return Err(e.into()),
        };
        String::from_utf8(hash)
            .map_err(|e| Error::internal("stored password hash is not utf-8").with_source(e))
    }
}

#[async_trait]
impl PasswordsService for KvService {
    async fn set_password(&self, ctx: &RequestContext, name: &str, password: &str) -> Result<()> {
        let hash = self
            .hash_password(password)
            .map_err(|e| Error::wrap("kv/SetPassword", e))?;
        self.write_op(ctx, "kv/SetPassword", |tx| {
            let user = self.find_user_by_name_tx(tx, name)?;
            self.put_password_tx(tx, user.id, &hash)?;
            debug!(user_id = %user.id, "password set");
            Ok(())
        })
    }

    async fn compare_password(
        &self,
        _ctx: &RequestContext,
        name: &str,
        password: &str,
    ) -> Result<()> {
        let hash = self.read_op("kv/ComparePassword", |tx| self.get_password_tx(tx, name))?;
        self.crypt
            .compare_hash_and_password(&hash, password.as_bytes())
            .map_err(|e| Error::wrap("kv/ComparePassword", e))
    }

    async fn compare_and_set_password(
        &self,
        ctx: &RequestContext,
        name: &str,
        old: &str,
        new: &str,
    ) -> Result<()> {
        self.compare_password(ctx, name, old).await?;
        self.set_password(ctx, name, new).await
    }
}
