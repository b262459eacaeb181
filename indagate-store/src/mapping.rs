//! User-resource mappings
//!
//! Keys are the encoded resource id followed by the encoded user id, so every
//! mapping of one resource is a contiguous key range.

use crate::index::{decode, encode, page};
use crate::service::KvService;
use async_trait::async_trait;
use indagate_core::{
    Error, FindOptions, Id, RequestContext, ResourceType, Result, UserResourceMapping,
    UserResourceMappingFilter, UserResourceMappingService,
};
use indagate_kv::{KvError, Transaction};
use tracing::debug;

pub(crate) const MAPPING_BUCKET: &str = "userresourcemappingsv1";

fn mapping_key(resource_id: Id, user_id: Id) -> Result<Vec<u8>> {
    let mut key = resource_id.encode()?;
    key.extend_from_slice(&user_id.encode()?);
    Ok(key)
}

impl KvService {
    /// Walk mappings, restricted to one resource's key range when given
    fn scan_mappings_tx<F>(
        &self,
        ctx: &RequestContext,
        tx: &dyn Transaction,
        resource_id: Option<Id>,
        mut f: F,
    ) -> Result<()>
    where
        F: FnMut(Vec<u8>, UserResourceMapping),
    {
        let prefix = match resource_id {
            Some(id) => id.encode()?,
            None => Vec::new(),
        };
        let bucket = tx.bucket(MAPPING_BUCKET)?;
        let mut cursor = bucket.cursor()?;
        let mut entry = cursor.seek(&prefix)?;
        while let Some((key, value)) = entry {
            if !key.starts_with(&prefix) {
                break;
            }
            ctx.check_cancelled()?;
            f(key, decode(&value)?);
            entry = cursor.next()?;
        }
        Ok(())
    }

    pub(crate) fn find_mappings_tx(
        &self,
        ctx: &RequestContext,
        tx: &dyn Transaction,
        f: &UserResourceMappingFilter,
    ) -> Result<Vec<UserResourceMapping>> {
        let mut out = Vec::new();
        self.scan_mappings_tx(ctx, tx, f.resource_id, |_, m| {
            if f.matches(&m) {
                out.push(m);
            }
        })?;
        Ok(out)
    }

    pub(crate) fn create_mapping_tx(
        &self,
        tx: &dyn Transaction,
        m: &UserResourceMapping,
    ) -> Result<()> {
        m.valid()?;
        self.find_user_by_id_tx(tx, m.user_id)?;
        match m.resource_type {
            ResourceType::Orgs => {
                self.find_organization_by_id_tx(tx, m.resource_id)?;
            }
            ResourceType::Authorizations => {
                self.find_authorization_by_id_tx(tx, m.resource_id)?;
            }
            ResourceType::Users => {
                self.find_user_by_id_tx(tx, m.resource_id)?;
            }
            // buckets are owned outside this store
            ResourceType::Buckets => {}
        }

        let key = mapping_key(m.resource_id, m.user_id)?;
        let mut bucket = tx.bucket(MAPPING_BUCKET)?;
        match bucket.get(&key) {
            Ok(_) => {
                return Err(Error::conflict(format!(
                    "user {} is already mapped to {} {}",
                    m.user_id, m.resource_type, m.resource_id
                )))
            }
            Err(KvError::KeyNotFound) => {}
            Err(e) => return Err(e.into()),
        }
        bucket.put(&key, &encode(m)?)?;
        debug!(user_id = %m.user_id, resource_id = %m.resource_id, "created mapping");
        Ok(())
    }

    fn delete_mapping_tx(&self, tx: &dyn Transaction, resource_id: Id, user_id: Id) -> Result<()> {
        let key = mapping_key(resource_id, user_id)?;
        let mut bucket = tx.bucket(MAPPING_BUCKET)?;
        match bucket.get(&key) {
            Ok(_) => {}
            Err(KvError::KeyNotFound) => {
                return Err(Error::not_found("user resource mapping not found"))
            }
            Err(e) => return Err(e.into()),
        }
        bucket.delete(&key)?;
        Ok(())
    }

    /// Remove every mapping `doomed` accepts, returning how many went
    pub(crate) fn delete_mappings_tx<P>(
        &self,
        ctx: &RequestContext,
        tx: &dyn Transaction,
        resource_id: Option<Id>,
        doomed: P,
    ) -> Result<usize>
    where
        P: Fn(&UserResourceMapping) -> bool,
    {
        let mut keys = Vec::new();
        self.scan_mappings_tx(ctx, tx, resource_id, |key, m| {
            if doomed(&m) {
                keys.push(key);
            }
        })?;

        let mut bucket = tx.bucket(MAPPING_BUCKET)?;
        for key in &keys {
            bucket.delete(key)?;
        }
        Ok(keys.len())
    }
}

#[async_trait]
impl UserResourceMappingService for KvService {
    async fn find_user_resource_mappings(
        &self,
        ctx: &RequestContext,
        f: UserResourceMappingFilter,
        opts: FindOptions,
    ) -> Result<(Vec<UserResourceMapping>, usize)> {
        let mappings = self.read_op("kv/FindUserResourceMappings", |tx| {
            self.find_mappings_tx(ctx, tx, &f)
        })?;
        Ok(page(mappings, opts))
    }

    async fn create_user_resource_mapping(
        &self,
        ctx: &RequestContext,
        mapping: &UserResourceMapping,
    ) -> Result<()> {
        self.write_op(ctx, "kv/CreateUserResourceMapping", |tx| {
            self.create_mapping_tx(tx, mapping)
        })
    }

    async fn delete_user_resource_mapping(
        &self,
        ctx: &RequestContext,
        resource_id: Id,
        user_id: Id,
    ) -> Result<()> {
        self.write_op(ctx, "kv/DeleteUserResourceMapping", |tx| {
            self.delete_mapping_tx(tx, resource_id, user_id)
        })
    }
}
