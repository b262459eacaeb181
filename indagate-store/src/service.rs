use crate::authorization::{AUTHORIZATION_BUCKET, AUTHORIZATION_INDEX};
use crate::mapping::MAPPING_BUCKET;
use crate::organization::{ORGANIZATION_BUCKET, ORGANIZATION_INDEX};
use crate::password::PASSWORD_BUCKET;
use crate::session::SESSION_BUCKET;
use crate::user::{USER_BUCKET, USER_INDEX};
use indagate_core::{
    Argon2Crypt, AuthConfig, Crypt, Error, IdGenerator, IndagateConfig, RandomTokenGenerator,
    RealTimeGenerator, RequestContext, Result, SnowflakeGenerator, TimeGenerator, TokenGenerator,
};
use indagate_kv::{open_store, Store, StoreExt, Transaction};
use std::sync::Arc;
use tracing::{debug, info};

const ALL_BUCKETS: [&str; 9] = [
    AUTHORIZATION_BUCKET,
    AUTHORIZATION_INDEX,
    ORGANIZATION_BUCKET,
    ORGANIZATION_INDEX,
    USER_BUCKET,
    USER_INDEX,
    SESSION_BUCKET,
    MAPPING_BUCKET,
    PASSWORD_BUCKET,
];

/// Entity stores over one [`Store`]
///
/// Implements every service trait of `indagate-core` without any permission
/// checks; wrap it in the authorizing decorators before exposing it.
pub struct KvService {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) id_generator: Arc<dyn IdGenerator>,
    pub(crate) token_generator: Arc<dyn TokenGenerator>,
    pub(crate) time_generator: Arc<dyn TimeGenerator>,
    pub(crate) crypt: Arc<dyn Crypt>,
    pub(crate) config: AuthConfig,
}

impl KvService {
    pub fn new(store: Arc<dyn Store>, config: AuthConfig) -> Self {
        Self {
            store,
            id_generator: Arc::new(SnowflakeGenerator::new()),
            token_generator: Arc::new(RandomTokenGenerator::new(config.token_size)),
            time_generator: Arc::new(RealTimeGenerator),
            crypt: Arc::new(Argon2Crypt),
            config,
        }
    }

    /// Open the configured engine and create all buckets
    pub fn from_config(config: &IndagateConfig) -> Result<Self> {
        config.validate()?;
        let service = Self::new(open_store(&config.storage)?, config.auth.clone());
        service.initialize()?;
        Ok(service)
    }

    pub fn with_id_generator(mut self, generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = generator;
        self
    }

    pub fn with_token_generator(mut self, generator: Arc<dyn TokenGenerator>) -> Self {
        self.token_generator = generator;
        self
    }

    pub fn with_time_generator(mut self, generator: Arc<dyn TimeGenerator>) -> Self {
        self.time_generator = generator;
        self
    }

    pub fn with_crypt(mut self, crypt: Arc<dyn Crypt>) -> Self {
        self.crypt = crypt;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Read transaction with failures tagged by `op`
    pub(crate) fn read_op<T, F>(&self, op: &str, f: F) -> Result<T>
    where
        F: FnMut(&dyn Transaction) -> Result<T>,
    {
        self.store
            .read(f)
            .map_err(|e| Error::wrap(op, e))
            .inspect_err(log_failure)
    }

    /// Write transaction, skipped when the request is already cancelled
    pub(crate) fn write_op<T, F>(&self, ctx: &RequestContext, op: &str, f: F) -> Result<T>
    where
        F: FnMut(&dyn Transaction) -> Result<T>,
    {
        ctx.check_cancelled()
            .and_then(|_| self.store.write(f))
            .map_err(|e| Error::wrap(op, e))
            .inspect_err(log_failure)
    }

    /// Create every bucket in one write transaction
    pub fn initialize(&self) -> Result<()> {
        self.store
            .modify(&mut |tx| {
                for name in ALL_BUCKETS {
                    tx.bucket(name)?;
                }
                Ok(())
            })
            .map_err(|e| Error::wrap("kv/Initialize", e))?;
        info!(buckets = ALL_BUCKETS.len(), "store initialized");
        Ok(())
    }
}

/// Misses and rejected credentials are routine; anything else gets logged
fn log_failure(err: &Error) {
    if err.is_not_found() || err.is_unauthorized() {
        debug!(error = %err, "lookup failed");
    } else {
        err.log();
    }
}

impl std::fmt::Debug for KvService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
