#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use indagate_core::{
    AuthConfig, FixedTimeGenerator, Organization, OrganizationService, RequestContext, Result,
    SequentialIdGenerator, User, UserService,
};
use indagate_kv::{MemoryStore, Store, StoreExt};
use indagate_store::KvService;
use std::sync::Arc;

pub struct Harness {
    pub service: KvService,
    pub clock: Arc<FixedTimeGenerator>,
    pub ctx: RequestContext,
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        password_cost: 1,
        token_size: 16,
        ..Default::default()
    }
}

pub fn harness_on(store: Arc<dyn Store>) -> Harness {
    let clock = Arc::new(FixedTimeGenerator::new(epoch()));
    let service = KvService::new(store, test_auth_config())
        .with_id_generator(Arc::new(SequentialIdGenerator::new()))
        .with_time_generator(clock.clone());
    service.initialize().unwrap();
    Harness {
        service,
        clock,
        ctx: RequestContext::new(),
    }
}

pub fn harness() -> Harness {
    harness_on(Arc::new(MemoryStore::new()))
}

impl Harness {
    pub async fn user(&self, name: &str) -> User {
        let mut user = User::new(name);
        self.service.create_user(&self.ctx, &mut user).await.unwrap();
        user
    }

    pub async fn org(&self, name: &str) -> Organization {
        let mut org = Organization::new(name);
        self.service
            .create_organization(&self.ctx, &mut org)
            .await
            .unwrap();
        org
    }

    /// Number of keys in `bucket`
    pub fn count(&self, bucket: &str) -> Result<usize> {
        self.service.store().read(|tx| {
            let b = tx.bucket(bucket)?;
            let mut cursor = b.cursor()?;
            let mut n = 0;
            let mut entry = cursor.first()?;
            while entry.is_some() {
                n += 1;
                entry = cursor.next()?;
            }
            Ok(n)
        })
    }
}
