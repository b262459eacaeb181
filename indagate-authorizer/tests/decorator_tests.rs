//! Integration tests for the authorizing decorators over a memory-backed store

use indagate_authorizer::{
    AuthorizedAuthorizationService, AuthorizedMappingService, AuthorizedOrganizationService,
    AuthorizedUserService,
};
use indagate_core::{
    operator_permissions, Action, AuthConfig, Authorization, AuthorizationFilter,
    AuthorizationService, AuthorizationUpdate, ErrorCode, FindOptions, Id, MappingType,
    Organization, OrganizationFilter, OrganizationService, OrganizationUpdate, Permission,
    RequestContext, ResourceType, SequentialIdGenerator, SessionService, Status, User, UserFilter,
    UserResourceMapping, UserResourceMappingFilter, UserResourceMappingService, UserService,
    UserType, UserUpdate,
};
use indagate_kv::MemoryStore;
use indagate_store::KvService;
use std::sync::Arc;

struct Fixture {
    store: Arc<KvService>,
    admin: RequestContext,
    alice: User,
    bob: User,
    acme: Organization,
    globex: Organization,
}

fn membership(user_id: Id, org: Id, user_type: UserType) -> UserResourceMapping {
    UserResourceMapping {
        user_id,
        user_type,
        mapping_type: MappingType::User,
        resource_type: ResourceType::Orgs,
        resource_id: org,
    }
}

/// alice owns acme and is a member of globex; bob belongs nowhere
async fn fixture() -> Fixture {
    let config = AuthConfig {
        password_cost: 1,
        ..Default::default()
    };
    let store = Arc::new(
        KvService::new(Arc::new(MemoryStore::new()), config)
            .with_id_generator(Arc::new(SequentialIdGenerator::new())),
    );
    store.initialize().unwrap();
    let admin = RequestContext::new();

    let mut alice = User::new("alice");
    store.create_user(&admin, &mut alice).await.unwrap();
    let mut bob = User::new("bob");
    store.create_user(&admin, &mut bob).await.unwrap();
    let mut acme = Organization::new("acme");
    store.create_organization(&admin, &mut acme).await.unwrap();
    let mut globex = Organization::new("globex");
    store.create_organization(&admin, &mut globex).await.unwrap();

    store
        .create_user_resource_mapping(&admin, &membership(alice.id, acme.id, UserType::Owner))
        .await
        .unwrap();
    store
        .create_user_resource_mapping(&admin, &membership(alice.id, globex.id, UserType::Member))
        .await
        .unwrap();

    Fixture {
        store,
        admin,
        alice,
        bob,
        acme,
        globex,
    }
}

impl Fixture {
    async fn session_ctx(&self, name: &str) -> RequestContext {
        let session = self.store.create_session(&self.admin, name).await.unwrap();
        RequestContext::with_authorizer(Arc::new(session))
    }

    fn token_ctx(&self, permissions: Vec<Permission>) -> RequestContext {
        let caller = Authorization {
            id: Id::new(0xcafe),
            token: "caller".into(),
            org_id: self.acme.id,
            user_id: self.alice.id,
            permissions,
            ..Default::default()
        };
        RequestContext::with_authorizer(Arc::new(caller))
    }

    async fn token(&self, org: Id) -> Authorization {
        let mut auth = Authorization::new(org, self.alice.id, Vec::new());
        self.store
            .create_authorization(&self.admin, &mut auth)
            .await
            .unwrap();
        auth
    }
}

#[tokio::test]
async fn collection_read_keeps_permitted_items_in_order() {
    let f = fixture().await;
    let mut auths = Vec::new();
    for _ in 0..5 {
        auths.push(f.token(f.acme.id).await);
    }
    let held = [0, 2, 4]
        .iter()
        .map(|&i| {
            Permission::at_id(
                auths[i].id,
                Action::Read,
                ResourceType::Authorizations,
                Some(f.acme.id),
            )
        })
        .collect();
    let ctx = f.token_ctx(held);

    let service = AuthorizedAuthorizationService::new(f.store.clone());
    let (found, total) = service
        .find_authorizations(&ctx, AuthorizationFilter::default(), FindOptions::default())
        .await
        .unwrap();
    let ids: Vec<_> = found.iter().map(|a| a.id).collect();
    assert_eq!(ids, [auths[0].id, auths[2].id, auths[4].id]);
    assert_eq!(total, 3);

    let (page, total) = service
        .find_authorizations(&ctx, AuthorizationFilter::default(), FindOptions::limit(1))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, auths[0].id);
    assert_eq!(total, 3);
}

#[tokio::test]
async fn single_read_without_permission_is_unauthorized() {
    let f = fixture().await;
    let auth = f.token(f.acme.id).await;
    let service = AuthorizedAuthorizationService::new(f.store.clone());

    let ctx = f.token_ctx(Vec::new());
    let err = service
        .find_authorization_by_id(&ctx, auth.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    let err = service
        .find_authorization_by_token(&ctx, &auth.token)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    let err = service
        .find_authorization_by_id(&ctx, Id::new(0xdead))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let ctx = f.token_ctx(vec![Permission::new(
        Action::Read,
        ResourceType::Authorizations,
        Some(f.acme.id),
    )]);
    let found = service.find_authorization_by_id(&ctx, auth.id).await.unwrap();
    assert_eq!(found, auth);
}

#[tokio::test]
async fn minting_a_token_requires_holding_its_permissions() {
    let f = fixture().await;
    let service = AuthorizedAuthorizationService::new(f.store.clone());
    let read_buckets = Permission::new(Action::Read, ResourceType::Buckets, Some(f.acme.id));
    let write_buckets = Permission::new(Action::Write, ResourceType::Buckets, Some(f.acme.id));

    let ctx = f.token_ctx(vec![read_buckets]);
    let mut auth = Authorization::new(f.acme.id, f.alice.id, vec![read_buckets]);
    let err = service
        .create_authorization(&ctx, &mut auth)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    let ctx = f.token_ctx(vec![
        Permission::new(Action::Write, ResourceType::Authorizations, Some(f.acme.id)),
        read_buckets,
    ]);
    let mut greedy = Authorization::new(f.acme.id, f.alice.id, vec![read_buckets, write_buckets]);
    let err = service
        .create_authorization(&ctx, &mut greedy)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    assert!(!greedy.id.valid());

    let mut modest = Authorization::new(f.acme.id, f.alice.id, vec![read_buckets]);
    service.create_authorization(&ctx, &mut modest).await.unwrap();
    assert!(modest.id.valid());

    let (all, _) = f
        .store
        .find_authorizations(&f.admin, AuthorizationFilter::default(), FindOptions::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn token_mutations_check_the_owning_org() {
    let f = fixture().await;
    let theirs = f.token(f.globex.id).await;
    let ours = f.token(f.acme.id).await;
    let service = AuthorizedAuthorizationService::new(f.store.clone());
    let ctx = f.session_ctx("alice").await;

    let update = AuthorizationUpdate {
        status: Some(Status::Inactive),
        description: None,
    };
    let err = service
        .update_authorization(&ctx, theirs.id, update.clone())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    let err = service
        .delete_authorization(&ctx, theirs.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    let updated = service
        .update_authorization(&ctx, ours.id, update)
        .await
        .unwrap();
    assert_eq!(updated.status, Status::Inactive);
    service.delete_authorization(&ctx, ours.id).await.unwrap();
}

#[tokio::test]
async fn missing_authorizer_is_unauthorized_everywhere() {
    let f = fixture().await;
    let ctx = RequestContext::new();
    let users = AuthorizedUserService::new(f.store.clone());
    let orgs = AuthorizedOrganizationService::new(f.store.clone());

    let err = users
        .find_users(&ctx, UserFilter::default(), FindOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    let err = users.find_user_by_id(&ctx, f.alice.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    let err = orgs
        .create_organization(&ctx, &mut Organization::new("initech"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    let mappings = AuthorizedMappingService::new(f.store.clone(), f.store.clone());
    for (resource, user) in [(f.acme.id, f.alice.id), (f.acme.id, f.bob.id)] {
        let err = mappings
            .delete_user_resource_mapping(&ctx, resource, user)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }
}

#[tokio::test]
async fn session_sees_only_its_own_user() {
    let f = fixture().await;
    let users = AuthorizedUserService::new(f.store.clone());
    let ctx = f.session_ctx("alice").await;

    let me = users.find_user_by_id(&ctx, f.alice.id).await.unwrap();
    assert_eq!(me, f.alice);
    let err = users.find_user_by_id(&ctx, f.bob.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    let err = users
        .find_user(&ctx, UserFilter::by_name("bob"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    let (visible, total) = users
        .find_users(&ctx, UserFilter::default(), FindOptions::default())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(visible[0].id, f.alice.id);

    let renamed = users
        .update_user(&ctx, f.alice.id, UserUpdate { name: Some("alicia".into()) })
        .await
        .unwrap();
    assert_eq!(renamed.name, "alicia");
    let err = users.delete_user(&ctx, f.bob.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    let err = users
        .create_user(&ctx, &mut User::new("carol"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn org_access_follows_membership() {
    let f = fixture().await;
    let mut initech = Organization::new("initech");
    f.store
        .create_organization(&f.admin, &mut initech)
        .await
        .unwrap();
    let orgs = AuthorizedOrganizationService::new(f.store.clone());
    let ctx = f.session_ctx("alice").await;

    let (visible, total) = orgs
        .find_organizations(&ctx, OrganizationFilter::default(), FindOptions::default())
        .await
        .unwrap();
    assert_eq!(total, 2);
    let names: Vec<_> = visible.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["acme", "globex"]);

    let err = orgs
        .find_organization_by_id(&ctx, initech.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    let update = OrganizationUpdate {
        name: None,
        description: Some("renamed".into()),
    };
    orgs.update_organization(&ctx, f.acme.id, update.clone())
        .await
        .unwrap();
    let err = orgs
        .update_organization(&ctx, f.globex.id, update)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    let err = orgs.delete_organization(&ctx, f.globex.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn operator_token_may_create_users_and_orgs() {
    let f = fixture().await;
    let ctx = f.token_ctx(operator_permissions());
    let users = AuthorizedUserService::new(f.store.clone());
    let orgs = AuthorizedOrganizationService::new(f.store.clone());

    let mut carol = User::new("carol");
    users.create_user(&ctx, &mut carol).await.unwrap();
    assert!(carol.id.valid());
    let mut initech = Organization::new("initech");
    orgs.create_organization(&ctx, &mut initech).await.unwrap();
    assert!(initech.id.valid());
}

#[tokio::test]
async fn mapping_writes_need_write_on_the_resource() {
    let f = fixture().await;
    let mappings = AuthorizedMappingService::new(f.store.clone(), f.store.clone());
    let ctx = f.session_ctx("alice").await;

    mappings
        .create_user_resource_mapping(&ctx, &membership(f.bob.id, f.acme.id, UserType::Member))
        .await
        .unwrap();
    let err = mappings
        .create_user_resource_mapping(&ctx, &membership(f.bob.id, f.globex.id, UserType::Member))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    let err = mappings
        .delete_user_resource_mapping(&ctx, f.globex.id, f.alice.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    mappings
        .delete_user_resource_mapping(&ctx, f.acme.id, f.bob.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn mapping_reads_are_filtered_through_the_resource_org() {
    let f = fixture().await;
    let auth = f.token(f.acme.id).await;
    f.store
        .create_user_resource_mapping(
            &f.admin,
            &UserResourceMapping {
                user_id: f.bob.id,
                user_type: UserType::Member,
                mapping_type: MappingType::User,
                resource_type: ResourceType::Authorizations,
                resource_id: auth.id,
            },
        )
        .await
        .unwrap();
    let mappings = AuthorizedMappingService::new(f.store.clone(), f.store.clone());

    let ctx = f.token_ctx(vec![Permission::new(
        Action::Read,
        ResourceType::Authorizations,
        Some(f.acme.id),
    )]);
    let (visible, total) = mappings
        .find_user_resource_mappings(&ctx, UserResourceMappingFilter::default(), FindOptions::default())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(visible[0].resource_id, auth.id);

    let ctx = f.session_ctx("alice").await;
    let (visible, total) = mappings
        .find_user_resource_mappings(&ctx, UserResourceMappingFilter::default(), FindOptions::default())
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert!(visible.iter().any(|m| m.resource_type == ResourceType::Authorizations));
}
