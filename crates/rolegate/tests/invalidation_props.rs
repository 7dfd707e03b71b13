//! Random write sequences against a warm cache.

use proptest::prelude::*;
use rolegate::store::MemoryStore;
use rolegate::{Authorizer, CacheState, SubjectId};

#[derive(Debug, Clone)]
enum Write {
    CreateRole(u8),
    AttachPermission,
    DetachPermission,
    AssignRole(u64),
    GrantPermission(u64),
}

fn write() -> impl Strategy<Value = Write> {
    prop_oneof![
        any::<u8>().prop_map(Write::CreateRole),
        Just(Write::AttachPermission),
        Just(Write::DetachPermission),
        (1u64..8).prop_map(Write::AssignRole),
        (1u64..8).prop_map(Write::GrantPermission),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_catalogue_writes_empty_the_cache(writes in prop::collection::vec(write(), 1..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        runtime.block_on(async {
            let authz = Authorizer::new(MemoryStore::new());
            authz.create_role("base", None).await.unwrap();
            authz.create_permission("read", None, None).await.unwrap();

            for (i, write) in writes.into_iter().enumerate() {
                authz.warm().await.unwrap();
                let invalidates = match write {
                    Write::CreateRole(n) => {
                        authz
                            .create_role(&format!("role-{}-{}", i, n), Some("base".into()))
                            .await
                            .unwrap();
                        true
                    }
                    Write::AttachPermission => authz.attach_permission("base", "read").await.unwrap(),
                    Write::DetachPermission => authz.detach_permission("base", "read").await.unwrap(),
                    Write::AssignRole(subject) => {
                        authz.assign_role(SubjectId::new(subject), "base").await.unwrap();
                        false
                    }
                    Write::GrantPermission(subject) => {
                        authz
                            .give_permission_to(SubjectId::new(subject), ["read"])
                            .await
                            .unwrap();
                        false
                    }
                };

                let expected = if invalidates {
                    CacheState::Empty
                } else {
                    CacheState::Populated
                };
                assert_eq!(authz.cache().state(), expected);
            }
        });
    }
}
