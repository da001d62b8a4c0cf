use std::sync::{Arc, Barrier};

use usergate::config::SecurityConfig;
use usergate::db::{Store, is_unique_violation};
use usergate::services::{
    Argon2Scheme, CredentialError, CredentialService, Identity, MAX_USER_NAME_LEN,
    PasswordScheme, SeaOrmCredentialService,
};

fn cheap_security() -> SecurityConfig {
    SecurityConfig {
        argon2_memory_cost_kib: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
        ..SecurityConfig::default()
    }
}

async fn memory_store() -> Store {
    Store::new("sqlite::memory:")
        .await
        .expect("Failed to open in-memory store")
}

async fn service_with(scheme: Arc<dyn PasswordScheme>) -> (Store, SeaOrmCredentialService) {
    let store = memory_store().await;
    let service = SeaOrmCredentialService::new(store.clone(), scheme);
    (store, service)
}

async fn service() -> (Store, SeaOrmCredentialService) {
    service_with(Arc::new(Argon2Scheme::from_config(&cheap_security()).unwrap())).await
}

async fn stored_hash(service: &SeaOrmCredentialService, id: i32) -> String {
    service
        .list_users()
        .await
        .unwrap()
        .into_iter()
        .find(|u| u.id == id)
        .map(|u| u.password_hash)
        .expect("user should exist")
}

#[tokio::test]
async fn created_users_can_authenticate() {
    let (_, service) = service().await;

    let alice = service.user_create("alice", "pw1").await.unwrap();
    let bob = service.user_create("bob", "hunter2").await.unwrap();

    let identity = service.authenticate("alice", "pw1").await.unwrap();
    assert_eq!(
        identity,
        Identity {
            id: alice,
            name: "alice".to_string()
        }
    );
    assert_eq!(service.authenticate("bob", "hunter2").await.unwrap().id, bob);
}

#[tokio::test]
async fn authenticate_distinguishes_unknown_name_and_wrong_password() {
    let (_, service) = service().await;
    service.user_create("alice", "pw1").await.unwrap();

    let wrong_password = service.authenticate("alice", "nope").await.unwrap_err();
    assert!(matches!(wrong_password, CredentialError::InvalidPassword));

    let unknown = service.authenticate("mallory", "pw1").await.unwrap_err();
    assert!(matches!(unknown, CredentialError::NotFound));
}

#[tokio::test]
async fn passwords_are_stored_hashed() {
    let (_, service) = service().await;
    let id = service.user_create("alice", "plaintext-pw").await.unwrap();

    let hash = stored_hash(&service, id).await;
    assert_ne!(hash, "plaintext-pw");
    assert!(hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn duplicate_name_is_rejected_and_original_kept() {
    let (_, service) = service().await;
    let id = service.user_create("alice", "pw1").await.unwrap();

    let err = service.user_create("alice", "pw2").await.unwrap_err();
    assert!(matches!(err, CredentialError::NameTaken(ref n) if n == "alice"));

    let users = service.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, id);

    assert!(service.authenticate("alice", "pw1").await.is_ok());
    assert!(matches!(
        service.authenticate("alice", "pw2").await,
        Err(CredentialError::InvalidPassword)
    ));
}

#[tokio::test]
async fn is_empty_flips_after_first_user() {
    let (_, service) = service().await;

    assert!(service.is_empty().await.unwrap());
    assert_eq!(service.count().await.unwrap(), 0);

    service.user_create("alice", "pw1").await.unwrap();

    assert!(!service.is_empty().await.unwrap());
    assert_eq!(service.count().await.unwrap(), 1);
}

#[tokio::test]
async fn list_users_keeps_insertion_order() {
    let (_, service) = service().await;
    for name in ["carol", "alice", "bob"] {
        service.user_create(name, "pw").await.unwrap();
    }

    let names: Vec<String> = service
        .list_users()
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, ["carol", "alice", "bob"]);
}

#[tokio::test]
async fn get_user_name_and_exists() {
    let (_, service) = service().await;
    let id = service.user_create("alice", "pw1").await.unwrap();

    assert_eq!(service.get_user_name(id).await.unwrap(), "alice");
    assert!(matches!(
        service.get_user_name(id + 100).await,
        Err(CredentialError::IdNotFound(missing)) if missing == id + 100
    ));

    assert!(service.user_exists("alice").await.unwrap());
    assert!(!service.user_exists("bob").await.unwrap());
}

#[tokio::test]
async fn empty_change_is_a_no_op() {
    let (_, service) = service().await;
    let id = service.user_create("alice", "pw1").await.unwrap();
    let before = stored_hash(&service, id).await;

    service.change_credentials(id, "", "").await.unwrap();
    service.change_credentials(id, "alice", "").await.unwrap();

    assert_eq!(service.get_user_name(id).await.unwrap(), "alice");
    assert_eq!(stored_hash(&service, id).await, before);
}

#[tokio::test]
async fn rename_leaves_password_untouched() {
    let (_, service) = service().await;
    let id = service.user_create("alice", "pw1").await.unwrap();
    let before = stored_hash(&service, id).await;

    service.change_credentials(id, "alicia", "").await.unwrap();

    assert_eq!(service.get_user_name(id).await.unwrap(), "alicia");
    assert_eq!(stored_hash(&service, id).await, before);
    assert!(service.authenticate("alicia", "pw1").await.is_ok());
    assert!(matches!(
        service.authenticate("alice", "pw1").await,
        Err(CredentialError::NotFound)
    ));
}

#[tokio::test]
async fn password_change_leaves_name_untouched() {
    let (_, service) = service().await;
    let id = service.user_create("alice", "pw1").await.unwrap();

    service.change_credentials(id, "", "pw2").await.unwrap();

    assert_eq!(service.get_user_name(id).await.unwrap(), "alice");
    assert!(service.authenticate("alice", "pw2").await.is_ok());
    assert!(service.authenticate("alice", "pw1").await.is_err());
}

#[tokio::test]
async fn change_both_fields() {
    let (_, service) = service().await;
    let id = service.user_create("alice", "pw1").await.unwrap();

    service.change_credentials(id, "alicia", "pw2").await.unwrap();

    assert_eq!(service.authenticate("alicia", "pw2").await.unwrap().id, id);
}

#[tokio::test]
async fn change_credentials_unknown_id() {
    let (_, service) = service().await;

    assert!(matches!(
        service.change_credentials(42, "x", "y").await,
        Err(CredentialError::IdNotFound(42))
    ));
    // The id check comes first even when nothing would be written.
    assert!(matches!(
        service.change_credentials(42, "", "").await,
        Err(CredentialError::IdNotFound(42))
    ));
}

#[tokio::test]
async fn rename_onto_existing_name_is_rejected() {
    let (_, service) = service().await;
    service.user_create("alice", "pw1").await.unwrap();
    let bob = service.user_create("bob", "pw2").await.unwrap();

    let err = service.change_credentials(bob, "alice", "").await.unwrap_err();
    assert!(matches!(err, CredentialError::NameTaken(ref n) if n == "alice"));
    assert_eq!(service.get_user_name(bob).await.unwrap(), "bob");
}

#[tokio::test]
async fn malformed_names_are_never_stored() {
    let (_, service) = service().await;
    let long = "x".repeat(MAX_USER_NAME_LEN + 1);

    for bad in [long.as_str(), "", "two\nlines"] {
        assert!(matches!(
            service.user_create(bad, "pw").await,
            Err(CredentialError::InvalidName(_))
        ));
    }
    assert!(service.is_empty().await.unwrap());

    let id = service
        .user_create(&"x".repeat(MAX_USER_NAME_LEN), "pw")
        .await
        .unwrap();
    assert!(matches!(
        service.change_credentials(id, &long, "").await,
        Err(CredentialError::InvalidName(_))
    ));
    assert!(matches!(
        service.change_credentials(id, "tab\there", "").await,
        Err(CredentialError::InvalidName(_))
    ));
    assert_eq!(
        service.get_user_name(id).await.unwrap(),
        "x".repeat(MAX_USER_NAME_LEN)
    );
}

#[tokio::test]
async fn delete_removes_user() {
    let (_, service) = service().await;
    let id = service.user_create("alice", "pw1").await.unwrap();

    service.delete_user(id).await.unwrap();

    assert!(matches!(
        service.get_user_name(id).await,
        Err(CredentialError::IdNotFound(_))
    ));
    assert!(matches!(
        service.delete_user(id).await,
        Err(CredentialError::IdNotFound(_))
    ));
    assert!(service.is_empty().await.unwrap());
}

#[tokio::test]
async fn identity_validity_tracks_rename_and_delete() {
    let (_, service) = service().await;
    let id = service.user_create("alice", "pw1").await.unwrap();
    let identity = service.authenticate("alice", "pw1").await.unwrap();

    assert!(service.is_identity_valid(&identity).await.unwrap());

    service.change_credentials(id, "alicia", "").await.unwrap();
    assert!(!service.is_identity_valid(&identity).await.unwrap());

    let renamed = Identity {
        id,
        name: "alicia".to_string(),
    };
    assert!(service.is_identity_valid(&renamed).await.unwrap());

    service.delete_user(id).await.unwrap();
    assert!(!service.is_identity_valid(&renamed).await.unwrap());
}

#[tokio::test]
async fn storage_enforces_unique_names() {
    let store = memory_store().await;
    store.insert_user("alice", "h1").await.unwrap();

    let err = store.insert_user("alice", "h2").await.unwrap_err();
    assert!(is_unique_violation(&err));
    assert_eq!(store.user_count().await.unwrap(), 1);
}

/// Holds every `hash` call until two are in flight, so two creates with the
/// same name both pass the existence check before either inserts.
struct LockstepScheme {
    inner: Argon2Scheme,
    barrier: Barrier,
}

impl PasswordScheme for LockstepScheme {
    fn hash(&self, plaintext: &str) -> anyhow::Result<String> {
        self.barrier.wait();
        self.inner.hash(plaintext)
    }

    fn verify(&self, plaintext: &str, hash: &str) -> anyhow::Result<bool> {
        self.inner.verify(plaintext, hash)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_creates_surface_concurrent_conflict() {
    let scheme = Arc::new(LockstepScheme {
        inner: Argon2Scheme::from_config(&cheap_security()).unwrap(),
        barrier: Barrier::new(2),
    });
    let (_, service) = service_with(scheme).await;

    let (a, b) = tokio::join!(
        service.user_create("alice", "pw-a"),
        service.user_create("alice", "pw-b"),
    );

    let results = [a, b];
    let created = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(CredentialError::ConcurrentNameConflict(n)) if n == "alice"))
        .count();

    assert_eq!(created, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(service.count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_renames_surface_concurrent_conflict() {
    let scheme = Arc::new(LockstepScheme {
        inner: Argon2Scheme::from_config(&cheap_security()).unwrap(),
        barrier: Barrier::new(2),
    });
    let (store, service) = service_with(scheme).await;

    // Seed through the store so the barrier only sees the two renames.
    let alice = store.insert_user("alice", "seed-hash").await.unwrap().id;
    let bob = store.insert_user("bob", "seed-hash").await.unwrap().id;

    let (a, b) = tokio::join!(
        service.change_credentials(alice, "carol", "pw-a"),
        service.change_credentials(bob, "carol", "pw-b"),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(CredentialError::ConcurrentNameConflict(n)) if n == "carol"))
            .count(),
        1
    );

    let mut names: Vec<String> = service
        .list_users()
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect();
    names.sort();
    assert!(names == ["alice", "carol"] || names == ["bob", "carol"]);
}
