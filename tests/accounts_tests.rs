/// Account tests
///
/// Exec creation, login, password change and password reset
/// Run with: cargo test --test accounts_tests

use chrono::Utc;
use school_registry::{
    Accounts, Database, Exec, Identity, Patch, RegistryConfig, RegistryError, Role,
};
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    db: Database,
    accounts: Accounts,
}

fn fixture_with(config: impl FnOnce(RegistryConfig) -> RegistryConfig) -> Fixture {
    let dir = TempDir::new().unwrap();
    let config = config(RegistryConfig::new(dir.path().join("accounts.db")));
    let db = Database::from_config(&config).unwrap();
    db.init_schema().unwrap();
    let accounts = Accounts::new(db.clone(), &config);
    Fixture {
        _dir: dir,
        db,
        accounts,
    }
}

fn fixture() -> Fixture {
    fixture_with(|config| config)
}

fn root() -> Identity {
    Identity::new(
        0,
        "root",
        Role::Admin,
        Utc::now() + chrono::Duration::hours(1),
    )
}

fn exec(username: &str, role: &str) -> Exec {
    Exec {
        first_name: "Test".into(),
        last_name: "User".into(),
        email: format!("{username}@school.test"),
        username: username.into(),
        password: "s3cret-pass".into(),
        role: role.into(),
        ..Exec::default()
    }
}

#[test]
fn test_created_exec_stores_hash_only() {
    let fx = fixture();
    let created = fx
        .accounts
        .create_execs(&root(), vec![exec("alice", "manager")])
        .unwrap()
        .remove(0);

    let stored = fx.db.repository::<Exec>().get(created.id).unwrap();
    assert_ne!(stored.password, "s3cret-pass");
    assert!(stored.password.starts_with("$2"));
    assert!(stored.user_created_at.is_some());

    let json = serde_json::to_value(&stored).unwrap();
    assert!(json.get("password").is_none());
}

#[test]
fn test_duplicate_username_is_rejected() {
    let fx = fixture();
    fx.accounts
        .create_execs(&root(), vec![exec("alice", "admin")])
        .unwrap();
    let err = fx
        .accounts
        .create_execs(&root(), vec![exec("alice", "exec")])
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");
}

#[test]
fn test_duplicate_username_within_one_batch_stores_nothing() {
    let fx = fixture();
    let err = fx
        .accounts
        .create_execs(&root(), vec![exec("gina", "exec"), exec("gina", "manager")])
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");
    assert!(fx.db.repository::<Exec>().list(&[]).unwrap().is_empty());
}

#[test]
fn test_repository_create_enforces_unique_username() {
    let fx = fixture();
    let execs = fx.db.repository::<Exec>();
    execs.create(&root(), vec![exec("hank", "exec")]).unwrap();

    let err = execs
        .create(&root(), vec![exec("ivy", "exec"), exec("hank", "admin")])
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");

    let usernames: Vec<String> = execs
        .list(&[])
        .unwrap()
        .into_iter()
        .map(|stored| stored.username)
        .collect();
    assert_eq!(usernames, vec!["hank".to_string()]);
}

#[test]
fn test_only_admins_create_execs() {
    let fx = fixture();
    let manager = Identity::new(
        5,
        "boss",
        Role::Manager,
        Utc::now() + chrono::Duration::hours(1),
    );
    let err = fx
        .accounts
        .create_execs(&manager, vec![exec("alice", "exec")])
        .unwrap_err();
    assert!(matches!(err, RegistryError::Unauthorized(_)));
}

#[test]
fn test_login_paths() {
    let fx = fixture();
    let created = fx
        .accounts
        .create_execs(&root(), vec![exec("bob", "Manager")])
        .unwrap()
        .remove(0);

    let identity = fx.accounts.login("bob", "s3cret-pass").unwrap();
    assert_eq!(identity.user_id, created.id);
    assert_eq!(identity.role, Role::Manager);
    assert!(!identity.is_expired());

    let wrong = fx.accounts.login("bob", "not-the-pass").unwrap_err();
    let unknown = fx.accounts.login("nobody", "s3cret-pass").unwrap_err();
    assert_eq!(wrong.to_string(), unknown.to_string());
    assert_eq!(wrong.to_string(), "Unauthorized: invalid username or password");

    fx.db
        .repository::<Exec>()
        .patch(&root(), created.id, &Patch::new().set("inactiveStatus", true))
        .unwrap();
    let inactive = fx.accounts.login("bob", "s3cret-pass").unwrap_err();
    assert_eq!(inactive.to_string(), "Unauthorized: user is inactive");
}

#[test]
fn test_update_password_by_owner() {
    let fx = fixture();
    fx.accounts
        .create_execs(&root(), vec![exec("carol", "exec"), exec("dave", "exec")])
        .unwrap();
    let carol = fx.accounts.login("carol", "s3cret-pass").unwrap();
    let dave = fx.accounts.login("dave", "s3cret-pass").unwrap();

    let err = fx
        .accounts
        .update_password(&dave, carol.user_id, "s3cret-pass", "another-pass")
        .unwrap_err();
    assert_eq!(err.kind(), "unauthorized");

    let err = fx
        .accounts
        .update_password(&carol, carol.user_id, "wrong-current", "another-pass")
        .unwrap_err();
    assert_eq!(err.kind(), "unauthorized");

    let refreshed = fx
        .accounts
        .update_password(&carol, carol.user_id, "s3cret-pass", "another-pass")
        .unwrap();
    assert_eq!(refreshed.username, "carol");

    assert!(fx.accounts.login("carol", "s3cret-pass").is_err());
    assert!(fx.accounts.login("carol", "another-pass").is_ok());

    let stored = fx.db.repository::<Exec>().get(carol.user_id).unwrap();
    assert!(stored.password_changed_at.is_some());
}

#[test]
fn test_forgot_and_reset_password() {
    let fx = fixture();
    let created = fx
        .accounts
        .create_execs(&root(), vec![exec("erin", "exec")])
        .unwrap()
        .remove(0);

    let ticket = fx.accounts.forgot_password("erin@school.test").unwrap();
    assert_eq!(ticket.exec_id, created.id);
    assert_eq!(ticket.token.len(), 64);

    let stored = fx.db.repository::<Exec>().get(created.id).unwrap();
    let digest = stored.reset_code.clone().unwrap();
    assert_ne!(digest, ticket.token);
    assert!(stored.token_expires_at.is_some());

    let err = fx
        .accounts
        .reset_password(&ticket.token, "brand-new-pass", "different-pass")
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");

    fx.accounts
        .reset_password(&ticket.token, "brand-new-pass", "brand-new-pass")
        .unwrap();
    assert!(fx.accounts.login("erin", "brand-new-pass").is_ok());

    let stored = fx.db.repository::<Exec>().get(created.id).unwrap();
    assert_eq!(stored.reset_code, None);
    assert_eq!(stored.token_expires_at, None);

    let reused = fx
        .accounts
        .reset_password(&ticket.token, "third-password", "third-password")
        .unwrap_err();
    assert_eq!(reused.kind(), "unauthorized");
}

#[test]
fn test_expired_reset_token_is_rejected() {
    let fx = fixture_with(|config| config.reset_token_ttl(Duration::from_millis(5)));
    fx.accounts
        .create_execs(&root(), vec![exec("frank", "exec")])
        .unwrap();

    let ticket = fx.accounts.forgot_password("frank@school.test").unwrap();
    std::thread::sleep(Duration::from_millis(50));

    let err = fx
        .accounts
        .reset_password(&ticket.token, "brand-new-pass", "brand-new-pass")
        .unwrap_err();
    assert_eq!(err.to_string(), "Unauthorized: invalid or expired reset token");
    assert!(fx.accounts.login("frank", "s3cret-pass").is_ok());
}

#[test]
fn test_reset_token_must_be_hex() {
    let fx = fixture();
    let err = fx
        .accounts
        .reset_password("not hex at all", "brand-new-pass", "brand-new-pass")
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");

    let err = fx.accounts.forgot_password("ghost@school.test").unwrap_err();
    assert_eq!(err.kind(), "not_found");
}
