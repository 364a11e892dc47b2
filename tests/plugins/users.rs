use qualityguard::core::config::{PasswordConfig, QualityConfig};
use qualityguard::core::error::QualityError;
use qualityguard::core::store::Store;
use qualityguard::plugins::policy::Role;
use qualityguard::plugins::users::{authenticate, get_user, list_users, register};
use tempfile::tempdir;

fn test_store(root: &std::path::Path) -> Store {
    let config = QualityConfig {
        password: PasswordConfig {
            min_length: 8,
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            argon2_parallelism: 1,
        },
        ..Default::default()
    };
    Store::open_with_config(root, config).unwrap()
}

#[test]
fn test_register_defaults_to_agent_and_normalizes_email() {
    let tmp = tempdir().unwrap();
    let store = test_store(tmp.path());

    let user = register(&store, "  Luis@Example.com ", "password1", None).unwrap();
    assert_eq!(user.email, "luis@example.com");
    assert_eq!(user.role, Role::Agent);
    assert!(user.password_hash.starts_with("$argon2id$"));

    let stored = get_user(&store, "LUIS@example.com").unwrap().unwrap();
    assert_eq!(stored.role, Role::Agent);
}

#[test]
fn test_duplicate_email_is_conflict() {
    let tmp = tempdir().unwrap();
    let store = test_store(tmp.path());
    register(&store, "marta@example.com", "password1", Some(Role::Supervisor)).unwrap();

    let err = register(&store, "MARTA@example.com", "otherpass", Some(Role::Agent)).unwrap_err();
    assert!(matches!(err, QualityError::Conflict(_)));
    // The original registration is untouched.
    assert_eq!(
        get_user(&store, "marta@example.com").unwrap().unwrap().role,
        Role::Supervisor
    );
    assert_eq!(list_users(&store).unwrap().len(), 1);
}

#[test]
fn test_register_validates_input() {
    let tmp = tempdir().unwrap();
    let store = test_store(tmp.path());

    match register(&store, "not-an-email", "password1", None).unwrap_err() {
        QualityError::Validation { field, .. } => assert_eq!(field, "email"),
        other => panic!("unexpected: {other}"),
    }
    match register(&store, "ana@example.com", "short", None).unwrap_err() {
        QualityError::Validation { field, .. } => assert_eq!(field, "password"),
        other => panic!("unexpected: {other}"),
    }
    assert!(list_users(&store).unwrap().is_empty());
}

#[test]
fn test_login_failures_are_indistinguishable() {
    let tmp = tempdir().unwrap();
    let store = test_store(tmp.path());
    register(&store, "ana@example.com", "password1", Some(Role::QualityAnalyst)).unwrap();

    let actor = authenticate(&store, "Ana@Example.com", "password1").unwrap();
    assert_eq!(actor.email, "ana@example.com");
    assert_eq!(actor.role, Role::QualityAnalyst);

    let wrong_password = authenticate(&store, "ana@example.com", "password2").unwrap_err();
    let unknown_email = authenticate(&store, "nobody@example.com", "password1").unwrap_err();
    assert!(matches!(wrong_password, QualityError::InvalidCredentials));
    assert!(matches!(unknown_email, QualityError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[test]
fn test_list_users_never_serializes_hashes() {
    let tmp = tempdir().unwrap();
    let store = test_store(tmp.path());
    register(&store, "b@example.com", "password1", Some(Role::Supervisor)).unwrap();
    register(&store, "a@example.com", "password1", None).unwrap();

    let users = list_users(&store).unwrap();
    let emails: Vec<&str> = users.iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails, vec!["a@example.com", "b@example.com"]);

    let json = serde_json::to_string(&users).unwrap();
    assert!(!json.contains("argon2"));
}

#[test]
fn test_unknown_stored_role_is_corrupt() {
    let tmp = tempdir().unwrap();
    let store = test_store(tmp.path());
    let conn = rusqlite::Connection::open(tmp.path().join("quality.db")).unwrap();
    // Bypass the CHECK constraint the way an old, unconstrained table would.
    conn.execute_batch(
        "PRAGMA ignore_check_constraints = ON;
         INSERT INTO users(email, password_hash, role, created_at)
         VALUES('x@example.com', 'h', 'MANAGER', '0Z');",
    )
    .unwrap();
    drop(conn);

    assert!(matches!(
        get_user(&store, "x@example.com"),
        Err(QualityError::Corrupt(_))
    ));
}
