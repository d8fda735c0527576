use std::sync::{atomic::Ordering, Arc};

use futures::executor::block_on;

use super::support::{decoding_key, MemoryBackend, MemoryPreferences, ScriptedBiometrics};
use crate::{
    auth::{signup::SignUpForm, token::decode_access_token},
    device::{
        bootstrap::{login_form, logout, LOGIN_FAILED, MISSING_CREDENTIALS},
        storage::{
            BIOMETRIC_ENABLED, CURRENT_STORE, REMEMBER_ME, SAVED_CREDENTIALS, SAVED_IDENTIFIER,
            SESSION,
        },
        Bootstrapper, CredentialStore, Destination, Enrollment, Outcome,
    },
};

fn bootstrapper(
    backend: &Arc<MemoryBackend>,
    prefs: &MemoryPreferences,
    biometrics: ScriptedBiometrics,
) -> Bootstrapper<MemoryPreferences> {
    Bootstrapper::new(
        backend.clone(),
        CredentialStore::new(prefs.clone()),
        Box::new(biometrics),
    )
}

fn failed_with(outcome: Outcome) -> String {
    match outcome {
        Outcome::Failed { message } => message,
        other => panic!("expected a failure, got {:?}", other),
    }
}

#[test]
fn test_username_awaiting_approval_goes_to_waiting_page() {
    let backend = Arc::new(MemoryBackend::new());
    backend.with_user("shop1@kasirq.id", "shop1", "rahasia", false);
    let prefs = MemoryPreferences::default();
    let bootstrapper = bootstrapper(&backend, &prefs, ScriptedBiometrics::available(true));

    let outcome = block_on(bootstrapper.login("shop1", "rahasia", true));

    assert!(matches!(outcome, Outcome::WaitingApproval));
    assert_eq!(backend.calls(), vec!["sign_in_with_username shop1 true"]);
    // nothing is remembered for a login that did not go through
    assert!(prefs.is_empty());
}

#[test]
fn test_identifier_with_at_uses_email() {
    let backend = Arc::new(MemoryBackend::new());
    let user = backend.with_user("shop1@kasirq.id", "shop1", "rahasia", true);
    let store = backend.with_store(user, "Warung Maju");
    let prefs = MemoryPreferences::default();
    let bootstrapper = bootstrapper(&backend, &prefs, ScriptedBiometrics::unavailable());

    let outcome = block_on(bootstrapper.login("shop1@kasirq.id", "rahasia", false));

    assert_eq!(backend.calls(), vec!["sign_in_with_email shop1@kasirq.id false"]);
    let redirect = match outcome {
        Outcome::Redirect(redirect) => redirect,
        other => panic!("expected a redirect, got {:?}", other),
    };
    assert_eq!(redirect.destination, Destination::Dashboard(store.clone()));
    assert_eq!(redirect.enrollment, Enrollment::Unchanged);
    assert!(!redirect.tokens.session.remember_me);

    // the saved session belongs to the user
    let token = prefs.value(SESSION).unwrap();
    let claims = decode_access_token(&token, &decoding_key()).unwrap();
    assert_eq!(claims.user_id(), user);
    assert_eq!(prefs.value(CURRENT_STORE), Some(store.id.to_string()));
    assert_eq!(prefs.value(REMEMBER_ME), None);
    assert_eq!(prefs.value(SAVED_IDENTIFIER), None);
}

#[test]
fn test_login_errors_are_localized() {
    let backend = Arc::new(MemoryBackend::new());
    let user = backend.with_user("shop1@kasirq.id", "shop1", "rahasia", true);
    let prefs = MemoryPreferences::default();
    let bootstrapper = bootstrapper(&backend, &prefs, ScriptedBiometrics::unavailable());

    block_on(async {
        assert_eq!(
            failed_with(bootstrapper.login("shop1", "salah", false).await),
            "Email/Username atau password salah"
        );
        assert_eq!(
            failed_with(bootstrapper.login("shop2", "rahasia", false).await),
            "Username tidak ditemukan"
        );
        assert_eq!(
            failed_with(bootstrapper.login("  ", "rahasia", false).await),
            "Email/username dan password wajib diisi"
        );
        backend.unconfirm(user);
        assert_eq!(
            failed_with(bootstrapper.login("shop1@kasirq.id", "rahasia", false).await),
            "Email belum dikonfirmasi. Silakan cek email Anda"
        );
    });
}

#[test]
fn test_first_remembered_login_enrolls_biometrics() {
    let backend = Arc::new(MemoryBackend::new());
    let user = backend.with_user("shop1@kasirq.id", "shop1", "rahasia", true);
    backend.with_store(user, "Warung Maju");
    let prefs = MemoryPreferences::default();
    let bootstrapper = bootstrapper(&backend, &prefs, ScriptedBiometrics::available(true));

    let outcome = block_on(bootstrapper.login("shop1", "rahasia", true));

    match outcome {
        Outcome::Redirect(redirect) => {
            assert_eq!(redirect.enrollment, Enrollment::Enrolled);
            assert!(redirect.tokens.session.remember_me);
        }
        other => panic!("expected a redirect, got {:?}", other),
    }
    assert_eq!(prefs.value(BIOMETRIC_ENABLED).as_deref(), Some("true"));
    assert_eq!(prefs.value(REMEMBER_ME).as_deref(), Some("true"));
    assert_eq!(prefs.value(SAVED_IDENTIFIER).as_deref(), Some("shop1"));

    let saved = block_on(CredentialStore::new(prefs.clone()).credentials())
        .unwrap()
        .unwrap();
    assert_eq!(saved.identifier, "shop1");
    assert_eq!(saved.password, "rahasia");
}

#[test]
fn test_remembered_login_without_biometrics_keeps_identifier_only() {
    let backend = Arc::new(MemoryBackend::new());
    backend.with_user("shop1@kasirq.id", "shop1", "rahasia", true);
    let prefs = MemoryPreferences::default();
    let bootstrapper = bootstrapper(&backend, &prefs, ScriptedBiometrics::unavailable());

    match block_on(bootstrapper.login("shop1", "rahasia", true)) {
        Outcome::Redirect(redirect) => {
            assert_eq!(redirect.enrollment, Enrollment::IdentifierOnly);
            assert_eq!(redirect.destination, Destination::SelectStore);
        }
        other => panic!("expected a redirect, got {:?}", other),
    }
    assert_eq!(prefs.value(SAVED_IDENTIFIER).as_deref(), Some("shop1"));
    assert_eq!(prefs.value(SAVED_CREDENTIALS), None);
    assert_eq!(prefs.value(BIOMETRIC_ENABLED), None);
}

#[test]
fn test_enabled_biometrics_refresh_credentials() {
    let backend = Arc::new(MemoryBackend::new());
    backend.with_user("shop1@kasirq.id", "shop1", "baru123", true);
    let prefs = MemoryPreferences::default();
    let credentials = CredentialStore::new(prefs.clone());
    block_on(async {
        credentials.set_biometric_enabled(true).await.unwrap();
        credentials.save_credentials("shop1", "lama123").await.unwrap();
    });
    let bootstrapper = bootstrapper(&backend, &prefs, ScriptedBiometrics::available(true));

    match block_on(bootstrapper.login("shop1@kasirq.id", "baru123", true)) {
        Outcome::Redirect(redirect) => assert_eq!(redirect.enrollment, Enrollment::Refreshed),
        other => panic!("expected a redirect, got {:?}", other),
    }
    let saved = block_on(credentials.credentials()).unwrap().unwrap();
    assert_eq!(saved.identifier, "shop1@kasirq.id");
    assert_eq!(saved.password, "baru123");
}

#[test]
fn test_failed_enrollment_does_not_fail_login() {
    let backend = Arc::new(MemoryBackend::new());
    backend.with_user("shop1@kasirq.id", "shop1", "rahasia", true);
    let prefs = MemoryPreferences::default();
    prefs.fail_writes_to(SAVED_CREDENTIALS);
    let bootstrapper = bootstrapper(&backend, &prefs, ScriptedBiometrics::available(true));

    match block_on(bootstrapper.login("shop1", "rahasia", true)) {
        Outcome::Redirect(redirect) => assert_eq!(redirect.enrollment, Enrollment::Failed),
        other => panic!("expected a redirect, got {:?}", other),
    }
    assert!(prefs.value(SESSION).is_some());
}

#[test]
fn test_saved_store_is_kept() {
    let backend = Arc::new(MemoryBackend::new());
    let user = backend.with_user("shop1@kasirq.id", "shop1", "rahasia", true);
    backend.with_store(user, "Cabang Satu");
    let second = backend.with_store(user, "Cabang Dua");
    let prefs = MemoryPreferences::default();
    prefs.insert(CURRENT_STORE, &second.id.to_string());
    let bootstrapper = bootstrapper(&backend, &prefs, ScriptedBiometrics::unavailable());

    match block_on(bootstrapper.login("shop1", "rahasia", false)) {
        Outcome::Redirect(redirect) => {
            assert_eq!(redirect.destination, Destination::Dashboard(second))
        }
        other => panic!("expected a redirect, got {:?}", other),
    }
}

#[test]
fn test_biometric_login() {
    let backend = Arc::new(MemoryBackend::new());
    backend.with_user("shop1@kasirq.id", "shop1", "rahasia", true);
    let prefs = MemoryPreferences::default();

    // dismissed prompt
    let declined = ScriptedBiometrics::available(false);
    let prompts = declined.prompts.clone();
    let outcome = block_on(bootstrapper(&backend, &prefs, declined).biometric_login());
    assert!(matches!(outcome, Outcome::Cancelled));
    assert_eq!(prompts.load(Ordering::SeqCst), 1);
    assert!(backend.calls().is_empty());

    // nothing saved yet
    let bootstrapper = bootstrapper(&backend, &prefs, ScriptedBiometrics::available(true));
    assert_eq!(
        failed_with(block_on(bootstrapper.biometric_login())),
        MISSING_CREDENTIALS
    );

    // outdated password
    let credentials = CredentialStore::new(prefs.clone());
    block_on(credentials.save_credentials("shop1", "lama")).unwrap();
    assert_eq!(
        failed_with(block_on(bootstrapper.biometric_login())),
        LOGIN_FAILED
    );

    block_on(credentials.save_credentials("shop1", "rahasia")).unwrap();
    match block_on(bootstrapper.biometric_login()) {
        Outcome::Redirect(redirect) => assert!(redirect.tokens.session.remember_me),
        other => panic!("expected a redirect, got {:?}", other),
    }
    assert_eq!(
        backend.calls().last().map(String::as_str),
        Some("sign_in_with_username shop1 true")
    );
}

#[test]
fn test_login_form_and_logout() {
    let prefs = MemoryPreferences::default();
    let credentials = CredentialStore::new(prefs.clone());
    let biometrics = ScriptedBiometrics::available(true);
    block_on(async {
        credentials.set_saved_identifier("shop1").await.unwrap();

        // the identifier is only filled in with remember-me
        let form = login_form(&credentials, &biometrics).await.unwrap();
        assert!(form.biometric_available);
        assert!(!form.biometric_enabled);
        assert_eq!(form.identifier, None);

        credentials.set_remember_me(true).await.unwrap();
        credentials.set_biometric_enabled(true).await.unwrap();
        let form = login_form(&credentials, &biometrics).await.unwrap();
        assert!(form.biometric_enabled);
        assert_eq!(form.identifier.as_deref(), Some("shop1"));

        logout(&credentials).await.unwrap();
    });
    assert!(prefs.is_empty());
}

#[test]
fn test_sign_up_waits_for_approval() {
    let backend = Arc::new(MemoryBackend::new());
    backend.with_user("shop1@kasirq.id", "shop1", "rahasia", true);
    let prefs = MemoryPreferences::default();
    let bootstrapper = bootstrapper(&backend, &prefs, ScriptedBiometrics::unavailable());
    let form = |username: &str| SignUpForm {
        email: format!("{}@kasirq.id", username),
        username: username.to_string(),
        password: "rahasia".to_string(),
        confirm_password: "rahasia".to_string(),
        whatsapp: "081234567890".to_string(),
    };

    block_on(async {
        assert!(matches!(
            bootstrapper.sign_up(form("shop2")).await,
            Outcome::WaitingApproval
        ));
        assert_eq!(
            failed_with(bootstrapper.sign_up(form("shop1")).await),
            "Email atau username sudah terdaftar"
        );
        let mut short = form("shop3");
        short.password = "123".to_string();
        short.confirm_password = "123".to_string();
        assert_eq!(
            failed_with(bootstrapper.sign_up(short).await),
            "Password minimal 6 karakter"
        );
        // the new account can't log in yet
        assert!(matches!(
            bootstrapper.login("shop2", "rahasia", false).await,
            Outcome::WaitingApproval
        ));
    });
}
