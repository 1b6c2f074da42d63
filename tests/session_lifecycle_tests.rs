// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle tests: login settlement, logout, startup probe.

use common::{principal, LoginOutcome, ScriptedIdentityProvider};
use std::sync::Arc;
use studysphere_client::error::AppError;
use studysphere_client::models::SessionState;
use studysphere_client::services::SessionManager;

mod common;

const IDP_URL: &str = "https://identity.example";

fn manager(provider: &Arc<ScriptedIdentityProvider>) -> Arc<SessionManager> {
    Arc::new(SessionManager::new(provider.clone(), IDP_URL))
}

#[tokio::test]
async fn test_successful_login_publishes_authenticated() {
    let provider = ScriptedIdentityProvider::new(LoginOutcome::Succeed(principal(1)));
    let sessions = manager(&provider);
    let mut rx = sessions.subscribe();

    let session = sessions.login().await.unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.principal_text(), Some(principal(1).to_text().as_str()));
    assert_eq!(rx.borrow_and_update().state(), &SessionState::Authenticated);
}

#[tokio::test]
async fn test_login_then_logout_restores_unauthenticated() {
    let provider = ScriptedIdentityProvider::new(LoginOutcome::Succeed(principal(2)));
    let sessions = manager(&provider);

    sessions.login().await.unwrap();
    let session = sessions.logout().await;

    assert_eq!(session.state(), &SessionState::Unauthenticated);
    assert!(session.principal_text().is_none());
    assert_eq!(sessions.current().state(), &SessionState::Unauthenticated);
    assert_eq!(provider.logouts(), 1);
}

#[tokio::test]
async fn test_failed_login_reports_reason_and_reverts() {
    let provider = ScriptedIdentityProvider::new(LoginOutcome::Fail("UserInterrupt".to_string()));
    let sessions = manager(&provider);

    let session = sessions.login().await.unwrap();

    assert_eq!(session.failure_reason(), Some("UserInterrupt"));
    assert_eq!(sessions.current().state(), &SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_identity_without_principal_fails_login() {
    let provider = ScriptedIdentityProvider::new(LoginOutcome::MissingPrincipal);
    let sessions = manager(&provider);

    let session = sessions.login().await.unwrap();

    assert_eq!(session.failure_reason(), Some("Invalid identity object"));
    assert!(!sessions.current().is_authenticated());
}

#[tokio::test]
async fn test_double_callback_settles_once() {
    let provider = ScriptedIdentityProvider::new(LoginOutcome::DoubleFire(principal(3)));
    let sessions = manager(&provider);

    let session = sessions.login().await.unwrap();

    assert!(session.is_authenticated());
    assert!(sessions.current().is_authenticated());
}

#[tokio::test]
async fn test_abandoned_login_fails() {
    let provider = ScriptedIdentityProvider::new(LoginOutcome::Manual);
    let sessions = manager(&provider);

    let pending = tokio::spawn({
        let sessions = sessions.clone();
        async move { sessions.login().await }
    });
    provider.wait_for_pending().await;
    provider.abandon();

    let session = pending.await.unwrap().unwrap();
    assert!(session.failure_reason().is_some());
    assert!(!sessions.current().is_authenticated());
}

#[tokio::test]
async fn test_dropped_login_reverts_to_unauthenticated() {
    let provider = ScriptedIdentityProvider::new(LoginOutcome::Manual);
    let sessions = manager(&provider);

    let pending = tokio::spawn({
        let sessions = sessions.clone();
        async move { sessions.login().await }
    });
    provider.wait_for_pending().await;
    assert_eq!(sessions.current().state(), &SessionState::Authenticating);

    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());
    assert_eq!(sessions.current().state(), &SessionState::Unauthenticated);

    // A late callback has nowhere to land
    provider.complete_success(principal(7));
    assert_eq!(sessions.current().state(), &SessionState::Unauthenticated);

    // The login lock was released with the dropped attempt
    provider.set_outcome(LoginOutcome::Succeed(principal(8)));
    let session = sessions.login().await.unwrap();
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_concurrent_login_rejected() {
    let provider = ScriptedIdentityProvider::new(LoginOutcome::Manual);
    let sessions = manager(&provider);

    let first = tokio::spawn({
        let sessions = sessions.clone();
        async move { sessions.login().await }
    });
    provider.wait_for_pending().await;
    assert_eq!(sessions.current().state(), &SessionState::Authenticating);

    let second = sessions.login().await;
    assert!(matches!(second, Err(AppError::LoginInProgress)));
    assert_eq!(provider.logins(), 1);

    provider.complete_success(principal(4));
    let session = first.await.unwrap().unwrap();
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_logout_during_login_discards_result() {
    let provider = ScriptedIdentityProvider::new(LoginOutcome::Manual);
    let sessions = manager(&provider);

    let pending = tokio::spawn({
        let sessions = sessions.clone();
        async move { sessions.login().await }
    });
    provider.wait_for_pending().await;

    sessions.logout().await;
    provider.complete_success(principal(5));

    let settled = pending.await.unwrap().unwrap();
    assert!(!settled.is_authenticated());
    assert_eq!(sessions.current().state(), &SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_logout_succeeds_when_provider_errors() {
    let provider = ScriptedIdentityProvider::new(LoginOutcome::Succeed(principal(6)));
    provider.fail_logout();
    let sessions = manager(&provider);

    sessions.login().await.unwrap();
    let session = sessions.logout().await;

    assert_eq!(session.state(), &SessionState::Unauthenticated);
    assert!(sessions.current().principal_text().is_none());
}

#[tokio::test]
async fn test_init_restores_existing_session() {
    let provider = ScriptedIdentityProvider::new(LoginOutcome::Manual);
    provider.sign_in_externally(principal(7));
    let sessions = manager(&provider);

    let session = sessions.init().await;

    assert!(session.is_authenticated());
    assert_eq!(session.principal_text(), Some(principal(7).to_text().as_str()));
}

#[tokio::test]
async fn test_init_probe_error_fails_closed() {
    let provider = ScriptedIdentityProvider::new(LoginOutcome::Manual);
    provider.sign_in_externally(principal(8));
    provider.fail_probe();
    let sessions = manager(&provider);

    let session = sessions.init().await;

    assert_eq!(session.state(), &SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_repeated_init_keeps_session_serial() {
    let provider = ScriptedIdentityProvider::new(LoginOutcome::Manual);
    provider.sign_in_externally(principal(9));
    let sessions = manager(&provider);

    let first = sessions.init().await;
    let second = sessions.init().await;

    assert_eq!(first.id(), second.id());
    assert!(Arc::ptr_eq(&first, &second));
}
