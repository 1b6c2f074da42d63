// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use studysphere_client::config::Config;
use studysphere_client::error::AppError;
use studysphere_client::models::Principal;
use studysphere_client::routes::create_router;
use studysphere_client::services::{
    Identity, IdentityClient, IdentityProvider, InMemoryBackend, LoginOptions,
};
use studysphere_client::{AppState, IdentityFactory};

/// A deterministic principal distinct for each `n`.
#[allow(dead_code)]
pub fn principal(n: u8) -> Principal {
    Principal::from_slice(&[n, 0xab, 0xcd, 0x01, 0x02]).expect("valid principal")
}

/// How the scripted provider settles the next login.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Succeed(Principal),
    Fail(String),
    /// Success callback fires but the identity has no principal.
    MissingPrincipal,
    /// Success callback fires, then the error callback.
    DoubleFire(Principal),
    /// Callbacks are held until the test settles them.
    Manual,
}

struct ScriptedIdentity(Option<Principal>);

impl Identity for ScriptedIdentity {
    fn principal(&self) -> Option<Principal> {
        self.0.clone()
    }
}

struct Script {
    outcome: LoginOutcome,
    identity: Option<Arc<dyn Identity>>,
    probe_fails: bool,
    logout_fails: bool,
    pending: Option<LoginOptions>,
    logins: usize,
    logouts: usize,
}

/// Identity provider whose behavior is set by the test.
#[derive(Clone)]
pub struct ScriptedIdentityProvider {
    script: Arc<Mutex<Script>>,
}

#[allow(dead_code)]
impl ScriptedIdentityProvider {
    pub fn new(outcome: LoginOutcome) -> Arc<Self> {
        Arc::new(Self {
            script: Arc::new(Mutex::new(Script {
                outcome,
                identity: None,
                probe_fails: false,
                logout_fails: false,
                pending: None,
                logins: 0,
                logouts: 0,
            })),
        })
    }

    pub fn set_outcome(&self, outcome: LoginOutcome) {
        self.script.lock().outcome = outcome;
    }

    /// Pretend the provider already holds a session for `principal`.
    pub fn sign_in_externally(&self, principal: Principal) {
        self.script.lock().identity = Some(Arc::new(ScriptedIdentity(Some(principal))));
    }

    pub fn fail_probe(&self) {
        self.script.lock().probe_fails = true;
    }

    pub fn fail_logout(&self) {
        self.script.lock().logout_fails = true;
    }

    pub fn logins(&self) -> usize {
        self.script.lock().logins
    }

    pub fn logouts(&self) -> usize {
        self.script.lock().logouts
    }

    /// Wait until a `Manual` login is parked at the provider.
    pub async fn wait_for_pending(&self) {
        for _ in 0..500 {
            if self.script.lock().pending.is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("login never reached the identity provider");
    }

    pub fn complete_success(&self, principal: Principal) {
        let options = {
            let mut script = self.script.lock();
            script.identity = Some(Arc::new(ScriptedIdentity(Some(principal))));
            script.pending.take().expect("no pending login")
        };
        (options.on_success)();
    }

    pub fn complete_error(&self, reason: &str) {
        let options = self.script.lock().pending.take().expect("no pending login");
        (options.on_error)(reason.to_string());
    }

    /// Drop the parked callbacks without calling either.
    pub fn abandon(&self) {
        self.script.lock().pending.take();
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentityProvider {
    async fn create(&self) -> Result<Arc<dyn IdentityClient>, AppError> {
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl IdentityClient for ScriptedIdentityProvider {
    async fn is_authenticated(&self) -> Result<bool, AppError> {
        let script = self.script.lock();
        if script.probe_fails {
            return Err(AppError::IdentityProvider("storage unavailable".to_string()));
        }
        Ok(script.identity.is_some())
    }

    fn identity(&self) -> Option<Arc<dyn Identity>> {
        self.script.lock().identity.clone()
    }

    fn login(&self, options: LoginOptions) {
        let outcome = {
            let mut script = self.script.lock();
            script.logins += 1;
            script.outcome.clone()
        };

        match outcome {
            LoginOutcome::Succeed(principal) => {
                self.script.lock().identity = Some(Arc::new(ScriptedIdentity(Some(principal))));
                (options.on_success)();
            }
            LoginOutcome::Fail(reason) => (options.on_error)(reason),
            LoginOutcome::MissingPrincipal => {
                self.script.lock().identity = Some(Arc::new(ScriptedIdentity(None)));
                (options.on_success)();
            }
            LoginOutcome::DoubleFire(principal) => {
                self.script.lock().identity = Some(Arc::new(ScriptedIdentity(Some(principal))));
                (options.on_success)();
                (options.on_error)("late error".to_string());
            }
            LoginOutcome::Manual => self.script.lock().pending = Some(options),
        }
    }

    async fn logout(&self) -> Result<(), AppError> {
        let mut script = self.script.lock();
        script.logouts += 1;
        script.identity = None;
        if script.logout_fails {
            return Err(AppError::IdentityProvider("logout endpoint down".to_string()));
        }
        Ok(())
    }
}

/// Test app over in-process collaborators.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub backend: InMemoryBackend,
    pub identity: Arc<ScriptedIdentityProvider>,
}

/// Create a test app whose browsing contexts all share `identity`.
#[allow(dead_code)]
pub fn create_test_app(identity: Arc<ScriptedIdentityProvider>) -> TestApp {
    create_test_app_with(identity, Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(identity: Arc<ScriptedIdentityProvider>, config: Config) -> TestApp {
    let backend = InMemoryBackend::new();
    let factory_identity = identity.clone();
    let factory: IdentityFactory =
        Arc::new(move || factory_identity.clone() as Arc<dyn IdentityProvider>);

    let state = Arc::new(AppState::new(
        config,
        Arc::new(backend.clone()),
        factory,
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        backend,
        identity,
    }
}
