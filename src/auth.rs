// Auth session tracking: one source of truth for "who is the current
// identity", plus the bounded wait the upload and history flows use before
// touching per-user storage.

use crate::models::AuthUser;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

/// Exactly one of these holds at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated(AuthUser),
    Guest,
    SignedOut,
}

/// External auth backend. Dropping the receiver returned by `watch`
/// unsubscribes from login-state changes.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    fn current_user(&self) -> Option<AuthUser>;

    fn watch(&self) -> mpsc::Receiver<Option<AuthUser>>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;

    async fn register(&self, email: &str, password: &str) -> Result<AuthUser>;

    async fn sign_out(&self) -> Result<()>;
}

/// Tracks signed-in vs. guest vs. signed-out against the external gateway.
/// Guest mode is a client-local flag; any real sign-in, register, or
/// sign-out clears it.
pub struct AuthSession {
    gateway: Arc<dyn AuthGateway>,
    guest_mode: bool,
    signing_out: bool,
}

impl AuthSession {
    pub fn new(gateway: Arc<dyn AuthGateway>) -> Self {
        Self {
            gateway,
            guest_mode: false,
            signing_out: false,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn AuthGateway> {
        &self.gateway
    }

    pub fn is_guest(&self) -> bool {
        self.guest_mode
    }

    pub fn enter_guest_mode(&mut self) {
        self.guest_mode = true;
    }

    pub fn disable_guest_mode(&mut self) {
        self.guest_mode = false;
    }

    /// Marks the next signed-out notification as user-initiated, which
    /// routes to the login view instead of the register fallback.
    pub fn begin_sign_out(&mut self) {
        self.signing_out = true;
        self.guest_mode = false;
    }

    pub fn take_signing_out(&mut self) -> bool {
        std::mem::take(&mut self.signing_out)
    }

    pub fn cancel_sign_out(&mut self) {
        self.signing_out = false;
    }

    pub fn current_identity(&self) -> Identity {
        if self.guest_mode {
            return Identity::Guest;
        }
        match self.gateway.current_user() {
            Some(user) => Identity::Authenticated(user),
            None => Identity::SignedOut,
        }
    }

    /// Resolves the current user, waiting up to `wait` for the gateway to
    /// hydrate. Guest mode short-circuits to `None` without waiting. The
    /// watch receiver is dropped on every path, so no listener leaks and
    /// nothing resolves twice.
    pub async fn await_identity(&self, wait: Duration) -> Option<AuthUser> {
        if self.guest_mode {
            return None;
        }
        if let Some(user) = self.gateway.current_user() {
            return Some(user);
        }

        let mut updates = self.gateway.watch();
        let resolved = match timeout(wait, updates.recv()).await {
            Ok(Some(user)) => user,
            Ok(None) | Err(_) => None,
        };
        drop(updates);

        if resolved.is_none() {
            debug!("identity did not resolve within {:?}", wait);
        }
        resolved
    }
}

/// In-memory gateway used by the test suite: registered users, a settable
/// current user, and broadcast of login-state changes to live watchers.
#[derive(Default)]
pub struct MemoryAuthGateway {
    users: Mutex<HashMap<String, (String, AuthUser)>>,
    current: Mutex<Option<AuthUser>>,
    watchers: Mutex<Vec<mpsc::Sender<Option<AuthUser>>>>,
}

impl MemoryAuthGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(uid: &str) -> Self {
        let gateway = Self::default();
        *gateway.current.lock() = Some(AuthUser::new(uid));
        gateway
    }

    /// Simulates the backend reporting a login-state change.
    pub fn emit(&self, user: Option<AuthUser>) {
        *self.current.lock() = user.clone();
        self.watchers
            .lock()
            .retain(|tx| tx.try_send(user.clone()).is_ok());
    }

    pub fn watcher_count(&self) -> usize {
        let mut watchers = self.watchers.lock();
        watchers.retain(|tx| !tx.is_closed());
        watchers.len()
    }
}

#[async_trait]
impl AuthGateway for MemoryAuthGateway {
    fn current_user(&self) -> Option<AuthUser> {
        self.current.lock().clone()
    }

    fn watch(&self) -> mpsc::Receiver<Option<AuthUser>> {
        let (tx, rx) = mpsc::channel(8);
        self.watchers.lock().push(tx);
        rx
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let user = {
            let users = self.users.lock();
            let (stored_password, user) = users
                .get(email)
                .ok_or_else(|| anyhow!("No account for {email}"))?;
            if stored_password != password {
                return Err(anyhow!("Invalid credentials"));
            }
            user.clone()
        };
        self.emit(Some(user.clone()));
        Ok(user)
    }

    async fn register(&self, email: &str, password: &str) -> Result<AuthUser> {
        let user = AuthUser::new(Uuid::new_v4().to_string());
        let mut users = self.users.lock();
        if users.contains_key(email) {
            return Err(anyhow!("Account already exists for {email}"));
        }
        users.insert(email.to_string(), (password.to_string(), user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        self.emit(None);
        Ok(())
    }
}
