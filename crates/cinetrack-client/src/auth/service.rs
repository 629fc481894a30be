//! Session lifecycle: sign-in, token refresh, sign-out and listener fan-out.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::{Mutex as AsyncMutex, RwLock};

use cinetrack_core::ErrorKind;
use cinetrack_core::domain::{
    AuthEvent, AuthGrant, AuthState, Session, TokenGrant, User, UserAttributes,
};
use cinetrack_core::ports::{
    AuthBackend, AuthError, BearerToken, Clock, Credentials, TokenClaims, TokenDecoder,
};
use cinetrack_infra::SessionStore;

use super::listeners::{ListenerRegistry, Subscription};
use crate::background::BackgroundTask;

/// Lifetime assumed for federated tokens that carry no expiry at all.
const FEDERATED_FALLBACK_EXPIRY_SECS: i64 = 3600;

/// Refresh timer configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// How often the timer checks the session.
    pub refresh_interval: Duration,
    /// Sessions with less remaining lifetime than this are refreshed early.
    pub refresh_threshold: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5 * 60),
            refresh_threshold: Duration::from_secs(10 * 60),
        }
    }
}

/// Tokens delivered by a federated-login redirect.
#[derive(Debug, Clone)]
pub struct FederatedTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime in seconds, when the provider reported one.
    pub expires_in: Option<i64>,
}

type RefreshFuture = Shared<BoxFuture<'static, Result<Session, AuthError>>>;

struct AuthInner {
    backend: Arc<dyn AuthBackend>,
    decoder: Arc<dyn TokenDecoder>,
    store: SessionStore,
    token: BearerToken,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
    session: RwLock<Option<Session>>,
    listeners: ListenerRegistry,
    /// The refresh currently in flight, shared by every caller that needs it.
    refreshing: AsyncMutex<Option<RefreshFuture>>,
    timer: Mutex<Option<BackgroundTask>>,
}

/// Owns the session, the bearer token and the refresh timer.
///
/// Cloning is cheap and every clone drives the same session.
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<AuthInner>,
}

impl AuthService {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        decoder: Arc<dyn TokenDecoder>,
        store: SessionStore,
        token: BearerToken,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                backend,
                decoder,
                store,
                token,
                clock,
                config,
                session: RwLock::new(None),
                listeners: ListenerRegistry::new(),
                refreshing: AsyncMutex::new(None),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Restore the persisted session, if any, and return the current state.
    ///
    /// An expired restored session goes through the normal refresh path.
    pub async fn init(&self) -> AuthState {
        match self.inner.store.load().await {
            Ok(Some(session)) => {
                tracing::info!(
                    user_id = %session.user.id,
                    expires_at = session.expires_at,
                    "Restored persisted session"
                );
                {
                    let mut slot = self.inner.session.write().await;
                    self.inner.token.set(Some(session.access_token.clone()));
                    *slot = Some(session);
                }
                self.start_refresh_timer();
                self.get_session().await
            }
            Ok(None) => AuthState::signed_out(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read persisted session");
                AuthState::signed_out()
            }
        }
    }

    /// Stop the refresh timer and drop every listener.
    pub fn dispose(&self) {
        self.stop_refresh_timer();
        self.inner.listeners.clear();
        tracing::debug!("Auth service disposed");
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthState, AuthError> {
        let grant = self
            .inner
            .backend
            .sign_up(&Credentials::new(email, password))
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Sign-up rejected"))?;

        Ok(self.establish(grant, AuthEvent::SignedUp).await)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthState, AuthError> {
        let grant = self
            .inner
            .backend
            .sign_in(&Credentials::new(email, password))
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Sign-in rejected"))?;

        Ok(self.establish(grant, AuthEvent::SignedIn).await)
    }

    /// Complete a federated login from the tokens in the redirect.
    ///
    /// Never fails: when the token cannot be decoded the profile is fetched,
    /// and when that fails too a minimal user is built from what is known.
    pub async fn sign_in_with_tokens(&self, tokens: FederatedTokens) -> AuthState {
        let claims = match self.inner.decoder.decode(&tokens.access_token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::warn!(error = %e, "Could not decode federated access token");
                None
            }
        };

        let user = match claims.as_ref().filter(|c| c.sub.is_some()) {
            Some(claims) => claims.to_user(),
            None => {
                // The profile endpoint authenticates with the new token
                self.inner.token.set(Some(tokens.access_token.clone()));
                match self.inner.backend.get_user().await {
                    Ok(user) => user,
                    Err(e) => {
                        tracing::warn!(error = %e, "Profile fetch failed, using minimal user");
                        claims.as_ref().map(TokenClaims::to_user).unwrap_or_default()
                    }
                }
            }
        };

        let now = self.inner.clock.now().timestamp();
        let (expires_in, expires_at) = match (tokens.expires_in, claims.and_then(|c| c.exp)) {
            (Some(expires_in), _) => (expires_in, None),
            (None, Some(exp)) => (exp - now, Some(exp)),
            (None, None) => (FEDERATED_FALLBACK_EXPIRY_SECS, None),
        };

        let grant = AuthGrant {
            user,
            tokens: TokenGrant {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                expires_in,
                expires_at,
                token_type: None,
            },
        };
        self.establish(grant, AuthEvent::SignedIn).await
    }

    /// End the session. Never fails and is safe to call repeatedly.
    ///
    /// The server call is best effort; local state is cleared regardless.
    pub async fn sign_out(&self) {
        if self.inner.token.get().is_some() {
            if let Err(e) = self.inner.backend.sign_out().await {
                tracing::warn!(error = %e, "Server sign-out failed, clearing local session anyway");
            }
        }

        self.clear_local().await;
        tracing::info!("Signed out");
        self.inner.listeners.notify(AuthEvent::SignedOut, None);
    }

    /// Current auth state, refreshing an expired session first.
    ///
    /// A failed refresh signs the user out.
    pub async fn get_session(&self) -> AuthState {
        let Some(session) = self.current_session().await else {
            return AuthState::signed_out();
        };

        if !session.is_expired(self.inner.clock.now()) {
            return AuthState::from(session);
        }

        tracing::debug!(expires_at = session.expires_at, "Session expired, refreshing");
        match self.refresh_session(&session.access_token).await {
            Ok(renewed) => AuthState::from(renewed),
            // Replaced or cleared while we waited; report whatever is current
            Err(AuthError::NoSession) => self.current_state().await,
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed, signing out");
                self.sign_out().await;
                AuthState::signed_out()
            }
        }
    }

    /// Re-validate when the host application becomes visible again.
    pub async fn handle_visibility_change(&self, visible: bool) {
        if !visible || self.inner.session.read().await.is_none() {
            return;
        }
        tracing::debug!("Host visible, re-validating session");
        self.get_session().await;
    }

    pub fn on_auth_state_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(AuthEvent, Option<&User>) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(callback)
    }

    /// Re-fetch the profile and replace the session's user.
    pub async fn refresh_user(&self) -> Result<User, AuthError> {
        self.require_session().await?;
        let user = self.inner.backend.get_user().await?;
        self.replace_user(user).await
    }

    /// Apply profile changes and replace the session's user.
    pub async fn update_user(&self, attributes: &UserAttributes) -> Result<User, AuthError> {
        self.require_session().await?;
        let user = self.inner.backend.update_user(attributes).await?;
        self.replace_user(user).await
    }

    /// The held session, without refreshing it.
    pub async fn current_session(&self) -> Option<Session> {
        self.inner.session.read().await.clone()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.user.clone())
    }

    async fn current_state(&self) -> AuthState {
        self.current_session()
            .await
            .map(AuthState::from)
            .unwrap_or_default()
    }

    async fn require_session(&self) -> Result<(), AuthError> {
        match self.inner.session.read().await.as_ref() {
            Some(_) => Ok(()),
            None => Err(AuthError::NoSession),
        }
    }

    async fn establish(&self, grant: AuthGrant, event: AuthEvent) -> AuthState {
        let session = Session::from_grant(grant, self.inner.clock.now());
        {
            let mut slot = self.inner.session.write().await;
            self.inner.token.set(Some(session.access_token.clone()));
            self.persist(&session).await;
            *slot = Some(session.clone());
        }
        self.start_refresh_timer();

        tracing::info!(
            user_id = %session.user.id,
            event = ?event,
            expires_at = session.expires_at,
            "Session established"
        );
        self.inner.listeners.notify(event, Some(&session.user));
        AuthState::from(session)
    }

    async fn clear_local(&self) {
        self.stop_refresh_timer();

        let mut slot = self.inner.session.write().await;
        *slot = None;
        self.inner.token.set(None);
        if let Err(e) = self.inner.store.clear().await {
            tracing::warn!(error = %e, "Failed to clear persisted session");
        }
    }

    /// Persistence failures keep the in-memory session usable.
    async fn persist(&self, session: &Session) {
        if let Err(e) = self.inner.store.save(session).await {
            tracing::warn!(error = %e, "Failed to persist session");
        }
    }

    async fn replace_user(&self, user: User) -> Result<User, AuthError> {
        {
            let mut slot = self.inner.session.write().await;
            let session = slot.as_mut().ok_or(AuthError::NoSession)?;
            session.user = user.clone();
            let snapshot = session.clone();
            self.persist(&snapshot).await;
        }

        tracing::info!(user_id = %user.id, "User profile updated");
        self.inner.listeners.notify(AuthEvent::UserUpdated, Some(&user));
        Ok(user)
    }

    /// Refresh the session whose access token is `replacing`.
    ///
    /// Callers arriving while a refresh is in flight await that same refresh.
    async fn refresh_session(&self, replacing: &str) -> Result<Session, AuthError> {
        let refresh = {
            let mut slot = self.inner.refreshing.lock().await;
            match slot.as_ref() {
                Some(in_flight) => in_flight.clone(),
                None => {
                    // A refresh may have landed between the caller's read and now
                    if let Some(current) = self.inner.session.read().await.as_ref() {
                        if current.access_token != replacing
                            && !current.is_expired(self.inner.clock.now())
                        {
                            return Ok(current.clone());
                        }
                    }

                    let inner = Arc::downgrade(&self.inner);
                    let refresh = async move {
                        let inner = inner.upgrade().ok_or(AuthError::NoSession)?;
                        AuthService { inner }.perform_refresh().await
                    }
                    .boxed()
                    .shared();
                    *slot = Some(refresh.clone());
                    refresh
                }
            }
        };

        let result = refresh.clone().await;

        let mut slot = self.inner.refreshing.lock().await;
        if slot.as_ref().is_some_and(|f| f.ptr_eq(&refresh)) {
            *slot = None;
        }
        result
    }

    async fn perform_refresh(&self) -> Result<Session, AuthError> {
        let current = self.current_session().await.ok_or(AuthError::NoSession)?;
        if current.refresh_token.is_empty() {
            return Err(AuthError::MissingRefreshToken);
        }

        let refreshed = self.inner.backend.refresh(&current.refresh_token).await?;
        let now = self.inner.clock.now();
        let session = current.renewed(refreshed, now);
        if session.is_expired(now) {
            tracing::warn!(
                expires_at = session.expires_at,
                "Refresh returned an already expired session"
            );
            return Err(AuthError::InvalidToken(
                "refreshed session already expired".to_string(),
            ));
        }

        {
            let mut slot = self.inner.session.write().await;
            // Signed out or replaced while the request was in flight
            let unchanged = slot
                .as_ref()
                .is_some_and(|s| s.refresh_token == current.refresh_token);
            if !unchanged {
                return Err(AuthError::NoSession);
            }
            self.inner.token.set(Some(session.access_token.clone()));
            self.persist(&session).await;
            *slot = Some(session.clone());
        }

        tracing::info!(
            user_id = %session.user.id,
            expires_at = session.expires_at,
            "Session refreshed"
        );
        self.inner
            .listeners
            .notify(AuthEvent::TokenRefreshed, Some(&session.user));
        Ok(session)
    }

    /// Timer body: refresh sessions that are still valid but close to expiry.
    async fn refresh_if_expiring(&self) {
        let Some(session) = self.current_session().await else {
            return;
        };

        let remaining = session.remaining_secs(self.inner.clock.now());
        let threshold = self.inner.config.refresh_threshold.as_secs() as i64;
        if remaining <= 0 || remaining >= threshold {
            return;
        }

        tracing::debug!(remaining_secs = remaining, "Session close to expiry, refreshing");
        match self.refresh_session(&session.access_token).await {
            Ok(_) | Err(AuthError::NoSession) => {}
            Err(AuthError::Api(e)) if e.is_connectivity() || e.kind == ErrorKind::Server => {
                tracing::warn!(error = %e, "Proactive refresh failed, retrying on next tick");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Refresh rejected, signing out");
                self.sign_out().await;
            }
        }
    }

    fn timer(&self) -> MutexGuard<'_, Option<BackgroundTask>> {
        self.inner
            .timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start_refresh_timer(&self) {
        let inner = Arc::downgrade(&self.inner);
        let task = BackgroundTask::every(
            "auth-refresh",
            self.inner.config.refresh_interval,
            move || {
                let inner = inner.clone();
                async move {
                    let Some(inner) = inner.upgrade() else {
                        return ControlFlow::Break(());
                    };
                    AuthService { inner }.refresh_if_expiring().await;
                    ControlFlow::Continue(())
                }
            },
        );
        // Replacing the handle stops the previous timer
        *self.timer() = Some(task);
    }

    fn stop_refresh_timer(&self) {
        if let Some(task) = self.timer().take() {
            task.cancel();
        }
    }

    #[cfg(test)]
    pub(crate) fn has_refresh_timer(&self) -> bool {
        self.timer().is_some()
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}
