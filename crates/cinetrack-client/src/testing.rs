//! In-memory port fakes shared by the service tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use cinetrack_core::ApiError;
use cinetrack_core::domain::{
    AuthGrant, MediaType, Movie, MovieQuery, MovieUpdate, NewMovie, Page, RefreshedTokens,
    StatsQuery, TokenGrant, User, UserAttributes, ViewingStats, WatchStatus,
};
use cinetrack_core::ports::{AuthBackend, AuthError, Credentials, TokenClaims, TokenDecoder};

pub(crate) fn grant(access_token: &str, refresh_token: &str, expires_in: i64) -> AuthGrant {
    AuthGrant {
        user: User::minimal("u1", "a@b.com"),
        tokens: TokenGrant {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_in,
            expires_at: None,
            token_type: None,
        },
    }
}

pub(crate) fn refreshed(access_token: &str, expires_in: i64) -> RefreshedTokens {
    RefreshedTokens {
        access_token: access_token.to_string(),
        refresh_token: Some(format!("{access_token}-refresh")),
        expires_in,
        expires_at: None,
        token_type: None,
        user: None,
    }
}

fn unscripted(call: &str) -> ApiError {
    ApiError::unknown(format!("no scripted response for {call}"))
}

/// Scripted auth backend.
#[derive(Default)]
pub(crate) struct FakeAuthBackend {
    grants: Mutex<VecDeque<Result<AuthGrant, ApiError>>>,
    refreshes: Mutex<VecDeque<Result<RefreshedTokens, ApiError>>>,
    users: Mutex<VecDeque<Result<User, ApiError>>>,
    refresh_delay: Mutex<Duration>,
    refresh_tokens_used: Mutex<Vec<String>>,
    sign_out_calls: AtomicUsize,
    fail_sign_out: AtomicBool,
}

impl FakeAuthBackend {
    pub fn push_grant(&self, result: Result<AuthGrant, ApiError>) {
        self.grants.lock().unwrap().push_back(result);
    }

    pub fn push_refresh(&self, result: Result<RefreshedTokens, ApiError>) {
        self.refreshes.lock().unwrap().push_back(result);
    }

    pub fn push_user(&self, result: Result<User, ApiError>) {
        self.users.lock().unwrap().push_back(result);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    pub fn fail_sign_out(&self) {
        self.fail_sign_out.store(true, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_tokens_used.lock().unwrap().len()
    }

    pub fn refresh_tokens_used(&self) -> Vec<String> {
        self.refresh_tokens_used.lock().unwrap().clone()
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    fn next_grant(&self, call: &str) -> Result<AuthGrant, ApiError> {
        self.grants
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unscripted(call)))
    }

    fn next_user(&self) -> Result<User, ApiError> {
        self.users
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("user")))
    }
}

#[async_trait]
impl AuthBackend for FakeAuthBackend {
    async fn sign_up(&self, _credentials: &Credentials) -> Result<AuthGrant, ApiError> {
        self.next_grant("sign_up")
    }

    async fn sign_in(&self, _credentials: &Credentials) -> Result<AuthGrant, ApiError> {
        self.next_grant("sign_in")
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(ApiError::network("connection reset"));
        }
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError> {
        self.refresh_tokens_used
            .lock()
            .unwrap()
            .push(refresh_token.to_string());

        let delay = *self.refresh_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.refreshes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("refresh")))
    }

    async fn get_user(&self) -> Result<User, ApiError> {
        self.next_user()
    }

    async fn update_user(&self, _attributes: &UserAttributes) -> Result<User, ApiError> {
        self.next_user()
    }
}

/// Token decoder returning fixed claims, or failing when given none.
pub(crate) struct FakeDecoder(pub Option<TokenClaims>);

impl TokenDecoder for FakeDecoder {
    fn decode(&self, _access_token: &str) -> Result<TokenClaims, AuthError> {
        self.0
            .clone()
            .ok_or_else(|| AuthError::InvalidToken("not a JWT".to_string()))
    }
}

pub(crate) fn movie(id: &str, title: &str) -> Movie {
    Movie {
        id: id.to_string(),
        title: title.to_string(),
        media_type: MediaType::Movie,
        genres: Vec::new(),
        status: WatchStatus::PlanToWatch,
        rating: None,
        poster_url: None,
        release_year: None,
        watched_at: None,
        created_at: None,
        updated_at: None,
    }
}

/// Movie backend that records every call as a `verb:subject` label.
#[derive(Default)]
pub(crate) struct FakeMovieBackend {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashMap<String, ApiError>>,
    list_delay: Mutex<Duration>,
}

impl FakeMovieBackend {
    /// Make every call with this label fail until `recover` is called.
    pub fn fail(&self, label: &str, error: ApiError) {
        self.failing.lock().unwrap().insert(label.to_string(), error);
    }

    /// Answer `list` with the state seen when the call arrived, `delay` later.
    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = delay;
    }

    pub fn recover(&self, label: &str) {
        self.failing.lock().unwrap().remove(label);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, label: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == label)
            .count()
    }

    fn record(&self, label: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(label.clone());
        match self.failing.lock().unwrap().get(&label) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl cinetrack_core::ports::MovieBackend for FakeMovieBackend {
    async fn list(&self, _query: &MovieQuery) -> Result<Page<Movie>, ApiError> {
        self.record("list".to_string())?;
        // One seeded title plus everything created so far
        let total = 1 + self
            .calls()
            .iter()
            .filter(|c| c.starts_with("create:"))
            .count() as u64;
        let delay = *self.list_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(Page {
            items: vec![movie("m1", "Dune")],
            total,
            page: 1,
            per_page: 20,
        })
    }

    async fn get(&self, id: &str) -> Result<Movie, ApiError> {
        self.record(format!("get:{id}"))?;
        Ok(movie(id, "Dune"))
    }

    async fn create(&self, new: &NewMovie) -> Result<Movie, ApiError> {
        self.record(format!("create:{}", new.title))?;
        Ok(movie(&format!("m-{}", new.title), &new.title))
    }

    async fn update(&self, id: &str, changes: &MovieUpdate) -> Result<Movie, ApiError> {
        self.record(format!("update:{id}"))?;
        let mut updated = movie(id, changes.title.as_deref().unwrap_or("Dune"));
        if let Some(status) = changes.status {
            updated.status = status;
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.record(format!("delete:{id}"))
    }

    async fn stats(&self, _query: &StatsQuery) -> Result<ViewingStats, ApiError> {
        self.record("stats".to_string())?;
        Ok(ViewingStats {
            total_titles: 1,
            ..ViewingStats::default()
        })
    }
}
