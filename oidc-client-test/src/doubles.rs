use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use oidc_client::{
    is_check_session_configured, AuthState, CallbackError, CallbackHandler, CheckSession, LoginResponse,
    PopupRelay, RefreshError, RefreshSession, SavedRedirect, SilentRenew, Slot, TokenValidationScheduler,
    UserDataPublisher,
};
use oidc_client_core::{is_callback_from_sts, OpenIdConfiguration, StoragePersistence};
use serde_json::Value;

/// Shared, cloneable call log.
pub struct Calls<T>(Arc<Mutex<Vec<T>>>);

impl<T> Clone for Calls<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Default for Calls<T> {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }
}

impl<T: Clone> Calls<T> {
    pub fn record(&self, call: T) {
        self.0.lock().unwrap().push(call);
    }

    pub fn all(&self) -> Vec<T> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

fn flag(value: bool) -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(value))
}

/// [`AuthState`] with scripted answers.
///
/// Tokens are valid and absent unless told otherwise.
#[derive(Clone)]
pub struct AuthStateMock {
    valid: Arc<AtomicBool>,
    id_token: Arc<Mutex<Option<String>>>,
    access_token: Arc<Mutex<Option<String>>>,
    /// Config ids passed to `are_auth_storage_tokens_valid`.
    pub validity_checks: Calls<String>,
    /// Config ids of the set passed to each `set_authenticated_and_fire_event`.
    pub set_authenticated: Calls<Vec<String>>,
}

impl Default for AuthStateMock {
    fn default() -> Self {
        Self {
            valid: flag(true),
            id_token: Arc::default(),
            access_token: Arc::default(),
            validity_checks: Calls::default(),
            set_authenticated: Calls::default(),
        }
    }
}

impl AuthStateMock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tokens_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::SeqCst);
    }

    pub fn set_id_token(&self, token: impl Into<String>) {
        *self.id_token.lock().unwrap() = Some(token.into());
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.lock().unwrap() = Some(token.into());
    }
}

impl AuthState for AuthStateMock {
    fn is_authenticated(&self, _config: &OpenIdConfiguration) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn are_auth_storage_tokens_valid(&self, config: &OpenIdConfiguration) -> bool {
        self.validity_checks.record(config.config_id.clone());
        self.valid.load(Ordering::SeqCst)
    }

    fn set_authenticated_and_fire_event(&self, all_configs: &[OpenIdConfiguration]) {
        self.set_authenticated
            .record(all_configs.iter().map(|c| c.config_id.clone()).collect());
    }

    fn get_access_token(&self, _config: &OpenIdConfiguration) -> Option<String> {
        self.access_token.lock().unwrap().clone()
    }

    fn get_id_token(&self, _config: &OpenIdConfiguration) -> Option<String> {
        self.id_token.lock().unwrap().clone()
    }
}

/// [`CallbackHandler`] that records what it was handed.
///
/// Callback detection follows the URL unless forced with
/// [`set_is_callback`](Self::set_is_callback).
#[derive(Clone, Default)]
pub struct MockCallbackHandler {
    forced_is_callback: Arc<Mutex<Option<bool>>>,
    failure: Arc<Mutex<Option<String>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    /// `(url, config_id)` of every handled callback.
    pub handled: Calls<(String, String)>,
    /// Config ids in the order their callbacks finished.
    pub completed: Calls<String>,
}

impl MockCallbackHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_is_callback(&self, is_callback: bool) {
        *self.forced_is_callback.lock().unwrap() = Some(is_callback);
    }

    /// Make every handled callback fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(message.into());
    }

    /// Hold the callback of `config_id` for `delay` before answering.
    pub fn delay_for(&self, config_id: impl Into<String>, delay: Duration) {
        self.delays.lock().unwrap().insert(config_id.into(), delay);
    }
}

impl CallbackHandler for MockCallbackHandler {
    fn is_callback(&self, url: &str) -> bool {
        self.forced_is_callback
            .lock()
            .unwrap()
            .unwrap_or_else(|| is_callback_from_sts(url))
    }

    async fn handle_callback_and_fire_events(
        &self,
        url: &str,
        config: &OpenIdConfiguration,
        _all_configs: &[OpenIdConfiguration],
    ) -> Result<(), CallbackError> {
        self.handled.record((url.to_string(), config.config_id.clone()));
        let delay = self.delays.lock().unwrap().get(&config.config_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.record(config.config_id.clone());
        let failure = self.failure.lock().unwrap().clone();
        match failure {
            Some(message) => Err(CallbackError::new(message)),
            None => Ok(()),
        }
    }
}

/// [`RefreshSession`] answering with a scripted response.
///
/// Answers unauthenticated until told otherwise.
#[derive(Clone, Default)]
pub struct MockRefreshSession {
    outcome: Arc<Mutex<Option<Result<LoginResponse, RefreshError>>>>,
    /// Config ids of every forced refresh.
    pub refreshed: Calls<String>,
}

impl MockRefreshSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(&self, response: LoginResponse) {
        *self.outcome.lock().unwrap() = Some(Ok(response));
    }

    pub fn fail_with(&self, message: impl Into<String>) {
        *self.outcome.lock().unwrap() = Some(Err(RefreshError::new(message)));
    }
}

impl RefreshSession for MockRefreshSession {
    async fn force_refresh_session(
        &self,
        config: &OpenIdConfiguration,
        _all_configs: &[OpenIdConfiguration],
    ) -> Result<LoginResponse, RefreshError> {
        self.refreshed.record(config.config_id.clone());
        let outcome = self.outcome.lock().unwrap().clone();
        outcome.unwrap_or_else(|| {
            Ok(LoginResponse {
                is_authenticated: false,
                error_message: None,
                config_id: Some(config.config_id.clone()),
                id_token: Slot::Absent,
                access_token: Slot::Absent,
                user_data: Slot::Absent,
            })
        })
    }
}

/// [`UserDataPublisher`] over a map of config id to user data.
#[derive(Clone, Default)]
pub struct RecordingUserService {
    data: Arc<Mutex<HashMap<String, Value>>>,
    /// Config ids of every `publish_user_data_if_exists`.
    pub published: Calls<String>,
}

impl RecordingUserService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_user_data(&self, config_id: impl Into<String>, data: Value) {
        self.data.lock().unwrap().insert(config_id.into(), data);
    }
}

impl UserDataPublisher for RecordingUserService {
    fn get_user_data_from_store(&self, config: &OpenIdConfiguration) -> Option<Value> {
        self.data.lock().unwrap().get(&config.config_id).cloned()
    }

    fn publish_user_data_if_exists(&self, config: &OpenIdConfiguration, _all_configs: &[OpenIdConfiguration]) {
        self.published.record(config.config_id.clone());
    }
}

/// [`TokenValidationScheduler`] that only records.
#[derive(Clone, Default)]
pub struct RecordingScheduler {
    /// `(interval_secs, config ids)` of every start.
    pub started: Calls<(u64, Vec<String>)>,
}

impl TokenValidationScheduler for RecordingScheduler {
    fn start_token_validation_periodically(&self, interval_secs: u64, all_configs: &[OpenIdConfiguration]) {
        self.started.record((
            interval_secs,
            all_configs.iter().map(|c| c.config_id.clone()).collect(),
        ));
    }
}

/// [`CheckSession`] recording starts. Uses the stock predicate unless forced
/// with [`set_configured`](Self::set_configured).
#[derive(Clone, Default)]
pub struct MockCheckSession {
    forced_configured: Arc<Mutex<Option<bool>>>,
    pub started: Calls<String>,
}

impl MockCheckSession {
    /// Override the stock predicate.
    pub fn set_configured(&self, configured: bool) {
        *self.forced_configured.lock().unwrap() = Some(configured);
    }
}

impl CheckSession for MockCheckSession {
    fn is_check_session_configured(&self, config: &OpenIdConfiguration, storage: &dyn StoragePersistence) -> bool {
        self.forced_configured
            .lock()
            .unwrap()
            .unwrap_or_else(|| is_check_session_configured(storage, config))
    }

    fn start(&self, config: &OpenIdConfiguration) {
        self.started.record(config.config_id.clone());
    }
}

/// [`SilentRenew`] keeping the stock predicate and recording iframe creation.
#[derive(Clone, Default)]
pub struct MockSilentRenew {
    pub iframes: Calls<String>,
}

impl SilentRenew for MockSilentRenew {
    fn get_or_create_iframe(&self, config: &OpenIdConfiguration) {
        self.iframes.record(config.config_id.clone());
    }
}

#[derive(Clone, Default)]
pub struct RecordingSavedRedirect {
    pub resumed: Calls<String>,
}

impl SavedRedirect for RecordingSavedRedirect {
    fn check_saved_redirect_route_and_navigate(&self, config: &OpenIdConfiguration) {
        self.resumed.record(config.config_id.clone());
    }
}

#[derive(Clone, Default)]
pub struct RecordingPopupRelay {
    /// `(url, config_id)` of every relayed message.
    pub messages: Calls<(String, String)>,
}

impl PopupRelay for RecordingPopupRelay {
    fn send_message_to_main_window(&self, url: &str, config: &OpenIdConfiguration) {
        self.messages.record((url.to_string(), config.config_id.clone()));
    }
}
