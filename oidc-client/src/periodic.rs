//! Background validation of stored tokens.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use oidc_client_core::{EventType, OpenIdConfiguration, PublicEventsService, StorageKey, StoragePersistence};
use serde_json::Value;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::auth_state::AuthState;
use crate::refresh::{RefreshSession, RefreshSessionErased};

/// Starts periodic token validation.
pub trait TokenValidationScheduler: Send + Sync + 'static {
    fn start_token_validation_periodically(&self, interval_secs: u64, all_configs: &[OpenIdConfiguration]);
}

/// Value of `storageSilentRenewRunning` while a silent renew is in flight.
pub const SILENT_RENEW_RUNNING: &str = "running";

/// Checks stored tokens on an interval and renews the ones that went stale.
///
/// Only configurations that renew on their own (silent renew or refresh
/// tokens) are looked at. Starting while already running is a no-op; the
/// task lives until [`stop`](Self::stop) or its token is cancelled.
#[derive(Clone)]
pub struct PeriodicallyTokenCheckService {
    auth_state: Arc<dyn AuthState>,
    storage: Arc<dyn StoragePersistence>,
    events: PublicEventsService,
    refresh: Option<Arc<dyn RefreshSessionErased>>,
    running: Arc<Mutex<Option<CancellationToken>>>,
}

impl PeriodicallyTokenCheckService {
    pub fn new(
        auth_state: Arc<dyn AuthState>,
        storage: Arc<dyn StoragePersistence>,
        events: PublicEventsService,
    ) -> Self {
        Self {
            auth_state,
            storage,
            events,
            refresh: None,
            running: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_refresh(self, refresh: impl RefreshSession) -> Self {
        self.with_refresh_erased(Arc::new(refresh))
    }

    pub(crate) fn with_refresh_erased(mut self, refresh: Arc<dyn RefreshSessionErased>) -> Self {
        self.refresh = Some(refresh);
        self
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Token of the running task, if any.
    pub fn cancellation_token(&self) -> Option<CancellationToken> {
        self.lock().clone()
    }

    pub fn stop(&self) {
        if let Some(token) = self.lock().take() {
            tracing::debug!("Stopping periodic token validation");
            token.cancel();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(&self, period: Duration, all_configs: Vec<OpenIdConfiguration>, token: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.check_all(&all_configs).await,
            }
        }
        tracing::debug!("Periodic token validation stopped");
    }

    async fn check_all(&self, all_configs: &[OpenIdConfiguration]) {
        for config in all_configs {
            if !(config.silent_renew || config.use_refresh_token) {
                continue;
            }
            if !self.auth_state.is_authenticated(config) || self.silent_renew_running(config) {
                continue;
            }
            if self.auth_state.are_auth_storage_tokens_valid(config) {
                continue;
            }
            self.renew(config, all_configs).await;
        }
    }

    async fn renew(&self, config: &OpenIdConfiguration, all_configs: &[OpenIdConfiguration]) {
        let config_id = config.config_id.as_str();
        let Some(refresh) = &self.refresh else {
            tracing::debug!(config_id, "Stored tokens went stale, but no refresh session is wired");
            return;
        };
        tracing::debug!(config_id, "Stored tokens went stale, renewing");
        self.events
            .fire_event(EventType::SilentRenewStarted, Some(config_id), None);

        match refresh.force_refresh_session(config, all_configs).await {
            Ok(response) if response.is_authenticated => {
                tracing::debug!(config_id, "Tokens renewed");
            }
            Ok(response) => {
                tracing::warn!(config_id, error = ?response.error_message, "Renewal did not authenticate");
                self.events.fire_event(
                    EventType::SilentRenewFailed,
                    Some(config_id),
                    response.error_message.map(Value::String),
                );
            }
            Err(err) => {
                tracing::warn!(config_id, error = %err, "Renewal failed");
                self.events.fire_event(
                    EventType::SilentRenewFailed,
                    Some(config_id),
                    Some(Value::String(err.to_string())),
                );
            }
        }
    }

    fn silent_renew_running(&self, config: &OpenIdConfiguration) -> bool {
        self.storage
            .read_str(StorageKey::StorageSilentRenewRunning, config)
            .is_some_and(|v| v == SILENT_RENEW_RUNNING)
    }
}

impl TokenValidationScheduler for PeriodicallyTokenCheckService {
    fn start_token_validation_periodically(&self, interval_secs: u64, all_configs: &[OpenIdConfiguration]) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No tokio runtime, periodic token validation not started");
            return;
        };

        let token = {
            let mut running = self.lock();
            if running.as_ref().is_some_and(|t| !t.is_cancelled()) {
                return;
            }
            let token = CancellationToken::new();
            *running = Some(token.clone());
            token
        };

        let period = Duration::from_secs(interval_secs.max(1));
        tracing::info!(interval_secs = period.as_secs(), configs = all_configs.len(), "Starting periodic token validation");
        let service = self.clone();
        let all_configs = all_configs.to_vec();
        handle.spawn(async move { service.run(period, all_configs, token).await });
    }
}
