//! The authentication check.
//!
//! A check resolves the configuration to run against, hands a callback URL
//! to the [`CallbackHandler`], asks the [`AuthState`] whether the stored
//! tokens are still good, and on success starts the background machinery
//! (session monitoring, periodic validation, silent renew).
//!
//! # Example
//!
//! ```ignore
//! use oidc_client::prelude::*;
//!
//! let service = CheckAuthServiceBuilder::new(InMemoryStorage::new(), CurrentUrlService::new(location))
//!     .with_callback_handler(code_flow)
//!     .with_refresh_session(refresher)
//!     .build()?;
//!
//! let configs = OidcClientConfig::load("dev")?.configurations()?;
//! if let Some(response) = service.check_auth(None, &configs, None).await? {
//!     println!("authenticated: {}", response.is_authenticated);
//! }
//! ```

use std::sync::Arc;

use futures_util::future::join_all;
use oidc_client_core::{CurrentUrlService, EventType, OpenIdConfiguration, PublicEventsService, StoragePersistence};
use serde_json::Value;

use crate::auth_state::{AuthState, AuthStateService};
use crate::auto_login::{AutoLoginService, SavedRedirect};
use crate::callback::{CallbackHandler, CallbackHandlerErased};
use crate::error::CheckAuthError;
use crate::iframe::{CheckSession, NoCheckSession, NoSilentRenew, SilentRenew};
use crate::periodic::{PeriodicallyTokenCheckService, TokenValidationScheduler};
use crate::popup::{ExecutionContext, NoPopupRelay, PopupRelay};
use crate::refresh::{RefreshSession, RefreshSessionErased};
use crate::resolver;
use crate::result::{LoginResponse, Slot};
use crate::user::{UserDataPublisher, UserService};

/// Orchestrates authentication checks over a set of configurations.
///
/// Cheap to clone; clones share every collaborator.
#[derive(Clone)]
pub struct CheckAuthService {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn StoragePersistence>,
    current_url: CurrentUrlService,
    events: PublicEventsService,
    context: ExecutionContext,
    callback: Arc<dyn CallbackHandlerErased>,
    refresh: Arc<dyn RefreshSessionErased>,
    auth_state: Arc<dyn AuthState>,
    user: Arc<dyn UserDataPublisher>,
    scheduler: Arc<dyn TokenValidationScheduler>,
    check_session: Arc<dyn CheckSession>,
    silent_renew: Arc<dyn SilentRenew>,
    saved_redirect: Arc<dyn SavedRedirect>,
    popup: Arc<dyn PopupRelay>,
}

impl CheckAuthService {
    pub fn builder(
        storage: impl StoragePersistence,
        current_url: CurrentUrlService,
    ) -> CheckAuthServiceBuilder {
        CheckAuthServiceBuilder::new(storage, current_url)
    }

    pub fn events(&self) -> &PublicEventsService {
        &self.inner.events
    }

    pub fn execution_context(&self) -> ExecutionContext {
        self.inner.context
    }

    /// Check authentication for one configuration.
    ///
    /// A `state` on the URL selects the configuration that issued it, even
    /// over `requested`. `url` stands in for the current URL when given.
    /// Returns `Ok(None)` inside a login popup, where the URL is relayed to
    /// the main window instead.
    ///
    /// # Errors
    ///
    /// [`CheckAuthError::ConfigNotFound`] when no configuration issued the
    /// URL's `state`, [`CheckAuthError::AmbiguousState`] when several did.
    pub async fn check_auth(
        &self,
        requested: Option<&OpenIdConfiguration>,
        all_configs: &[OpenIdConfiguration],
        url: Option<&str>,
    ) -> Result<Option<LoginResponse>, CheckAuthError> {
        let Some(config) = self.resolve(requested, all_configs, url)? else {
            return Ok(Some(LoginResponse::no_configuration()));
        };
        Ok(self
            .check_auth_with_config(config, all_configs, self.url_or_current(url))
            .await)
    }

    /// Like [`check_auth`](Self::check_auth), but falls back to a forced
    /// refresh against the identity provider when the local check comes out
    /// unauthenticated.
    pub async fn check_auth_including_server(
        &self,
        requested: Option<&OpenIdConfiguration>,
        all_configs: &[OpenIdConfiguration],
        url: Option<&str>,
    ) -> Result<Option<LoginResponse>, CheckAuthError> {
        let Some(config) = self.resolve(requested, all_configs, url)? else {
            return Ok(Some(LoginResponse::no_configuration()));
        };
        let Some(response) = self
            .check_auth_with_config(config, all_configs, self.url_or_current(url))
            .await
        else {
            return Ok(None);
        };
        if response.is_authenticated {
            return Ok(Some(response));
        }

        tracing::debug!(config_id = %config.config_id, "Not authenticated locally, forcing refresh");
        let refreshed = match self
            .inner
            .refresh
            .force_refresh_session(config, all_configs)
            .await
        {
            Ok(refreshed) => refreshed,
            Err(err) => {
                tracing::warn!(config_id = %config.config_id, error = %err, "Forced refresh failed");
                return Ok(Some(LoginResponse::failed(&config.config_id, err.message())));
            }
        };
        if refreshed.is_authenticated {
            self.start_check_session_and_validation(config, all_configs);
        }
        Ok(Some(refreshed))
    }

    /// Check every configuration concurrently. Results follow the order of
    /// `all_configs`.
    ///
    /// With a `state` on the URL only the configuration that issued it sees
    /// the URL; the others check against their own redirect URL.
    ///
    /// # Errors
    ///
    /// As [`check_auth`](Self::check_auth); an unmatched `state` fails the
    /// whole batch before any check runs.
    pub async fn check_auth_multiple(
        &self,
        all_configs: &[OpenIdConfiguration],
        url: Option<&str>,
    ) -> Result<Vec<LoginResponse>, CheckAuthError> {
        let caller_url = self.url_or_current(url);
        let active = match resolver::state_param(&self.inner.current_url, url) {
            Some(state) => Some(self.find_config_for_state(&state, all_configs)?),
            None => None,
        };

        if self.inner.context == ExecutionContext::Popup {
            if let Some(config) = active.or_else(|| all_configs.first()) {
                self.relay_to_main_window(config, caller_url.as_deref());
            }
            return Ok(Vec::new());
        }

        let checks = all_configs.iter().map(|config| {
            let config_url = match active {
                Some(active) if !std::ptr::eq(active, config) => config.redirect_url.clone(),
                _ => caller_url.clone(),
            };
            self.check_auth_with_config(config, all_configs, config_url)
        });
        Ok(join_all(checks).await.into_iter().flatten().collect())
    }

    fn resolve<'a>(
        &self,
        requested: Option<&'a OpenIdConfiguration>,
        all_configs: &'a [OpenIdConfiguration],
        url: Option<&str>,
    ) -> Result<Option<&'a OpenIdConfiguration>, CheckAuthError> {
        match resolver::resolve(&*self.inner.storage, &self.inner.current_url, requested, all_configs, url) {
            Ok(config) => Ok(Some(config)),
            Err(CheckAuthError::NoConfiguration) => {
                tracing::warn!("{}", CheckAuthError::NoConfiguration);
                Ok(None)
            }
            Err(err) => {
                tracing::error!(error = %err, "Could not resolve configuration");
                Err(err)
            }
        }
    }

    fn find_config_for_state<'a>(
        &self,
        state: &str,
        all_configs: &'a [OpenIdConfiguration],
    ) -> Result<&'a OpenIdConfiguration, CheckAuthError> {
        resolver::find_config_for_state(&*self.inner.storage, state, all_configs).inspect_err(|err| {
            tracing::error!(error = %err, "Could not resolve configuration");
        })
    }

    fn url_or_current(&self, url: Option<&str>) -> Option<String> {
        url.map(str::to_string)
            .or_else(|| self.inner.current_url.get_current_url())
    }

    fn relay_to_main_window(&self, config: &OpenIdConfiguration, url: Option<&str>) {
        match url {
            Some(url) => self.inner.popup.send_message_to_main_window(url, config),
            None => tracing::debug!(config_id = %config.config_id, "In popup without a URL, nothing to relay"),
        }
    }

    async fn check_auth_with_config(
        &self,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
        url: Option<String>,
    ) -> Option<LoginResponse> {
        let inner = &self.inner;
        if inner.context == ExecutionContext::Popup {
            self.relay_to_main_window(config, url.as_deref());
            return None;
        }

        let config_id = config.config_id.as_str();
        inner.events.fire_event(EventType::CheckingAuth, Some(config_id), None);

        let callback_url = url.as_deref().filter(|url| inner.callback.is_callback(url));
        tracing::debug!(config_id, is_callback = callback_url.is_some(), "Checking authentication");

        if let Some(callback_url) = callback_url {
            if let Err(err) = inner
                .callback
                .handle_callback_and_fire_events(callback_url, config, all_configs)
                .await
            {
                tracing::warn!(config_id, error = %err, "Callback handling failed");
                inner.events.fire_event(
                    EventType::CheckingAuthFinishedWithError,
                    Some(config_id),
                    Some(Value::String(err.message().to_string())),
                );
                return Some(LoginResponse::failed(config_id, err.message()));
            }
        }

        let is_authenticated = inner.auth_state.are_auth_storage_tokens_valid(config);
        if is_authenticated {
            // A handled callback has already set the auth state and user data.
            if callback_url.is_none() {
                inner.auth_state.set_authenticated_and_fire_event(all_configs);
                inner.user.publish_user_data_if_exists(config, all_configs);
            }
            self.start_check_session_and_validation(config, all_configs);
            inner.saved_redirect.check_saved_redirect_route_and_navigate(config);
        }
        tracing::debug!(config_id, is_authenticated, "Authentication check finished");
        inner
            .events
            .fire_event(EventType::CheckingAuthFinished, Some(config_id), None);

        Some(LoginResponse {
            is_authenticated,
            error_message: None,
            config_id: Some(config.config_id.clone()),
            id_token: Slot::from_store(inner.auth_state.get_id_token(config)),
            access_token: Slot::from_store(inner.auth_state.get_access_token(config)),
            user_data: Slot::from_store(inner.user.get_user_data_from_store(config)),
        })
    }

    fn start_check_session_and_validation(&self, config: &OpenIdConfiguration, all_configs: &[OpenIdConfiguration]) {
        let inner = &self.inner;
        if inner.check_session.is_check_session_configured(config, &*inner.storage) {
            inner.check_session.start(config);
        }
        inner
            .scheduler
            .start_token_validation_periodically(config.token_refresh_in_seconds, all_configs);
        if inner.silent_renew.is_silent_renew_configured(config) {
            inner.silent_renew.get_or_create_iframe(config);
        }
    }
}

/// Builder for [`CheckAuthService`].
///
/// The callback handler and the refresh session are required. Everything
/// else defaults to the stock services over the given storage.
pub struct CheckAuthServiceBuilder {
    storage: Arc<dyn StoragePersistence>,
    current_url: CurrentUrlService,
    events: PublicEventsService,
    context: ExecutionContext,
    callback: Option<Arc<dyn CallbackHandlerErased>>,
    refresh: Option<Arc<dyn RefreshSessionErased>>,
    auth_state: Option<Arc<dyn AuthState>>,
    user: Option<Arc<dyn UserDataPublisher>>,
    scheduler: Option<Arc<dyn TokenValidationScheduler>>,
    check_session: Arc<dyn CheckSession>,
    silent_renew: Arc<dyn SilentRenew>,
    saved_redirect: Option<Arc<dyn SavedRedirect>>,
    popup: Arc<dyn PopupRelay>,
}

impl CheckAuthServiceBuilder {
    pub fn new(storage: impl StoragePersistence, current_url: CurrentUrlService) -> Self {
        Self {
            storage: Arc::new(storage),
            current_url,
            events: PublicEventsService::default(),
            context: ExecutionContext::MainWindow,
            callback: None,
            refresh: None,
            auth_state: None,
            user: None,
            scheduler: None,
            check_session: Arc::new(NoCheckSession),
            silent_renew: Arc::new(NoSilentRenew),
            saved_redirect: None,
            popup: Arc::new(NoPopupRelay),
        }
    }

    /// Publish on `events` instead of a private broadcaster.
    pub fn with_events(mut self, events: PublicEventsService) -> Self {
        self.events = events;
        self
    }

    pub fn with_execution_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Set the callback handler (required).
    pub fn with_callback_handler(mut self, handler: impl CallbackHandler) -> Self {
        self.callback = Some(Arc::new(handler));
        self
    }

    /// Set the refresh session (required).
    pub fn with_refresh_session(mut self, refresh: impl RefreshSession) -> Self {
        self.refresh = Some(Arc::new(refresh));
        self
    }

    pub fn with_auth_state(mut self, auth_state: impl AuthState) -> Self {
        self.auth_state = Some(Arc::new(auth_state));
        self
    }

    pub fn with_user_service(mut self, user: impl UserDataPublisher) -> Self {
        self.user = Some(Arc::new(user));
        self
    }

    pub fn with_token_validation(mut self, scheduler: impl TokenValidationScheduler) -> Self {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    pub fn with_check_session(mut self, check_session: impl CheckSession) -> Self {
        self.check_session = Arc::new(check_session);
        self
    }

    pub fn with_silent_renew(mut self, silent_renew: impl SilentRenew) -> Self {
        self.silent_renew = Arc::new(silent_renew);
        self
    }

    pub fn with_saved_redirect(mut self, saved_redirect: impl SavedRedirect) -> Self {
        self.saved_redirect = Some(Arc::new(saved_redirect));
        self
    }

    pub fn with_popup_relay(mut self, popup: impl PopupRelay) -> Self {
        self.popup = Arc::new(popup);
        self
    }

    pub fn build(self) -> Result<CheckAuthService, CheckAuthError> {
        let callback = self
            .callback
            .ok_or(CheckAuthError::Misconfigured("callback handler"))?;
        let refresh = self
            .refresh
            .ok_or(CheckAuthError::Misconfigured("refresh session"))?;

        let storage = self.storage;
        let events = self.events;
        let auth_state = self.auth_state.unwrap_or_else(|| {
            Arc::new(AuthStateService::new(storage.clone(), events.clone()))
        });
        let user = self
            .user
            .unwrap_or_else(|| Arc::new(UserService::new(storage.clone(), events.clone())));
        let scheduler = self.scheduler.unwrap_or_else(|| {
            Arc::new(
                PeriodicallyTokenCheckService::new(auth_state.clone(), storage.clone(), events.clone())
                    .with_refresh_erased(refresh.clone()),
            )
        });
        let saved_redirect = self
            .saved_redirect
            .unwrap_or_else(|| Arc::new(AutoLoginService::new(storage.clone())));

        Ok(CheckAuthService {
            inner: Arc::new(Inner {
                storage,
                current_url: self.current_url,
                events,
                context: self.context,
                callback,
                refresh,
                auth_state,
                user,
                scheduler,
                check_session: self.check_session,
                silent_renew: self.silent_renew,
                saved_redirect,
                popup: self.popup,
            }),
        })
    }
}
