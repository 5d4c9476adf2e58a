use oidc_client::{CheckAuthService, ExecutionContext};
use oidc_client_core::{
    CurrentUrlService, FixedUrl, InMemoryStorage, OpenIdConfiguration, PublicEventsService, StorageKey,
    StoragePersistence,
};
use serde_json::Value;

use crate::doubles::{
    AuthStateMock, MockCallbackHandler, MockCheckSession, MockRefreshSession, MockSilentRenew,
    RecordingPopupRelay, RecordingSavedRedirect, RecordingScheduler, RecordingUserService,
};

/// A [`CheckAuthService`] wired to recording doubles.
///
/// Every double is shared with the services built from this client, so
/// tests script them before a check and inspect them after.
///
/// ```ignore
/// let client = TestClient::at("https://app.example.com/callback?code=c&state=s");
/// client.store_state(&configs[1], "s");
/// let response = client.service().check_auth(None, &configs, None).await?;
/// assert_eq!(client.callback.handled.count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct TestClient {
    pub storage: InMemoryStorage,
    pub location: FixedUrl,
    pub events: PublicEventsService,
    pub auth_state: AuthStateMock,
    pub callback: MockCallbackHandler,
    pub refresh: MockRefreshSession,
    pub user: RecordingUserService,
    pub scheduler: RecordingScheduler,
    pub check_session: MockCheckSession,
    pub silent_renew: MockSilentRenew,
    pub saved_redirect: RecordingSavedRedirect,
    pub popup: RecordingPopupRelay,
}

impl TestClient {
    /// A client with no current URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose current URL is `url`.
    pub fn at(url: impl Into<String>) -> Self {
        let client = Self::default();
        client.location.set(url);
        client
    }

    /// Store `state` as the `authStateControl` of `config`.
    pub fn store_state(&self, config: &OpenIdConfiguration, state: &str) {
        self.storage
            .write(StorageKey::AuthStateControl, Value::from(state), config);
    }

    pub fn service(&self) -> CheckAuthService {
        self.build(ExecutionContext::MainWindow)
    }

    /// A service that believes it runs inside a login popup.
    pub fn popup_service(&self) -> CheckAuthService {
        self.build(ExecutionContext::Popup)
    }

    fn build(&self, context: ExecutionContext) -> CheckAuthService {
        CheckAuthService::builder(self.storage.clone(), CurrentUrlService::new(self.location.clone()))
            .with_events(self.events.clone())
            .with_execution_context(context)
            .with_callback_handler(self.callback.clone())
            .with_refresh_session(self.refresh.clone())
            .with_auth_state(self.auth_state.clone())
            .with_user_service(self.user.clone())
            .with_token_validation(self.scheduler.clone())
            .with_check_session(self.check_session.clone())
            .with_silent_renew(self.silent_renew.clone())
            .with_saved_redirect(self.saved_redirect.clone())
            .with_popup_relay(self.popup.clone())
            .build()
            .expect("TestClient wires every required collaborator")
    }
}

/// A configuration with id `config_id` against a fixed test authority.
pub fn test_config(config_id: &str) -> OpenIdConfiguration {
    OpenIdConfiguration::new(config_id, "https://idp.example.com")
        .with_client_id(format!("{config_id}-client"))
        .with_redirect_url(format!("https://app.example.com/{config_id}/callback"))
}
