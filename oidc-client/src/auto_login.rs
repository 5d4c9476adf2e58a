//! Resuming the route the user was on before an auto login.

use std::sync::Arc;

use oidc_client_core::{OpenIdConfiguration, StorageKey, StoragePersistence};
use serde_json::Value;

/// Moves the host application to a route.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, route: &str);
}

/// Resumes a route saved before the login redirect.
pub trait SavedRedirect: Send + Sync + 'static {
    fn check_saved_redirect_route_and_navigate(&self, config: &OpenIdConfiguration);
}

#[derive(Clone)]
pub struct AutoLoginService {
    storage: Arc<dyn StoragePersistence>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl AutoLoginService {
    pub fn new(storage: Arc<dyn StoragePersistence>) -> Self {
        Self {
            storage,
            navigator: None,
        }
    }

    pub fn with_navigator(mut self, navigator: impl Navigator) -> Self {
        self.navigator = Some(Arc::new(navigator));
        self
    }

    pub fn save_redirect_route(&self, config: &OpenIdConfiguration, route: &str) {
        self.storage
            .write(StorageKey::Redirect, Value::from(route), config);
    }

    pub fn get_stored_redirect_route(&self, config: &OpenIdConfiguration) -> Option<String> {
        self.storage.read_str(StorageKey::Redirect, config)
    }
}

impl SavedRedirect for AutoLoginService {
    fn check_saved_redirect_route_and_navigate(&self, config: &OpenIdConfiguration) {
        let Some(route) = self.get_stored_redirect_route(config) else {
            return;
        };
        self.storage.remove(StorageKey::Redirect, config);
        match &self.navigator {
            Some(navigator) => {
                tracing::debug!(config_id = %config.config_id, route = %route, "Resuming saved route");
                navigator.navigate(&route);
            }
            None => {
                tracing::debug!(config_id = %config.config_id, route = %route, "No navigator, dropping saved route");
            }
        }
    }
}
