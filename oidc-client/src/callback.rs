use std::future::Future;
use std::pin::Pin;

use oidc_client_core::{is_callback_from_sts, OpenIdConfiguration};

use crate::error::CallbackError;

/// Processes the return leg of a redirect-based flow.
///
/// Implementations exchange the authorization code, validate the tokens,
/// persist them, and fire the resulting events. Token validation itself is
/// out of scope for this crate.
pub trait CallbackHandler: Send + Sync + 'static {
    /// Whether `url` is a callback from the identity provider.
    fn is_callback(&self, url: &str) -> bool {
        is_callback_from_sts(url)
    }

    /// Handle the callback on `url` for `config`.
    fn handle_callback_and_fire_events(
        &self,
        url: &str,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) -> impl Future<Output = Result<(), CallbackError>> + Send;
}

/// Object-safe wrapper for `CallbackHandler`.
pub(crate) trait CallbackHandlerErased: Send + Sync {
    fn is_callback(&self, url: &str) -> bool;

    fn handle_callback_and_fire_events<'a>(
        &'a self,
        url: &'a str,
        config: &'a OpenIdConfiguration,
        all_configs: &'a [OpenIdConfiguration],
    ) -> Pin<Box<dyn Future<Output = Result<(), CallbackError>> + Send + 'a>>;
}

impl<T: CallbackHandler> CallbackHandlerErased for T {
    fn is_callback(&self, url: &str) -> bool {
        CallbackHandler::is_callback(self, url)
    }

    fn handle_callback_and_fire_events<'a>(
        &'a self,
        url: &'a str,
        config: &'a OpenIdConfiguration,
        all_configs: &'a [OpenIdConfiguration],
    ) -> Pin<Box<dyn Future<Output = Result<(), CallbackError>> + Send + 'a>> {
        Box::pin(CallbackHandler::handle_callback_and_fire_events(
            self,
            url,
            config,
            all_configs,
        ))
    }
}
