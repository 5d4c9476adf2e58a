use std::future::Future;
use std::pin::Pin;

use oidc_client_core::OpenIdConfiguration;

use crate::error::RefreshError;
use crate::result::LoginResponse;

/// Forces a live token refresh against the identity provider.
///
/// Depending on the configuration this is a refresh-token grant or a silent
/// renew through an iframe; either way the outcome is a fresh
/// [`LoginResponse`].
pub trait RefreshSession: Send + Sync + 'static {
    fn force_refresh_session(
        &self,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) -> impl Future<Output = Result<LoginResponse, RefreshError>> + Send;
}

/// Object-safe wrapper for `RefreshSession`.
pub(crate) trait RefreshSessionErased: Send + Sync {
    fn force_refresh_session<'a>(
        &'a self,
        config: &'a OpenIdConfiguration,
        all_configs: &'a [OpenIdConfiguration],
    ) -> Pin<Box<dyn Future<Output = Result<LoginResponse, RefreshError>> + Send + 'a>>;
}

impl<T: RefreshSession> RefreshSessionErased for T {
    fn force_refresh_session<'a>(
        &'a self,
        config: &'a OpenIdConfiguration,
        all_configs: &'a [OpenIdConfiguration],
    ) -> Pin<Box<dyn Future<Output = Result<LoginResponse, RefreshError>> + Send + 'a>> {
        Box::pin(RefreshSession::force_refresh_session(self, config, all_configs))
    }
}
