//! Authentication checks for an OpenID Connect client.
//!
//! [`CheckAuthService`] decides whether the user is authenticated for one or
//! many provider configurations, consuming redirect callbacks on the way and
//! starting token renewal once tokens are known to be good. Protocol work
//! (code exchange, token validation, refresh grants) is plugged in through
//! [`CallbackHandler`] and [`RefreshSession`].

pub mod auth_state;
pub mod auto_login;
pub mod callback;
pub mod check_auth;
pub mod error;
pub mod iframe;
pub mod periodic;
pub mod popup;
pub mod refresh;
pub mod resolver;
pub mod result;
pub mod token_helper;
pub mod user;

pub use auth_state::{AuthState, AuthStateService};
pub use auto_login::{AutoLoginService, Navigator, SavedRedirect};
pub use callback::CallbackHandler;
pub use check_auth::{CheckAuthService, CheckAuthServiceBuilder};
pub use error::{CallbackError, CheckAuthError, RefreshError, NO_CONFIGURATION_MESSAGE};
pub use iframe::{is_check_session_configured, CheckSession, NoCheckSession, NoSilentRenew, SilentRenew};
pub use periodic::{PeriodicallyTokenCheckService, TokenValidationScheduler, SILENT_RENEW_RUNNING};
pub use popup::{ChannelPopupRelay, ExecutionContext, NoPopupRelay, PopupMessage, PopupRelay};
pub use refresh::RefreshSession;
pub use result::{AuthStateResult, AuthenticatedResult, ConfigAuthenticatedResult, LoginResponse, Slot};
pub use user::{ConfigUserDataResult, UserDataPublisher, UserDataResult, UserService};

pub use oidc_client_core;

pub mod prelude {
    //! Re-exports of the most commonly used types.
    pub use crate::{
        AuthState, CallbackError, CallbackHandler, CheckAuthError, CheckAuthService,
        CheckAuthServiceBuilder, ExecutionContext, LoginResponse, RefreshError, RefreshSession,
        Slot,
    };
    pub use oidc_client_core::prelude::*;
}
