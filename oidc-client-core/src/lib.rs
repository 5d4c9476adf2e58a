//! Core building blocks of the OIDC client: configuration, per-configuration
//! storage, current-URL access, and the public event broadcaster.

pub mod config;
pub mod current_url;
pub mod events;
pub mod logging;
pub mod storage;

pub use config::{
    validate_configurations, ConfigError, ConfigValidationDetail, ConfigValue, EnvResolver,
    FromConfigValue, OidcClientConfig, OpenIdConfiguration, PlaceholderResolver,
};
pub use current_url::{is_callback_from_sts, query_param, CurrentUrlService, FixedUrl, UrlSource};
pub use events::{EventSubscription, EventType, OidcClientNotification, PublicEventsService};
pub use logging::init_tracing;
pub use storage::{InMemoryStorage, StorageKey, StoragePersistence};

pub mod prelude {
    //! Re-exports of the most commonly used core types.
    pub use crate::{
        CurrentUrlService, EventType, InMemoryStorage, OidcClientConfig, OpenIdConfiguration,
        PublicEventsService, StorageKey, StoragePersistence,
    };
}
