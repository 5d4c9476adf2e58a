//! User profile data per configuration.

use std::sync::Arc;

use oidc_client_core::{EventType, OpenIdConfiguration, PublicEventsService, StorageKey, StoragePersistence};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

/// Reads and publishes stored user data.
pub trait UserDataPublisher: Send + Sync + 'static {
    fn get_user_data_from_store(&self, config: &OpenIdConfiguration) -> Option<Value>;

    /// Publish the stored user data of `config`, if any.
    fn publish_user_data_if_exists(&self, config: &OpenIdConfiguration, all_configs: &[OpenIdConfiguration]);
}

/// User data of one configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUserDataResult {
    pub config_id: String,
    pub user_data: Option<Value>,
}

/// User data as last published.
///
/// `user_data` is set for a single configuration; with several, every entry
/// lands in `all_user_data`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataResult {
    pub user_data: Option<Value>,
    pub all_user_data: Vec<ConfigUserDataResult>,
}

#[derive(Clone)]
pub struct UserService {
    storage: Arc<dyn StoragePersistence>,
    events: PublicEventsService,
    user_data: Arc<watch::Sender<UserDataResult>>,
}

impl UserService {
    pub fn new(storage: Arc<dyn StoragePersistence>, events: PublicEventsService) -> Self {
        let (tx, _) = watch::channel(UserDataResult::default());
        Self {
            storage,
            events,
            user_data: Arc::new(tx),
        }
    }

    pub fn user_data(&self) -> watch::Receiver<UserDataResult> {
        self.user_data.subscribe()
    }

    /// Store `value` for `config` and publish it.
    pub fn set_user_data_to_store(
        &self,
        value: Value,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) {
        self.storage.write(StorageKey::UserData, value.clone(), config);
        self.publish(Some(value), config, all_configs);
    }

    pub fn reset_user_data_in_store(&self, config: &OpenIdConfiguration, all_configs: &[OpenIdConfiguration]) {
        self.storage.remove(StorageKey::UserData, config);
        self.publish(None, config, all_configs);
    }

    fn publish(&self, value: Option<Value>, config: &OpenIdConfiguration, all_configs: &[OpenIdConfiguration]) {
        let result = if all_configs.len() <= 1 {
            UserDataResult {
                user_data: value.clone(),
                all_user_data: vec![ConfigUserDataResult {
                    config_id: config.config_id.clone(),
                    user_data: value.clone(),
                }],
            }
        } else {
            UserDataResult {
                user_data: None,
                all_user_data: all_configs
                    .iter()
                    .map(|c| ConfigUserDataResult {
                        config_id: c.config_id.clone(),
                        user_data: if c.config_id == config.config_id {
                            value.clone()
                        } else {
                            self.get_user_data_from_store(c)
                        },
                    })
                    .collect(),
            }
        };
        self.user_data.send_replace(result);

        let payload = serde_json::json!({
            "configId": config.config_id,
            "userData": value,
        });
        self.events
            .fire_event(EventType::UserDataChanged, Some(&config.config_id), Some(payload));
    }
}

impl UserDataPublisher for UserService {
    fn get_user_data_from_store(&self, config: &OpenIdConfiguration) -> Option<Value> {
        self.storage
            .read(StorageKey::UserData, config)
            .filter(|v| !v.is_null())
    }

    fn publish_user_data_if_exists(&self, config: &OpenIdConfiguration, all_configs: &[OpenIdConfiguration]) {
        if let Some(data) = self.get_user_data_from_store(config) {
            tracing::debug!(config_id = %config.config_id, "Publishing stored user data");
            self.publish(Some(data), config, all_configs);
        }
    }
}
