use std::sync::Arc;

use chrono::Utc;
use oidc_client::{AuthState, AuthStateResult, AuthStateService, CheckAuthService, Slot};
use oidc_client_core::{
    CurrentUrlService, EventType, FixedUrl, InMemoryStorage, OpenIdConfiguration, PublicEventsService,
    StorageKey, StoragePersistence,
};
use oidc_client_test::{test_config, MockCallbackHandler, MockRefreshSession, TestJwt};
use serde_json::{json, Value};

fn service() -> (AuthStateService, InMemoryStorage, PublicEventsService) {
    let storage = InMemoryStorage::new();
    let events = PublicEventsService::default();
    let auth_state = AuthStateService::new(Arc::new(storage.clone()), events.clone());
    (auth_state, storage, events)
}

fn store_tokens(storage: &InMemoryStorage, config: &OpenIdConfiguration, id_token: &str) {
    storage.write(StorageKey::AuthzData, Value::from("access-token"), config);
    storage.write(StorageKey::AuthnResult, json!({"id_token": id_token}), config);
}

#[test]
fn nothing_stored_is_not_authenticated() {
    let (auth_state, _, _) = service();
    let config = test_config("configId1");

    assert!(!auth_state.is_authenticated(&config));
    assert!(!auth_state.are_auth_storage_tokens_valid(&config));
    assert_eq!(auth_state.get_access_token(&config), None);
    assert_eq!(auth_state.get_id_token(&config), None);
}

#[test]
fn fresh_tokens_are_valid() {
    let (auth_state, storage, _) = service();
    let config = test_config("configId1");
    let id_token = TestJwt::new().subject("alice").expires_in(600).build();
    store_tokens(&storage, &config, &id_token);

    assert!(auth_state.are_auth_storage_tokens_valid(&config));
    assert_eq!(auth_state.get_access_token(&config).as_deref(), Some("access-token"));
    assert_eq!(auth_state.get_id_token(&config), Some(id_token));
}

#[test]
fn expired_id_token_is_invalid_and_fires_event() {
    let (auth_state, storage, events) = service();
    let mut sub = events.register_for_events();
    let config = test_config("configId1");
    store_tokens(&storage, &config, &TestJwt::new().expired().build());

    assert!(auth_state.is_authenticated(&config));
    assert!(!auth_state.are_auth_storage_tokens_valid(&config));

    let fired = sub.drain();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].event_type, EventType::IdTokenExpired);
    assert_eq!(fired[0].config_id.as_deref(), Some("configId1"));
}

#[test]
fn renew_offset_expires_tokens_early() {
    let (auth_state, storage, _) = service();
    let config = test_config("configId1").with_renew_time_before_token_expires(120);
    store_tokens(&storage, &config, &TestJwt::new().expires_in(60).build());

    assert!(auth_state.has_id_token_expired_and_renew_check_is_enabled(&config));
}

#[test]
fn id_token_expiry_ignored_when_disabled() {
    let (auth_state, storage, _) = service();
    let mut config = test_config("configId1");
    config.trigger_refresh_when_id_token_expired = false;
    store_tokens(&storage, &config, &TestJwt::new().expired().build());
    assert!(auth_state.are_auth_storage_tokens_valid(&config));

    let mut config = test_config("configId2");
    config.disable_id_token_validation = true;
    store_tokens(&storage, &config, &TestJwt::new().expired().build());
    assert!(auth_state.are_auth_storage_tokens_valid(&config));
}

#[test]
fn expired_access_token_is_invalid_and_fires_event() {
    let (auth_state, storage, events) = service();
    let mut sub = events.register_for_events();
    let config = test_config("configId1");
    store_tokens(&storage, &config, &TestJwt::new().expires_in(600).build());
    let past = Utc::now().timestamp_millis() - 1000;
    storage.write(StorageKey::AccessTokenExpiresAt, Value::from(past), &config);

    assert!(!auth_state.are_auth_storage_tokens_valid(&config));
    let kinds: Vec<_> = sub.drain().into_iter().map(|n| n.event_type).collect();
    assert_eq!(kinds, vec![EventType::TokenExpired]);
}

#[test]
fn authorization_data_is_persisted_and_published() {
    let (auth_state, storage, _) = service();
    let all = vec![test_config("configId1")];
    let id_token = TestJwt::new().expires_in(600).build();

    auth_state.set_authorization_data(
        "access-token",
        json!({"id_token": id_token, "refresh_token": "rt", "expires_in": 300}),
        &all[0],
        &all,
    );

    assert!(auth_state.are_auth_storage_tokens_valid(&all[0]));
    assert_eq!(auth_state.get_refresh_token(&all[0]).as_deref(), Some("rt"));
    let expires_at = storage
        .read(StorageKey::AccessTokenExpiresAt, &all[0])
        .and_then(|v| v.as_i64())
        .unwrap();
    assert!(expires_at > Utc::now().timestamp_millis() + 290_000);

    let published = auth_state.authenticated().borrow().clone();
    assert!(published.is_authenticated);
    assert_eq!(published.all_configs_authenticated[0].config_id, "configId1");
}

#[test]
fn huge_expires_in_leaves_no_expiry() {
    let (auth_state, storage, _) = service();
    let all = vec![test_config("configId1")];
    storage.write(StorageKey::AccessTokenExpiresAt, Value::from(0), &all[0]);
    let id_token = TestJwt::new().expires_in(600).build();

    auth_state.set_authorization_data(
        "access-token",
        json!({"id_token": id_token, "expires_in": i64::MAX / 100}),
        &all[0],
        &all,
    );

    assert_eq!(storage.read(StorageKey::AccessTokenExpiresAt, &all[0]), None);
    assert!(auth_state.are_auth_storage_tokens_valid(&all[0]));
}

#[test]
fn multiple_configs_are_authenticated_only_together() {
    let (auth_state, storage, _) = service();
    let all = vec![test_config("a"), test_config("b")];
    store_tokens(&storage, &all[0], &TestJwt::new().expires_in(600).build());

    auth_state.set_authenticated_and_fire_event(&all);
    let published = auth_state.authenticated().borrow().clone();
    assert!(!published.is_authenticated);
    assert!(published.all_configs_authenticated[0].is_authenticated);
    assert!(!published.all_configs_authenticated[1].is_authenticated);

    store_tokens(&storage, &all[1], &TestJwt::new().expires_in(600).build());
    auth_state.set_authenticated_and_fire_event(&all);
    assert!(auth_state.authenticated().borrow().is_authenticated);
}

#[test]
fn unauthenticated_drops_tokens() {
    let (auth_state, storage, _) = service();
    let all = vec![test_config("configId1")];
    store_tokens(&storage, &all[0], &TestJwt::new().expires_in(600).build());

    auth_state.set_unauthenticated_and_fire_event(&all[0], &all);

    assert!(!auth_state.is_authenticated(&all[0]));
    assert!(!auth_state.authenticated().borrow().is_authenticated);
}

#[test]
fn auth_state_changes_are_published_as_events() {
    let (auth_state, _, events) = service();
    let mut sub = events.register_for_events();

    auth_state.update_and_publish_auth_state(
        "configId1",
        &AuthStateResult {
            is_authenticated: true,
            validation_result: "Ok".into(),
            is_renew_process: false,
        },
    );

    let fired = sub.drain();
    assert_eq!(fired[0].event_type, EventType::NewAuthenticationResult);
    assert_eq!(
        fired[0].value,
        Some(json!({"isAuthenticated": true, "validationResult": "Ok", "isRenewProcess": false}))
    );
}

#[tokio::test]
async fn default_services_report_stored_tokens() {
    let storage = InMemoryStorage::new();
    let config = test_config("configId1");
    let id_token = TestJwt::new().expires_in(600).build();
    store_tokens(&storage, &config, &id_token);
    storage.write(StorageKey::UserData, json!({"sub": "alice"}), &config);
    storage.write(StorageKey::Redirect, Value::from("/orders"), &config);

    let service = CheckAuthService::builder(storage.clone(), CurrentUrlService::new(FixedUrl::new("https://app/home")))
        .with_callback_handler(MockCallbackHandler::new())
        .with_refresh_session(MockRefreshSession::new())
        .build()
        .unwrap();

    let response = service
        .check_auth(None, std::slice::from_ref(&config), None)
        .await
        .unwrap()
        .unwrap();

    assert!(response.is_authenticated);
    assert_eq!(response.id_token, Slot::Present(id_token));
    assert_eq!(response.access_token, Slot::Present("access-token".to_string()));
    assert_eq!(response.user_data, Slot::Present(json!({"sub": "alice"})));
    assert_eq!(storage.read(StorageKey::Redirect, &config), None);
}
