use oidc_client::token_helper::{get_payload_from_token, has_token_expired};
use oidc_client::{AuthState, CallbackHandler};
use oidc_client_test::{test_config, AuthStateMock, Calls, MockCallbackHandler, TestClient, TestJwt};
use serde_json::json;

#[test]
fn test_jwt_carries_claims() {
    let token = TestJwt::new()
        .subject("alice")
        .claim("email", json!("alice@example.com"))
        .expires_in(300)
        .build();

    let payload = get_payload_from_token(&token).unwrap();
    assert_eq!(payload["sub"], "alice");
    assert_eq!(payload["email"], "alice@example.com");
    assert!(!has_token_expired(&token, 0));
    assert!(has_token_expired(&TestJwt::new().expired().build(), 0));
}

#[test]
fn calls_are_shared_between_clones() {
    let calls = Calls::default();
    let clone = calls.clone();
    clone.record("first".to_string());

    assert_eq!(calls.all(), vec!["first".to_string()]);
    assert_eq!(calls.count(), 1);
}

#[test]
fn auth_state_mock_defaults_to_valid_without_tokens() {
    let mock = AuthStateMock::new();
    let config = test_config("configId1");

    assert!(mock.are_auth_storage_tokens_valid(&config));
    assert_eq!(mock.get_id_token(&config), None);

    mock.set_tokens_valid(false);
    assert!(!mock.are_auth_storage_tokens_valid(&config));
    assert_eq!(mock.validity_checks.count(), 2);
}

#[test]
fn callback_detection_follows_url_until_forced() {
    let handler = MockCallbackHandler::new();
    assert!(handler.is_callback("https://app/cb?code=c&state=s"));
    assert!(!handler.is_callback("https://app/home"));

    handler.set_is_callback(true);
    assert!(handler.is_callback("https://app/home"));
}

#[tokio::test]
async fn test_client_shares_its_doubles() {
    let client = TestClient::at("https://app.example.com/home");
    let configs = vec![test_config("configId1")];

    client.service().check_auth(None, &configs, None).await.unwrap();

    assert_eq!(client.auth_state.set_authenticated.count(), 1);
    assert_eq!(client.scheduler.started.count(), 1);
}
