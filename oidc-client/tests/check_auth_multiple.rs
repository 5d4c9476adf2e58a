use std::time::Duration;

use oidc_client::CheckAuthError;
use oidc_client_test::{test_config, TestClient};

#[tokio::test]
async fn one_result_per_config_in_input_order() {
    let client = TestClient::at("https://app.example.com/home");
    let configs: Vec<_> = ["a", "b", "c", "d"].into_iter().map(test_config).collect();

    let results = client.service().check_auth_multiple(&configs, None).await.unwrap();

    let ids: Vec<_> = results.iter().map(|r| r.config_id.as_deref().unwrap()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    assert!(results.iter().all(|r| r.is_authenticated));
    assert_eq!(client.scheduler.started.count(), 4);
}

#[tokio::test(start_paused = true)]
async fn results_keep_input_order_when_checks_finish_out_of_order() {
    let client = TestClient::at("https://app.example.com/home");
    let configs: Vec<_> = ["a", "b", "c", "d"].into_iter().map(test_config).collect();
    client.callback.set_is_callback(true);
    client.callback.delay_for("a", Duration::from_millis(300));
    client.callback.delay_for("b", Duration::from_millis(200));
    client.callback.delay_for("c", Duration::from_millis(100));

    let results = client.service().check_auth_multiple(&configs, None).await.unwrap();

    assert_eq!(client.callback.completed.all(), vec!["d", "c", "b", "a"]);
    let ids: Vec<_> = results.iter().map(|r| r.config_id.as_deref().unwrap()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    assert!(results.iter().all(|r| r.is_authenticated));
}

#[tokio::test]
async fn state_param_routes_url_only_to_the_issuing_config() {
    let url = "https://app.example.com/callback?code=c&state=state-two";
    let client = TestClient::at(url);
    let configs = vec![test_config("configId1"), test_config("configId2")];
    client.store_state(&configs[1], "state-two");

    let results = client.service().check_auth_multiple(&configs, None).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(
        client.callback.handled.all(),
        vec![(url.to_string(), "configId2".to_string())]
    );
}

#[tokio::test]
async fn other_configs_check_against_their_redirect_url() {
    let client = TestClient::at("https://app.example.com/callback?code=c&state=s1");
    let configs = vec![test_config("configId1"), test_config("configId2")];
    client.store_state(&configs[0], "s1");
    client.callback.set_is_callback(true);

    client.service().check_auth_multiple(&configs, None).await.unwrap();

    let mut handled = client.callback.handled.all();
    handled.sort();
    assert_eq!(
        handled,
        vec![
            (
                "https://app.example.com/callback?code=c&state=s1".to_string(),
                "configId1".to_string()
            ),
            (
                "https://app.example.com/configId2/callback".to_string(),
                "configId2".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn unmatched_state_fails_the_whole_batch() {
    let client = TestClient::at("https://app.example.com/callback?code=c&state=unknown");
    let configs = vec![test_config("configId1"), test_config("configId2")];
    client.store_state(&configs[0], "s1");

    let err = client.service().check_auth_multiple(&configs, None).await.unwrap_err();

    assert_eq!(err, CheckAuthError::ConfigNotFound { state: "unknown".into() });
    assert!(client.auth_state.validity_checks.is_empty());
    assert!(client.callback.handled.is_empty());
}

#[tokio::test]
async fn one_failing_callback_does_not_stop_the_others() {
    let client = TestClient::at("https://app.example.com/callback?code=c&state=s1");
    let configs = vec![test_config("configId1"), test_config("configId2")];
    client.store_state(&configs[0], "s1");
    client.callback.fail_with("ERROR");

    let results = client.service().check_auth_multiple(&configs, None).await.unwrap();

    assert_eq!(results[0].error_message.as_deref(), Some("ERROR"));
    assert!(!results[0].is_authenticated);
    assert!(results[1].is_authenticated);
    assert_eq!(results[1].config_id.as_deref(), Some("configId2"));
}

#[tokio::test]
async fn explicit_url_is_used_for_state_lookup() {
    let client = TestClient::at("https://app.example.com/home");
    let configs = vec![test_config("configId1"), test_config("configId2")];
    client.store_state(&configs[1], "s2");
    let url = "https://app.example.com/callback?code=c&state=s2";

    client.service().check_auth_multiple(&configs, Some(url)).await.unwrap();

    assert_eq!(client.callback.handled.all(), vec![(url.to_string(), "configId2".to_string())]);
}

#[tokio::test]
async fn popup_relays_once_and_returns_nothing() {
    let url = "https://app.example.com/callback?code=c&state=s2";
    let client = TestClient::at(url);
    let configs = vec![test_config("configId1"), test_config("configId2")];
    client.store_state(&configs[1], "s2");

    let results = client.popup_service().check_auth_multiple(&configs, None).await.unwrap();

    assert!(results.is_empty());
    assert_eq!(client.popup.messages.all(), vec![(url.to_string(), "configId2".to_string())]);
    assert!(client.auth_state.validity_checks.is_empty());
}

#[tokio::test]
async fn empty_set_without_state_is_empty() {
    let client = TestClient::at("https://app.example.com/home");

    let results = client.service().check_auth_multiple(&[], None).await.unwrap();

    assert!(results.is_empty());
}
