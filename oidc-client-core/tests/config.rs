use oidc_client_core::config::{
    ConfigError, ConfigValue, EnvResolver, OidcClientConfig, OpenIdConfiguration,
};
use serial_test::serial;

const TWO_CONFIGS: &str = r#"
oidc:
  configs:
    - config-id: configId1
      authority: https://idp.example.com/realms/one
      client-id: spa-one
      redirect-url: https://app.example.com/one
      silent-renew: true
      silent-renew-url: https://app.example.com/silent-renew.html
      token-refresh-in-seconds: 7
    - authority: https://idp.example.com/realms/two
      client-id: spa-two
      use-refresh-token: true
      scope: openid offline_access
"#;

#[test]
fn test_empty_config() {
    let config = OidcClientConfig::empty();
    assert!(config.get::<String>("oidc.configs.0.authority").is_err());
    assert!(config.configurations().unwrap().is_empty());
}

#[test]
fn test_set_and_get() {
    let mut config = OidcClientConfig::empty();
    config.set("oidc.configs.0.authority", ConfigValue::String("a".into()));
    assert_eq!(config.get::<String>("oidc.configs.0.authority").unwrap(), "a");
    assert!(config.contains_key("oidc.configs.0.authority"));
}

#[test]
fn test_get_opt_reports_type_mismatch() {
    let mut config = OidcClientConfig::empty();
    config.set("k", ConfigValue::String("not-a-number".into()));
    let err = config.get_opt::<u64>("k").unwrap_err();
    assert!(matches!(err, ConfigError::TypeMismatch { .. }));
    assert!(config.get_opt::<u64>("missing").unwrap().is_none());
}

#[test]
fn test_configurations_from_yaml() {
    let config = OidcClientConfig::from_yaml_str(TWO_CONFIGS, "test").unwrap();
    let configs = config.configurations().unwrap();

    assert_eq!(configs.len(), 2);
    assert_eq!(configs[0].config_id, "configId1");
    assert_eq!(configs[0].authority, "https://idp.example.com/realms/one");
    assert_eq!(configs[0].redirect_url.as_deref(), Some("https://app.example.com/one"));
    assert!(configs[0].silent_renew);
    assert_eq!(configs[0].token_refresh_in_seconds, 7);
    assert!(configs[0].trigger_refresh_when_id_token_expired);

    // Missing config id falls back to "{index}-{client-id}".
    assert_eq!(configs[1].config_id, "1-spa-two");
    assert!(configs[1].use_refresh_token);
    assert_eq!(configs[1].scope, "openid offline_access");
    assert_eq!(configs[1].token_refresh_in_seconds, 4);
}

#[test]
fn test_missing_authority_is_rejected() {
    let yaml = r#"
oidc:
  configs:
    - client-id: spa
"#;
    let config = OidcClientConfig::from_yaml_str(yaml, "test").unwrap();
    match config.configurations() {
        Err(ConfigError::Validation(details)) => {
            assert_eq!(details.len(), 1);
            assert_eq!(details[0].key, "oidc.configs.0.authority");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_duplicate_config_ids_are_rejected() {
    let yaml = r#"
oidc:
  configs:
    - config-id: same
      authority: a
      client-id: one
    - config-id: same
      authority: b
      client-id: two
"#;
    let config = OidcClientConfig::from_yaml_str(yaml, "test").unwrap();
    let err = config.configurations().unwrap_err();
    assert!(err.to_string().contains("duplicate config id 'same'"));
}

#[test]
fn test_builder_defaults() {
    let c = OpenIdConfiguration::new("configId1", "some-authority");
    assert_eq!(c.token_refresh_in_seconds, 4);
    assert_eq!(c.renew_time_before_token_expires_in_seconds, 0);
    assert!(!c.silent_renew);
    assert!(!c.disable_id_token_validation);

    let c = c.with_silent_renew("https://app/silent").with_token_refresh_in_seconds(7);
    assert!(c.silent_renew);
    assert_eq!(c.silent_renew_url.as_deref(), Some("https://app/silent"));
    assert_eq!(c.token_refresh_in_seconds, 7);
}

#[test]
#[serial]
fn test_load_from_dir_with_profile_and_env() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("oidc.yaml"), TWO_CONFIGS).unwrap();
    std::fs::write(
        dir.path().join("oidc-prod.yaml"),
        "oidc:\n  configs:\n    - authority: https://login.example.com\n",
    )
    .unwrap();

    std::env::remove_var("OIDC_PROFILE");
    std::env::set_var("OIDC_CONFIGS_1_CLIENT_ID", "from-env");

    let config = OidcClientConfig::load_from_dir(dir.path(), "prod", &EnvResolver).unwrap();
    std::env::remove_var("OIDC_CONFIGS_1_CLIENT_ID");

    assert_eq!(config.profile(), "prod");
    let configs = config.configurations().unwrap();
    assert_eq!(configs[0].authority, "https://login.example.com");
    assert_eq!(configs[1].client_id.as_deref(), Some("from-env"));
}

#[test]
#[serial]
fn test_placeholders_resolved_on_load() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("oidc.yaml"),
        "oidc:\n  configs:\n    - authority: https://${OIDC_TEST_IDP_HOST}/realms/x\n      client-id: spa\n",
    )
    .unwrap();
    std::env::set_var("OIDC_TEST_IDP_HOST", "idp.internal");

    let config = OidcClientConfig::load_from_dir(dir.path(), "dev", &EnvResolver).unwrap();
    std::env::remove_var("OIDC_TEST_IDP_HOST");

    let configs = config.configurations().unwrap();
    assert_eq!(configs[0].authority, "https://idp.internal/realms/x");
}

#[test]
fn test_invalid_yaml_is_load_error() {
    let err = OidcClientConfig::from_yaml_str("oidc: [unclosed", "test").unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}
