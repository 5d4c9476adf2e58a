use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Unsigned JWTs for tests.
///
/// The client never verifies signatures, so the signature segment is a
/// placeholder.
///
/// ```ignore
/// let id_token = TestJwt::new().subject("alice").expires_in(300).build();
/// let stale = TestJwt::new().expired().build();
/// ```
#[derive(Clone, Debug, Default)]
pub struct TestJwt {
    claims: Map<String, Value>,
}

impl TestJwt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(self, sub: impl Into<String>) -> Self {
        self.claim("sub", Value::String(sub.into()))
    }

    /// `exp` at `secs` seconds from now.
    pub fn expires_in(self, secs: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(secs)).timestamp();
        self.claim("exp", json!(exp))
    }

    /// `exp` one hour in the past.
    pub fn expired(self) -> Self {
        self.expires_in(-3600)
    }

    pub fn claim(mut self, name: impl Into<String>, value: Value) -> Self {
        self.claims.insert(name.into(), value);
        self
    }

    pub fn build(&self) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(Value::Object(self.claims.clone()).to_string());
        format!("{header}.{payload}.test-signature")
    }
}
