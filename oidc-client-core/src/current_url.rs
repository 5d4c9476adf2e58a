//! Access to the URL the client is currently running at.

use std::sync::{Arc, RwLock};

use url::Url;

/// Source of the current location.
///
/// In a browser this is `window.location`; in tests and native hosts it is
/// whatever the host says it is.
pub trait UrlSource: Send + Sync + 'static {
    fn current_url(&self) -> Option<String>;
}

/// A location that is set explicitly and can be updated on navigation.
#[derive(Clone, Default)]
pub struct FixedUrl {
    inner: Arc<RwLock<Option<String>>>,
}

impl FixedUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(url.into()))),
        }
    }

    /// No location known yet.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn set(&self, url: impl Into<String>) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(url.into());
        }
    }
}

impl UrlSource for FixedUrl {
    fn current_url(&self) -> Option<String> {
        self.inner.read().ok().and_then(|guard| guard.clone())
    }
}

/// Query helpers over a [`UrlSource`].
#[derive(Clone)]
pub struct CurrentUrlService {
    source: Arc<dyn UrlSource>,
}

impl CurrentUrlService {
    pub fn new(source: impl UrlSource) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn get_current_url(&self) -> Option<String> {
        self.source.current_url()
    }

    /// Value of the `state` query parameter of the current URL. An empty
    /// `state=` counts as no state.
    pub fn get_state_param_from_current_url(&self) -> Option<String> {
        self.get_current_url()
            .and_then(|url| query_param(&url, "state"))
            .filter(|state| !state.is_empty())
    }

    pub fn current_url_has_state_param(&self) -> bool {
        self.get_state_param_from_current_url().is_some()
    }
}

/// First value of query parameter `name` in `url`.
///
/// Relative URLs (`/callback?code=...`) are accepted.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = parse_lenient(url)?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Whether `url` carries an authorization response from the identity provider.
///
/// Code flow responses carry `code` (or `error`) together with `state`;
/// implicit flow responses carry tokens in the fragment.
pub fn is_callback_from_sts(url: &str) -> bool {
    let Some(parsed) = parse_lenient(url) else {
        return false;
    };
    let has = |name: &str| parsed.query_pairs().any(|(k, _)| k == name);
    if (has("code") || has("error")) && has("state") {
        return true;
    }
    parsed.fragment().is_some_and(|fragment| {
        fragment
            .split('&')
            .filter_map(|pair| pair.split('=').next())
            .any(|k| matches!(k, "id_token" | "access_token" | "token"))
    })
}

fn parse_lenient(url: &str) -> Option<Url> {
    match Url::parse(url) {
        Ok(u) => Some(u),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse("http://localhost/").ok()?;
            base.join(url).ok()
        }
        Err(_) => None,
    }
}
