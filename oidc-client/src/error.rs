/// Message of the negative result returned when no configuration was given.
pub const NO_CONFIGURATION_MESSAGE: &str =
    "Please provide at least one configuration before setting up the module";

/// Errors of the authentication check.
///
/// Callback and refresh failures never show up here; they are recovered into a
/// negative [`LoginResponse`](crate::LoginResponse).
#[derive(Debug, Clone, PartialEq)]
pub enum CheckAuthError {
    /// The configuration set is empty.
    NoConfiguration,

    /// The URL carries a `state` no stored configuration issued.
    ConfigNotFound { state: String },

    /// More than one configuration claims the URL's `state`.
    AmbiguousState { state: String, config_ids: Vec<String> },

    /// A required collaborator was not supplied to the builder.
    Misconfigured(&'static str),
}

impl std::fmt::Display for CheckAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckAuthError::NoConfiguration => f.write_str(NO_CONFIGURATION_MESSAGE),
            CheckAuthError::ConfigNotFound { state } => {
                write!(f, "could not find matching config for state {state}")
            }
            CheckAuthError::AmbiguousState { state, config_ids } => write!(
                f,
                "state {state} matches more than one config: {}",
                config_ids.join(", ")
            ),
            CheckAuthError::Misconfigured(what) => {
                write!(f, "CheckAuthService: missing {what}")
            }
        }
    }
}

impl std::error::Error for CheckAuthError {}

/// Failure reported by a [`CallbackHandler`](crate::CallbackHandler).
///
/// `Display` is the bare message; it ends up verbatim in
/// `LoginResponse::error_message`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackError(String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CallbackError {}

/// Failure reported by a [`RefreshSession`](crate::RefreshSession).
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshError(String);

impl RefreshError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for RefreshError {}
