//! Popup-window login support.

use oidc_client_core::OpenIdConfiguration;
use tokio::sync::mpsc;

/// Where the client is running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionContext {
    #[default]
    MainWindow,
    /// A popup opened for login. Callbacks are handed to the opener.
    Popup,
}

/// Hands a callback URL from a popup to the main window.
pub trait PopupRelay: Send + Sync + 'static {
    fn send_message_to_main_window(&self, url: &str, config: &OpenIdConfiguration);
}

/// Drops every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPopupRelay;

impl PopupRelay for NoPopupRelay {
    fn send_message_to_main_window(&self, url: &str, config: &OpenIdConfiguration) {
        tracing::debug!(config_id = %config.config_id, url, "No popup relay, dropping callback URL");
    }
}

/// Callback URL relayed from a popup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopupMessage {
    pub url: String,
    pub config_id: String,
}

/// [`PopupRelay`] over an mpsc channel; the main window owns the receiver.
#[derive(Clone, Debug)]
pub struct ChannelPopupRelay {
    tx: mpsc::UnboundedSender<PopupMessage>,
}

impl ChannelPopupRelay {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PopupMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PopupRelay for ChannelPopupRelay {
    fn send_message_to_main_window(&self, url: &str, config: &OpenIdConfiguration) {
        let message = PopupMessage {
            url: url.to_string(),
            config_id: config.config_id.clone(),
        };
        if self.tx.send(message).is_err() {
            tracing::warn!(config_id = %config.config_id, "Main window is gone, callback URL dropped");
        }
    }
}
