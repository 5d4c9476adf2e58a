//! Public event broadcaster.
//!
//! # Usage
//!
//! ```ignore
//! use oidc_client_core::events::{EventType, PublicEventsService};
//!
//! let events = PublicEventsService::new(64);
//! let mut sub = events.register_for_events();
//!
//! events.fire_event(EventType::CheckingAuth, Some("main"), None);
//! let notification = sub.recv().await;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Default capacity of the notification channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 128;

/// Kinds of notifications the client publishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    ConfigLoaded,
    CheckingAuth,
    CheckingAuthFinished,
    CheckingAuthFinishedWithError,
    CheckSessionReceived,
    UserDataChanged,
    NewAuthenticationResult,
    TokenExpired,
    IdTokenExpired,
    SilentRenewStarted,
    SilentRenewFailed,
}

/// A published notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcClientNotification {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub config_id: Option<String>,
    pub value: Option<Value>,
}

/// Broadcasts client notifications to any number of subscribers.
///
/// Clone + Send + Sync. Firing never blocks and never fails: with no
/// subscriber the notification is dropped, and slow subscribers skip what
/// they lagged behind on.
#[derive(Clone)]
pub struct PublicEventsService {
    tx: broadcast::Sender<OidcClientNotification>,
}

impl PublicEventsService {
    /// `capacity` is the per-subscriber backlog; zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn fire_event(&self, event_type: EventType, config_id: Option<&str>, value: Option<Value>) {
        let notification = OidcClientNotification {
            event_type,
            config_id: config_id.map(str::to_string),
            value,
        };
        if self.tx.send(notification).is_err() {
            tracing::trace!(?event_type, "No subscriber for public event");
        }
    }

    pub fn register_for_events(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PublicEventsService {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// A subscription yielding notifications in firing order.
pub struct EventSubscription {
    rx: broadcast::Receiver<OidcClientNotification>,
}

impl EventSubscription {
    /// Wait for the next notification. `None` once the service is dropped.
    pub async fn recv(&mut self) -> Option<OidcClientNotification> {
        loop {
            match self.rx.recv().await {
                Ok(n) => return Some(n),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Everything fired so far that has not been received yet.
    pub fn drain(&mut self) -> Vec<OidcClientNotification> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(n) => out.push(n),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return out,
            }
        }
    }
}

impl futures_core::Stream for EventSubscription {
    type Item = OidcClientNotification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match self.rx.try_recv() {
                Ok(n) => return Poll::Ready(Some(n)),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(broadcast::error::TryRecvError::Closed) => return Poll::Ready(None),
                Err(broadcast::error::TryRecvError::Empty) => break,
            }
        }

        // recv() is cancel-safe, so dropping the future between polls loses nothing.
        let rx = &mut self.rx;
        let mut recv_fut = Box::pin(rx.recv());
        match recv_fut.as_mut().poll(cx) {
            Poll::Ready(Ok(n)) => Poll::Ready(Some(n)),
            Poll::Ready(Err(broadcast::error::RecvError::Closed)) => Poll::Ready(None),
            Poll::Ready(Err(broadcast::error::RecvError::Lagged(_))) => {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_core::Stream;

    async fn next(sub: &mut EventSubscription) -> Option<OidcClientNotification> {
        tokio::time::timeout(std::time::Duration::from_millis(100), async {
            std::future::poll_fn(|cx| Pin::new(&mut *sub).poll_next(cx)).await
        })
        .await
        .ok()
        .flatten()
    }

    #[tokio::test]
    async fn subscriber_receives_in_order() {
        let events = PublicEventsService::default();
        let mut sub = events.register_for_events();

        events.fire_event(EventType::CheckingAuth, Some("configId1"), None);
        events.fire_event(EventType::CheckingAuthFinished, Some("configId1"), None);

        let first = next(&mut sub).await.unwrap();
        assert_eq!(first.event_type, EventType::CheckingAuth);
        assert_eq!(first.config_id.as_deref(), Some("configId1"));
        let second = next(&mut sub).await.unwrap();
        assert_eq!(second.event_type, EventType::CheckingAuthFinished);
    }

    #[tokio::test]
    async fn zero_capacity_still_delivers() {
        let events = PublicEventsService::new(0);
        let mut sub = events.register_for_events();

        events.fire_event(EventType::ConfigLoaded, None, None);

        assert_eq!(next(&mut sub).await.unwrap().event_type, EventType::ConfigLoaded);
    }

    #[tokio::test]
    async fn fire_without_subscriber_is_silent() {
        let events = PublicEventsService::new(4);
        events.fire_event(EventType::TokenExpired, None, None);
        assert_eq!(events.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let events = PublicEventsService::new(4);
        events.fire_event(EventType::ConfigLoaded, None, None);
        let mut sub = events.register_for_events();
        assert!(sub.drain().is_empty());
    }

    #[tokio::test]
    async fn recv_returns_none_when_closed() {
        let events = PublicEventsService::new(4);
        let mut sub = events.register_for_events();
        drop(events);
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn notification_serializes_with_type_tag() {
        let n = OidcClientNotification {
            event_type: EventType::UserDataChanged,
            config_id: Some("c".into()),
            value: Some(serde_json::json!({"sub": "u1"})),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "UserDataChanged");
        assert_eq!(json["configId"], "c");
    }
}
