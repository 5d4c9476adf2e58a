mod client;
mod doubles;
mod jwt;

pub use client::{test_config, TestClient};
pub use doubles::{
    AuthStateMock, Calls, MockCallbackHandler, MockCheckSession, MockRefreshSession, MockSilentRenew,
    RecordingPopupRelay, RecordingSavedRedirect, RecordingScheduler, RecordingUserService,
};
pub use jwt::TestJwt;
