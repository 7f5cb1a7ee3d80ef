//! Live [`DomPort`] over an attached CDP page session.

use std::time::Duration;

use async_trait::async_trait;
use cdp_bridge::{BridgeError, BridgeErrorKind, BridgeSession};
use form_driver::{DomPort, DriverError};
use serde_json::Value;
use tokio::time::sleep;

/// Forwards driver calls to the page; settling is a real sleep here, unlike
/// the instant test fakes.
pub struct BridgeDom<'a> {
    session: &'a BridgeSession,
}

impl<'a> BridgeDom<'a> {
    pub fn new(session: &'a BridgeSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl DomPort for BridgeDom<'_> {
    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError> {
        self.session
            .evaluate(expression)
            .await
            .map_err(into_driver_error)
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), DriverError> {
        self.session.click_at(x, y).await.map_err(into_driver_error)
    }

    async fn insert_text(&self, text: &str) -> Result<(), DriverError> {
        self.session
            .insert_text(text)
            .await
            .map_err(into_driver_error)
    }

    async fn settle(&self, pause: Duration) {
        sleep(pause).await;
    }
}

fn into_driver_error(err: BridgeError) -> DriverError {
    match err.kind {
        BridgeErrorKind::Timeout => DriverError::WaitTimeout(err.to_string()),
        _ => DriverError::Page(err.to_string()),
    }
}
