use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::DriverError;

/// The page surface the drivers run against.
///
/// A live implementation forwards to a CDP session; test fakes answer
/// scripted values and make [`settle`](DomPort::settle) instant.
#[async_trait]
pub trait DomPort: Send + Sync {
    /// Evaluates an expression in the page and returns its value.
    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError>;

    /// Synthesizes a left-button click at page coordinates.
    async fn click_at(&self, x: f64, y: f64) -> Result<(), DriverError>;

    /// Inserts text into the currently focused element.
    async fn insert_text(&self, text: &str) -> Result<(), DriverError>;

    /// Unconditional pause between interactions.
    async fn settle(&self, pause: Duration);
}
