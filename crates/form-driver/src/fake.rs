use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::DriverError;
use crate::ports::DomPort;

/// In-memory page for driver tests. Scripted responses are matched by
/// substring against the evaluated expression and consumed in order; an
/// expression with no pending match evaluates to `null`. Interactions are
/// recorded and settling is instant.
pub(crate) struct FakeDom {
    responses: Mutex<Vec<(String, Value)>>,
    clicks: Mutex<Vec<(f64, f64)>>,
    inserted: Mutex<Vec<String>>,
    settles: Mutex<Vec<Duration>>,
}

impl FakeDom {
    pub(crate) fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            inserted: Mutex::new(Vec::new()),
            settles: Mutex::new(Vec::new()),
        }
    }

    /// Queues `value` for the next expression containing `needle`.
    pub(crate) fn on(&self, needle: &str, value: Value) {
        self.responses
            .lock()
            .unwrap()
            .push((needle.to_string(), value));
    }

    pub(crate) fn clicks(&self) -> Vec<(f64, f64)> {
        self.clicks.lock().unwrap().clone()
    }

    pub(crate) fn inserted(&self) -> Vec<String> {
        self.inserted.lock().unwrap().clone()
    }

    pub(crate) fn settles(&self) -> Vec<Duration> {
        self.settles.lock().unwrap().clone()
    }
}

#[async_trait]
impl DomPort for FakeDom {
    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError> {
        let mut responses = self.responses.lock().unwrap();
        match responses
            .iter()
            .position(|(needle, _)| expression.contains(needle))
        {
            Some(index) => Ok(responses.remove(index).1),
            None => Ok(Value::Null),
        }
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), DriverError> {
        self.clicks.lock().unwrap().push((x, y));
        Ok(())
    }

    async fn insert_text(&self, text: &str) -> Result<(), DriverError> {
        self.inserted.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn settle(&self, pause: Duration) {
        self.settles.lock().unwrap().push(pause);
    }
}
