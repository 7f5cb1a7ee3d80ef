use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::errors::{BridgeError, BridgeErrorKind};
use crate::transport::{CdpTransport, CommandTarget, TransportEvent};

const ATTACH_POLL: Duration = Duration::from_millis(50);
const READY_POLL: Duration = Duration::from_millis(100);

/// One attached page on a running browser.
///
/// Targets are discovered through `Target.setAutoAttach`; the first page
/// session to attach is the one the whole run drives. The run never needs
/// a second tab.
pub struct BridgeSession {
    transport: Arc<dyn CdpTransport>,
    state: Arc<SessionState>,
    events_task: JoinHandle<()>,
}

#[derive(Default)]
struct SessionState {
    page_session: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct AttachedToTargetParams {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "targetInfo")]
    target_info: TargetInfo,
}

#[derive(Debug, Deserialize)]
struct TargetInfo {
    #[serde(rename = "targetId")]
    target_id: String,
    #[serde(rename = "type")]
    target_type: String,
}

#[derive(Debug, Deserialize)]
struct DetachedFromTargetParams {
    #[serde(rename = "sessionId")]
    session_id: String,
}

impl BridgeSession {
    /// Starts the transport, enables target discovery and waits for a page
    /// session to attach.
    pub async fn start(
        transport: Arc<dyn CdpTransport>,
        attach_timeout: Duration,
    ) -> Result<Self, BridgeError> {
        transport.start().await?;
        transport
            .send_command(
                CommandTarget::Browser,
                "Target.setDiscoverTargets",
                json!({ "discover": true }),
            )
            .await?;
        transport
            .send_command(
                CommandTarget::Browser,
                "Target.setAutoAttach",
                json!({
                    "autoAttach": true,
                    "waitForDebuggerOnStart": false,
                    "flatten": true,
                }),
            )
            .await?;

        let state = Arc::new(SessionState::default());
        let events_task = tokio::spawn(Self::event_loop(transport.clone(), state.clone()));

        let session = Self {
            transport,
            state,
            events_task,
        };

        if session.current_session().await.is_none() {
            session
                .transport
                .send_command(
                    CommandTarget::Browser,
                    "Target.createTarget",
                    json!({ "url": "about:blank" }),
                )
                .await?;
        }
        session.wait_for_page(attach_timeout).await?;
        Ok(session)
    }

    async fn event_loop(transport: Arc<dyn CdpTransport>, state: Arc<SessionState>) {
        while let Some(event) = transport.next_event().await {
            Self::apply_event(&state, event).await;
        }
        debug!(target: "cdp-bridge", "event stream ended");
    }

    async fn apply_event(state: &SessionState, event: TransportEvent) {
        match event.method.as_str() {
            "Target.attachedToTarget" => {
                match serde_json::from_value::<AttachedToTargetParams>(event.params) {
                    Ok(params) if params.target_info.target_type == "page" => {
                        let mut guard = state.page_session.write().await;
                        if guard.is_none() {
                            info!(
                                target: "cdp-bridge",
                                target_id = %params.target_info.target_id,
                                "page session attached"
                            );
                            *guard = Some(params.session_id);
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(target: "cdp-bridge", ?err, "malformed attach event");
                    }
                }
            }
            "Target.detachedFromTarget" => {
                if let Ok(params) = serde_json::from_value::<DetachedFromTargetParams>(event.params)
                {
                    let mut guard = state.page_session.write().await;
                    if guard.as_deref() == Some(params.session_id.as_str()) {
                        warn!(target: "cdp-bridge", "page session detached");
                        *guard = None;
                    }
                }
            }
            other => {
                debug!(target: "cdp-bridge", method = %other, "unhandled cdp event");
            }
        }
    }

    async fn current_session(&self) -> Option<String> {
        self.state.page_session.read().await.clone()
    }

    async fn wait_for_page(&self, timeout: Duration) -> Result<(), BridgeError> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.current_session().await.is_some() {
                return Ok(());
            }
            sleep(ATTACH_POLL).await;
        }
        Err(BridgeError::new(BridgeErrorKind::Timeout)
            .with_hint("no page target attached before deadline"))
    }

    async fn send_page_command(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        let session = self.current_session().await.ok_or_else(|| {
            BridgeError::new(BridgeErrorKind::Internal).with_hint("no page session attached")
        })?;
        self.transport
            .send_command(CommandTarget::Session(session), method, params)
            .await
    }

    /// Navigates the page and waits for document readiness.
    pub async fn navigate(&self, url: &str, deadline: Duration) -> Result<(), BridgeError> {
        self.send_page_command("Page.navigate", json!({ "url": url }))
            .await?;
        self.wait_dom_ready(deadline).await
    }

    /// Polls `document.readyState` until interactive or complete.
    pub async fn wait_dom_ready(&self, deadline: Duration) -> Result<(), BridgeError> {
        let deadline_at = Instant::now() + deadline;
        loop {
            if Instant::now() >= deadline_at {
                return Err(BridgeError::new(BridgeErrorKind::Timeout)
                    .with_hint("document readiness wait timed out"));
            }

            let response = self
                .send_page_command(
                    "Runtime.evaluate",
                    json!({
                        "expression": "document.readyState",
                        "returnByValue": true,
                    }),
                )
                .await?;

            let ready = response
                .get("result")
                .and_then(|v| v.get("value"))
                .and_then(|v| v.as_str())
                .map(|state| matches!(state, "interactive" | "complete"))
                .unwrap_or(false);

            if ready {
                return Ok(());
            }

            sleep(READY_POLL).await;
        }
    }

    /// Evaluates an expression in the page, returning its value. Script
    /// exceptions come back as errors, not values.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, BridgeError> {
        let response = self
            .send_page_command(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "awaitPromise": true,
                    "returnByValue": true,
                    "userGesture": true,
                }),
            )
            .await?;

        if let Some(details) = response.get("exceptionDetails") {
            return Err(BridgeError::new(BridgeErrorKind::Script)
                .with_hint(exception_hint(details)));
        }

        Ok(response
            .get("result")
            .and_then(|res| res.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Synthesizes a left-button click at page coordinates.
    pub async fn click_at(&self, x: f64, y: f64) -> Result<(), BridgeError> {
        let press = json!({
            "type": "mousePressed",
            "x": x,
            "y": y,
            "button": "left",
            "buttons": 1,
            "clickCount": 1,
            "pointerType": "mouse",
        });
        self.send_page_command("Input.dispatchMouseEvent", press)
            .await?;

        let release = json!({
            "type": "mouseReleased",
            "x": x,
            "y": y,
            "button": "left",
            "buttons": 1,
            "clickCount": 1,
            "pointerType": "mouse",
        });
        self.send_page_command("Input.dispatchMouseEvent", release)
            .await?;
        Ok(())
    }

    /// Inserts text into the focused element.
    pub async fn insert_text(&self, text: &str) -> Result<(), BridgeError> {
        self.send_page_command("Input.insertText", json!({ "text": text }))
            .await
            .map(|_| ())
    }

    /// Captures the full page as PNG bytes.
    pub async fn screenshot_png(&self) -> Result<Vec<u8>, BridgeError> {
        let response = self
            .send_page_command(
                "Page.captureScreenshot",
                json!({ "format": "png", "captureBeyondViewport": true }),
            )
            .await?;
        let data = response
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                BridgeError::new(BridgeErrorKind::Internal).with_hint("missing screenshot data")
            })?;
        let bytes = STANDARD
            .decode(data)
            .map_err(|err| BridgeError::new(BridgeErrorKind::Internal).with_hint(err.to_string()))?;
        Ok(bytes)
    }

    /// Asks the browser to exit and stops event handling. The transport
    /// kills the child process if the browser does not go down on its own.
    pub async fn shutdown(self) {
        if let Err(err) = self
            .transport
            .send_command(CommandTarget::Browser, "Browser.close", json!({}))
            .await
        {
            debug!(target: "cdp-bridge", ?err, "browser close command failed");
        }
        self.events_task.abort();
    }
}

fn exception_hint(details: &Value) -> String {
    details
        .get("exception")
        .and_then(|e| e.get("description"))
        .and_then(|d| d.as_str())
        .or_else(|| details.get("text").and_then(|t| t.as_str()))
        .unwrap_or("script exception")
        .to_string()
}
