use std::fmt;

use thiserror::Error;

/// High-level failure categories surfaced by the bridge.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BridgeErrorKind {
    #[error("browser launch failed")]
    Launch,
    #[error("cdp i/o failure")]
    CdpIo,
    #[error("wait timed out")]
    Timeout,
    #[error("script raised an exception")]
    Script,
    #[error("internal bridge error")]
    Internal,
}

/// Bridge error with an optional human-readable hint.
#[derive(Clone, Debug)]
pub struct BridgeError {
    pub kind: BridgeErrorKind,
    pub hint: Option<String>,
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for BridgeError {}

impl BridgeError {
    pub fn new(kind: BridgeErrorKind) -> Self {
        Self { kind, hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
