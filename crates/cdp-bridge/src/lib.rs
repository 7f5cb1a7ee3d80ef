//! Chrome DevTools Protocol plumbing for a single-page automation run.
//!
//! The bridge launches a Chromium process, drives the raw CDP websocket
//! through a small command/event routing loop, and exposes the handful of
//! page operations the autofill run needs:
//! navigation, script evaluation, mouse clicks at a point, text insertion
//! and screenshot capture. The transport is a trait so everything above it
//! can be exercised against a scripted mock without a browser.

pub mod config;
pub mod errors;
pub mod session;
pub mod transport;
mod util;

pub use config::{detect_chrome_executable, BridgeConfig};
pub use errors::{BridgeError, BridgeErrorKind};
pub use session::BridgeSession;
pub use transport::{CdpTransport, ChromiumTransport, CommandTarget, TransportEvent};
