use std::time::{Duration, Instant};

use serde_json::Value;

use crate::errors::DriverError;
use crate::ports::DomPort;

pub(crate) fn point_from(value: &Value) -> Option<(f64, f64)> {
    let x = value.get("x")?.as_f64()?;
    let y = value.get("y")?.as_f64()?;
    Some((x, y))
}

/// Probe for the center of the first visible match of `selector`.
pub(crate) fn center_probe_js(selector: &str) -> Result<String, DriverError> {
    let literal = js_literal(selector)?;
    Ok(format!(
        "(() => {{\n    const el = document.querySelector({literal});\n    if (!el) {{ return null; }}\n    const rect = el.getBoundingClientRect();\n    if (!(rect.width > 0 && rect.height > 0)) {{ return null; }}\n    return {{ x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 }};\n}})()"
    ))
}

/// Like [`center_probe_js`] but satisfied by mere presence in the DOM.
pub(crate) fn presence_probe_js(selector: &str) -> Result<String, DriverError> {
    let literal = js_literal(selector)?;
    Ok(format!(
        "(() => {{\n    const el = document.querySelector({literal});\n    if (!el) {{ return null; }}\n    const rect = el.getBoundingClientRect();\n    return {{ x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 }};\n}})()"
    ))
}

/// Re-runs a point probe until it yields, settling through the port between
/// attempts. The deadline bounds the wait; the probe itself never blocks.
pub(crate) async fn wait_for_point(
    port: &dyn DomPort,
    expression: &str,
    what: &str,
    timeout: Duration,
    poll: Duration,
) -> Result<(f64, f64), DriverError> {
    let deadline = Instant::now() + timeout;
    loop {
        let value = port.evaluate(expression).await?;
        if let Some(point) = point_from(&value) {
            return Ok(point);
        }
        if Instant::now() >= deadline {
            return Err(DriverError::WaitTimeout(format!(
                "{what} not present before deadline"
            )));
        }
        port.settle(poll).await;
    }
}

pub(crate) fn js_literal(raw: &str) -> Result<String, DriverError> {
    serde_json::to_string(raw).map_err(|err| DriverError::Page(err.to_string()))
}
