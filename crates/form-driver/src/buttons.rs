use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use crate::errors::DriverError;
use crate::ports::DomPort;
use crate::wait::{center_probe_js, js_literal, point_from, wait_for_point};

/// Waits for a button carrying the given span text and clicks it with a
/// synthesized mouse press. `exact` matches the whole normalized text;
/// otherwise a substring suffices. Disabled and zero-size buttons do not
/// count as present.
#[instrument(skip_all, fields(text = %text))]
pub async fn click_button_with_text(
    port: &dyn DomPort,
    text: &str,
    exact: bool,
    timeout: Duration,
    poll: Duration,
) -> Result<(), DriverError> {
    let probe = button_probe_js(text, exact, false)?;
    let center = wait_for_point(
        port,
        &probe,
        &format!("button '{text}'"),
        timeout,
        poll,
    )
    .await?;
    port.click_at(center.0, center.1).await?;
    debug!("button clicked");
    Ok(())
}

/// Waits for the button like [`click_button_with_text`] but fires its click
/// handler from script. The calculator swallows the synthesized mouse press
/// on its trigger control, so the click has to happen inside the page.
#[instrument(skip_all, fields(text = %text))]
pub async fn click_button_scripted(
    port: &dyn DomPort,
    text: &str,
    timeout: Duration,
    poll: Duration,
) -> Result<(), DriverError> {
    let probe = button_probe_js(text, false, true)?;
    let deadline = Instant::now() + timeout;
    loop {
        let value = port.evaluate(&probe).await?;
        if value.as_bool() == Some(true) {
            debug!("button clicked from script");
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(DriverError::WaitTimeout(format!(
                "button '{text}' not present before deadline"
            )));
        }
        port.settle(poll).await;
    }
}

/// Clicks the middle of the page body. The focused control blurs and the
/// page runs its own change handlers before the next step.
pub async fn click_page_body(port: &dyn DomPort) -> Result<(), DriverError> {
    let probe = center_probe_js("body")?;
    let value = port.evaluate(&probe).await?;
    let center =
        point_from(&value).ok_or_else(|| DriverError::NoMatch("page body".to_string()))?;
    port.click_at(center.0, center.1).await
}

fn button_probe_js(text: &str, exact: bool, scripted: bool) -> Result<String, DriverError> {
    let needle_literal = js_literal(text)?;
    let matcher = if exact {
        "text === needle"
    } else {
        "text.includes(needle)"
    };
    let action = if scripted {
        "button.click(); return true;"
    } else {
        "const rect = button.getBoundingClientRect();\n                return { x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 };"
    };
    Ok(format!(
        "(() => {{\n    const norm = (s) => (s || '').trim().replace(/\\s+/g, ' ');\n    const needle = norm({needle_literal});\n    for (const button of document.querySelectorAll('button')) {{\n        if (button.disabled) {{ continue; }}\n        const size = button.getBoundingClientRect();\n        if (!(size.width > 0 && size.height > 0)) {{ continue; }}\n        for (const span of button.querySelectorAll('span')) {{\n            const text = norm(span.textContent);\n            if ({matcher}) {{\n                {action}\n            }}\n        }}\n    }}\n    return {fallback};\n}})()",
        fallback = if scripted { "false" } else { "null" }
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fake::FakeDom;

    const FAST: Duration = Duration::from_millis(50);
    const POLL: Duration = Duration::from_millis(1);

    #[tokio::test]
    async fn clicks_button_at_its_center() {
        let dom = FakeDom::new();
        dom.on("querySelectorAll('button')", json!({ "x": 3.0, "y": 4.0 }));

        click_button_with_text(&dom, "I Agree", true, FAST, POLL)
            .await
            .unwrap();

        assert_eq!(dom.clicks(), vec![(3.0, 4.0)]);
    }

    #[tokio::test]
    async fn scripted_click_stays_inside_the_page() {
        let dom = FakeDom::new();
        dom.on("button.click()", json!(true));

        click_button_scripted(&dom, "Calculate", FAST, POLL)
            .await
            .unwrap();

        assert!(dom.clicks().is_empty(), "no synthesized mouse press");
    }

    #[tokio::test]
    async fn missing_button_times_out() {
        let dom = FakeDom::new();

        let err = click_button_with_text(&dom, "I Agree", true, Duration::ZERO, POLL)
            .await
            .unwrap_err();

        assert!(matches!(err, DriverError::WaitTimeout(_)));
    }

    #[tokio::test]
    async fn body_click_lands_on_center() {
        let dom = FakeDom::new();
        dom.on("\"body\"", json!({ "x": 960.0, "y": 540.0 }));

        click_page_body(&dom).await.unwrap();

        assert_eq!(dom.clicks(), vec![(960.0, 540.0)]);
    }
}
