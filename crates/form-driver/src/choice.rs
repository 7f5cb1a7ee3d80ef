use std::time::Duration;

use tracing::{debug, instrument};

use crate::errors::DriverError;
use crate::ports::DomPort;
use crate::wait::{center_probe_js, js_literal, point_from, presence_probe_js, wait_for_point};

/// Structural markers of the dropdown widget on the target surface.
#[derive(Debug, Clone)]
pub struct ChoiceMarkup {
    /// The clickable control container.
    pub control: String,
    /// Marker present while the option popover is open.
    pub popover: String,
    /// Option elements; visible text sits in a nested `p` when present.
    pub option: String,
}

impl Default for ChoiceMarkup {
    fn default() -> Self {
        Self {
            control: "div.mud-select".into(),
            popover: "div.mud-popover-open".into(),
            option: "div.mud-list-item".into(),
        }
    }
}

/// Waits and delays around the open/populate/select sequence.
#[derive(Debug, Clone, Copy)]
pub struct ChoiceTiming {
    /// Bound on the control and popover waits.
    pub open_timeout: Duration,
    /// Interval between wait probes.
    pub poll: Duration,
    /// Fixed delay after the popover opens; option population exposes no
    /// readiness signal.
    pub populate_settle: Duration,
}

impl Default for ChoiceTiming {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(10),
            poll: Duration::from_millis(100),
            populate_settle: Duration::from_millis(500),
        }
    }
}

/// Drives the dropdown from closed to selected.
///
/// The sequence is: click the control, wait for the popover-open marker,
/// settle while options populate, then click the visible option inside that
/// popover whose normalized text equals `value` exactly. No fuzzy or
/// partial matching; an ambiguous surface must not pick a wrong option
/// silently.
#[instrument(skip_all, fields(value = %value))]
pub async fn select_choice(
    port: &dyn DomPort,
    markup: &ChoiceMarkup,
    timing: &ChoiceTiming,
    value: &str,
) -> Result<(), DriverError> {
    let control_probe = center_probe_js(&markup.control)?;
    let control = wait_for_point(
        port,
        &control_probe,
        "choice control",
        timing.open_timeout,
        timing.poll,
    )
    .await?;
    port.click_at(control.0, control.1).await?;
    debug!("choice control clicked");

    let popover_probe = presence_probe_js(&markup.popover)?;
    wait_for_point(
        port,
        &popover_probe,
        "choice popover",
        timing.open_timeout,
        timing.poll,
    )
    .await?;
    port.settle(timing.populate_settle).await;

    let option_js = option_probe_js(&markup.popover, &markup.option, value)?;
    let found = port.evaluate(&option_js).await?;
    let option = point_from(&found)
        .ok_or_else(|| DriverError::NoMatch(format!("option '{value}' in open popover")))?;
    port.click_at(option.0, option.1).await?;
    debug!("option clicked");
    Ok(())
}

fn option_probe_js(
    popover_selector: &str,
    option_selector: &str,
    value: &str,
) -> Result<String, DriverError> {
    let popover_literal = js_literal(popover_selector)?;
    let selector_literal = js_literal(option_selector)?;
    let value_literal = js_literal(value)?;
    Ok(format!(
        "(() => {{\n    const norm = (s) => (s || '').trim().replace(/\\s+/g, ' ');\n    const needle = norm({value_literal});\n    const popover = document.querySelector({popover_literal});\n    if (!popover) {{ return null; }}\n    for (const item of popover.querySelectorAll({selector_literal})) {{\n        const rect = item.getBoundingClientRect();\n        if (!(rect.width > 0 && rect.height > 0)) {{ continue; }}\n        const p = item.querySelector('p');\n        const text = norm(p ? p.textContent : item.textContent);\n        if (text === needle) {{\n            return {{ x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 }};\n        }}\n    }}\n    return null;\n}})()"
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fake::FakeDom;

    fn fast_timing() -> ChoiceTiming {
        ChoiceTiming {
            open_timeout: Duration::from_millis(50),
            poll: Duration::from_millis(1),
            populate_settle: Duration::from_millis(500),
        }
    }

    #[tokio::test]
    async fn walks_open_populate_select() {
        let dom = FakeDom::new();
        dom.on("div.mud-select", json!({ "x": 10.0, "y": 12.0 }));
        dom.on("div.mud-popover-open", json!({ "x": 0.0, "y": 0.0 }));
        dom.on("div.mud-list-item", json!({ "x": 40.0, "y": 42.0 }));

        select_choice(&dom, &ChoiceMarkup::default(), &fast_timing(), "Female")
            .await
            .unwrap();

        assert_eq!(dom.clicks(), vec![(10.0, 12.0), (40.0, 42.0)]);
        // Popover population has no signal, so the fixed settle must run.
        assert!(dom
            .settles()
            .contains(&Duration::from_millis(500)));
    }

    #[tokio::test]
    async fn option_search_runs_inside_the_open_popover() {
        let dom = FakeDom::new();
        dom.on("div.mud-select", json!({ "x": 10.0, "y": 12.0 }));
        dom.on("div.mud-popover-open", json!({ "x": 0.0, "y": 0.0 }));
        // Only a popover-scoped query matches this key; a document-wide
        // option search would miss it.
        dom.on("popover.querySelectorAll", json!({ "x": 40.0, "y": 42.0 }));

        select_choice(&dom, &ChoiceMarkup::default(), &fast_timing(), "Female")
            .await
            .unwrap();

        assert_eq!(dom.clicks(), vec![(10.0, 12.0), (40.0, 42.0)]);
    }

    #[tokio::test]
    async fn missing_option_reports_no_match() {
        let dom = FakeDom::new();
        dom.on("div.mud-select", json!({ "x": 10.0, "y": 12.0 }));
        dom.on("div.mud-popover-open", json!({ "x": 0.0, "y": 0.0 }));

        let err = select_choice(&dom, &ChoiceMarkup::default(), &fast_timing(), "Unlisted")
            .await
            .unwrap_err();

        assert!(matches!(err, DriverError::NoMatch(_)));
        // Only the control click happened.
        assert_eq!(dom.clicks().len(), 1);
    }

    #[tokio::test]
    async fn absent_control_times_out_without_clicks() {
        let dom = FakeDom::new();
        let timing = ChoiceTiming {
            open_timeout: Duration::ZERO,
            ..fast_timing()
        };

        let err = select_choice(&dom, &ChoiceMarkup::default(), &timing, "Female")
            .await
            .unwrap_err();

        assert!(matches!(err, DriverError::WaitTimeout(_)));
        assert!(dom.clicks().is_empty());
    }
}
