use std::collections::HashSet;

use iol_record::FieldMap;
use tracing::{debug, info, instrument, warn};

use crate::errors::DriverError;
use crate::model::{FillOutcome, FillReport, LabeledInput};
use crate::ports::DomPort;
use crate::scan::scan_labeled_inputs;
use crate::wait::js_literal;

/// Writes the mapped values into their labelled controls.
///
/// Controls are enumerated from the live page, so a label only has to
/// exist at fill time, not in any hardcoded selector table. Each label is
/// written at most once per pass; empty values leave the control alone.
/// Individual control failures become outcomes, not errors, and the pass
/// keeps going. Only a failed page scan aborts the whole pass.
#[instrument(skip_all, fields(targets = map.len()))]
pub async fn fill_labeled_inputs(
    port: &dyn DomPort,
    map: &FieldMap,
) -> Result<FillReport, DriverError> {
    let controls = scan_labeled_inputs(port).await?;
    debug!(controls = controls.len(), "scanned labelled inputs");

    let mut written: HashSet<String> = HashSet::new();
    let mut report = FillReport::default();

    for control in controls {
        let Some(value) = map.get(&control.label) else {
            continue;
        };

        if written.contains(&control.label) {
            debug!(label = %control.label, "label already written, skipping duplicate control");
            report.outcomes.push(FillOutcome::Duplicate {
                label: control.label,
            });
            continue;
        }

        if value.is_empty() {
            debug!(label = %control.label, "no value mapped, leaving control untouched");
            report.outcomes.push(FillOutcome::LeftEmpty {
                label: control.label,
            });
            continue;
        }

        match write_into(port, &control, value).await {
            Ok(()) => {
                info!(label = %control.label, "filled control");
                written.insert(control.label.clone());
                report.outcomes.push(FillOutcome::Filled {
                    label: control.label,
                    value: value.to_string(),
                });
            }
            Err(err) => {
                warn!(label = %control.label, %err, "control fill failed, continuing");
                report.outcomes.push(FillOutcome::Failed {
                    label: control.label,
                    reason: err.to_string(),
                });
            }
        }
    }

    Ok(report)
}

/// Focuses the control, verifies focus actually moved to it, then selects
/// its content and overwrites it with the inserted text. Text insertion
/// lands in whatever element holds focus, so a control that does not take
/// focus is reported as a failed write.
async fn write_into(
    port: &dyn DomPort,
    control: &LabeledInput,
    value: &str,
) -> Result<(), DriverError> {
    let id_literal = js_literal(&control.id)?;
    let expression = format!(
        "(() => {{\n    const el = document.getElementById({id_literal});\n    if (!el) {{ return {{ status: 'not-found' }}; }}\n    if (typeof el.focus === 'function') {{ el.focus(); }}\n    if (document.activeElement !== el) {{ return {{ status: 'unfocusable' }}; }}\n    if (typeof el.select === 'function') {{ el.select(); }}\n    return {{ status: 'focused' }};\n}})()"
    );

    let response = port.evaluate(&expression).await?;
    let status = response
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");

    match status {
        "focused" => port.insert_text(value).await,
        "not-found" => Err(DriverError::NoMatch(format!(
            "input #{} vanished before write",
            control.id
        ))),
        "unfocusable" => Err(DriverError::Page(format!(
            "input #{} did not take focus",
            control.id
        ))),
        other => Err(DriverError::Page(format!(
            "focus failed for input #{}: {}",
            control.id, other
        ))),
    }
}
