use crate::errors::DriverError;
use crate::model::LabeledInput;
use crate::ports::DomPort;

const SCAN_INPUTS_JS: &str = "(() => {\n    return Array.from(document.querySelectorAll('input'), (el) => {\n        if (!el.id) { return null; }\n        const label = document.querySelector('label[for=\"' + el.id + '\"]');\n        if (!label) { return null; }\n        const text = (label.textContent || '').trim().replace(/\\s+/g, ' ');\n        if (!text) { return null; }\n        return { id: el.id, label: text };\n    }).filter(Boolean);\n})()";

/// Builds the association list for the current page: every input that has
/// an id and a `label[for]` pointing at it, in document order, with the
/// label text whitespace-normalized.
pub async fn scan_labeled_inputs(port: &dyn DomPort) -> Result<Vec<LabeledInput>, DriverError> {
    let value = port.evaluate(SCAN_INPUTS_JS).await?;
    let entries = value
        .as_array()
        .ok_or_else(|| DriverError::Page("input scan did not return an array".into()))?;

    let mut controls = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = entry
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DriverError::Page("input scan entry missing 'id'".into()))?;
        let label = entry
            .get("label")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DriverError::Page("input scan entry missing 'label'".into()))?;
        controls.push(LabeledInput {
            id: id.to_string(),
            label: label.to_string(),
        });
    }
    Ok(controls)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fake::FakeDom;

    #[tokio::test]
    async fn parses_scanned_controls_in_order() {
        let dom = FakeDom::new();
        dom.on(
            "querySelectorAll('input')",
            json!([
                { "id": "f1", "label": "Surgeon" },
                { "id": "f2", "label": "AL" }
            ]),
        );

        let controls = scan_labeled_inputs(&dom).await.unwrap();
        assert_eq!(
            controls,
            vec![
                LabeledInput {
                    id: "f1".into(),
                    label: "Surgeon".into()
                },
                LabeledInput {
                    id: "f2".into(),
                    label: "AL".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn rejects_malformed_scan_payload() {
        let dom = FakeDom::new();
        dom.on("querySelectorAll('input')", json!([{ "label": "AL" }]));

        let err = scan_labeled_inputs(&dom).await.unwrap_err();
        assert!(matches!(err, DriverError::Page(_)));
    }
}
