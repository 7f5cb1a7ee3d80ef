//! Session orchestration
//!
//! The fixed interaction sequence against the calculator page, expressed
//! over [`DomPort`] so the whole sequence runs under test against a
//! scripted page.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use form_driver::{
    click_button_scripted, click_button_with_text, click_page_body, fill_labeled_inputs,
    select_choice, ChoiceMarkup, ChoiceTiming, DomPort, DriverError, FillReport,
};
use iol_record::{
    build_field_map, gender_choice, ExportRecord, FieldMap, RecordError, BIOMETRY_FIELDS,
    IDENTITY_FIELDS,
};
use tracing::{info, instrument, warn};

use crate::config::TimingConfig;

/// Span text of the terms acknowledgment button, matched exactly.
const AGREE_LABEL: &str = "I Agree";

/// Span text of the calculation trigger, matched as a substring.
const CALCULATE_LABEL: &str = "Calculate";

/// Everything the interaction sequence needs from the record.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub gender: String,
    pub identity: FieldMap,
    pub biometry: FieldMap,
}

/// Resolves the record into the dropdown value and the two fill batches.
pub fn build_run_plan(record: &ExportRecord) -> RunPlan {
    RunPlan {
        gender: gender_choice(record),
        identity: build_field_map(record, IDENTITY_FIELDS),
        biometry: build_field_map(record, BIOMETRY_FIELDS),
    }
}

/// Loads the record and resolves the plan. Runs before any browser work, so
/// input-file problems never cost a launch.
pub fn prepare_plan(input: &Path) -> Result<RunPlan, RecordError> {
    let record = ExportRecord::load(input)?;
    Ok(build_run_plan(&record))
}

/// Outcome of a step the run survives without.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Skipped { reason: String },
}

impl StepStatus {
    pub fn completed(&self) -> bool {
        matches!(self, StepStatus::Completed)
    }
}

/// Step outcomes of one full sequence.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub choice: StepStatus,
    pub identity: FillReport,
    pub biometry: FillReport,
    pub calculate: StepStatus,
}

/// Runs the fixed sequence on an already-navigated page: accept the terms,
/// select the gender, fill both batches, blur the last control, trigger the
/// calculation and sit out the remote computation.
///
/// The acknowledgment and the blur click are interactions the run cannot
/// survive; gender selection and the calculate trigger degrade to reported
/// skips, and individual controls degrade to fill outcomes.
#[instrument(skip_all, fields(gender = %plan.gender))]
pub async fn drive_calculator(
    dom: &dyn DomPort,
    plan: &RunPlan,
    timing: &TimingConfig,
) -> Result<RunReport, DriverError> {
    let wait = timing.wait_timeout();
    let poll = timing.poll();

    click_button_with_text(dom, AGREE_LABEL, true, wait, poll).await?;
    info!("terms accepted");
    dom.settle(timing.step_settle()).await;

    let choice_timing = ChoiceTiming {
        open_timeout: wait,
        poll,
        populate_settle: timing.populate_settle(),
    };
    let choice =
        match select_choice(dom, &ChoiceMarkup::default(), &choice_timing, &plan.gender).await {
            Ok(()) => {
                info!(gender = %plan.gender, "gender selected");
                StepStatus::Completed
            }
            Err(err) => {
                warn!(gender = %plan.gender, %err, "gender selection skipped");
                StepStatus::Skipped {
                    reason: err.to_string(),
                }
            }
        };
    dom.settle(timing.step_settle()).await;

    let identity = fill_labeled_inputs(dom, &plan.identity).await?;
    let biometry = fill_labeled_inputs(dom, &plan.biometry).await?;

    // The site recalculates on blur of the last edited control.
    click_page_body(dom).await?;
    dom.settle(timing.pre_calculate_settle()).await;

    let calculate = match click_button_scripted(dom, CALCULATE_LABEL, wait, poll).await {
        Ok(()) => {
            info!("calculation triggered");
            StepStatus::Completed
        }
        Err(err) => {
            warn!(%err, "calculate trigger skipped");
            StepStatus::Skipped {
                reason: err.to_string(),
            }
        }
    };
    dom.settle(timing.post_calculate_wait()).await;

    Ok(RunReport {
        choice,
        identity,
        biometry,
        calculate,
    })
}

/// Timestamped artifact path, `<prefix>_<YYYYMMDD_HHMMSS>.png` under `dir`.
pub fn artifact_path(dir: &Path, prefix: &str, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("{prefix}_{}.png", at.format("%Y%m%d_%H%M%S")))
}

/// Logs the step outcomes as the run summary.
pub fn log_report(report: &RunReport) {
    match &report.choice {
        StepStatus::Completed => info!(step = "gender", outcome = "selected", "run summary"),
        StepStatus::Skipped { reason } => {
            warn!(step = "gender", outcome = "skipped", %reason, "run summary")
        }
    }
    info!(
        step = "identity",
        filled = report.identity.filled(),
        left_empty = report.identity.left_empty(),
        failed = report.identity.failed(),
        "run summary"
    );
    info!(
        step = "biometry",
        filled = report.biometry.filled(),
        left_empty = report.biometry.left_empty(),
        failed = report.biometry.failed(),
        "run summary"
    );
    match &report.calculate {
        StepStatus::Completed => info!(step = "calculate", outcome = "triggered", "run summary"),
        StepStatus::Skipped { reason } => {
            warn!(step = "calculate", outcome = "skipped", %reason, "run summary")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    use super::*;

    /// Scripted page: evaluate answers the first pending entry whose key is
    /// a substring of the expression, consumed in order.
    struct ScriptedPage {
        responses: Mutex<Vec<(String, Value)>>,
        clicks: Mutex<Vec<(f64, f64)>>,
        inserted: Mutex<Vec<String>>,
    }

    impl ScriptedPage {
        fn new() -> Self {
            Self {
                responses: Mutex::new(Vec::new()),
                clicks: Mutex::new(Vec::new()),
                inserted: Mutex::new(Vec::new()),
            }
        }

        fn on(&self, needle: &str, value: Value) {
            self.responses
                .lock()
                .unwrap()
                .push((needle.to_string(), value));
        }

        fn clicks(&self) -> Vec<(f64, f64)> {
            self.clicks.lock().unwrap().clone()
        }

        fn inserted(&self) -> Vec<String> {
            self.inserted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DomPort for ScriptedPage {
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

        async fn settle(&self, _pause: Duration) {}
    }

    fn fast_timing() -> TimingConfig {
        TimingConfig {
            wait_timeout_ms: 50,
            poll_ms: 1,
            populate_settle_ms: 0,
            step_settle_ms: 0,
            pre_calculate_settle_ms: 0,
            post_calculate_wait_ms: 0,
            navigation_timeout_ms: 50,
        }
    }

    fn point(x: f64, y: f64) -> Value {
        json!({ "x": x, "y": y })
    }

    #[test]
    fn plan_resolves_gender_and_both_batches() {
        let record = ExportRecord::from_json(
            r#"{"gender":"Female","surgeon":"Dr. X",
                "iolData":{"rightEye":{"AL":"23.50","K1":"44.20 @ 10","K2":"45.10 @ 100"}}}"#,
        )
        .unwrap();

        let plan = build_run_plan(&record);
        assert_eq!(plan.gender, "Female");
        assert_eq!(plan.identity.get("Surgeon"), Some("Dr. X"));
        assert_eq!(plan.biometry.get("AL"), Some("23.50"));
        assert_eq!(plan.biometry.get("K1"), Some("44.20"));
        assert_eq!(plan.biometry.get("K2"), Some("45.10"));
    }

    #[test]
    fn missing_record_aborts_before_any_browser_work() {
        let err = prepare_plan(Path::new("/nonexistent/exported_iol_data.json")).unwrap_err();
        assert!(matches!(err, RecordError::NotFound { .. }));
    }

    #[tokio::test]
    async fn full_sequence_fills_selects_and_triggers() {
        let record = ExportRecord::from_json(
            r#"{"gender":"Female","surgeon":"Dr. X",
                "iolData":{"rightEye":{"AL":"23.50","K1":"44.20 @ 10","K2":"45.10 @ 100"}}}"#,
        )
        .unwrap();
        let plan = build_run_plan(&record);

        let page = ScriptedPage::new();
        page.on("I Agree", point(100.0, 200.0));
        page.on("div.mud-select", point(10.0, 12.0));
        page.on("div.mud-popover-open", point(0.0, 0.0));
        page.on("div.mud-list-item", point(40.0, 42.0));
        page.on(
            "querySelectorAll('input')",
            json!([{ "id": "surgeon", "label": "Surgeon" }]),
        );
        page.on("getElementById", json!({ "status": "focused" }));
        page.on(
            "querySelectorAll('input')",
            json!([
                { "id": "al", "label": "AL" },
                { "id": "k1", "label": "K1" },
                { "id": "k2", "label": "K2" }
            ]),
        );
        page.on("getElementById", json!({ "status": "focused" }));
        page.on("getElementById", json!({ "status": "focused" }));
        page.on("getElementById", json!({ "status": "focused" }));
        page.on("\"body\"", point(960.0, 540.0));
        page.on("button.click()", json!(true));

        let report = drive_calculator(&page, &plan, &fast_timing()).await.unwrap();

        assert!(report.choice.completed());
        assert!(report.calculate.completed());
        assert_eq!(report.identity.filled(), 1);
        assert_eq!(report.biometry.filled(), 3);
        assert_eq!(
            page.inserted(),
            vec![
                "Dr. X".to_string(),
                "23.50".to_string(),
                "44.20".to_string(),
                "45.10".to_string(),
            ]
        );
        // Agree, choice control, option, body blur. Calculate stays scripted.
        assert_eq!(page.clicks().len(), 4);
    }

    #[tokio::test]
    async fn missing_agree_button_aborts_the_sequence() {
        let plan = RunPlan {
            gender: "Female".to_string(),
            identity: FieldMap::default(),
            biometry: FieldMap::default(),
        };
        let timing = TimingConfig {
            wait_timeout_ms: 0,
            ..fast_timing()
        };

        let page = ScriptedPage::new();
        let err = drive_calculator(&page, &plan, &timing).await.unwrap_err();

        assert!(matches!(err, DriverError::WaitTimeout(_)));
        assert!(page.clicks().is_empty());
        assert!(page.inserted().is_empty());
    }

    #[tokio::test]
    async fn optional_steps_degrade_to_skips() {
        let plan = RunPlan {
            gender: "Female".to_string(),
            identity: FieldMap::default(),
            biometry: FieldMap::default(),
        };
        let timing = TimingConfig {
            wait_timeout_ms: 0,
            ..fast_timing()
        };

        let page = ScriptedPage::new();
        page.on("I Agree", point(100.0, 200.0));
        page.on("querySelectorAll('input')", json!([]));
        page.on("querySelectorAll('input')", json!([]));
        page.on("\"body\"", point(960.0, 540.0));

        let report = drive_calculator(&page, &plan, &timing).await.unwrap();

        assert!(!report.choice.completed());
        assert!(!report.calculate.completed());
        assert_eq!(report.identity.outcomes.len(), 0);
        assert_eq!(report.biometry.outcomes.len(), 0);
    }

    #[test]
    fn artifact_names_carry_the_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 30, 5).unwrap();
        assert_eq!(
            artifact_path(Path::new("shots"), "iol_result", at),
            PathBuf::from("shots/iol_result_20240309_143005.png")
        );
        assert_eq!(
            artifact_path(Path::new("."), "error", at),
            PathBuf::from("./error_20240309_143005.png")
        );
    }
}
