//! Fills the ESCRS IOL Calculator from an exported biometry record.
//!
//! The heavy lifting lives in the workspace crates: `iol-record` resolves
//! the record into label-to-value maps, `cdp-bridge` owns the browser, and
//! `form-driver` drives the page. This crate wires them into one run.

pub mod config;
pub mod dom;
pub mod session;

pub use config::{load_config, RunConfig, TimingConfig};
pub use dom::BridgeDom;
pub use session::{
    artifact_path, build_run_plan, drive_calculator, log_report, prepare_plan, RunPlan, RunReport,
    StepStatus,
};
