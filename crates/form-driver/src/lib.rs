//! Interaction drivers for the calculator form.
//!
//! Everything here runs against the narrow [`DomPort`] surface, so the same
//! driver code works over a live CDP session or an in-memory fake. The fill
//! driver discovers label-to-control associations at runtime and reports a
//! per-control outcome instead of failing the pass; the choice driver walks
//! a dropdown through open, populate and exact-text select.

pub mod buttons;
pub mod choice;
pub mod errors;
pub mod fill;
pub mod model;
pub mod ports;
pub mod scan;

mod wait;

#[cfg(test)]
pub(crate) mod fake;

pub use buttons::{click_button_scripted, click_button_with_text, click_page_body};
pub use choice::{select_choice, ChoiceMarkup, ChoiceTiming};
pub use errors::DriverError;
pub use fill::fill_labeled_inputs;
pub use model::{FillOutcome, FillReport, LabeledInput};
pub use ports::DomPort;
pub use scan::scan_labeled_inputs;
