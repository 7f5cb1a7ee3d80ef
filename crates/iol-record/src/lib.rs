//! Data layer for the IOL Calculator autofill run.
//!
//! Loads the exported JSON record, reduces composite measurement strings to
//! the single numeric token the form accepts, and builds the ordered
//! label-to-value maps the interaction drivers consume.

pub mod errors;
pub mod extract;
pub mod mapping;
pub mod record;

pub use errors::RecordError;
pub use extract::first_numeric_token;
pub use mapping::{
    build_field_map, gender_choice, FieldMap, ValueRule, BIOMETRY_FIELDS, IDENTITY_FIELDS,
};
pub use record::ExportRecord;
