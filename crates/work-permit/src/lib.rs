//! Safety work permit intake.
//!
//! Submissions are validated, written to the primary tables together with a label-converted
//! sync projection in a single transaction, and read back as history projections that can
//! pre-fill a new form.

pub mod config;
pub mod db;
pub mod error;
pub mod telemetry;
pub mod workflows;
