//! Safety work permit intake.
//!
//! Submissions are validated, given an application number and written together with their
//! accompanying persons and a label-converted sync copy in one transaction. Stored
//! applications are read back as label projections that can seed a new submission.

pub mod clock;
pub mod domain;
pub mod labels;
pub mod numbering;
pub mod options;
pub mod projection;
pub mod repository;
pub mod router;
pub mod schedule;
pub mod service;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    AccompanyingPersonInput, ApplicationNumber, DeletionReport, Page, SubmissionCandidate,
    SubmissionReceipt, UserRecord,
};
pub use labels::{LabelConverter, HAZARD_SEPARATOR};
pub use numbering::{ApplicationNumberSource, RandomNumberSource};
pub use options::{CatalogError, OptionCatalog, OptionEntry, OptionKind, OptionRegistry};
pub use projection::{ApplicationView, OptionListing, PersonView};
pub use repository::{RepositoryError, SafetyWorkRepository};
pub use router::safety_work_router;
pub use schedule::{TimeSlot, WorkDuration, WorkWindow};
pub use service::{DeleteOutcome, SafetyWorkError, SafetyWorkService};
pub use store::SqlSafetyWorkRepository;
pub use validation::{decode_form, validate, validate_on, FieldErrors};
