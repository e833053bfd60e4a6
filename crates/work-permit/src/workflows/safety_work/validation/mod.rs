mod rules;
mod shape;

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use super::domain::{text, AccompanyingPersonInput, SubmissionCandidate};
use super::options::QUALITY_REWORK;
use super::schedule::{parse_start_date, WorkDuration};

pub(crate) use rules::is_mobile_phone;
pub use shape::decode_form;

/// Field-keyed validation messages. Empty means the candidate is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Add every entry of `other`, replacing messages already recorded for the same field.
    pub fn merge(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Human-readable count, e.g. "3 problems found".
    pub fn summary(&self) -> String {
        match self.len() {
            1 => "1 problem found".to_string(),
            count => format!("{count} problems found"),
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Validate a candidate against today's local date.
pub fn validate(candidate: &SubmissionCandidate) -> FieldErrors {
    validate_on(candidate, Local::now().date_naive())
}

/// Validate a candidate, treating `today` as the earliest permitted start date.
///
/// Every rule runs; the result lists every violated field, not just the first.
pub fn validate_on(candidate: &SubmissionCandidate, today: NaiveDate) -> FieldErrors {
    let mut errors = FieldErrors::new();

    require(&mut errors, "name", text(&candidate.name), "applicant name is required");
    require(
        &mut errors,
        "companyName",
        text(&candidate.company_name),
        "company name is required",
    );
    require(
        &mut errors,
        "workLocation",
        text(&candidate.work_location),
        "work location is required",
    );
    require(
        &mut errors,
        "workType",
        text(&candidate.work_type),
        "work type is required",
    );
    require(
        &mut errors,
        "workContent",
        text(&candidate.work_content),
        "work content is required",
    );
    require(
        &mut errors,
        "notifierName",
        text(&candidate.notifier_name),
        "notifier name is required",
    );
    require(
        &mut errors,
        "notifierDepartment",
        text(&candidate.notifier_department),
        "notifier department is required",
    );

    check_national_id(&mut errors, "idNumber", text(&candidate.id_number));
    check_phone(&mut errors, "phoneNumber", text(&candidate.phone_number));

    match text(&candidate.notifier_number) {
        "" => errors.insert("notifierNumber", "notifier employee number is required"),
        number if !rules::is_employee_number(number) => {
            errors.insert("notifierNumber", "notifier employee number must be 12 digits")
        }
        _ => {}
    }

    check_schedule(&mut errors, candidate, today);

    if text(&candidate.work_type) == QUALITY_REWORK {
        check_quality_rework(&mut errors, candidate);
    }

    if !candidate
        .hazards()
        .iter()
        .any(|code| !code.trim().is_empty())
    {
        errors.insert("dangerTypes", "select at least one hazard type");
    }

    check_accompanying_persons(&mut errors, candidate);

    errors
}

fn require(errors: &mut FieldErrors, field: &str, value: &str, message: &str) {
    if value.is_empty() {
        errors.insert(field, message);
    }
}

fn check_national_id(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.is_empty() {
        errors.insert(field, "ID number is required");
    } else if !rules::is_national_id(value) {
        errors.insert(field, "ID number format is invalid");
    }
}

fn check_phone(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.is_empty() {
        errors.insert(field, "phone number is required");
    } else if !rules::is_mobile_phone(value) {
        errors.insert(field, "phone number must be an 11-digit mobile number");
    }
}

fn check_schedule(errors: &mut FieldErrors, candidate: &SubmissionCandidate, today: NaiveDate) {
    match text(&candidate.start_date) {
        "" => errors.insert("startDate", "start date is required"),
        raw => match parse_start_date(raw) {
            None => errors.insert("startDate", "start date must be YYYY-MM-DD"),
            Some(date) if date < today => {
                errors.insert("startDate", "start date cannot be in the past")
            }
            Some(_) => {}
        },
    }

    match text(&candidate.working_hours) {
        "" => errors.insert("workingHours", "working hours are required"),
        code if WorkDuration::from_code(code).is_none() => {
            errors.insert("workingHours", "working hours option is not recognised")
        }
        _ => {}
    }
}

fn check_quality_rework(errors: &mut FieldErrors, candidate: &SubmissionCandidate) {
    require(
        errors,
        "projectName",
        text(&candidate.project_name),
        "project name is required for quality rework",
    );
    require(
        errors,
        "vehicleNumber",
        text(&candidate.vehicle_number),
        "vehicle number is required for quality rework",
    );
    require(
        errors,
        "trackPosition",
        text(&candidate.track_position),
        "track position is required for quality rework",
    );

    let basis = text(&candidate.work_basis);
    require(
        errors,
        "workBasis",
        basis,
        "work basis is required for quality rework",
    );

    match text(&candidate.basis_number) {
        "" => errors.insert("basisNumber", "basis number is required for quality rework"),
        number if !basis.is_empty() => {
            if let Err(message) = rules::check_basis_number(basis, number) {
                errors.insert("basisNumber", message);
            }
        }
        _ => {}
    }
}

fn check_accompanying_persons(errors: &mut FieldErrors, candidate: &SubmissionCandidate) {
    let persons = candidate.persons();
    let declared = candidate.declared_person_count();

    if declared == 0 {
        return;
    }

    if declared != persons.len() {
        errors.insert(
            "accompanyingPersons",
            format!(
                "declared {declared} accompanying person(s) but {} provided",
                persons.len()
            ),
        );
    }

    for (index, person) in persons.iter().enumerate() {
        check_person(errors, index, person);
    }
}

fn check_person(errors: &mut FieldErrors, index: usize, person: &AccompanyingPersonInput) {
    let key = |field: &str| format!("accompanyingPersons[{index}].{field}");

    if text(&person.name).is_empty() {
        errors.insert(key("name"), "name is required");
    }
    check_national_id(errors, &key("idNumber"), text(&person.id_number));
    check_phone(errors, &key("phoneNumber"), text(&person.phone_number));
}
