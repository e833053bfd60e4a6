use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::domain::{AccompanyingPersonInput, SubmissionCandidate};
use super::labels::LabelConverter;
use super::options::{OptionCatalog, OptionEntry, OptionKind, OptionRegistry, NO_HAZARD};
use super::repository::{NewApplication, PersonRow, StoredApplication, SyncHeadRow};
use super::schedule::{TimeSlot, WorkDuration};

/// Display format for submit timestamps (zh-CN locale style).
pub const SUBMITTED_AT_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Display format for work start and end.
pub const WORK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Label-converted application, shaped like the submission form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    pub application_number: String,
    pub submitted_at: String,
    pub name: String,
    pub id_number: String,
    pub phone_number: String,
    pub employee_number: Option<String>,
    pub department: Option<String>,
    pub company_name: String,
    pub project_name: Option<String>,
    pub work_location: String,
    pub work_type: String,
    pub work_content: String,
    pub start_date: String,
    pub start_time: String,
    pub working_hours: String,
    pub work_start: String,
    pub work_end: String,
    /// Whole hours between work start and end.
    pub working_hours_count: i64,
    pub vehicle_number: Option<String>,
    pub track_position: Option<String>,
    pub product_quantity: Option<i64>,
    pub work_basis: Option<String>,
    pub basis_number: Option<String>,
    pub danger_types: String,
    pub notifier_name: String,
    pub notifier_number: String,
    pub notifier_department: String,
    pub accompanying_count: i64,
    pub accompanying_persons: Vec<PersonView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonView {
    pub name: String,
    pub id_number: String,
    pub phone_number: String,
    pub employee_number: Option<String>,
    pub department: Option<String>,
}

impl From<&PersonRow> for PersonView {
    fn from(row: &PersonRow) -> Self {
        Self {
            name: row.name.clone(),
            id_number: row.id_number.clone(),
            phone_number: row.phone_number.clone(),
            employee_number: row.employee_number.clone(),
            department: row.department.clone(),
        }
    }
}

pub fn format_submitted_at(at: NaiveDateTime) -> String {
    at.format(SUBMITTED_AT_FORMAT).to_string()
}

fn format_work_time(at: NaiveDateTime) -> String {
    at.format(WORK_TIME_FORMAT).to_string()
}

impl ApplicationView {
    pub fn project(stored: &StoredApplication, converter: &LabelConverter) -> Self {
        let record = &stored.record;

        Self {
            application_number: record.application_number.clone(),
            submitted_at: format_submitted_at(record.submitted_at),
            name: record.applicant_name.clone(),
            id_number: record.id_number.clone(),
            phone_number: record.phone_number.clone(),
            employee_number: record.employee_number.clone(),
            department: record.department.clone(),
            company_name: record.company_name.clone(),
            project_name: record.project_name.clone(),
            work_location: converter.label(OptionKind::WorkLocation, &record.work_location),
            work_type: converter.label(OptionKind::WorkType, &record.work_type),
            work_content: converter.work_content_label(&record.work_type, &record.work_content),
            start_date: record.work_start.date().format("%Y-%m-%d").to_string(),
            start_time: converter.time_slot_label(&record.time_slot),
            working_hours: converter.duration_label(&record.working_hours),
            work_start: format_work_time(record.work_start),
            work_end: format_work_time(record.work_end),
            working_hours_count: (record.work_end - record.work_start).num_hours(),
            vehicle_number: record.vehicle_number.clone(),
            track_position: record.track_position.clone(),
            product_quantity: record.product_quantity,
            work_basis: record
                .work_basis
                .as_deref()
                .map(|basis| converter.label(OptionKind::WorkBasis, basis)),
            basis_number: record.basis_number.clone(),
            danger_types: converter.hazard_display(&record.danger_types.0),
            notifier_name: record.notifier_name.clone(),
            notifier_number: record.notifier_number.clone(),
            notifier_department: record.notifier_department.clone(),
            accompanying_count: record.accompanying_count,
            accompanying_persons: stored.persons.iter().map(PersonView::from).collect(),
        }
    }

    /// Turn a historical record back into form input for a new submission.
    ///
    /// Labels resolve to codes (work type before work content), the start date is cleared, and
    /// a "none" hazard display becomes the explicit "none" selection. Work content that has no
    /// matching option is free text and is kept verbatim.
    pub fn prefill(&self, converter: &LabelConverter) -> SubmissionCandidate {
        let work_type = converter.code(OptionKind::WorkType, &self.work_type);
        let work_content = match converter.work_content_code(&work_type, &self.work_content) {
            code if code.is_empty() => self.work_content.clone(),
            code => code,
        };

        let mut hazards = converter.hazard_codes(&self.danger_types);
        if hazards.is_empty() {
            hazards.push(NO_HAZARD.to_string());
        }

        let persons: Vec<AccompanyingPersonInput> = self
            .accompanying_persons
            .iter()
            .map(|person| AccompanyingPersonInput {
                name: Some(person.name.clone()),
                id_number: Some(person.id_number.clone()),
                phone_number: Some(person.phone_number.clone()),
                employee_number: person.employee_number.clone(),
                department: person.department.clone(),
            })
            .collect();

        SubmissionCandidate {
            name: Some(self.name.clone()),
            id_number: Some(self.id_number.clone()),
            phone_number: Some(self.phone_number.clone()),
            employee_number: self.employee_number.clone(),
            department: self.department.clone(),
            company_name: Some(self.company_name.clone()),
            project_name: self.project_name.clone(),
            work_location: non_empty(converter.code(OptionKind::WorkLocation, &self.work_location)),
            work_type: non_empty(work_type),
            work_content: non_empty(work_content),
            start_date: None,
            start_time: non_empty(converter.time_slot_code(&self.start_time)),
            working_hours: non_empty(converter.duration_code(&self.working_hours)),
            vehicle_number: self.vehicle_number.clone(),
            track_position: self.track_position.clone(),
            product_quantity: self
                .product_quantity
                .and_then(|quantity| u32::try_from(quantity).ok()),
            work_basis: self
                .work_basis
                .as_deref()
                .and_then(|label| non_empty(converter.code(OptionKind::WorkBasis, label))),
            basis_number: self.basis_number.clone(),
            danger_types: Some(hazards),
            notifier_name: Some(self.notifier_name.clone()),
            notifier_number: Some(self.notifier_number.clone()),
            notifier_department: Some(self.notifier_department.clone()),
            accompanying_count: u32::try_from(persons.len()).ok(),
            accompanying_persons: Some(persons),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Label-converted head row written alongside the primary application.
pub fn sync_head(application: &NewApplication, converter: &LabelConverter) -> SyncHeadRow {
    SyncHeadRow {
        application_number: application.application_number.clone(),
        applicant_name: application.applicant_name.clone(),
        id_number: application.id_number.clone(),
        phone_number: application.phone_number.clone(),
        employee_number: application.employee_number.clone(),
        department: application.department.clone(),
        company_name: application.company_name.clone(),
        project_name: application.project_name.clone(),
        work_location: converter.label(OptionKind::WorkLocation, &application.work_location),
        work_type: converter.label(OptionKind::WorkType, &application.work_type),
        work_content: converter
            .work_content_label(&application.work_type, &application.work_content),
        time_slot: converter.time_slot_label(&application.time_slot),
        working_hours: converter.duration_label(&application.working_hours),
        work_start: format_work_time(application.work_start),
        work_end: format_work_time(application.work_end),
        vehicle_number: application.vehicle_number.clone(),
        track_position: application.track_position.clone(),
        product_quantity: application.product_quantity,
        work_basis: application
            .work_basis
            .as_deref()
            .map(|basis| converter.label(OptionKind::WorkBasis, basis)),
        basis_number: application.basis_number.clone(),
        danger_types: converter.hazard_display(&application.danger_types),
        notifier_name: application.notifier_name.clone(),
        notifier_number: application.notifier_number.clone(),
        notifier_department: application.notifier_department.clone(),
        accompanying_count: application.accompanying_count,
        submitted_at: format_submitted_at(application.submitted_at),
    }
}

/// Every option set a form client needs, including the fixed time slots and durations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionListing {
    #[serde(flatten)]
    pub catalog: OptionCatalog,
    pub time_slots: Vec<OptionEntry>,
    pub work_durations: Vec<OptionEntry>,
}

impl OptionListing {
    pub fn from_registry(registry: &OptionRegistry) -> Self {
        Self {
            catalog: registry.catalog().clone(),
            time_slots: TimeSlot::ALL
                .into_iter()
                .map(|slot| OptionEntry::new(slot.code(), slot.label()))
                .collect(),
            work_durations: WorkDuration::ALL
                .into_iter()
                .map(|duration| OptionEntry::new(duration.code(), duration.label()))
                .collect(),
        }
    }
}
