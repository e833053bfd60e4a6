use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::clock::{Clock, SystemClock};
use super::domain::{
    optional_text, text, ApplicationNumber, DeletionReport, Page, SubmissionCandidate,
    SubmissionReceipt, UserRecord,
};
use super::labels::LabelConverter;
use super::numbering::{ApplicationNumberSource, RandomNumberSource};
use super::options::OptionRegistry;
use super::projection::{self, ApplicationView, OptionListing};
use super::repository::{
    NewApplication, PersonRow, RepositoryError, SafetyWorkRepository, SubmissionWrite,
};
use super::schedule::{parse_start_date, TimeSlot, WorkDuration, WorkWindow};
use super::validation::{decode_form, is_mobile_phone, validate_on, FieldErrors};

/// Default number of application-number attempts before a collision is surfaced.
pub const DEFAULT_NUMBER_ATTEMPTS: u32 = 5;

/// Result of deleting a single application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(DeletionReport),
    NotFound,
}

/// Service composing the validator, label converter and repository for the intake workflow.
pub struct SafetyWorkService<R> {
    repository: Arc<R>,
    converter: LabelConverter,
    numbers: Arc<dyn ApplicationNumberSource>,
    clock: Arc<dyn Clock>,
    number_attempts: u32,
}

impl<R> Clone for SafetyWorkService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            converter: self.converter.clone(),
            numbers: Arc::clone(&self.numbers),
            clock: Arc::clone(&self.clock),
            number_attempts: self.number_attempts,
        }
    }
}

impl<R> SafetyWorkService<R>
where
    R: SafetyWorkRepository + 'static,
{
    pub fn new(repository: Arc<R>, registry: Arc<OptionRegistry>) -> Self {
        Self {
            repository,
            converter: LabelConverter::new(registry),
            numbers: Arc::new(RandomNumberSource),
            clock: Arc::new(SystemClock),
            number_attempts: DEFAULT_NUMBER_ATTEMPTS,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_number_source(mut self, numbers: Arc<dyn ApplicationNumberSource>) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn with_number_attempts(mut self, attempts: u32) -> Self {
        self.number_attempts = attempts.max(1);
        self
    }

    pub fn converter(&self) -> &LabelConverter {
        &self.converter
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Decode a posted JSON body and submit it.
    ///
    /// Fields of the wrong JSON type are reported alongside every other validation problem.
    pub async fn submit_form(
        &self,
        body: serde_json::Value,
    ) -> Result<SubmissionReceipt, SafetyWorkError> {
        let (candidate, shape_errors) = decode_form(body);
        if shape_errors.is_empty() {
            return self.submit(candidate).await;
        }

        let mut errors = validate_on(&candidate, self.clock.now().date());
        errors.merge(shape_errors);
        debug!(problems = errors.len(), "safety work form rejected by type checks");
        Err(SafetyWorkError::Validation(errors))
    }

    /// Validate and persist a submission.
    ///
    /// The user, application, persons and both sync tables are written in one transaction. A
    /// colliding application number rolls that attempt back and is retried with a fresh number.
    pub async fn submit(
        &self,
        candidate: SubmissionCandidate,
    ) -> Result<SubmissionReceipt, SafetyWorkError> {
        let submitted_at = self.clock.now();

        let errors = validate_on(&candidate, submitted_at.date());
        if !errors.is_empty() {
            debug!(problems = errors.len(), "safety work submission rejected by validation");
            return Err(SafetyWorkError::Validation(errors));
        }

        let mut application = self.new_application(&candidate, submitted_at)?;
        let persons = person_rows(&candidate);

        for attempt in 1..=self.number_attempts {
            application.application_number = self
                .numbers
                .next_number(&application.phone_number, submitted_at);

            let write = SubmissionWrite {
                user_phone: application.phone_number.clone(),
                user_name: application.applicant_name.clone(),
                sync_head: projection::sync_head(&application, &self.converter),
                sync_persons: persons.clone(),
                persons: persons.clone(),
                application: application.clone(),
            };

            match self.repository.insert_submission(&write).await {
                Ok(application_id) => {
                    info!(
                        application_number = %application.application_number,
                        application_id,
                        accompanying_persons = persons.len(),
                        "safety work application submitted"
                    );
                    return Ok(SubmissionReceipt {
                        application_number: application.application_number,
                    });
                }
                Err(RepositoryError::Conflict) => {
                    warn!(
                        application_number = %application.application_number,
                        attempt,
                        "application number collided; regenerating"
                    );
                }
                Err(error) => return Err(self.fail("submit", error)),
            }
        }

        error!(
            attempts = self.number_attempts,
            "application number attempts exhausted"
        );
        Err(SafetyWorkError::Conflict)
    }

    /// Label-converted projection of one application.
    pub async fn get(&self, number: &ApplicationNumber) -> Result<ApplicationView, SafetyWorkError> {
        let stored = self
            .repository
            .fetch(number)
            .await
            .map_err(|error| self.fail("get", error))?
            .ok_or_else(|| SafetyWorkError::NotFound(format!("application {number}")))?;

        Ok(ApplicationView::project(&stored, &self.converter))
    }

    /// Applications submitted by the phone's user, most recent first.
    pub async fn history(
        &self,
        phone: &str,
        page: Page,
    ) -> Result<Vec<ApplicationView>, SafetyWorkError> {
        let phone = checked_phone(phone)?;

        let user = self
            .repository
            .find_user(phone)
            .await
            .map_err(|error| self.fail("history", error))?;
        if user.is_none() {
            return Err(SafetyWorkError::NotFound(format!("user {phone}")));
        }

        let stored = self
            .repository
            .history(phone, page)
            .await
            .map_err(|error| self.fail("history", error))?;

        Ok(stored
            .iter()
            .map(|application| ApplicationView::project(application, &self.converter))
            .collect())
    }

    /// A new submission candidate seeded from a past application.
    pub async fn prefill(
        &self,
        number: &ApplicationNumber,
    ) -> Result<SubmissionCandidate, SafetyWorkError> {
        let view = self.get(number).await?;
        Ok(view.prefill(&self.converter))
    }

    pub async fn delete(&self, number: &ApplicationNumber) -> Result<DeleteOutcome, SafetyWorkError> {
        let report = self
            .repository
            .delete(number)
            .await
            .map_err(|error| self.fail("delete", error))?;

        if report.is_empty() {
            debug!(application_number = %number, "delete requested for unknown application");
            return Ok(DeleteOutcome::NotFound);
        }

        info!(
            application_number = %number,
            rows_removed = report.rows_removed(),
            "safety work application deleted"
        );
        Ok(DeleteOutcome::Deleted(report))
    }

    /// Delete every application owned by the phone's user. Unknown users remove nothing.
    pub async fn delete_for_user(&self, phone: &str) -> Result<DeletionReport, SafetyWorkError> {
        let phone = checked_phone(phone)?;

        let report = self
            .repository
            .delete_for_user(phone)
            .await
            .map_err(|error| self.fail("delete_for_user", error))?;

        info!(
            applications = report.applications,
            accompanying_persons = report.accompanying_persons,
            "deleted safety work applications for user"
        );
        Ok(report)
    }

    /// Find or create the user for a phone number and stamp the login time.
    pub async fn lookup_user(
        &self,
        phone: &str,
        display_name: Option<&str>,
    ) -> Result<UserRecord, SafetyWorkError> {
        let phone = checked_phone(phone)?;
        let display_name = display_name.map(str::trim).filter(|name| !name.is_empty());

        let user = self
            .repository
            .touch_user(phone, display_name, self.clock.now())
            .await
            .map_err(|error| self.fail("lookup_user", error))?;

        info!(user_id = user.id, "safety work user signed in");
        Ok(user)
    }

    pub fn option_listing(&self) -> OptionListing {
        OptionListing::from_registry(self.converter.registry())
    }

    fn new_application(
        &self,
        candidate: &SubmissionCandidate,
        submitted_at: chrono::NaiveDateTime,
    ) -> Result<NewApplication, SafetyWorkError> {
        let start_date = parse_start_date(text(&candidate.start_date)).ok_or_else(|| {
            invariant("validated submission has no parsable start date")
        })?;
        let duration = WorkDuration::from_code(text(&candidate.working_hours)).ok_or_else(|| {
            invariant("validated submission has no recognised working hours")
        })?;
        let slot = TimeSlot::from_code(text(&candidate.start_time));
        let window = WorkWindow::new(start_date, slot, duration);

        if window.end <= window.start {
            return Err(invariant("work window does not end after it starts"));
        }

        let danger_types = candidate
            .hazards()
            .iter()
            .map(|code| code.trim())
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect();

        Ok(NewApplication {
            application_number: ApplicationNumber(String::new()),
            applicant_name: text(&candidate.name).to_string(),
            id_number: text(&candidate.id_number).to_string(),
            phone_number: text(&candidate.phone_number).to_string(),
            employee_number: optional_text(&candidate.employee_number),
            department: optional_text(&candidate.department),
            company_name: text(&candidate.company_name).to_string(),
            project_name: optional_text(&candidate.project_name),
            work_location: text(&candidate.work_location).to_string(),
            work_type: text(&candidate.work_type).to_string(),
            work_content: text(&candidate.work_content).to_string(),
            time_slot: slot.code().to_string(),
            working_hours: duration.code().to_string(),
            work_start: window.start,
            work_end: window.end,
            vehicle_number: optional_text(&candidate.vehicle_number),
            track_position: optional_text(&candidate.track_position),
            product_quantity: candidate.product_quantity.map(i64::from),
            work_basis: optional_text(&candidate.work_basis),
            basis_number: optional_text(&candidate.basis_number),
            danger_types,
            notifier_name: text(&candidate.notifier_name).to_string(),
            notifier_number: text(&candidate.notifier_number).to_string(),
            notifier_department: text(&candidate.notifier_department).to_string(),
            accompanying_count: person_rows(candidate).len() as i64,
            submitted_at,
        })
    }

    fn fail(&self, operation: &'static str, error: RepositoryError) -> SafetyWorkError {
        match &error {
            RepositoryError::Conflict => {
                warn!(operation, "unexpected conflict in safety work repository")
            }
            RepositoryError::Unavailable(detail) => {
                warn!(operation, detail = %detail, "safety work repository unavailable")
            }
            RepositoryError::Storage(detail) => {
                error!(operation, detail = %detail, "safety work repository failure")
            }
        }
        error.into()
    }
}

/// Rows sent alongside a declared count of zero are neither validated nor stored.
fn person_rows(candidate: &SubmissionCandidate) -> Vec<PersonRow> {
    if candidate.declared_person_count() == 0 {
        return Vec::new();
    }

    candidate
        .persons()
        .iter()
        .map(|person| PersonRow {
            name: text(&person.name).to_string(),
            id_number: text(&person.id_number).to_string(),
            phone_number: text(&person.phone_number).to_string(),
            employee_number: optional_text(&person.employee_number),
            department: optional_text(&person.department),
        })
        .collect()
}

fn checked_phone(phone: &str) -> Result<&str, SafetyWorkError> {
    let phone = phone.trim();
    if is_mobile_phone(phone) {
        return Ok(phone);
    }

    let mut errors = FieldErrors::new();
    errors.insert("phone", "phone number must be an 11-digit mobile number");
    Err(SafetyWorkError::Validation(errors))
}

fn invariant(detail: &str) -> SafetyWorkError {
    error!(detail, "safety work invariant violated");
    SafetyWorkError::Internal(detail.to_string())
}

/// Error raised by the safety work service.
#[derive(Debug, thiserror::Error)]
pub enum SafetyWorkError {
    #[error("{0}")]
    Validation(FieldErrors),
    #[error("{0} not found")]
    NotFound(String),
    #[error("application number could not be allocated")]
    Conflict,
    #[error("storage temporarily unavailable: {0}")]
    Unavailable(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl From<RepositoryError> for SafetyWorkError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict => SafetyWorkError::Conflict,
            RepositoryError::Unavailable(detail) => SafetyWorkError::Unavailable(detail),
            RepositoryError::Storage(detail) => SafetyWorkError::Internal(detail),
        }
    }
}
