use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use super::domain::{ApplicationNumber, DeletionReport, Page, UserRecord};

/// Primary application row as written by the submission transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub application_number: ApplicationNumber,
    pub applicant_name: String,
    pub id_number: String,
    pub phone_number: String,
    pub employee_number: Option<String>,
    pub department: Option<String>,
    pub company_name: String,
    pub project_name: Option<String>,
    pub work_location: String,
    pub work_type: String,
    pub work_content: String,
    pub time_slot: String,
    pub working_hours: String,
    pub work_start: NaiveDateTime,
    pub work_end: NaiveDateTime,
    pub vehicle_number: Option<String>,
    pub track_position: Option<String>,
    pub product_quantity: Option<i64>,
    pub work_basis: Option<String>,
    pub basis_number: Option<String>,
    pub danger_types: Vec<String>,
    pub notifier_name: String,
    pub notifier_number: String,
    pub notifier_department: String,
    pub accompanying_count: i64,
    pub submitted_at: NaiveDateTime,
}

/// Accompanying person columns, shared by the primary and sync person tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PersonRow {
    pub name: String,
    pub id_number: String,
    pub phone_number: String,
    pub employee_number: Option<String>,
    pub department: Option<String>,
}

/// Label-converted head row for external extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncHeadRow {
    pub application_number: ApplicationNumber,
    pub applicant_name: String,
    pub id_number: String,
    pub phone_number: String,
    pub employee_number: Option<String>,
    pub department: Option<String>,
    pub company_name: String,
    pub project_name: Option<String>,
    pub work_location: String,
    pub work_type: String,
    pub work_content: String,
    pub time_slot: String,
    pub working_hours: String,
    pub work_start: String,
    pub work_end: String,
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
    pub submitted_at: String,
}

/// Everything one submission writes, in write order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionWrite {
    pub user_phone: String,
    pub user_name: String,
    pub application: NewApplication,
    pub persons: Vec<PersonRow>,
    pub sync_head: SyncHeadRow,
    pub sync_persons: Vec<PersonRow>,
}

/// Application row as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ApplicationRecord {
    pub id: i64,
    pub application_number: String,
    pub user_id: Option<i64>,
    pub applicant_name: String,
    pub id_number: String,
    pub phone_number: String,
    pub employee_number: Option<String>,
    pub department: Option<String>,
    pub company_name: String,
    pub project_name: Option<String>,
    pub work_location: String,
    pub work_type: String,
    pub work_content: String,
    pub time_slot: String,
    pub working_hours: String,
    pub work_start: NaiveDateTime,
    pub work_end: NaiveDateTime,
    pub vehicle_number: Option<String>,
    pub track_position: Option<String>,
    pub product_quantity: Option<i64>,
    pub work_basis: Option<String>,
    pub basis_number: Option<String>,
    pub danger_types: Json<Vec<String>>,
    pub notifier_name: String,
    pub notifier_number: String,
    pub notifier_department: String,
    pub accompanying_count: i64,
    pub submitted_at: NaiveDateTime,
}

/// An application with its accompanying persons in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredApplication {
    pub record: ApplicationRecord,
    pub persons: Vec<PersonRow>,
}

/// Storage abstraction so the service module can be exercised in isolation.
#[async_trait]
pub trait SafetyWorkRepository: Send + Sync {
    /// Find or create the user and stamp the login time.
    async fn touch_user(
        &self,
        phone: &str,
        display_name: Option<&str>,
        at: NaiveDateTime,
    ) -> Result<UserRecord, RepositoryError>;

    async fn find_user(&self, phone: &str) -> Result<Option<UserRecord>, RepositoryError>;

    /// Write user, application, persons and sync rows atomically. Returns the application id.
    async fn insert_submission(&self, write: &SubmissionWrite) -> Result<i64, RepositoryError>;

    async fn fetch(
        &self,
        number: &ApplicationNumber,
    ) -> Result<Option<StoredApplication>, RepositoryError>;

    /// Applications owned by the phone's user, most recent first.
    async fn history(
        &self,
        phone: &str,
        page: Page,
    ) -> Result<Vec<StoredApplication>, RepositoryError>;

    async fn delete(&self, number: &ApplicationNumber) -> Result<DeletionReport, RepositoryError>;

    async fn delete_for_user(&self, phone: &str) -> Result<DeletionReport, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(database) if database.is_unique_violation() => {
                RepositoryError::Conflict
            }
            sqlx::Error::Database(database) if database.message().contains("locked") => {
                RepositoryError::Unavailable(error.to_string())
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::WorkerCrashed => RepositoryError::Unavailable(error.to_string()),
            _ => RepositoryError::Storage(error.to_string()),
        }
    }
}
