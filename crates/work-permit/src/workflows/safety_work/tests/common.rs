use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::config::DatabaseConfig;
use crate::db::{self, Pool};
use crate::workflows::safety_work::repository::{
    RepositoryError, SafetyWorkRepository, StoredApplication, SubmissionWrite,
};
use crate::workflows::safety_work::{
    AccompanyingPersonInput, ApplicationNumber, ApplicationNumberSource, DeletionReport,
    FixedClock, OptionRegistry, Page, SafetyWorkService, SqlSafetyWorkRepository,
    SubmissionCandidate, UserRecord,
};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).expect("valid date")
}

pub(super) fn now() -> NaiveDateTime {
    today().and_hms_opt(9, 30, 0).expect("valid time")
}

pub(super) const TOMORROW: &str = "2026-10-19";

pub(super) const APPLICANT_PHONE: &str = "13800138000";

/// The quality-rework submission used throughout the intake tests.
pub(super) fn valid_candidate() -> SubmissionCandidate {
    SubmissionCandidate {
        name: Some("张三".to_string()),
        id_number: Some("110101199001011234".to_string()),
        phone_number: Some(APPLICANT_PHONE.to_string()),
        company_name: Some("示例公司A".to_string()),
        start_date: Some(TOMORROW.to_string()),
        start_time: Some("morning".to_string()),
        working_hours: Some("half_day".to_string()),
        work_location: Some("old_debugging".to_string()),
        work_type: Some("quality_rework".to_string()),
        work_content: Some("ncr_rework".to_string()),
        project_name: Some("项目Alpha".to_string()),
        vehicle_number: Some("V001".to_string()),
        track_position: Some("T1".to_string()),
        work_basis: Some("ncr".to_string()),
        basis_number: Some("NCR-001".to_string()),
        danger_types: Some(vec!["high_altitude".to_string()]),
        notifier_name: Some("李四".to_string()),
        notifier_number: Some("123456789012".to_string()),
        notifier_department: Some("安全部".to_string()),
        accompanying_count: Some(0),
        ..SubmissionCandidate::default()
    }
}

pub(super) fn person(name: &str, id_number: &str, phone: &str) -> AccompanyingPersonInput {
    AccompanyingPersonInput {
        name: Some(name.to_string()),
        id_number: Some(id_number.to_string()),
        phone_number: Some(phone.to_string()),
        ..AccompanyingPersonInput::default()
    }
}

pub(super) fn three_persons() -> Vec<AccompanyingPersonInput> {
    vec![
        person("王五", "110101198505052345", "13912345678"),
        person("赵六", "320102199212123456", "15011112222"),
        person("孙七", "44030419880808567X", "18666667777"),
    ]
}

pub(super) fn with_persons(persons: Vec<AccompanyingPersonInput>) -> SubmissionCandidate {
    SubmissionCandidate {
        accompanying_count: Some(persons.len() as u32),
        accompanying_persons: Some(persons),
        ..valid_candidate()
    }
}

pub(super) async fn memory_pool() -> Pool {
    db::prepare(&DatabaseConfig::in_memory())
        .await
        .expect("in-memory database prepares")
}

pub(super) fn service_over(pool: &Pool) -> SafetyWorkService<SqlSafetyWorkRepository> {
    let repository = SqlSafetyWorkRepository::new(pool.clone(), DatabaseConfig::in_memory().statement_timeout);
    SafetyWorkService::new(Arc::new(repository), Arc::new(OptionRegistry::standard()))
        .with_clock(Arc::new(FixedClock(now())))
}

pub(super) async fn memory_service() -> (SafetyWorkService<SqlSafetyWorkRepository>, Pool) {
    let pool = memory_pool().await;
    (service_over(&pool), pool)
}

pub(super) async fn count(pool: &Pool, sql: &str) -> i64 {
    sqlx::query_scalar(sql)
        .fetch_one(pool)
        .await
        .expect("count query runs")
}

pub(super) async fn count_for(pool: &Pool, sql: &str, number: &str) -> i64 {
    sqlx::query_scalar(sql)
        .bind(number)
        .fetch_one(pool)
        .await
        .expect("count query runs")
}

pub(super) async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Hands out scripted numbers in order, then numbered fallbacks.
#[derive(Debug, Default)]
pub(super) struct ScriptedNumbers {
    scripted: Mutex<VecDeque<String>>,
    issued: Mutex<Vec<String>>,
}

impl ScriptedNumbers {
    pub(super) fn new(numbers: &[&str]) -> Self {
        Self {
            scripted: Mutex::new(numbers.iter().map(|number| number.to_string()).collect()),
            issued: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn issued(&self) -> Vec<String> {
        self.issued.lock().expect("issued lock").clone()
    }
}

impl ApplicationNumberSource for ScriptedNumbers {
    fn next_number(&self, _phone: &str, _submitted_at: NaiveDateTime) -> ApplicationNumber {
        let mut issued = self.issued.lock().expect("issued lock");
        let number = self
            .scripted
            .lock()
            .expect("scripted lock")
            .pop_front()
            .unwrap_or_else(|| format!("SW-FALLBACK-{:03}", issued.len()));
        issued.push(number.clone());
        ApplicationNumber(number)
    }
}

/// Repository whose every call fails as if the database were unreachable.
pub(super) struct UnavailableRepository;

fn unreachable_database() -> RepositoryError {
    RepositoryError::Unavailable("connection refused by 10.0.0.5:5432".to_string())
}

#[async_trait]
impl SafetyWorkRepository for UnavailableRepository {
    async fn touch_user(
        &self,
        _phone: &str,
        _display_name: Option<&str>,
        _at: NaiveDateTime,
    ) -> Result<UserRecord, RepositoryError> {
        Err(unreachable_database())
    }

    async fn find_user(&self, _phone: &str) -> Result<Option<UserRecord>, RepositoryError> {
        Err(unreachable_database())
    }

    async fn insert_submission(&self, _write: &SubmissionWrite) -> Result<i64, RepositoryError> {
        Err(unreachable_database())
    }

    async fn fetch(
        &self,
        _number: &ApplicationNumber,
    ) -> Result<Option<StoredApplication>, RepositoryError> {
        Err(unreachable_database())
    }

    async fn history(
        &self,
        _phone: &str,
        _page: Page,
    ) -> Result<Vec<StoredApplication>, RepositoryError> {
        Err(unreachable_database())
    }

    async fn delete(&self, _number: &ApplicationNumber) -> Result<DeletionReport, RepositoryError> {
        Err(unreachable_database())
    }

    async fn delete_for_user(&self, _phone: &str) -> Result<DeletionReport, RepositoryError> {
        Err(unreachable_database())
    }
}

/// Repository that reports a unique-key collision for every write.
pub(super) struct AlwaysConflictRepository {
    pub(super) attempts: Mutex<u32>,
}

#[async_trait]
impl SafetyWorkRepository for AlwaysConflictRepository {
    async fn touch_user(
        &self,
        _phone: &str,
        _display_name: Option<&str>,
        _at: NaiveDateTime,
    ) -> Result<UserRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    async fn find_user(&self, _phone: &str) -> Result<Option<UserRecord>, RepositoryError> {
        Ok(None)
    }

    async fn insert_submission(&self, _write: &SubmissionWrite) -> Result<i64, RepositoryError> {
        *self.attempts.lock().expect("attempts lock") += 1;
        Err(RepositoryError::Conflict)
    }

    async fn fetch(
        &self,
        _number: &ApplicationNumber,
    ) -> Result<Option<StoredApplication>, RepositoryError> {
        Ok(None)
    }

    async fn history(
        &self,
        _phone: &str,
        _page: Page,
    ) -> Result<Vec<StoredApplication>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _number: &ApplicationNumber) -> Result<DeletionReport, RepositoryError> {
        Ok(DeletionReport::default())
    }

    async fn delete_for_user(&self, _phone: &str) -> Result<DeletionReport, RepositoryError> {
        Ok(DeletionReport::default())
    }
}
