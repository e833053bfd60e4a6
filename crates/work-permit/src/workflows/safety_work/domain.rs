use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// System-generated identifier of a submitted application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationNumber(pub String);

impl ApplicationNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Form payload as posted by the client. Every field is optional so the validator reports what
/// is missing. Bodies from the wire go through `decode_form`, which also reports wrongly typed
/// fields instead of failing the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmissionCandidate {
    pub name: Option<String>,
    pub id_number: Option<String>,
    pub phone_number: Option<String>,
    pub employee_number: Option<String>,
    pub department: Option<String>,
    pub company_name: Option<String>,
    pub project_name: Option<String>,
    pub work_location: Option<String>,
    pub work_type: Option<String>,
    pub work_content: Option<String>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub working_hours: Option<String>,
    pub vehicle_number: Option<String>,
    pub track_position: Option<String>,
    pub product_quantity: Option<u32>,
    pub work_basis: Option<String>,
    pub basis_number: Option<String>,
    pub danger_types: Option<Vec<String>>,
    pub notifier_name: Option<String>,
    pub notifier_number: Option<String>,
    pub notifier_department: Option<String>,
    pub accompanying_count: Option<u32>,
    pub accompanying_persons: Option<Vec<AccompanyingPersonInput>>,
}

impl SubmissionCandidate {
    pub fn persons(&self) -> &[AccompanyingPersonInput] {
        self.accompanying_persons.as_deref().unwrap_or(&[])
    }

    pub fn hazards(&self) -> &[String] {
        self.danger_types.as_deref().unwrap_or(&[])
    }

    /// Declared person count, falling back to the number of rows sent.
    pub fn declared_person_count(&self) -> usize {
        self.accompanying_count
            .map(|count| count as usize)
            .unwrap_or_else(|| self.persons().len())
    }
}

/// One accompanying worker as posted by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccompanyingPersonInput {
    pub name: Option<String>,
    pub id_number: Option<String>,
    pub phone_number: Option<String>,
    pub employee_number: Option<String>,
    pub department: Option<String>,
}

/// Trimmed text, `""` when absent.
pub(crate) fn text(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

/// Trimmed text, `None` when absent or blank.
pub(crate) fn optional_text(value: &Option<String>) -> Option<String> {
    match text(value) {
        "" => None,
        trimmed => Some(trimmed.to_string()),
    }
}

/// Stored user, keyed by phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,
    pub phone: String,
    pub display_name: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_login_at: NaiveDateTime,
}

/// Successful submission result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub application_number: ApplicationNumber,
}

/// Rows removed by a delete operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub applications: u64,
    pub accompanying_persons: u64,
}

impl DeletionReport {
    pub fn rows_removed(&self) -> u64 {
        self.applications + self.accompanying_persons
    }

    pub fn is_empty(&self) -> bool {
        self.applications == 0
    }
}

/// Offset pagination for history listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
