//! SQLite implementation of [`SafetyWorkRepository`].
//!
//! Writes and deletes run inside one transaction each. A transaction that is dropped before
//! `commit()`, whether through `?`, an error, or the timeout below, is rolled back and its
//! connection returned to the pool.
//!
//! Write transactions open with `BEGIN IMMEDIATE` so the write lock is taken before the first
//! read. A deferred transaction that reads and then writes cannot wait on `busy_timeout` when
//! another connection holds the lock, and fails at once with `SQLITE_BUSY`.
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::sqlite::SqliteConnection;
use sqlx::types::Json;

use super::domain::{ApplicationNumber, DeletionReport, Page, UserRecord};
use super::repository::{
    ApplicationRecord, NewApplication, PersonRow, RepositoryError, SafetyWorkRepository,
    StoredApplication, SubmissionWrite, SyncHeadRow,
};
use crate::db::Pool;

const APPLICATION_COLUMNS: &str = "
    id, application_number, user_id, applicant_name, id_number, phone_number,
    employee_number, department, company_name, project_name, work_location, work_type,
    work_content, time_slot, working_hours, work_start, work_end, vehicle_number,
    track_position, product_quantity, work_basis, basis_number, danger_types, notifier_name,
    notifier_number, notifier_department, accompanying_count, submitted_at
";

const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// SQL based persistent storage for safety work applications.
#[derive(Clone, Debug)]
pub struct SqlSafetyWorkRepository {
    pool: Pool,
    statement_timeout: Duration,
}

impl SqlSafetyWorkRepository {
    pub fn new(pool: Pool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn bounded<T, F>(&self, work: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>> + Send,
    {
        tokio::time::timeout(self.statement_timeout, work)
            .await
            .map_err(|_| {
                RepositoryError::Unavailable(format!(
                    "database operation exceeded {:?}",
                    self.statement_timeout
                ))
            })?
    }

    async fn write_submission(&self, write: &SubmissionWrite) -> Result<i64, RepositoryError> {
        let mut transaction = self.pool.begin_with(BEGIN_WRITE).await?;

        let user_id = find_or_create_user(
            &mut transaction,
            &write.user_phone,
            &write.user_name,
            write.application.submitted_at,
        )
        .await?;

        let application_id =
            insert_application(&mut transaction, user_id, &write.application).await?;

        for person in &write.persons {
            insert_person(&mut transaction, application_id, person).await?;
        }

        insert_sync_head(&mut transaction, &write.sync_head).await?;

        for person in &write.sync_persons {
            insert_sync_person(&mut transaction, &write.sync_head.application_number, person)
                .await?;
        }

        transaction.commit().await?;
        Ok(application_id)
    }

    async fn load(
        &self,
        number: &ApplicationNumber,
    ) -> Result<Option<StoredApplication>, RepositoryError> {
        let mut connection = self.pool.acquire().await?;

        let record = sqlx::query_as::<_, ApplicationRecord>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE application_number = ?"
        ))
        .bind(number.as_str())
        .fetch_optional(&mut *connection)
        .await?;

        match record {
            Some(record) => {
                let persons = persons_of(&mut connection, record.id).await?;
                Ok(Some(StoredApplication { record, persons }))
            }
            None => Ok(None),
        }
    }

    async fn load_history(
        &self,
        phone: &str,
        page: Page,
    ) -> Result<Vec<StoredApplication>, RepositoryError> {
        let mut connection = self.pool.acquire().await?;

        let records = sqlx::query_as::<_, ApplicationRecord>(&format!(
            "
            SELECT {APPLICATION_COLUMNS}
            FROM applications
            WHERE user_id = (SELECT id FROM users WHERE phone = ?)
            ORDER BY submitted_at DESC, id DESC
            LIMIT ? OFFSET ?
            "
        ))
        .bind(phone)
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&mut *connection)
        .await?;

        let mut applications = Vec::with_capacity(records.len());
        for record in records {
            let persons = persons_of(&mut connection, record.id).await?;
            applications.push(StoredApplication { record, persons });
        }

        Ok(applications)
    }

    async fn remove(&self, number: &ApplicationNumber) -> Result<DeletionReport, RepositoryError> {
        let mut transaction = self.pool.begin_with(BEGIN_WRITE).await?;

        let application_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM applications WHERE application_number = ?")
                .bind(number.as_str())
                .fetch_optional(&mut *transaction)
                .await?;

        let Some(application_id) = application_id else {
            return Ok(DeletionReport::default());
        };

        let accompanying_persons =
            sqlx::query("DELETE FROM accompanying_persons WHERE application_id = ?")
                .bind(application_id)
                .execute(&mut *transaction)
                .await?
                .rows_affected();

        let applications = sqlx::query("DELETE FROM applications WHERE id = ?")
            .bind(application_id)
            .execute(&mut *transaction)
            .await?
            .rows_affected();

        transaction.commit().await?;

        Ok(DeletionReport {
            applications,
            accompanying_persons,
        })
    }

    async fn remove_for_user(&self, phone: &str) -> Result<DeletionReport, RepositoryError> {
        let mut transaction = self.pool.begin_with(BEGIN_WRITE).await?;

        let accompanying_persons = sqlx::query(
            "
            DELETE FROM accompanying_persons
            WHERE application_id IN (
                SELECT applications.id
                FROM applications
                JOIN users ON users.id = applications.user_id
                WHERE users.phone = ?
            )
            ",
        )
        .bind(phone)
        .execute(&mut *transaction)
        .await?
        .rows_affected();

        let applications = sqlx::query(
            "DELETE FROM applications WHERE user_id = (SELECT id FROM users WHERE phone = ?)",
        )
        .bind(phone)
        .execute(&mut *transaction)
        .await?
        .rows_affected();

        transaction.commit().await?;

        Ok(DeletionReport {
            applications,
            accompanying_persons,
        })
    }
}

#[async_trait]
impl SafetyWorkRepository for SqlSafetyWorkRepository {
    async fn touch_user(
        &self,
        phone: &str,
        display_name: Option<&str>,
        at: NaiveDateTime,
    ) -> Result<UserRecord, RepositoryError> {
        self.bounded(async {
            let user = sqlx::query_as::<_, UserRecord>(
                "
                INSERT INTO users (phone, display_name, created_at, last_login_at)
                VALUES (?1, ?2, ?3, ?3)
                ON CONFLICT (phone) DO UPDATE SET
                    last_login_at = excluded.last_login_at,
                    display_name = COALESCE(excluded.display_name, users.display_name)
                RETURNING id, phone, display_name, created_at, last_login_at
                ",
            )
            .bind(phone)
            .bind(display_name)
            .bind(at)
            .fetch_one(&self.pool)
            .await?;
            Ok(user)
        })
        .await
    }

    async fn find_user(&self, phone: &str) -> Result<Option<UserRecord>, RepositoryError> {
        self.bounded(async {
            let user = sqlx::query_as::<_, UserRecord>(
                "SELECT id, phone, display_name, created_at, last_login_at FROM users WHERE phone = ?",
            )
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
            Ok(user)
        })
        .await
    }

    async fn insert_submission(&self, write: &SubmissionWrite) -> Result<i64, RepositoryError> {
        self.bounded(self.write_submission(write)).await
    }

    async fn fetch(
        &self,
        number: &ApplicationNumber,
    ) -> Result<Option<StoredApplication>, RepositoryError> {
        self.bounded(self.load(number)).await
    }

    async fn history(
        &self,
        phone: &str,
        page: Page,
    ) -> Result<Vec<StoredApplication>, RepositoryError> {
        self.bounded(self.load_history(phone, page)).await
    }

    async fn delete(&self, number: &ApplicationNumber) -> Result<DeletionReport, RepositoryError> {
        self.bounded(self.remove(number)).await
    }

    async fn delete_for_user(&self, phone: &str) -> Result<DeletionReport, RepositoryError> {
        self.bounded(self.remove_for_user(phone)).await
    }
}

async fn find_or_create_user(
    connection: &mut SqliteConnection,
    phone: &str,
    name: &str,
    at: NaiveDateTime,
) -> Result<i64, RepositoryError> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE phone = ?")
        .bind(phone)
        .fetch_optional(&mut *connection)
        .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let created = sqlx::query(
        "INSERT INTO users (phone, display_name, created_at, last_login_at) VALUES (?, ?, ?, ?)",
    )
    .bind(phone)
    .bind(name)
    .bind(at)
    .bind(at)
    .execute(&mut *connection)
    .await?;

    Ok(created.last_insert_rowid())
}

async fn insert_application(
    connection: &mut SqliteConnection,
    user_id: i64,
    application: &NewApplication,
) -> Result<i64, RepositoryError> {
    let inserted = sqlx::query(
        "
        INSERT INTO applications (
            application_number, user_id, applicant_name, id_number, phone_number,
            employee_number, department, company_name, project_name, work_location, work_type,
            work_content, time_slot, working_hours, work_start, work_end, vehicle_number,
            track_position, product_quantity, work_basis, basis_number, danger_types,
            notifier_name, notifier_number, notifier_department, accompanying_count, submitted_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(application.application_number.as_str())
    .bind(user_id)
    .bind(&application.applicant_name)
    .bind(&application.id_number)
    .bind(&application.phone_number)
    .bind(&application.employee_number)
    .bind(&application.department)
    .bind(&application.company_name)
    .bind(&application.project_name)
    .bind(&application.work_location)
    .bind(&application.work_type)
    .bind(&application.work_content)
    .bind(&application.time_slot)
    .bind(&application.working_hours)
    .bind(application.work_start)
    .bind(application.work_end)
    .bind(&application.vehicle_number)
    .bind(&application.track_position)
    .bind(application.product_quantity)
    .bind(&application.work_basis)
    .bind(&application.basis_number)
    .bind(Json(&application.danger_types))
    .bind(&application.notifier_name)
    .bind(&application.notifier_number)
    .bind(&application.notifier_department)
    .bind(application.accompanying_count)
    .bind(application.submitted_at)
    .execute(&mut *connection)
    .await?;

    Ok(inserted.last_insert_rowid())
}

async fn insert_person(
    connection: &mut SqliteConnection,
    application_id: i64,
    person: &PersonRow,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "
        INSERT INTO accompanying_persons (
            application_id, name, id_number, phone_number, employee_number, department
        )
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(application_id)
    .bind(&person.name)
    .bind(&person.id_number)
    .bind(&person.phone_number)
    .bind(&person.employee_number)
    .bind(&person.department)
    .execute(&mut *connection)
    .await?;

    Ok(())
}

async fn insert_sync_head(
    connection: &mut SqliteConnection,
    head: &SyncHeadRow,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "
        INSERT INTO sync_application_heads (
            application_number, applicant_name, id_number, phone_number, employee_number,
            department, company_name, project_name, work_location, work_type, work_content,
            time_slot, working_hours, work_start, work_end, vehicle_number, track_position,
            product_quantity, work_basis, basis_number, danger_types, notifier_name,
            notifier_number, notifier_department, accompanying_count, submitted_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(head.application_number.as_str())
    .bind(&head.applicant_name)
    .bind(&head.id_number)
    .bind(&head.phone_number)
    .bind(&head.employee_number)
    .bind(&head.department)
    .bind(&head.company_name)
    .bind(&head.project_name)
    .bind(&head.work_location)
    .bind(&head.work_type)
    .bind(&head.work_content)
    .bind(&head.time_slot)
    .bind(&head.working_hours)
    .bind(&head.work_start)
    .bind(&head.work_end)
    .bind(&head.vehicle_number)
    .bind(&head.track_position)
    .bind(head.product_quantity)
    .bind(&head.work_basis)
    .bind(&head.basis_number)
    .bind(&head.danger_types)
    .bind(&head.notifier_name)
    .bind(&head.notifier_number)
    .bind(&head.notifier_department)
    .bind(head.accompanying_count)
    .bind(&head.submitted_at)
    .execute(&mut *connection)
    .await?;

    Ok(())
}

async fn insert_sync_person(
    connection: &mut SqliteConnection,
    number: &ApplicationNumber,
    person: &PersonRow,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "
        INSERT INTO sync_accompanying_persons (
            application_number, name, id_number, phone_number, employee_number, department
        )
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(number.as_str())
    .bind(&person.name)
    .bind(&person.id_number)
    .bind(&person.phone_number)
    .bind(&person.employee_number)
    .bind(&person.department)
    .execute(&mut *connection)
    .await?;

    Ok(())
}

async fn persons_of(
    connection: &mut SqliteConnection,
    application_id: i64,
) -> Result<Vec<PersonRow>, RepositoryError> {
    let persons = sqlx::query_as::<_, PersonRow>(
        "
        SELECT name, id_number, phone_number, employee_number, department
        FROM accompanying_persons
        WHERE application_id = ?
        ORDER BY id ASC
        ",
    )
    .bind(application_id)
    .fetch_all(&mut *connection)
    .await?;

    Ok(persons)
}
