use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use work_permit::config::DatabaseConfig;
use work_permit::db;
use work_permit::workflows::safety_work::{
    DeleteOutcome, FixedClock, OptionRegistry, Page, SafetyWorkService, SqlSafetyWorkRepository,
    SubmissionCandidate,
};

#[tokio::test]
async fn quality_rework_submission_end_to_end() {
    let config = DatabaseConfig::in_memory();
    let pool = db::prepare(&config).await.expect("database prepares");
    let repository = SqlSafetyWorkRepository::new(pool.clone(), config.statement_timeout);
    let submitted_at = NaiveDate::from_ymd_opt(2026, 10, 18)
        .and_then(|date| date.and_hms_opt(16, 45, 10))
        .expect("valid timestamp");
    let service = SafetyWorkService::new(Arc::new(repository), Arc::new(OptionRegistry::standard()))
        .with_clock(Arc::new(FixedClock(submitted_at)));

    let candidate: SubmissionCandidate = serde_json::from_value(json!({
        "name": "张三",
        "idNumber": "110101199001011234",
        "companyName": "示例公司A",
        "phoneNumber": "13800138000",
        "startDate": "2026-10-19",
        "startTime": "morning",
        "workingHours": "half_day",
        "workLocation": "old_debugging",
        "workType": "quality_rework",
        "workContent": "ncr_rework",
        "projectName": "项目Alpha",
        "vehicleNumber": "V001",
        "trackPosition": "T1",
        "workBasis": "ncr",
        "basisNumber": "NCR-001",
        "dangerTypes": ["high_altitude"],
        "notifierName": "李四",
        "notifierNumber": "123456789012",
        "notifierDepartment": "安全部",
        "accompanyingCount": 0
    }))
    .expect("form payload deserializes");

    let receipt = service.submit(candidate).await.expect("submission succeeds");
    let number = receipt.application_number.clone();
    assert!(number.as_str().starts_with("SW20261018164510"));

    let work_type: String =
        sqlx::query_scalar("SELECT work_type FROM applications WHERE application_number = ?")
            .bind(number.as_str())
            .fetch_one(&pool)
            .await
            .expect("application row");
    assert_eq!(work_type, "quality_rework");

    let (sync_type, sync_location, sync_hazards): (String, String, String) = sqlx::query_as(
        "SELECT work_type, work_location, danger_types FROM sync_application_heads WHERE application_number = ?",
    )
    .bind(number.as_str())
    .fetch_one(&pool)
    .await
    .expect("sync head row");
    assert_eq!(sync_type, "质量返工");
    assert_eq!(sync_location, "老调试");
    assert!(sync_hazards.contains("登高作业"));

    let history = service
        .history("13800138000", Page::default())
        .await
        .expect("history loads");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].work_start, "2026-10-19 08:00");
    assert_eq!(history[0].work_end, "2026-10-19 12:00");
    assert_eq!(history[0].working_hours_count, 4);

    let outcome = service.delete(&number).await.expect("delete runs");
    assert!(matches!(outcome, DeleteOutcome::Deleted(report) if report.rows_removed() == 1));

    pool.close().await;
}
