use std::sync::{Arc, Mutex};

use chrono::Duration;

use super::common::*;
use crate::workflows::safety_work::{
    ApplicationNumber, DeleteOutcome, FixedClock, OptionRegistry, Page, SafetyWorkError,
    SafetyWorkService, SubmissionCandidate,
};

#[tokio::test]
async fn submission_writes_primary_and_sync_rows() {
    let (service, pool) = memory_service().await;

    let receipt = service
        .submit(valid_candidate())
        .await
        .expect("valid submission is stored");
    let number = receipt.application_number.as_str();
    assert!(number.starts_with("SW20261018093000"), "{number}");
    assert_eq!(&number[16..20], "8000");

    let work_type: String =
        sqlx::query_scalar("SELECT work_type FROM applications WHERE application_number = ?")
            .bind(number)
            .fetch_one(&pool)
            .await
            .expect("application row");
    assert_eq!(work_type, "quality_rework");

    let (sync_type, sync_location, sync_hazards, submitted_at): (String, String, String, String) =
        sqlx::query_as(
            "
            SELECT work_type, work_location, danger_types, submitted_at
            FROM sync_application_heads
            WHERE application_number = ?
            ",
        )
        .bind(number)
        .fetch_one(&pool)
        .await
        .expect("sync head row");
    assert_eq!(sync_type, "质量返工");
    assert_eq!(sync_location, "老调试");
    assert!(sync_hazards.contains("登高作业"));
    assert_eq!(submitted_at, "2026/10/18 09:30:00");

    let (work_start, work_end, slot, hours): (String, String, String, String) = sqlx::query_as(
        "
        SELECT work_start, work_end, time_slot, working_hours
        FROM sync_application_heads
        WHERE application_number = ?
        ",
    )
    .bind(number)
    .fetch_one(&pool)
    .await
    .expect("sync schedule");
    assert_eq!(work_start, "2026-10-19 08:00");
    assert_eq!(work_end, "2026-10-19 12:00");
    assert_eq!(slot, "上午");
    assert_eq!(hours, "半天");

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM users").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM accompanying_persons").await, 0);
}

#[tokio::test]
async fn invalid_submission_writes_nothing() {
    let (service, pool) = memory_service().await;

    let candidate = SubmissionCandidate {
        start_date: Some("2026-10-17".to_string()),
        project_name: None,
        ..valid_candidate()
    };

    match service.submit(candidate).await {
        Err(SafetyWorkError::Validation(errors)) => {
            assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["projectName", "startDate"]);
            assert_eq!(errors.summary(), "2 problems found");
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM users").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM applications").await, 0);
}

#[tokio::test]
async fn failed_person_insert_rolls_back_every_table() {
    let (service, pool) = memory_service().await;
    sqlx::query(
        "
        CREATE TRIGGER reject_failing_person
        BEFORE INSERT ON accompanying_persons
        WHEN NEW.name = 'FAIL'
        BEGIN
            SELECT RAISE(ABORT, 'simulated fault');
        END
        ",
    )
    .execute(&pool)
    .await
    .expect("trigger installs");

    let numbers = Arc::new(ScriptedNumbers::new(&["SW-ATOMIC-0001"]));
    let service = service.with_number_source(numbers.clone());

    let mut persons = three_persons();
    persons[1].name = Some("FAIL".to_string());

    let error = service
        .submit(with_persons(persons))
        .await
        .expect_err("trigger aborts the write");
    assert!(matches!(error, SafetyWorkError::Internal(_)), "{error:?}");
    assert_eq!(numbers.issued(), vec!["SW-ATOMIC-0001".to_string()]);

    for sql in [
        "SELECT COUNT(*) FROM applications WHERE application_number = ?",
        "SELECT COUNT(*) FROM sync_application_heads WHERE application_number = ?",
        "SELECT COUNT(*) FROM sync_accompanying_persons WHERE application_number = ?",
    ] {
        assert_eq!(count_for(&pool, sql, "SW-ATOMIC-0001").await, 0, "{sql}");
    }
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM accompanying_persons").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM users").await, 0);

    let receipt = service
        .submit(with_persons(three_persons()))
        .await
        .expect("pool is usable after rollback");
    assert_eq!(receipt.application_number.as_str(), "SW-FALLBACK-001");
}

#[tokio::test]
async fn colliding_numbers_are_regenerated() {
    let (service, pool) = memory_service().await;
    let numbers = Arc::new(ScriptedNumbers::new(&[
        "SW-COLLIDE-0001",
        "SW-COLLIDE-0001",
        "SW-COLLIDE-0002",
    ]));
    let service = service.with_number_source(numbers.clone());

    let first = service.submit(valid_candidate()).await.expect("first commits");
    let second = service
        .submit(with_persons(three_persons()))
        .await
        .expect("second commits under a new number");

    assert_eq!(first.application_number.as_str(), "SW-COLLIDE-0001");
    assert_eq!(second.application_number.as_str(), "SW-COLLIDE-0002");
    assert_eq!(numbers.issued().len(), 3);

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM applications").await, 2);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM sync_application_heads").await, 2);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM accompanying_persons").await, 3);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM sync_accompanying_persons").await, 3);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM users").await, 1);
}

#[tokio::test]
async fn exhausted_number_attempts_surface_conflict() {
    let repository = Arc::new(AlwaysConflictRepository {
        attempts: Mutex::new(0),
    });
    let service = SafetyWorkService::new(repository.clone(), Arc::new(OptionRegistry::standard()))
        .with_clock(Arc::new(FixedClock(now())))
        .with_number_attempts(3);

    let error = service
        .submit(valid_candidate())
        .await
        .expect_err("every attempt collides");
    assert!(matches!(error, SafetyWorkError::Conflict));
    assert_eq!(*repository.attempts.lock().expect("attempts lock"), 3);
}

#[tokio::test]
async fn deleting_an_application_cascades_to_persons() {
    let (service, pool) = memory_service().await;
    let receipt = service
        .submit(with_persons(three_persons()))
        .await
        .expect("submission stored");

    let outcome = service
        .delete(&receipt.application_number)
        .await
        .expect("delete runs");
    match outcome {
        DeleteOutcome::Deleted(report) => {
            assert_eq!(report.applications, 1);
            assert_eq!(report.accompanying_persons, 3);
            assert_eq!(report.rows_removed(), 4);
        }
        DeleteOutcome::NotFound => panic!("application should exist"),
    }

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM applications").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM accompanying_persons").await, 0);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM sync_accompanying_persons").await,
        3,
        "sync rows are left for external consumers"
    );

    let again = service
        .delete(&receipt.application_number)
        .await
        .expect("second delete is not an error");
    assert_eq!(again, DeleteOutcome::NotFound);
}

#[tokio::test]
async fn deleting_unknown_number_is_not_found() {
    let (service, _pool) = memory_service().await;
    let outcome = service
        .delete(&ApplicationNumber("SW-DOES-NOT-EXIST".to_string()))
        .await
        .expect("delete runs");
    assert_eq!(outcome, DeleteOutcome::NotFound);
}

#[tokio::test]
async fn deleting_for_user_removes_only_their_applications() {
    let (service, pool) = memory_service().await;
    service.submit(with_persons(three_persons())).await.expect("first");
    service.submit(valid_candidate()).await.expect("second");
    service
        .submit(SubmissionCandidate {
            phone_number: Some("13912345678".to_string()),
            ..valid_candidate()
        })
        .await
        .expect("other user");

    let report = service
        .delete_for_user(APPLICANT_PHONE)
        .await
        .expect("bulk delete runs");
    assert_eq!(report.applications, 2);
    assert_eq!(report.accompanying_persons, 3);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM applications").await, 1);

    let nobody = service
        .delete_for_user("15900001111")
        .await
        .expect("unknown user removes nothing");
    assert_eq!(nobody.rows_removed(), 0);

    assert!(matches!(
        service.delete_for_user("not-a-phone").await,
        Err(SafetyWorkError::Validation(_))
    ));
}

#[tokio::test]
async fn history_lists_most_recent_first_with_labels() {
    let pool = memory_pool().await;
    let mut numbers = Vec::new();
    for (offset, hours) in [(0, "half_day"), (1, "overnight"), (2, "one_hour")] {
        let service = service_over(&pool)
            .with_clock(Arc::new(FixedClock(now() + Duration::minutes(offset))));
        let candidate = SubmissionCandidate {
            working_hours: Some(hours.to_string()),
            start_time: Some("evening".to_string()),
            danger_types: Some(vec!["hot_work".to_string(), "lifting".to_string()]),
            ..with_persons(three_persons())
        };
        numbers.push(service.submit(candidate).await.expect("stored").application_number);
    }

    let service = service_over(&pool);
    let history = service
        .history(APPLICANT_PHONE, Page::default())
        .await
        .expect("history loads");

    let listed: Vec<&str> = history
        .iter()
        .map(|view| view.application_number.as_str())
        .collect();
    assert_eq!(listed, vec![numbers[2].as_str(), numbers[1].as_str(), numbers[0].as_str()]);

    let latest = &history[0];
    assert_eq!(latest.working_hours_count, 1);
    assert_eq!(history[1].working_hours_count, 12);
    assert_eq!(history[2].working_hours_count, 4);
    assert_eq!(latest.work_type, "质量返工");
    assert_eq!(latest.work_content, "NCR返工");
    assert_eq!(latest.start_time, "晚上");
    assert_eq!(latest.danger_types, "动火作业，起重吊装");
    assert_eq!(latest.work_basis.as_deref(), Some("NCR"));
    assert_eq!(latest.submitted_at, "2026/10/18 09:32:00");
    let names: Vec<&str> = latest
        .accompanying_persons
        .iter()
        .map(|person| person.name.as_str())
        .collect();
    assert_eq!(names, vec!["王五", "赵六", "孙七"]);

    let page = service
        .history(APPLICANT_PHONE, Page::new(Some(1), Some(1)))
        .await
        .expect("page loads");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].application_number, numbers[1].as_str());
}

#[tokio::test]
async fn history_distinguishes_unknown_users_and_bad_phones() {
    let (service, _pool) = memory_service().await;

    assert!(matches!(
        service.history("15900001111", Page::default()).await,
        Err(SafetyWorkError::NotFound(_))
    ));
    match service.history("0551-1234", Page::default()).await {
        Err(SafetyWorkError::Validation(errors)) => assert!(errors.contains("phone")),
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn single_lookup_reports_missing_application() {
    let (service, _pool) = memory_service().await;
    let error = service
        .get(&ApplicationNumber("SW-MISSING".to_string()))
        .await
        .expect_err("nothing stored");
    assert!(matches!(error, SafetyWorkError::NotFound(_)));
}

#[tokio::test]
async fn prefill_recovers_codes_and_resubmits() {
    let (service, pool) = memory_service().await;
    let original = with_persons(three_persons());
    let receipt = service.submit(original.clone()).await.expect("stored");

    let prefilled = service
        .prefill(&receipt.application_number)
        .await
        .expect("prefill loads");

    assert_eq!(prefilled.start_date, None);
    assert_eq!(prefilled.work_location.as_deref(), Some("old_debugging"));
    assert_eq!(prefilled.work_type.as_deref(), Some("quality_rework"));
    assert_eq!(prefilled.work_content.as_deref(), Some("ncr_rework"));
    assert_eq!(prefilled.working_hours.as_deref(), Some("half_day"));
    assert_eq!(prefilled.start_time.as_deref(), Some("morning"));
    assert_eq!(prefilled.work_basis.as_deref(), Some("ncr"));
    assert_eq!(prefilled.danger_types, original.danger_types);
    assert_eq!(prefilled.accompanying_persons, original.accompanying_persons);

    let resubmitted = service
        .submit(SubmissionCandidate {
            start_date: Some(TOMORROW.to_string()),
            ..prefilled
        })
        .await
        .expect("prefilled form is submittable");
    assert_ne!(resubmitted.application_number, receipt.application_number);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM applications").await, 2);
}

#[tokio::test]
async fn prefill_keeps_free_text_content_and_none_hazard() {
    let (service, _pool) = memory_service().await;
    let receipt = service
        .submit(SubmissionCandidate {
            work_type: Some("other".to_string()),
            work_content: Some("清理废料".to_string()),
            danger_types: Some(vec!["none".to_string()]),
            ..valid_candidate()
        })
        .await
        .expect("stored");

    let view = service.get(&receipt.application_number).await.expect("view");
    assert_eq!(view.work_content, "清理废料");
    assert_eq!(view.danger_types, "无");

    let prefilled = service
        .prefill(&receipt.application_number)
        .await
        .expect("prefill loads");
    assert_eq!(prefilled.work_content.as_deref(), Some("清理废料"));
    assert_eq!(prefilled.danger_types, Some(vec!["none".to_string()]));
}

#[tokio::test]
async fn lookup_creates_then_touches_user() {
    let pool = memory_pool().await;

    let first = service_over(&pool)
        .lookup_user(APPLICANT_PHONE, Some("张三"))
        .await
        .expect("user created");
    assert_eq!(first.display_name.as_deref(), Some("张三"));
    assert_eq!(first.created_at, now());

    let later = now() + Duration::hours(3);
    let second = service_over(&pool)
        .with_clock(Arc::new(FixedClock(later)))
        .lookup_user(APPLICANT_PHONE, None)
        .await
        .expect("user touched");
    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, now());
    assert_eq!(second.last_login_at, later);
    assert_eq!(second.display_name.as_deref(), Some("张三"));

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM users").await, 1);
}

#[tokio::test]
async fn submission_reuses_looked_up_user() {
    let (service, pool) = memory_service().await;
    let user = service
        .lookup_user(APPLICANT_PHONE, None)
        .await
        .expect("user created");

    service.submit(valid_candidate()).await.expect("stored");

    let owner: i64 = sqlx::query_scalar("SELECT user_id FROM applications")
        .fetch_one(&pool)
        .await
        .expect("owner");
    assert_eq!(owner, user.id);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM users").await, 1);
}

#[tokio::test]
async fn option_listing_includes_fixed_sets() {
    let (service, _pool) = memory_service().await;
    let listing = serde_json::to_value(service.option_listing()).expect("serializes");

    assert_eq!(listing["workTypes"][0]["value"], "quality_rework");
    assert_eq!(listing["workContents"]["quality_rework"][0]["label"], "NCR返工");
    assert_eq!(listing["timeSlots"].as_array().map(Vec::len), Some(3));
    assert_eq!(listing["workDurations"].as_array().map(Vec::len), Some(6));
}

#[tokio::test]
async fn rows_sent_with_zero_declared_persons_are_not_stored() {
    let (service, pool) = memory_service().await;
    let candidate = SubmissionCandidate {
        accompanying_count: Some(0),
        accompanying_persons: Some(three_persons()),
        ..valid_candidate()
    };

    service.submit(candidate).await.expect("submission is stored");

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM applications").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM accompanying_persons").await, 0);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM sync_accompanying_persons").await,
        0
    );
}
