use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use std::sync::Arc;
use work_permit::config::DatabaseConfig;
use work_permit::db;
use work_permit::error::AppError;
use work_permit::workflows::safety_work::{
    AccompanyingPersonInput, ApplicationView, DeleteOutcome, OptionRegistry, Page,
    SafetyWorkError, SafetyWorkService, SqlSafetyWorkRepository, SubmissionCandidate,
};

const DEMO_PHONE: &str = "13800138000";

const DEMO_PERSONS: [(&str, &str, &str); 3] = [
    ("王五", "110101198505052345", "13912345678"),
    ("赵六", "320102199212123456", "15011112222"),
    ("孙七", "44030419880808567X", "18666667777"),
];

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Work start date (YYYY-MM-DD). Defaults to tomorrow.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start_date: Option<NaiveDate>,
    /// Number of accompanying persons to include (0-3).
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=3))]
    pub(crate) persons: u8,
    /// Print the stored projection as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        start_date,
        persons,
        json,
    } = args;

    let start_date = start_date.unwrap_or_else(|| Local::now().date_naive() + Duration::days(1));

    let config = DatabaseConfig::in_memory();
    let pool = db::prepare(&config).await?;
    let repository = SqlSafetyWorkRepository::new(pool.clone(), config.statement_timeout);
    let service =
        SafetyWorkService::new(Arc::new(repository), Arc::new(OptionRegistry::standard()));

    println!("Safety work permit demo");

    let rejected = SubmissionCandidate {
        vehicle_number: None,
        basis_number: Some("REWORK-001".to_string()),
        ..demo_candidate(start_date, 0)
    };
    match service.submit(rejected).await {
        Err(SafetyWorkError::Validation(errors)) => {
            println!("\nRejected draft: {}", errors.summary());
            for field in errors.fields() {
                println!("  - {field}: {}", errors.get(field).unwrap_or_default());
            }
        }
        other => println!("\nUnexpected result for rejected draft: {other:?}"),
    }

    let receipt = match service.submit(demo_candidate(start_date, persons)).await {
        Ok(receipt) => receipt,
        Err(err) => {
            println!("\nSubmission failed: {err}");
            pool.close().await;
            return Ok(());
        }
    };
    println!("\nSubmitted application {}", receipt.application_number);

    match service.history(DEMO_PHONE, Page::default()).await {
        Ok(history) => {
            println!("\nHistory for {DEMO_PHONE} ({} application(s))", history.len());
            for view in &history {
                render_view(view, json);
            }
        }
        Err(err) => println!("\nHistory unavailable: {err}"),
    }

    match service.prefill(&receipt.application_number).await {
        Ok(prefill) => println!(
            "\nPre-fill recovers codes: location={} type={} content={} hazards={:?}",
            prefill.work_location.as_deref().unwrap_or("-"),
            prefill.work_type.as_deref().unwrap_or("-"),
            prefill.work_content.as_deref().unwrap_or("-"),
            prefill.danger_types.unwrap_or_default()
        ),
        Err(err) => println!("\nPre-fill unavailable: {err}"),
    }

    match service.delete(&receipt.application_number).await {
        Ok(DeleteOutcome::Deleted(report)) => println!(
            "\nDeleted {} application(s) and {} accompanying person(s)",
            report.applications, report.accompanying_persons
        ),
        Ok(DeleteOutcome::NotFound) => println!("\nApplication already removed"),
        Err(err) => println!("\nDelete failed: {err}"),
    }

    pool.close().await;
    Ok(())
}

fn demo_candidate(start_date: NaiveDate, persons: u8) -> SubmissionCandidate {
    let persons: Vec<AccompanyingPersonInput> = DEMO_PERSONS
        .iter()
        .take(usize::from(persons))
        .map(|(name, id_number, phone)| AccompanyingPersonInput {
            name: Some(name.to_string()),
            id_number: Some(id_number.to_string()),
            phone_number: Some(phone.to_string()),
            ..AccompanyingPersonInput::default()
        })
        .collect();

    SubmissionCandidate {
        name: Some("张三".to_string()),
        id_number: Some("110101199001011234".to_string()),
        phone_number: Some(DEMO_PHONE.to_string()),
        company_name: Some("示例公司A".to_string()),
        start_date: Some(start_date.format("%Y-%m-%d").to_string()),
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
        danger_types: Some(vec!["high_altitude".to_string(), "hot_work".to_string()]),
        notifier_name: Some("李四".to_string()),
        notifier_number: Some("123456789012".to_string()),
        notifier_department: Some("安全部".to_string()),
        accompanying_count: Some(persons.len() as u32),
        accompanying_persons: Some(persons),
        ..SubmissionCandidate::default()
    }
}

fn render_view(view: &ApplicationView, json: bool) {
    if json {
        match serde_json::to_string_pretty(view) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => println!("  (unable to render JSON: {err})"),
        }
        return;
    }

    println!(
        "- {} | submitted {} | {} / {} / {}",
        view.application_number,
        view.submitted_at,
        view.work_location,
        view.work_type,
        view.work_content
    );
    println!(
        "  {} -> {} ({} h, {} {}) | hazards: {}",
        view.work_start,
        view.work_end,
        view.working_hours_count,
        view.start_time,
        view.working_hours,
        view.danger_types
    );
    for person in &view.accompanying_persons {
        println!("  with {} ({})", person.name, person.phone_number);
    }
}
