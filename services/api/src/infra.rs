use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use work_permit::config::{AppConfig, IntakeConfig};
use work_permit::db::Pool;
use work_permit::error::AppError;
use work_permit::workflows::safety_work::{
    OptionRegistry, SafetyWorkService, SqlSafetyWorkRepository,
};

pub(crate) type IntakeService = SafetyWorkService<SqlSafetyWorkRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Built-in catalog, or the JSON replacement named by `PERMIT_OPTIONS_PATH`.
pub(crate) fn option_registry(intake: &IntakeConfig) -> Result<OptionRegistry, AppError> {
    match &intake.options_path {
        Some(path) => {
            let registry = OptionRegistry::from_path(path)?;
            info!(path = %path.display(), "loaded option catalog");
            Ok(registry)
        }
        None => Ok(OptionRegistry::standard()),
    }
}

pub(crate) fn intake_service(config: &AppConfig, pool: Pool) -> Result<IntakeService, AppError> {
    let registry = option_registry(&config.intake)?;
    let repository = SqlSafetyWorkRepository::new(pool, config.database.statement_timeout);

    Ok(
        SafetyWorkService::new(Arc::new(repository), Arc::new(registry))
            .with_number_attempts(config.intake.number_attempts),
    )
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
