use chrono::NaiveDate;
use loanflow::config::RateConfig;
use loanflow::error::AppError;
use loanflow::workflows::lending::applications::{
    ApplicationId, LoanApplicationRecord, LoanApplicationRepository, LoanApplicationStatus,
    LoanNotification, NotificationError, NotificationPublisher, RepositoryError,
};
use loanflow::workflows::lending::RateSchedule;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLoanApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, LoanApplicationRecord>>>,
}

impl LoanApplicationRepository for InMemoryLoanApplicationRepository {
    fn insert(
        &self,
        record: LoanApplicationRecord,
    ) -> Result<LoanApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.application_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.application_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: LoanApplicationRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.application_id) {
            guard.insert(record.application_id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn by_status(
        &self,
        status: LoanApplicationStatus,
        limit: usize,
    ) -> Result<Vec<LoanApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<_> = guard
            .values()
            .filter(|record| record.status == status)
            .cloned()
            .collect();
        records.sort_by(|left, right| left.application_id.cmp(&right.application_id));
        records.truncate(limit);
        Ok(records)
    }
}

/// Keeps notifications in memory and logs them; stands in for the SMS/e-mail gateway.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationPublisher {
    events: Arc<Mutex<Vec<LoanNotification>>>,
}

impl NotificationPublisher for InMemoryNotificationPublisher {
    fn publish(&self, notification: LoanNotification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            application_id = %notification.application_id.0,
            "borrower notification queued"
        );
        let mut guard = self.events.lock().expect("notification mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryNotificationPublisher {
    pub(crate) fn events(&self) -> Vec<LoanNotification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}

/// Rate tables from `APP_RATE_TABLE` when configured, the standard tables otherwise.
pub(crate) fn load_rate_schedule(config: &RateConfig) -> Result<RateSchedule, AppError> {
    match &config.table_path {
        Some(path) => {
            let schedule = RateSchedule::from_path(path)?;
            info!(path = %path.display(), version = %schedule.version, "loaded rate table");
            Ok(schedule)
        }
        None => Ok(RateSchedule::standard()),
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
