use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::lending::applications::domain::{ApplicationId, LoanApplicationStatus};
use crate::workflows::lending::applications::repository::{
    LoanApplicationRecord, LoanApplicationRepository, LoanNotification, NotificationError,
    NotificationPublisher, RepositoryError,
};
use crate::workflows::lending::applications::{lending_router, LoanApplicationService};
use crate::workflows::lending::domain::LoanCategory;
use crate::workflows::lending::intake::ApplicationDraft;
use crate::workflows::lending::quote::{QuoteEngine, RateSchedule};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Draft that passes the submission gate for every category.
pub(super) fn complete_draft(loan_amount: &str) -> ApplicationDraft {
    let mut draft = ApplicationDraft::new();
    for (key, value) in [
        ("first_name", "Maria"),
        ("middle_name", "Luz"),
        ("last_name", "Santos"),
        ("date_of_birth", "1988-04-12"),
        ("marital_status", "Single"),
        ("email", "maria.santos@example.com"),
        ("contact_number", "0917 123 4567"),
        ("address", "12 Mabini St, Quezon City"),
    ] {
        draft.basic_info.set(key, value);
    }
    for (key, value) in [
        ("source_of_income", "employed"),
        ("monthly_income", "38,000"),
        ("employer_name", "Northwind Logistics"),
        ("occupation", "Dispatcher"),
        ("employer_address", "Pasig City"),
    ] {
        draft.income.set(key, value);
    }
    for (slot, name, contact) in [
        (1, "Jose Reyes", "09181234567"),
        (2, "Ana Cruz", "+639191234567"),
        (3, "Ben Dela Rosa", "09201234567"),
    ] {
        draft.set_reference(slot, "name", name).expect("slot exists");
        draft
            .set_reference(slot, "contact", contact)
            .expect("slot exists");
        draft
            .set_reference(slot, "relation", "Friend")
            .expect("slot exists");
    }
    for (key, value) in [
        ("collateral_type", "Vehicle"),
        ("collateral_description", "2019 sedan, OR/CR on file"),
        ("collateral_value", "450000"),
    ] {
        draft.collateral.set(key, value);
    }
    draft.loan_details.set("loan_amount", loan_amount);
    draft.loan_details.set("loan_purpose", "Working capital");
    for (key, value) in [
        ("valid_id", "umid.pdf"),
        ("proof_of_income", "payslip.jpg"),
        ("proof_of_billing", "meralco.png"),
        ("collateral_document", "orcr.pdf"),
    ] {
        draft.uploads.set(key, value);
    }
    draft
}

pub(super) fn build_service() -> (
    LoanApplicationService<MemoryRepository, MemoryNotifications>,
    Arc<MemoryRepository>,
    Arc<MemoryNotifications>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = LoanApplicationService::new(
        repository.clone(),
        notifications.clone(),
        QuoteEngine::new(RateSchedule::standard()),
    );
    (service, repository, notifications)
}

/// Submitted and disbursed `WithoutCollateral` loan of 20,000 (8 x 4,500).
pub(super) fn disbursed_loan(
    service: &LoanApplicationService<MemoryRepository, MemoryNotifications>,
) -> LoanApplicationRecord {
    use crate::workflows::lending::applications::domain::StatusAction;

    let record = service
        .submit(
            LoanCategory::WithoutCollateral,
            complete_draft("20000"),
            date(2025, 1, 10),
        )
        .expect("submission accepted");
    let id = record.application_id;
    service
        .transition(&id, StatusAction::Approve, date(2025, 1, 12))
        .expect("approve");
    service
        .transition(&id, StatusAction::Disburse, date(2025, 1, 15))
        .expect("disburse")
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ApplicationId, LoanApplicationRecord>>>,
}

impl LoanApplicationRepository for MemoryRepository {
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
        guard.insert(record.application_id.clone(), record);
        Ok(())
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
        let mut matches: Vec<_> = guard
            .values()
            .filter(|record| record.status == status)
            .cloned()
            .collect();
        matches.sort_by(|left, right| left.application_id.cmp(&right.application_id));
        matches.truncate(limit);
        Ok(matches)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<LoanNotification>>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<LoanNotification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }

    pub(super) fn templates(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.template)
            .collect()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: LoanNotification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Publisher whose transport is always down.
pub(super) struct OfflineNotifications;

impl NotificationPublisher for OfflineNotifications {
    fn publish(&self, _notification: LoanNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("sms gateway down".to_string()))
    }
}

pub(super) struct ConflictRepository;

impl LoanApplicationRepository for ConflictRepository {
    fn insert(
        &self,
        _record: LoanApplicationRecord,
    ) -> Result<LoanApplicationRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn update(&self, _record: LoanApplicationRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<LoanApplicationRecord>, RepositoryError> {
        Ok(None)
    }

    fn by_status(
        &self,
        _status: LoanApplicationStatus,
        _limit: usize,
    ) -> Result<Vec<LoanApplicationRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableRepository;

impl LoanApplicationRepository for UnavailableRepository {
    fn insert(
        &self,
        _record: LoanApplicationRecord,
    ) -> Result<LoanApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: LoanApplicationRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<LoanApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn by_status(
        &self,
        _status: LoanApplicationStatus,
        _limit: usize,
    ) -> Result<Vec<LoanApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(
    service: LoanApplicationService<MemoryRepository, MemoryNotifications>,
) -> axum::Router {
    lending_router(Arc::new(service))
}

/// Money fields serialize as decimal strings.
pub(super) fn money(value: &Value) -> rust_decimal::Decimal {
    value
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .expect("money serialized as a decimal string")
}
