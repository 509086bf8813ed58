use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{Local, Months, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::super::domain::{LoanCategory, Money};
use super::super::intake::{ApplicationDraft, SubmissionBlocked, SubmissionPayload};
use super::super::quote::{AmortizationSchedule, QuoteOutcome};
use super::domain::{ApplicationId, StatusAction};
use super::repository::{LoanApplicationRepository, NotificationPublisher, RepositoryError};
use super::service::{ApplicationServiceError, LoanApplicationService};

/// Principal as typed by the borrower: either a JSON number or free text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PrincipalInput {
    Number(serde_json::Number),
    Text(String),
}

impl PrincipalInput {
    fn as_text(&self) -> String {
        match self {
            PrincipalInput::Number(number) => number.to_string(),
            PrincipalInput::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub category: LoanCategory,
    pub principal: PrincipalInput,
    /// Due date of the first installment; defaults to one month from today.
    #[serde(default)]
    pub first_due: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftRequest {
    pub category: LoanCategory,
    #[serde(default)]
    pub draft: ApplicationDraft,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionRequest {
    #[serde(flatten)]
    pub action: StatusAction,
    #[serde(default)]
    pub on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
    #[serde(default)]
    pub paid_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionsQuery {
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

/// Router builder exposing quoting, intake, and servicing endpoints.
pub fn lending_router<R, N>(service: Arc<LoanApplicationService<R, N>>) -> Router
where
    R: LoanApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/loans/rates", get(rates_handler::<R, N>))
        .route("/api/v1/loans/quote", post(quote_handler::<R, N>))
        .route(
            "/api/v1/loans/applications/progress",
            post(progress_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/applications/payload",
            post(payload_handler::<R, N>),
        )
        .route("/api/v1/loans/applications", post(submit_handler::<R, N>))
        .route(
            "/api/v1/loans/applications/:application_id",
            get(status_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/applications/:application_id/transitions",
            post(transition_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/applications/:application_id/payments",
            post(payment_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/applications/:application_id/collections",
            get(collections_handler::<R, N>),
        )
        .with_state(service)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) async fn rates_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
) -> Response
where
    R: LoanApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    (StatusCode::OK, axum::Json(service.quotes().schedule().clone())).into_response()
}

pub(crate) async fn quote_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    axum::Json(request): axum::Json<QuoteRequest>,
) -> Response
where
    R: LoanApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let raw = request.principal.as_text();
    let payload = match service.quotes().quote_input(request.category, &raw) {
        QuoteOutcome::Quoted(quote) => {
            let first_due = request.first_due.unwrap_or_else(|| {
                let today = today();
                today.checked_add_months(Months::new(1)).unwrap_or(today)
            });
            let schedule = AmortizationSchedule::for_quote(&quote, first_due);
            json!({
                "eligible": true,
                "quote": quote,
                "schedule": schedule,
            })
        }
        QuoteOutcome::NotEligible(reason) => {
            let mut payload = json!({
                "eligible": false,
                "message": reason.summary(),
            });
            if let (Some(target), Ok(serde_json::Value::Object(fields))) =
                (payload.as_object_mut(), serde_json::to_value(&reason))
            {
                target.extend(fields);
            }
            payload
        }
    };

    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn progress_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    axum::Json(request): axum::Json<DraftRequest>,
) -> Response
where
    R: LoanApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let report = service.progress(&request.draft, request.category);
    (StatusCode::OK, axum::Json(report)).into_response()
}

pub(crate) async fn payload_handler<R, N>(
    State(_service): State<Arc<LoanApplicationService<R, N>>>,
    axum::Json(request): axum::Json<DraftRequest>,
) -> Response
where
    R: LoanApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match SubmissionPayload::from_draft(&request.draft, request.category) {
        Ok(payload) => (StatusCode::OK, axum::Json(payload)).into_response(),
        Err(blocked) => blocked_response(&blocked),
    }
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    axum::Json(request): axum::Json<DraftRequest>,
) -> Response
where
    R: LoanApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.submit(request.category, request.draft, today()) {
        Ok(record) => {
            let view = record.status_view();
            (StatusCode::ACCEPTED, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: LoanApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.get(&ApplicationId(application_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn transition_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    R: LoanApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let on = request.on.unwrap_or_else(today);
    match service.transition(&ApplicationId(application_id), request.action, on) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn payment_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<PaymentRequest>,
) -> Response
where
    R: LoanApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let paid_on = request.paid_on.unwrap_or_else(today);
    match service.record_payment(&ApplicationId(application_id), request.amount, paid_on) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn collections_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    Path(application_id): Path<String>,
    Query(query): Query<CollectionsQuery>,
) -> Response
where
    R: LoanApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let today = query.today.unwrap_or_else(today);
    match service.collections(&ApplicationId(application_id), today) {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

fn blocked_response(blocked: &SubmissionBlocked) -> Response {
    let sections: Vec<&str> = blocked
        .incomplete_sections
        .iter()
        .map(|section| section.key())
        .collect();
    let payload = json!({
        "error": blocked.to_string(),
        "incomplete_sections": sections,
        "missing": blocked.missing,
        "invalid": blocked.invalid,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}

fn error_response(error: ApplicationServiceError) -> Response {
    let status = match &error {
        ApplicationServiceError::Incomplete(blocked) => return blocked_response(blocked),
        ApplicationServiceError::NotEligible(_)
        | ApplicationServiceError::InvalidLoanAmount
        | ApplicationServiceError::Payment(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ApplicationServiceError::Transition(_)
        | ApplicationServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ApplicationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ApplicationServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
