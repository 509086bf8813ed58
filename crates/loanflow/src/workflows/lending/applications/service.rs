use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::super::domain::{parse_amount, LoanCategory, Money};
use super::super::intake::{
    check_submittable, compute_progress, ApplicationDraft, ProgressReport, SubmissionBlocked,
};
use super::super::quote::{AmortizationSchedule, Ineligibility, QuoteEngine, QuoteOutcome};
use super::domain::{
    ApplicationId, InvalidTransition, LoanApplicationStatus, Repayment, StatusAction,
    StatusChange,
};
use super::repository::{
    CollectionSnapshot, LoanApplicationRecord, LoanApplicationRepository, LoanNotification,
    NotificationPublisher, RepositoryError,
};

/// Service composing the quote engine, intake gate, repository, and notifications.
pub struct LoanApplicationService<R, N> {
    quotes: Arc<QuoteEngine>,
    repository: Arc<R>,
    notifications: Arc<N>,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("loan-{id:06}"))
}

impl<R, N> LoanApplicationService<R, N>
where
    R: LoanApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>, quotes: QuoteEngine) -> Self {
        Self {
            quotes: Arc::new(quotes),
            repository,
            notifications,
        }
    }

    pub fn quotes(&self) -> &QuoteEngine {
        &self.quotes
    }

    pub fn progress(&self, draft: &ApplicationDraft, category: LoanCategory) -> ProgressReport {
        compute_progress(draft, category)
    }

    /// Gate, quote, and store a completed draft.
    pub fn submit(
        &self,
        category: LoanCategory,
        draft: ApplicationDraft,
        on: NaiveDate,
    ) -> Result<LoanApplicationRecord, ApplicationServiceError> {
        if let Err(blocked) = check_submittable(&draft, category) {
            debug!(
                category = category.slug(),
                missing = blocked.missing.len(),
                invalid = blocked.invalid.len(),
                "submission blocked by intake gate"
            );
            return Err(blocked.into());
        }

        let raw_amount = draft.loan_details.get("loan_amount").unwrap_or_default();
        let principal =
            parse_amount(raw_amount).ok_or(ApplicationServiceError::InvalidLoanAmount)?;
        let quote = match self.quotes.quote(category, principal) {
            QuoteOutcome::Quoted(quote) => quote,
            QuoteOutcome::NotEligible(reason) => {
                return Err(ApplicationServiceError::NotEligible(reason))
            }
        };

        let application_id = next_application_id();
        let record = LoanApplicationRecord {
            application_id: application_id.clone(),
            category,
            applicant_name: draft.applicant_name().unwrap_or_default(),
            draft,
            quote,
            status: LoanApplicationStatus::Submitted,
            history: vec![StatusChange {
                from: None,
                to: LoanApplicationStatus::Submitted,
                on,
                note: None,
            }],
            disbursed_on: None,
            schedule: None,
            repayments: Vec::new(),
        };

        let stored = self.repository.insert(record)?;
        info!(
            application_id = %application_id.0,
            category = category.slug(),
            principal = %stored.quote.principal,
            "loan application submitted"
        );
        Ok(stored)
    }

    /// Apply a staff action and persist the resulting status.
    pub fn transition(
        &self,
        application_id: &ApplicationId,
        action: StatusAction,
        on: NaiveDate,
    ) -> Result<LoanApplicationRecord, ApplicationServiceError> {
        let mut record = self.load(application_id)?;
        let from = record.status;
        let to = from.apply(&action)?;

        if action == StatusAction::Disburse {
            let first_due = on.checked_add_months(Months::new(1)).unwrap_or(on);
            record.disbursed_on = Some(on);
            record.schedule = AmortizationSchedule::for_quote(&record.quote, first_due);
        }

        record.status = to;
        record.history.push(StatusChange {
            from: Some(from),
            to,
            on,
            note: action.note().map(str::to_string),
        });
        self.repository.update(record.clone())?;

        info!(
            application_id = %application_id.0,
            from = from.label(),
            to = to.label(),
            "loan application status changed"
        );

        let template = match to {
            LoanApplicationStatus::Approved => Some("loan_approved"),
            LoanApplicationStatus::Rejected => Some("loan_rejected"),
            LoanApplicationStatus::Disbursed => Some("loan_disbursed"),
            _ => None,
        };
        if let Some(template) = template {
            let mut details = BTreeMap::new();
            details.insert("status".to_string(), to.label().to_string());
            if let Some(note) = action.note() {
                details.insert("reason".to_string(), note.to_string());
            }
            if let Some(payment) = record.quote.monthly_payment {
                details.insert("monthly_payment".to_string(), payment.to_string());
            }
            self.notify(template, &record, details);
        }

        Ok(record)
    }

    /// Post a repayment against a disbursed loan; clearing the balance closes it.
    pub fn record_payment(
        &self,
        application_id: &ApplicationId,
        amount: Money,
        paid_on: NaiveDate,
    ) -> Result<LoanApplicationRecord, ApplicationServiceError> {
        let mut record = self.load(application_id)?;
        if record.status != LoanApplicationStatus::Disbursed {
            return Err(PaymentError::NotCollectable(record.status).into());
        }
        if amount <= Decimal::ZERO {
            return Err(PaymentError::NonPositive.into());
        }
        let outstanding = record.outstanding();
        if amount > outstanding {
            warn!(
                application_id = %application_id.0,
                %amount,
                %outstanding,
                "rejected overpayment"
            );
            return Err(PaymentError::ExceedsBalance {
                amount,
                outstanding,
            }
            .into());
        }

        record.repayments.push(Repayment { amount, paid_on });
        let closed = record.outstanding() == Decimal::ZERO;
        if closed {
            record.status = LoanApplicationStatus::Closed;
            record.history.push(StatusChange {
                from: Some(LoanApplicationStatus::Disbursed),
                to: LoanApplicationStatus::Closed,
                on: paid_on,
                note: Some("fully repaid".to_string()),
            });
        }
        self.repository.update(record.clone())?;

        info!(
            application_id = %application_id.0,
            %amount,
            outstanding = %record.outstanding(),
            "repayment recorded"
        );

        if closed {
            let mut details = BTreeMap::new();
            details.insert("amount_paid".to_string(), record.amount_paid().to_string());
            self.notify("loan_closed", &record, details);
        }

        Ok(record)
    }

    pub fn collections(
        &self,
        application_id: &ApplicationId,
        today: NaiveDate,
    ) -> Result<CollectionSnapshot, ApplicationServiceError> {
        Ok(self.load(application_id)?.collections(today))
    }

    /// Fetch an application and current status for API responses.
    pub fn get(
        &self,
        application_id: &ApplicationId,
    ) -> Result<LoanApplicationRecord, ApplicationServiceError> {
        self.load(application_id)
    }

    /// Applications waiting in a given status, e.g. the reviewer queue.
    pub fn queue(
        &self,
        status: LoanApplicationStatus,
        limit: usize,
    ) -> Result<Vec<LoanApplicationRecord>, ApplicationServiceError> {
        Ok(self.repository.by_status(status, limit)?)
    }

    fn load(
        &self,
        application_id: &ApplicationId,
    ) -> Result<LoanApplicationRecord, ApplicationServiceError> {
        let record = self
            .repository
            .fetch(application_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Runs after the record is committed; a failed publish is logged, not returned.
    fn notify(
        &self,
        template: &str,
        record: &LoanApplicationRecord,
        details: BTreeMap<String, String>,
    ) {
        let notification = LoanNotification {
            template: template.to_string(),
            application_id: record.application_id.clone(),
            details,
        };
        if let Err(error) = self.notifications.publish(notification) {
            warn!(
                application_id = %record.application_id.0,
                template,
                %error,
                "borrower notification not delivered"
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("payments are only accepted on disbursed loans (status is {0})")]
    NotCollectable(LoanApplicationStatus),
    #[error("payment amount must be greater than zero")]
    NonPositive,
    #[error("payment of {amount} exceeds outstanding balance of {outstanding}")]
    ExceedsBalance { amount: Money, outstanding: Money },
}

/// Error raised by the loan application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Incomplete(#[from] SubmissionBlocked),
    #[error("loan amount is not eligible: {}", .0.summary())]
    NotEligible(Ineligibility),
    #[error("loan amount must be a number")]
    InvalidLoanAmount,
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
