use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::super::domain::{LoanCategory, Money};
use super::super::intake::ApplicationDraft;
use super::super::quote::{AmortizationSchedule, Installment, LoanQuote};
use super::domain::{ApplicationId, LoanApplicationStatus, Repayment, StatusChange};

/// Stored application with its quote, audit trail, and repayment ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplicationRecord {
    pub application_id: ApplicationId,
    pub category: LoanCategory,
    pub applicant_name: String,
    pub draft: ApplicationDraft,
    pub quote: LoanQuote,
    pub status: LoanApplicationStatus,
    pub history: Vec<StatusChange>,
    pub disbursed_on: Option<NaiveDate>,
    pub schedule: Option<AmortizationSchedule>,
    pub repayments: Vec<Repayment>,
}

impl LoanApplicationRecord {
    /// Amount the borrower owes once disbursed: the installment total for fixed-term loans,
    /// principal plus interest otherwise.
    pub fn amount_due(&self) -> Money {
        self.schedule
            .as_ref()
            .map(AmortizationSchedule::total_due)
            .unwrap_or(self.quote.total_repayment)
    }

    pub fn amount_paid(&self) -> Money {
        self.repayments.iter().map(|repayment| repayment.amount).sum()
    }

    pub fn outstanding(&self) -> Money {
        (self.amount_due() - self.amount_paid()).max(Decimal::ZERO)
    }

    /// Collections view as of `today`. Payments are applied to installments in order.
    pub fn collections(&self, today: NaiveDate) -> CollectionSnapshot {
        let amount_paid = self.amount_paid();
        let mut overdue_installments = 0;
        let mut overdue_amount = Decimal::ZERO;
        let mut next_installment = None;

        if self.status == LoanApplicationStatus::Disbursed {
            let mut remaining_credit = amount_paid;
            for installment in self
                .schedule
                .iter()
                .flat_map(|schedule| schedule.installments.iter())
            {
                let applied = remaining_credit.min(installment.amount);
                remaining_credit -= applied;
                let unpaid = installment.amount - applied;
                if unpaid <= Decimal::ZERO {
                    continue;
                }

                if installment.due_on < today {
                    overdue_installments += 1;
                    overdue_amount += unpaid;
                } else if next_installment.is_none() {
                    next_installment = Some(installment.clone());
                }
            }
        }

        CollectionSnapshot {
            application_id: self.application_id.clone(),
            status: self.status.label(),
            amount_due: self.amount_due(),
            amount_paid,
            outstanding: self.outstanding(),
            overdue_installments,
            overdue_amount,
            next_installment,
        }
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        let latest_note = self
            .history
            .iter()
            .rev()
            .find_map(|change| change.note.clone());

        ApplicationStatusView {
            application_id: self.application_id.clone(),
            applicant_name: self.applicant_name.clone(),
            category: self.category,
            status: self.status.label(),
            principal: self.quote.principal,
            monthly_payment: self.quote.monthly_payment,
            term_months: self.quote.term_months,
            outstanding: match self.status {
                LoanApplicationStatus::Disbursed | LoanApplicationStatus::Closed => {
                    Some(self.outstanding())
                }
                _ => None,
            },
            latest_note,
        }
    }
}

/// Storage abstraction so the service can be exercised in isolation.
pub trait LoanApplicationRepository: Send + Sync {
    fn insert(
        &self,
        record: LoanApplicationRecord,
    ) -> Result<LoanApplicationRecord, RepositoryError>;
    fn update(&self, record: LoanApplicationRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplicationRecord>, RepositoryError>;
    fn by_status(
        &self,
        status: LoanApplicationStatus,
        limit: usize,
    ) -> Result<Vec<LoanApplicationRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound borrower notifications (SMS, e-mail, or push adapters live outside this crate).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: LoanNotification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanNotification {
    pub template: String,
    pub application_id: ApplicationId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub applicant_name: String,
    pub category: LoanCategory,
    pub status: &'static str,
    pub principal: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_payment: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outstanding: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionSnapshot {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub amount_due: Money,
    pub amount_paid: Money,
    pub outstanding: Money,
    pub overdue_installments: usize,
    pub overdue_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_installment: Option<Installment>,
}
