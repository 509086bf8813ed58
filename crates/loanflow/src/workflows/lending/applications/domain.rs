use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::super::domain::Money;

/// Identifier wrapper for submitted loan applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Lifecycle of a submitted application from intake through collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanApplicationStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Disbursed,
    Closed,
    Cancelled,
}

impl LoanApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LoanApplicationStatus::Submitted => "submitted",
            LoanApplicationStatus::UnderReview => "under_review",
            LoanApplicationStatus::Approved => "approved",
            LoanApplicationStatus::Rejected => "rejected",
            LoanApplicationStatus::Disbursed => "disbursed",
            LoanApplicationStatus::Closed => "closed",
            LoanApplicationStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            LoanApplicationStatus::Rejected
                | LoanApplicationStatus::Closed
                | LoanApplicationStatus::Cancelled
        )
    }

    /// Next status for a staff action, or the reason it is not allowed.
    pub fn apply(self, action: &StatusAction) -> Result<Self, InvalidTransition> {
        use LoanApplicationStatus::*;

        let next = match (self, action) {
            (Submitted, StatusAction::BeginReview) => UnderReview,
            (Submitted | UnderReview, StatusAction::Approve) => Approved,
            (Submitted | UnderReview, StatusAction::Reject { .. }) => Rejected,
            (Approved, StatusAction::Disburse) => Disbursed,
            (Submitted | UnderReview | Approved, StatusAction::Cancel { .. }) => Cancelled,
            _ => {
                return Err(InvalidTransition {
                    from: self,
                    action: action.name(),
                })
            }
        };

        Ok(next)
    }
}

impl fmt::Display for LoanApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Staff or borrower action that moves an application along its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StatusAction {
    BeginReview,
    Approve,
    Reject { reason: String },
    Disburse,
    Cancel { reason: String },
}

impl StatusAction {
    pub const fn name(&self) -> &'static str {
        match self {
            StatusAction::BeginReview => "begin_review",
            StatusAction::Approve => "approve",
            StatusAction::Reject { .. } => "reject",
            StatusAction::Disburse => "disburse",
            StatusAction::Cancel { .. } => "cancel",
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            StatusAction::Reject { reason } | StatusAction::Cancel { reason } => {
                Some(reason.as_str())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} an application that is {from}")]
pub struct InvalidTransition {
    pub from: LoanApplicationStatus,
    pub action: &'static str,
}

/// Audit trail entry for every status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: Option<LoanApplicationStatus>,
    pub to: LoanApplicationStatus,
    pub on: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repayment {
    pub amount: Money,
    pub paid_on: NaiveDate,
}
