//! Tracked loan applications: submission, staff review, disbursement, and collections.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationId, InvalidTransition, LoanApplicationStatus, Repayment, StatusAction, StatusChange,
};
pub use repository::{
    ApplicationStatusView, CollectionSnapshot, LoanApplicationRecord, LoanApplicationRepository,
    LoanNotification, NotificationError, NotificationPublisher, RepositoryError,
};
pub use router::lending_router;
pub use service::{ApplicationServiceError, LoanApplicationService, PaymentError};
