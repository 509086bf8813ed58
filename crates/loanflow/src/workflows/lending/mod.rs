//! Loan origination: quoting, borrower intake, and tracked applications.

pub mod applications;
pub mod domain;
pub mod intake;
pub mod quote;

pub use domain::{LoanCategory, Money, UnknownCategory};
pub use intake::{compute_progress, ApplicationDraft, ProgressReport, SubmissionPayload};
pub use quote::{QuoteEngine, QuoteOutcome, RateSchedule};
