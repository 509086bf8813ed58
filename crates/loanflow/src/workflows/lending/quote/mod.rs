//! Loan quoting: rate brackets, derived quote figures, and repayment schedules.

mod rates;
mod schedule;

pub use rates::{RateSchedule, RateTable, RateTableEntry, RateTableError, MAX_TERM_MONTHS};
pub use schedule::{AmortizationSchedule, Installment};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{parse_amount, round_money, LoanCategory, Money};

/// Flat deduction withheld from the principal before disbursement.
pub const SERVICE_CHARGE_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Derived figures for a principal that falls inside one of the category's brackets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanQuote {
    pub category: LoanCategory,
    pub principal: Money,
    pub term_months: Option<u32>,
    pub monthly_interest_rate_percent: Decimal,
    pub monthly_payment: Option<Money>,
    pub service_charge: Money,
    pub net_proceeds: Money,
    pub total_interest: Money,
    pub total_repayment: Money,
}

impl LoanQuote {
    /// `None` when a derived figure does not fit in a `Decimal`.
    fn from_bracket(
        category: LoanCategory,
        principal: Money,
        bracket: &RateTableEntry,
    ) -> Option<Self> {
        let rate = bracket.monthly_interest_rate_percent;
        let monthly_interest = principal
            .checked_mul(rate)?
            .checked_div(Decimal::ONE_HUNDRED)?;
        let service_charge = round_money(principal.checked_mul(SERVICE_CHARGE_RATE)?);
        let total_interest = round_money(monthly_interest);
        let total_repayment = principal.checked_add(total_interest)?;
        let monthly_payment = match bracket.term_months {
            Some(term) => {
                let term = Decimal::from(term);
                // the installment plan must also be representable
                monthly_interest.checked_mul(term)?.checked_add(principal)?;
                let share = principal.checked_div(term)?;
                Some(round_money(share.checked_add(monthly_interest)?))
            }
            None => None,
        };

        Some(Self {
            category,
            principal,
            term_months: bracket.term_months,
            monthly_interest_rate_percent: rate,
            monthly_payment,
            service_charge,
            net_proceeds: principal - service_charge,
            total_interest,
            total_repayment,
        })
    }
}

/// Why a principal could not be quoted. Rendered inline, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Ineligibility {
    /// Input was not a positive number.
    InvalidAmount,
    /// Principal is below the category's smallest bracket.
    BelowMinimum { minimum: Money },
}

impl Ineligibility {
    pub fn summary(&self) -> String {
        match self {
            Ineligibility::InvalidAmount => "enter a valid loan amount".to_string(),
            Ineligibility::BelowMinimum { minimum } => {
                format!("amount below minimum of {minimum} for this loan type")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteOutcome {
    Quoted(LoanQuote),
    NotEligible(Ineligibility),
}

impl QuoteOutcome {
    pub fn quote(&self) -> Option<&LoanQuote> {
        match self {
            QuoteOutcome::Quoted(quote) => Some(quote),
            QuoteOutcome::NotEligible(_) => None,
        }
    }

    pub fn into_quote(self) -> Option<LoanQuote> {
        match self {
            QuoteOutcome::Quoted(quote) => Some(quote),
            QuoteOutcome::NotEligible(_) => None,
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, QuoteOutcome::Quoted(_))
    }
}

/// Quote a principal against the schedule's table for `category`.
pub fn compute_quote(
    schedule: &RateSchedule,
    category: LoanCategory,
    principal: Money,
) -> QuoteOutcome {
    if principal <= Decimal::ZERO {
        return QuoteOutcome::NotEligible(Ineligibility::InvalidAmount);
    }

    let Some(table) = schedule.table(category) else {
        return QuoteOutcome::NotEligible(Ineligibility::InvalidAmount);
    };

    match table.bracket_for(principal) {
        Some(bracket) => match LoanQuote::from_bracket(category, principal, bracket) {
            Some(quote) => QuoteOutcome::Quoted(quote),
            None => QuoteOutcome::NotEligible(Ineligibility::InvalidAmount),
        },
        None => QuoteOutcome::NotEligible(Ineligibility::BelowMinimum {
            minimum: table.minimum_principal().unwrap_or_default(),
        }),
    }
}

/// Stateless quoting facade bound to one rate schedule.
#[derive(Debug, Clone, Default)]
pub struct QuoteEngine {
    schedule: RateSchedule,
}

impl QuoteEngine {
    pub fn new(schedule: RateSchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &RateSchedule {
        &self.schedule
    }

    pub fn quote(&self, category: LoanCategory, principal: Money) -> QuoteOutcome {
        compute_quote(&self.schedule, category, principal)
    }

    /// Quote raw form input; unparseable text is treated as an invalid amount.
    pub fn quote_input(&self, category: LoanCategory, raw: &str) -> QuoteOutcome {
        match parse_amount(raw) {
            Some(principal) => self.quote(category, principal),
            None => QuoteOutcome::NotEligible(Ineligibility::InvalidAmount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> QuoteEngine {
        QuoteEngine::new(RateSchedule::standard())
    }

    fn quoted(outcome: QuoteOutcome) -> LoanQuote {
        match outcome {
            QuoteOutcome::Quoted(quote) => quote,
            other => panic!("expected a quote, got {other:?}"),
        }
    }

    #[test]
    fn without_collateral_twenty_thousand() {
        let quote = quoted(
            engine().quote(LoanCategory::WithoutCollateral, Decimal::from(20_000)),
        );

        assert_eq!(quote.term_months, Some(8));
        assert_eq!(quote.monthly_interest_rate_percent, Decimal::from(10));
        assert_eq!(quote.service_charge, Decimal::from(1_000));
        assert_eq!(quote.net_proceeds, Decimal::from(19_000));
        assert_eq!(quote.total_interest, Decimal::from(2_000));
        assert_eq!(quote.total_repayment, Decimal::from(22_000));
        assert_eq!(quote.monthly_payment, Some(Decimal::from(4_500)));
    }

    #[test]
    fn open_term_has_no_monthly_payment() {
        let quote = quoted(engine().quote(LoanCategory::OpenTerm, Decimal::from(499_999)));

        assert_eq!(quote.term_months, None);
        assert_eq!(quote.monthly_interest_rate_percent, Decimal::from(4));
        assert_eq!(quote.monthly_payment, None);
        assert_eq!(quote.total_interest, Decimal::new(1_999_996, 2));
        assert_eq!(quote.service_charge, Decimal::new(2_499_995, 2));
    }

    #[test]
    fn below_minimum_reports_category_floor() {
        let outcome = engine().quote(LoanCategory::WithCollateral, Decimal::from(19_999));

        assert_eq!(
            outcome,
            QuoteOutcome::NotEligible(Ineligibility::BelowMinimum {
                minimum: Decimal::from(20_000)
            })
        );
    }

    #[test]
    fn non_positive_and_non_numeric_inputs_are_not_eligible() {
        let engine = engine();

        for raw in ["0", "-5000", "abc", ""] {
            assert_eq!(
                engine.quote_input(LoanCategory::WithoutCollateral, raw),
                QuoteOutcome::NotEligible(Ineligibility::InvalidAmount),
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn principal_too_large_to_price_is_not_eligible() {
        let engine = engine();

        for category in LoanCategory::ordered() {
            assert_eq!(
                engine.quote_input(category, "10000000000000000000000000000"),
                QuoteOutcome::NotEligible(Ineligibility::InvalidAmount),
                "category {category}"
            );
        }
    }

    #[test]
    fn fractional_monthly_payment_rounds_to_centavos() {
        let quote = quoted(
            engine().quote(LoanCategory::WithoutCollateral, Decimal::from(10_000)),
        );

        // 10000 / 5 + 1000
        assert_eq!(quote.monthly_payment, Some(Decimal::from(3_000)));

        let quote = quoted(
            engine().quote(LoanCategory::WithoutCollateral, Decimal::from(15_001)),
        );
        // 15001 / 6 = 2500.1666.. plus 1500.10 interest
        assert_eq!(quote.monthly_payment, Some(Decimal::new(400_027, 2)));
    }
}
