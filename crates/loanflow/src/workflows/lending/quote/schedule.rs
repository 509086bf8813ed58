use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::super::domain::{round_money, Money};
use super::rates::MAX_TERM_MONTHS;
use super::LoanQuote;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub number: u32,
    pub due_on: NaiveDate,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub amount: Money,
    pub balance_after: Money,
}

/// Monthly repayment plan for a fixed-term quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub installments: Vec<Installment>,
}

impl AmortizationSchedule {
    /// Build the plan with the first installment due on `first_due`. Open-term quotes and
    /// quotes whose figures overflow have none.
    pub fn for_quote(quote: &LoanQuote, first_due: NaiveDate) -> Option<Self> {
        let term = quote
            .term_months
            .filter(|term| (1..=MAX_TERM_MONTHS).contains(term))?;
        let principal_share = round_money(quote.principal.checked_div(Decimal::from(term))?);
        let interest_portion = round_money(
            quote
                .principal
                .checked_mul(quote.monthly_interest_rate_percent)?
                .checked_div(Decimal::ONE_HUNDRED)?,
        );

        let mut balance = quote.principal;
        let mut installments = Vec::with_capacity(term as usize);
        for number in 1..=term {
            let principal_portion = if number == term {
                balance
            } else {
                principal_share.min(balance)
            };
            balance -= principal_portion;

            let due_on = first_due
                .checked_add_months(Months::new(number - 1))
                .unwrap_or(NaiveDate::MAX);

            installments.push(Installment {
                number,
                due_on,
                principal_portion,
                interest_portion,
                amount: principal_portion.checked_add(interest_portion)?,
                balance_after: balance,
            });
        }

        Some(Self { installments })
    }

    pub fn total_due(&self) -> Money {
        self.installments
            .iter()
            .map(|installment| installment.amount)
            .sum()
    }

    pub fn final_due_date(&self) -> Option<NaiveDate> {
        self.installments.last().map(|installment| installment.due_on)
    }
}
