use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency amounts are carried as exact decimals; derived values are rounded to centavos.
pub type Money = Decimal;

/// Loan product families offered by the lending desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanCategory {
    WithCollateral,
    WithoutCollateral,
    OpenTerm,
}

impl LoanCategory {
    pub const fn ordered() -> [Self; 3] {
        [Self::WithCollateral, Self::WithoutCollateral, Self::OpenTerm]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::WithCollateral => "With Collateral",
            Self::WithoutCollateral => "Without Collateral",
            Self::OpenTerm => "Open-Term",
        }
    }

    /// Path segment used by the external `/loan-applications/apply/{category}` endpoint.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::WithCollateral => "with-collateral",
            Self::WithoutCollateral => "without-collateral",
            Self::OpenTerm => "open-term",
        }
    }

    pub const fn requires_collateral(self) -> bool {
        matches!(self, Self::WithCollateral | Self::OpenTerm)
    }

    pub const fn has_fixed_term(self) -> bool {
        !matches!(self, Self::OpenTerm)
    }
}

impl fmt::Display for LoanCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown loan category '{0}' (expected with-collateral, without-collateral, or open-term)")]
pub struct UnknownCategory(pub String);

impl FromStr for LoanCategory {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|ch| !matches!(ch, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "withcollateral" => Ok(Self::WithCollateral),
            "withoutcollateral" => Ok(Self::WithoutCollateral),
            "openterm" => Ok(Self::OpenTerm),
            _ => Err(UnknownCategory(value.to_string())),
        }
    }
}

/// Round a money value to two decimal places, half away from zero.
pub fn round_money(value: Decimal) -> Money {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse form-typed amount text. Thousands separators are tolerated; anything else
/// non-numeric yields `None`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}
