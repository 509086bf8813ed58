use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::super::domain::{LoanCategory, Money};

/// Longest fixed term a rate table may declare.
pub const MAX_TERM_MONTHS: u32 = 600;

/// One bracket of a category's rate table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTableEntry {
    pub min_principal: Money,
    pub term_months: Option<u32>,
    pub monthly_interest_rate_percent: Decimal,
}

impl RateTableEntry {
    pub fn new(min_principal: i64, term_months: Option<u32>, rate_percent: Decimal) -> Self {
        Self {
            min_principal: Decimal::from(min_principal),
            term_months,
            monthly_interest_rate_percent: rate_percent,
        }
    }
}

/// Brackets for a single category, ordered by ascending `min_principal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    entries: Vec<RateTableEntry>,
}

impl RateTable {
    pub fn new(entries: Vec<RateTableEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RateTableEntry] {
        &self.entries
    }

    /// Smallest principal the category accepts.
    pub fn minimum_principal(&self) -> Option<Money> {
        self.entries.iter().map(|entry| entry.min_principal).min()
    }

    /// Qualifying bracket with the largest lower bound, if any.
    pub fn bracket_for(&self, principal: Money) -> Option<&RateTableEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.min_principal <= principal)
            .max_by_key(|entry| entry.min_principal)
    }
}

/// Versioned set of rate tables, one per loan category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSchedule {
    pub version: String,
    tables: BTreeMap<LoanCategory, RateTable>,
}

impl RateSchedule {
    /// Tables currently published to borrowers.
    pub fn standard() -> Self {
        let mut tables = BTreeMap::new();
        tables.insert(
            LoanCategory::WithoutCollateral,
            RateTable::new(vec![
                RateTableEntry::new(10_000, Some(5), Decimal::from(10)),
                RateTableEntry::new(15_000, Some(6), Decimal::from(10)),
                RateTableEntry::new(20_000, Some(8), Decimal::from(10)),
                RateTableEntry::new(30_000, Some(10), Decimal::from(10)),
            ]),
        );
        tables.insert(
            LoanCategory::WithCollateral,
            RateTable::new(vec![
                RateTableEntry::new(20_000, Some(8), Decimal::from(7)),
                RateTableEntry::new(50_000, Some(10), Decimal::from(5)),
                RateTableEntry::new(100_000, Some(18), Decimal::from(4)),
                RateTableEntry::new(200_000, Some(24), Decimal::from(3)),
                RateTableEntry::new(300_000, Some(36), Decimal::from(2)),
                RateTableEntry::new(500_000, Some(60), Decimal::new(15, 1)),
            ]),
        );
        tables.insert(
            LoanCategory::OpenTerm,
            RateTable::new(vec![
                RateTableEntry::new(50_000, None, Decimal::from(6)),
                RateTableEntry::new(100_000, None, Decimal::from(5)),
                RateTableEntry::new(200_000, None, Decimal::from(4)),
                RateTableEntry::new(500_000, None, Decimal::from(3)),
            ]),
        );

        Self {
            version: "standard".to_string(),
            tables,
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RateTableError> {
        let schedule: RateSchedule = serde_json::from_reader(reader)?;
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn from_path(path: &Path) -> Result<Self, RateTableError> {
        let file = File::open(path).map_err(|source| RateTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn table(&self, category: LoanCategory) -> Option<&RateTable> {
        self.tables.get(&category)
    }

    pub fn tables(&self) -> impl Iterator<Item = (LoanCategory, &RateTable)> {
        self.tables.iter().map(|(category, table)| (*category, table))
    }

    pub fn validate(&self) -> Result<(), RateTableError> {
        for category in LoanCategory::ordered() {
            let table = self
                .tables
                .get(&category)
                .ok_or(RateTableError::MissingCategory(category))?;
            if table.entries.is_empty() {
                return Err(RateTableError::MissingCategory(category));
            }

            let mut previous: Option<Money> = None;
            for entry in &table.entries {
                if entry.min_principal <= Decimal::ZERO {
                    return Err(RateTableError::NonPositiveMinimum {
                        category,
                        min_principal: entry.min_principal,
                    });
                }
                if entry.monthly_interest_rate_percent < Decimal::ZERO {
                    return Err(RateTableError::NegativeRate {
                        category,
                        min_principal: entry.min_principal,
                    });
                }
                if let Some(prior) = previous {
                    if entry.min_principal <= prior {
                        return Err(RateTableError::Unordered {
                            category,
                            min_principal: entry.min_principal,
                        });
                    }
                }
                match (category.has_fixed_term(), entry.term_months) {
                    (true, Some(months)) if (1..=MAX_TERM_MONTHS).contains(&months) => {}
                    (false, None) => {}
                    _ => {
                        return Err(RateTableError::TermMismatch {
                            category,
                            min_principal: entry.min_principal,
                        })
                    }
                }
                previous = Some(entry.min_principal);
            }
        }

        Ok(())
    }
}

impl Default for RateSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateTableError {
    #[error("unable to read rate table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("rate table is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("rate table has no brackets for {0}")]
    MissingCategory(LoanCategory),
    #[error("{category} bracket {min_principal} must have a positive minimum principal")]
    NonPositiveMinimum {
        category: LoanCategory,
        min_principal: Money,
    },
    #[error("{category} bracket {min_principal} has a negative interest rate")]
    NegativeRate {
        category: LoanCategory,
        min_principal: Money,
    },
    #[error("{category} brackets must be strictly ascending (found {min_principal} out of order)")]
    Unordered {
        category: LoanCategory,
        min_principal: Money,
    },
    #[error(
        "{category} bracket {min_principal} has a term that does not match the category \
         or exceeds {} months",
        MAX_TERM_MONTHS
    )]
    TermMismatch {
        category: LoanCategory,
        min_principal: Money,
    },
}
