use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Format predicates applied to present field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFormat {
    PersonName,
    Email,
    MobileNumber,
    IsoDate,
    DocumentFile,
}

impl FieldFormat {
    pub fn accepts(self, value: &str) -> bool {
        let value = value.trim();
        match self {
            FieldFormat::PersonName => person_name().is_match(value),
            FieldFormat::Email => email().is_match(value),
            FieldFormat::MobileNumber => {
                let compact: String = value
                    .chars()
                    .filter(|ch| !matches!(ch, ' ' | '-'))
                    .collect();
                mobile_number().is_match(&compact)
            }
            FieldFormat::IsoDate => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
            FieldFormat::DocumentFile => document_file().is_match(value),
        }
    }

    pub const fn hint(self) -> &'static str {
        match self {
            FieldFormat::PersonName => "letters, spaces, periods, apostrophes, and hyphens only",
            FieldFormat::Email => "a valid email address",
            FieldFormat::MobileNumber => "an 11-digit mobile number starting with 09 or +639",
            FieldFormat::IsoDate => "a date formatted YYYY-MM-DD",
            FieldFormat::DocumentFile => "a PDF, JPG, or PNG file",
        }
    }
}

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("field format pattern compiles"))
}

fn person_name() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    compiled(&PATTERN, r"^[\p{L}][\p{L} .'\-]*$")
}

fn email() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    compiled(&PATTERN, r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
}

fn mobile_number() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    compiled(&PATTERN, r"^(09|\+639)\d{9}$")
}

fn document_file() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    compiled(&PATTERN, r"(?i)^[^/\\]+\.(pdf|jpe?g|png)$")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_names_allow_common_punctuation() {
        assert!(FieldFormat::PersonName.accepts("Ma. Cristina"));
        assert!(FieldFormat::PersonName.accepts("O'Neil-Santos"));
        assert!(FieldFormat::PersonName.accepts("Peñafrancia"));
        assert!(!FieldFormat::PersonName.accepts("R2-D2"));
        assert!(!FieldFormat::PersonName.accepts(" "));
    }

    #[test]
    fn mobile_numbers_accept_local_and_international_prefixes() {
        assert!(FieldFormat::MobileNumber.accepts("09171234567"));
        assert!(FieldFormat::MobileNumber.accepts("+63 917 123 4567"));
        assert!(FieldFormat::MobileNumber.accepts("0917-123-4567"));
        assert!(!FieldFormat::MobileNumber.accepts("1234567"));
    }

    #[test]
    fn emails_and_dates() {
        assert!(FieldFormat::Email.accepts("borrower@example.ph"));
        assert!(!FieldFormat::Email.accepts("borrower@example"));
        assert!(FieldFormat::IsoDate.accepts("1990-02-28"));
        assert!(!FieldFormat::IsoDate.accepts("1990-02-30"));
    }

    #[test]
    fn documents_must_be_pdf_or_image() {
        assert!(FieldFormat::DocumentFile.accepts("payslip.PDF"));
        assert!(FieldFormat::DocumentFile.accepts("id-front.jpeg"));
        assert!(!FieldFormat::DocumentFile.accepts("notes.docx"));
        assert!(!FieldFormat::DocumentFile.accepts("../etc/passwd.png"));
    }
}
