//! Field requirements for every tracker section, shared by the live checklist, the
//! submit-time gate, and the submission adapter.

use super::super::domain::LoanCategory;
use super::validators::FieldFormat;
use super::{ApplicationDraft, SectionKey, REFERENCE_SLOTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be present and non-blank.
    Required,
    /// Must parse to a number greater than zero.
    Positive,
    /// Only validated when supplied.
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub key: &'static str,
    pub label: &'static str,
    pub presence: Presence,
    pub format: Option<FieldFormat>,
}

impl FieldRule {
    const fn required(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            presence: Presence::Required,
            format: None,
        }
    }

    const fn positive(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            presence: Presence::Positive,
            format: None,
        }
    }

    const fn optional(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            presence: Presence::Optional,
            format: None,
        }
    }

    const fn formatted(self, format: FieldFormat) -> Self {
        Self {
            format: Some(format),
            ..self
        }
    }
}

const IDENTITY_FIELDS: &[FieldRule] = &[
    FieldRule::required("first_name", "First Name").formatted(FieldFormat::PersonName),
    FieldRule::optional("middle_name", "Middle Name").formatted(FieldFormat::PersonName),
    FieldRule::required("last_name", "Last Name").formatted(FieldFormat::PersonName),
    FieldRule::required("date_of_birth", "Date of Birth").formatted(FieldFormat::IsoDate),
    FieldRule::required("marital_status", "Marital Status"),
];

const SPOUSE_FIELDS: &[FieldRule] = &[
    FieldRule::required("spouse_name", "Spouse Name").formatted(FieldFormat::PersonName),
    FieldRule::required("spouse_occupation", "Spouse Occupation"),
];

const CONTACT_FIELDS: &[FieldRule] = &[
    FieldRule::required("email", "Email Address").formatted(FieldFormat::Email),
    FieldRule::required("contact_number", "Contact Number").formatted(FieldFormat::MobileNumber),
    FieldRule::required("address", "Home Address"),
];

const INCOME_FIELDS: &[FieldRule] = &[
    FieldRule::required("source_of_income", "Source of Income"),
    FieldRule::positive("monthly_income", "Monthly Income"),
];

const BUSINESS_FIELDS: &[FieldRule] = &[
    FieldRule::required("business_name", "Business Name"),
    FieldRule::required("business_type", "Type of Business"),
    FieldRule::required("business_address", "Business Address"),
];

const EMPLOYMENT_FIELDS: &[FieldRule] = &[
    FieldRule::required("employer_name", "Employer Name"),
    FieldRule::required("occupation", "Occupation"),
    FieldRule::required("employer_address", "Employer Address"),
];

pub(crate) const REFERENCE_FIELDS: &[FieldRule] = &[
    FieldRule::required("name", "Name").formatted(FieldFormat::PersonName),
    FieldRule::required("contact", "Contact").formatted(FieldFormat::MobileNumber),
    FieldRule::required("relation", "Relationship"),
];

const COLLATERAL_FIELDS: &[FieldRule] = &[
    FieldRule::required("collateral_type", "Collateral Type"),
    FieldRule::required("collateral_description", "Collateral Description"),
    FieldRule::positive("collateral_value", "Estimated Collateral Value"),
];

const LOAN_DETAIL_FIELDS: &[FieldRule] = &[
    FieldRule::positive("loan_amount", "Loan Amount"),
    FieldRule::required("loan_purpose", "Loan Purpose"),
    FieldRule::optional("agent_id", "Assigned Agent"),
];

const UPLOAD_FIELDS: &[FieldRule] = &[
    FieldRule::required("valid_id", "Valid ID").formatted(FieldFormat::DocumentFile),
    FieldRule::required("proof_of_income", "Proof of Income").formatted(FieldFormat::DocumentFile),
    FieldRule::required("proof_of_billing", "Proof of Billing")
        .formatted(FieldFormat::DocumentFile),
];

const COLLATERAL_UPLOAD_FIELDS: &[FieldRule] = &[FieldRule::required(
    "collateral_document",
    "Collateral Document",
)
.formatted(FieldFormat::DocumentFile)];

/// Declared income source driving the income sub-fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomeBranch {
    Business,
    Employed,
    Undeclared,
}

impl IncomeBranch {
    pub fn of(draft: &ApplicationDraft) -> Self {
        match draft.income.get("source_of_income") {
            Some(source) if source.eq_ignore_ascii_case("business") => Self::Business,
            Some(source) if source.eq_ignore_ascii_case("employed") => Self::Employed,
            _ => Self::Undeclared,
        }
    }
}

fn is_married(draft: &ApplicationDraft) -> bool {
    draft
        .basic_info
        .get("marital_status")
        .map(|status| status.eq_ignore_ascii_case("married"))
        .unwrap_or(false)
}

/// A schema rule resolved against a concrete draft, with its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRequirement {
    pub section: SectionKey,
    pub slot: Option<usize>,
    pub rule: &'static FieldRule,
    pub label: String,
}

impl FieldRequirement {
    fn plain(section: SectionKey, rule: &'static FieldRule) -> Self {
        Self {
            section,
            slot: None,
            rule,
            label: rule.label.to_string(),
        }
    }

    fn reference(slot: usize, rule: &'static FieldRule) -> Self {
        Self {
            section: SectionKey::References,
            slot: Some(slot),
            rule,
            label: format!("Reference {} {}", slot + 1, rule.label),
        }
    }

    /// Form-data field name used when the draft is posted upstream.
    pub fn wire_name(&self) -> String {
        match self.slot {
            Some(slot) => format!("{}[{}][{}]", self.section.key(), slot, self.rule.key),
            None => format!("{}[{}]", self.section.key(), self.rule.key),
        }
    }
}

/// Sections tracked for a category, in display order.
pub fn sections_for(category: LoanCategory) -> Vec<SectionKey> {
    SectionKey::ordered()
        .into_iter()
        .filter(|section| *section != SectionKey::Collateral || category.requires_collateral())
        .collect()
}

/// Every rule that applies to `section` for this category and the draft's current branches.
pub fn section_requirements(
    section: SectionKey,
    category: LoanCategory,
    draft: &ApplicationDraft,
) -> Vec<FieldRequirement> {
    let plain = |rules: &'static [FieldRule]| {
        rules
            .iter()
            .map(move |rule| FieldRequirement::plain(section, rule))
    };

    match section {
        SectionKey::BasicInfo => {
            let mut fields: Vec<_> = plain(IDENTITY_FIELDS).collect();
            if is_married(draft) {
                fields.extend(plain(SPOUSE_FIELDS));
            }
            fields.extend(plain(CONTACT_FIELDS));
            fields
        }
        SectionKey::Income => {
            let mut fields: Vec<_> = plain(INCOME_FIELDS).collect();
            match IncomeBranch::of(draft) {
                IncomeBranch::Business => fields.extend(plain(BUSINESS_FIELDS)),
                IncomeBranch::Employed => fields.extend(plain(EMPLOYMENT_FIELDS)),
                IncomeBranch::Undeclared => {}
            }
            fields
        }
        SectionKey::References => (0..REFERENCE_SLOTS)
            .flat_map(|slot| {
                REFERENCE_FIELDS
                    .iter()
                    .map(move |rule| FieldRequirement::reference(slot, rule))
            })
            .collect(),
        SectionKey::Collateral if category.requires_collateral() => {
            plain(COLLATERAL_FIELDS).collect()
        }
        SectionKey::Collateral => Vec::new(),
        SectionKey::LoanDetails => plain(LOAN_DETAIL_FIELDS).collect(),
        SectionKey::Uploads => {
            let mut fields: Vec<_> = plain(UPLOAD_FIELDS).collect();
            if category.requires_collateral() {
                fields.extend(plain(COLLATERAL_UPLOAD_FIELDS));
            }
            fields
        }
    }
}
