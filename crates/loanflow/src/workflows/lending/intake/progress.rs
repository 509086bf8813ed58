use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::super::domain::{parse_amount, LoanCategory};
use super::schema::{section_requirements, sections_for, FieldRequirement, Presence};
use super::{ApplicationDraft, SectionKey};

/// Completion state of one tracker section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionProgress {
    pub section_key: SectionKey,
    pub section_label: String,
    pub is_complete: bool,
    pub missing_field_labels: Vec<String>,
    /// Present values that fail their format predicate.
    pub invalid_field_labels: Vec<String>,
    pub required_count: usize,
    pub satisfied_count: usize,
}

/// Checklist for a whole draft, sections in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub category: LoanCategory,
    pub sections: Vec<SectionProgress>,
    pub is_submittable: bool,
}

impl ProgressReport {
    pub fn section(&self, key: SectionKey) -> Option<&SectionProgress> {
        self.sections
            .iter()
            .find(|section| section.section_key == key)
    }

    pub fn completed_sections(&self) -> usize {
        self.sections
            .iter()
            .filter(|section| section.is_complete)
            .count()
    }

    pub fn missing_total(&self) -> usize {
        self.sections
            .iter()
            .map(|section| section.missing_field_labels.len())
            .sum()
    }
}

fn satisfies_presence(requirement: &FieldRequirement, value: Option<&str>) -> bool {
    match (requirement.rule.presence, value) {
        (Presence::Optional, _) => true,
        (Presence::Required, present) => present.is_some(),
        (Presence::Positive, Some(raw)) => parse_amount(raw)
            .map(|amount| amount > Decimal::ZERO)
            .unwrap_or(false),
        (Presence::Positive, None) => false,
    }
}

fn section_progress(
    section: SectionKey,
    category: LoanCategory,
    draft: &ApplicationDraft,
) -> SectionProgress {
    let requirements = section_requirements(section, category, draft);
    let mut missing_field_labels = Vec::new();
    let mut invalid_field_labels = Vec::new();
    let mut required_count = 0;

    for requirement in &requirements {
        let value = draft.value_of(requirement);
        if requirement.rule.presence != Presence::Optional {
            required_count += 1;
            if !satisfies_presence(requirement, value) {
                missing_field_labels.push(requirement.label.clone());
                continue;
            }
        }

        if let (Some(format), Some(value)) = (requirement.rule.format, value) {
            if !format.accepts(value) {
                invalid_field_labels.push(requirement.label.clone());
            }
        }
    }

    SectionProgress {
        section_key: section,
        section_label: section.label().to_string(),
        is_complete: missing_field_labels.is_empty(),
        satisfied_count: required_count - missing_field_labels.len(),
        missing_field_labels,
        invalid_field_labels,
        required_count,
    }
}

/// Evaluate every tracked section of `draft` for `category`.
pub fn compute_progress(draft: &ApplicationDraft, category: LoanCategory) -> ProgressReport {
    let sections: Vec<SectionProgress> = sections_for(category)
        .into_iter()
        .map(|section| section_progress(section, category, draft))
        .collect();
    let is_submittable = sections
        .iter()
        .all(|section| section.is_complete && section.invalid_field_labels.is_empty());

    ProgressReport {
        category,
        sections,
        is_submittable,
    }
}

/// Submit-time gate raised when a draft still has gaps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "application is not ready to submit: {} missing and {} invalid field(s) in [{}]",
    .missing.len(),
    .invalid.len(),
    section_list(.incomplete_sections)
)]
pub struct SubmissionBlocked {
    pub incomplete_sections: Vec<SectionKey>,
    pub missing: Vec<String>,
    pub invalid: Vec<String>,
}

fn section_list(sections: &[SectionKey]) -> String {
    sections
        .iter()
        .map(|section| section.key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Gate a submission on the same schema the live tracker uses.
pub fn check_submittable(
    draft: &ApplicationDraft,
    category: LoanCategory,
) -> Result<ProgressReport, SubmissionBlocked> {
    let report = compute_progress(draft, category);
    if report.is_submittable {
        return Ok(report);
    }

    let incomplete_sections = report
        .sections
        .iter()
        .filter(|section| !section.is_complete || !section.invalid_field_labels.is_empty())
        .map(|section| section.section_key)
        .collect();
    let missing = report
        .sections
        .iter()
        .flat_map(|section| section.missing_field_labels.iter().cloned())
        .collect();
    let invalid = report
        .sections
        .iter()
        .flat_map(|section| section.invalid_field_labels.iter().cloned())
        .collect();

    Err(SubmissionBlocked {
        incomplete_sections,
        missing,
        invalid,
    })
}
